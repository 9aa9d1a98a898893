use anchor_lang::prelude::*;

use crate::authority::Operation;
use crate::errors::StablecoinError;
use crate::events::{AuditEvent, AuthorityTransferred};
use crate::ledger::Transition;
use crate::utils::{bump_audit_counter, now_unix};

pub fn rotate_handler(tx: &mut Transition<'_>, new_authority: Pubkey) -> Result<()> {
    tx.require_authorized(&Operation::RotateAuthority)?;
    tx.require_active()?;
    let old_authority = tx.config().authority;
    require!(
        new_authority != old_authority,
        StablecoinError::SelfTransfer
    );

    let config = tx.config_mut()?;
    config.authority = new_authority;
    bump_audit_counter(config)?;

    tx.record(AuditEvent::AuthorityTransferred(AuthorityTransferred {
        old_authority,
        new_authority,
        timestamp: now_unix(),
    }))
}
