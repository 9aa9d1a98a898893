use anchor_lang::prelude::*;

use crate::authority::Operation;
use crate::errors::StablecoinError;
use crate::events::{AuditEvent, TokensTransferred};
use crate::ledger::Transition;
use crate::utils::now_unix;

/// Moves `amount` from the signer to `to`. Supply is untouched, so this runs
/// under the shared config lock and leaves the audit counter alone.
pub fn handler(tx: &mut Transition<'_>, to: Pubkey, amount: u64) -> Result<()> {
    let from = tx.signer();
    require!(amount > 0, StablecoinError::InvalidAmount);
    require!(from != to, StablecoinError::SelfTransfer);
    tx.require_authorized(&Operation::Transfer { owner: from })?;
    tx.require_active()?;

    tx.debit(&from, amount)?;
    tx.credit(&to, amount)?;

    tx.record(AuditEvent::Transferred(TokensTransferred {
        from,
        to,
        amount,
        timestamp: now_unix(),
    }))
}
