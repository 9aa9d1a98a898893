use anchor_lang::prelude::*;

use crate::authority::Operation;
use crate::errors::StablecoinError;
use crate::events::{AuditEvent, SystemPaused, SystemUnpaused};
use crate::ledger::Transition;
use crate::utils::{bump_audit_counter, now_unix};

pub fn pause_handler(tx: &mut Transition<'_>) -> Result<()> {
    tx.require_authorized(&Operation::Pause)?;
    require!(!tx.config().paused, StablecoinError::SystemPaused);

    let paused_by = tx.signer();
    let config = tx.config_mut()?;
    config.paused = true;
    bump_audit_counter(config)?;

    tx.record(AuditEvent::Paused(SystemPaused {
        paused_by,
        timestamp: now_unix(),
    }))
}

pub fn unpause_handler(tx: &mut Transition<'_>) -> Result<()> {
    tx.require_authorized(&Operation::Unpause)?;
    require!(tx.config().paused, StablecoinError::NotPaused);

    let unpaused_by = tx.signer();
    let config = tx.config_mut()?;
    config.paused = false;
    bump_audit_counter(config)?;

    tx.record(AuditEvent::Unpaused(SystemUnpaused {
        unpaused_by,
        timestamp: now_unix(),
    }))
}
