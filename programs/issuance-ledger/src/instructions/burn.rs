use anchor_lang::prelude::*;

use crate::authority::Operation;
use crate::errors::StablecoinError;
use crate::events::{AuditEvent, TokensBurned};
use crate::ledger::Transition;
use crate::utils::{bump_audit_counter, now_unix};

pub fn handler(tx: &mut Transition<'_>, from: Pubkey, amount: u64) -> Result<()> {
    require!(amount > 0, StablecoinError::InvalidAmount);
    tx.require_authorized(&Operation::Burn { owner: from })?;
    tx.require_active()?;
    require!(tx.has_account(&from)?, StablecoinError::AccountNotFound);

    tx.debit(&from, amount)?;

    let burner = tx.signer();
    let config = tx.config_mut()?;
    config.total_supply = config
        .total_supply
        .checked_sub(amount)
        .ok_or(StablecoinError::Overflow)?;
    config.total_burned = config
        .total_burned
        .checked_add(amount)
        .ok_or(StablecoinError::Overflow)?;
    bump_audit_counter(config)?;
    let new_total_supply = config.total_supply;

    tx.record(AuditEvent::Burned(TokensBurned {
        owner: from,
        amount,
        burner,
        new_total_supply,
        timestamp: now_unix(),
    }))
}
