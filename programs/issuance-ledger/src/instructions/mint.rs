use anchor_lang::prelude::*;

use crate::authority::Operation;
use crate::errors::StablecoinError;
use crate::events::{AuditEvent, TokensMinted};
use crate::ledger::Transition;
use crate::utils::{bump_audit_counter, now_unix};

pub fn handler(tx: &mut Transition<'_>, to: Pubkey, amount: u64) -> Result<()> {
    require!(amount > 0, StablecoinError::InvalidAmount);
    tx.require_authorized(&Operation::Mint)?;
    tx.require_active()?;

    tx.credit(&to, amount)?;

    let minter = tx.signer();
    let config = tx.config_mut()?;
    config.total_supply = config
        .total_supply
        .checked_add(amount)
        .ok_or(StablecoinError::Overflow)?;
    config.total_minted = config
        .total_minted
        .checked_add(amount)
        .ok_or(StablecoinError::Overflow)?;
    bump_audit_counter(config)?;
    let new_total_supply = config.total_supply;

    tx.record(AuditEvent::Minted(TokensMinted {
        recipient: to,
        amount,
        minter,
        new_total_supply,
        timestamp: now_unix(),
    }))
}
