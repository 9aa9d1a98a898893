use anchor_lang::prelude::*;

use crate::events::{AuditEvent, StablecoinInitialized};
use crate::state::MintConfig;
use crate::utils::{now_unix, require_metadata};

#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct InitializeArgs {
    pub authority: Pubkey,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

pub fn handler(args: &InitializeArgs) -> Result<(MintConfig, AuditEvent)> {
    require_metadata(&args.name, &args.symbol, args.decimals)?;

    let config = MintConfig::new(
        args.authority,
        args.name.clone(),
        args.symbol.clone(),
        args.decimals,
    );
    let event = AuditEvent::Initialized(StablecoinInitialized {
        authority: config.authority,
        name: config.name.clone(),
        symbol: config.symbol.clone(),
        decimals: config.decimals,
        timestamp: now_unix(),
    });
    Ok((config, event))
}
