use anchor_lang::prelude::*;

#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct MintConfig {
    pub authority: Pubkey,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub paused: bool,
    pub total_supply: u64,
    pub total_minted: u64,
    pub total_burned: u64,
    pub audit_counter: u64,
}

impl MintConfig {
    pub fn new(authority: Pubkey, name: String, symbol: String, decimals: u8) -> Self {
        Self {
            authority,
            name,
            symbol,
            decimals,
            paused: false,
            total_supply: 0,
            total_minted: 0,
            total_burned: 0,
            audit_counter: 0,
        }
    }
}

#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct HolderAccount {
    pub owner: Pubkey,
    pub balance: u64,
}

impl HolderAccount {
    pub fn empty(owner: Pubkey) -> Self {
        Self { owner, balance: 0 }
    }
}

#[account]
#[derive(Debug, PartialEq, Eq)]
pub struct HaltMarker {
    pub halted: bool,
    pub raised_at: i64,
    pub total_supply: u64,
    pub holder_sum: u128,
}
