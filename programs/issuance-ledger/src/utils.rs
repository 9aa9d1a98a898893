use anchor_lang::prelude::*;
use anchor_lang::{AccountDeserialize, AccountSerialize};

use crate::constants::{MAX_DECIMALS, MAX_NAME_LEN, MAX_SYMBOL_LEN};
use crate::errors::StablecoinError;
use crate::state::MintConfig;

pub fn encode_record<T: AccountSerialize>(record: &T) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    record.try_serialize(&mut data)?;
    Ok(data)
}

pub fn decode_record<T: AccountDeserialize>(data: &[u8]) -> Result<T> {
    let mut slice = data;
    T::try_deserialize(&mut slice).map_err(|_| error!(StablecoinError::CorruptRecord))
}

pub fn require_metadata(name: &str, symbol: &str, decimals: u8) -> Result<()> {
    require!(name.len() <= MAX_NAME_LEN, StablecoinError::NameTooLong);
    require!(symbol.len() <= MAX_SYMBOL_LEN, StablecoinError::SymbolTooLong);
    require!(decimals <= MAX_DECIMALS, StablecoinError::InvalidDecimals);
    Ok(())
}

pub fn bump_audit_counter(config: &mut MintConfig) -> Result<()> {
    config.audit_counter = config
        .audit_counter
        .checked_add(1)
        .ok_or(StablecoinError::Overflow)?;
    Ok(())
}

pub fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
