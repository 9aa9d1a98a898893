use anchor_lang::prelude::*;
use anchor_lang::{Discriminator, Event};

use crate::errors::StablecoinError;

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StablecoinInitialized {
    pub authority: Pubkey,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub timestamp: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokensMinted {
    pub recipient: Pubkey,
    pub amount: u64,
    pub minter: Pubkey,
    pub new_total_supply: u64,
    pub timestamp: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokensBurned {
    pub owner: Pubkey,
    pub amount: u64,
    pub burner: Pubkey,
    pub new_total_supply: u64,
    pub timestamp: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokensTransferred {
    pub from: Pubkey,
    pub to: Pubkey,
    pub amount: u64,
    pub timestamp: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPaused {
    pub paused_by: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemUnpaused {
    pub unpaused_by: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityTransferred {
    pub old_authority: Pubkey,
    pub new_authority: Pubkey,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    Initialized(StablecoinInitialized),
    Minted(TokensMinted),
    Burned(TokensBurned),
    Transferred(TokensTransferred),
    Paused(SystemPaused),
    Unpaused(SystemUnpaused),
    AuthorityTransferred(AuthorityTransferred),
}

impl AuditEvent {
    pub fn action(&self) -> &'static str {
        match self {
            AuditEvent::Initialized(_) => "initialize",
            AuditEvent::Minted(_) => "mint",
            AuditEvent::Burned(_) => "burn",
            AuditEvent::Transferred(_) => "transfer",
            AuditEvent::Paused(_) => "pause",
            AuditEvent::Unpaused(_) => "unpause",
            AuditEvent::AuthorityTransferred(_) => "rotate-authority",
        }
    }

    pub fn timestamp(&self) -> i64 {
        match self {
            AuditEvent::Initialized(event) => event.timestamp,
            AuditEvent::Minted(event) => event.timestamp,
            AuditEvent::Burned(event) => event.timestamp,
            AuditEvent::Transferred(event) => event.timestamp,
            AuditEvent::Paused(event) => event.timestamp,
            AuditEvent::Unpaused(event) => event.timestamp,
            AuditEvent::AuthorityTransferred(event) => event.timestamp,
        }
    }

    /// Anchor event encoding: discriminator followed by the borsh body.
    pub fn data(&self) -> Vec<u8> {
        match self {
            AuditEvent::Initialized(event) => event.data(),
            AuditEvent::Minted(event) => event.data(),
            AuditEvent::Burned(event) => event.data(),
            AuditEvent::Transferred(event) => event.data(),
            AuditEvent::Paused(event) => event.data(),
            AuditEvent::Unpaused(event) => event.data(),
            AuditEvent::AuthorityTransferred(event) => event.data(),
        }
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        require!(data.len() >= 8, StablecoinError::CorruptRecord);
        let (discriminator, body) = data.split_at(8);

        let event = if discriminator == StablecoinInitialized::DISCRIMINATOR {
            AuditEvent::Initialized(decode_body(body)?)
        } else if discriminator == TokensMinted::DISCRIMINATOR {
            AuditEvent::Minted(decode_body(body)?)
        } else if discriminator == TokensBurned::DISCRIMINATOR {
            AuditEvent::Burned(decode_body(body)?)
        } else if discriminator == TokensTransferred::DISCRIMINATOR {
            AuditEvent::Transferred(decode_body(body)?)
        } else if discriminator == SystemPaused::DISCRIMINATOR {
            AuditEvent::Paused(decode_body(body)?)
        } else if discriminator == SystemUnpaused::DISCRIMINATOR {
            AuditEvent::Unpaused(decode_body(body)?)
        } else if discriminator == AuthorityTransferred::DISCRIMINATOR {
            AuditEvent::AuthorityTransferred(decode_body(body)?)
        } else {
            return err!(StablecoinError::CorruptRecord);
        };
        Ok(event)
    }
}

fn decode_body<T: AnchorDeserialize>(body: &[u8]) -> Result<T> {
    T::try_from_slice(body).map_err(|_| error!(StablecoinError::CorruptRecord))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_what_it_encodes() {
        let event = AuditEvent::Transferred(TokensTransferred {
            from: Pubkey::new_unique(),
            to: Pubkey::new_unique(),
            amount: 400,
            timestamp: 1_700_000_000,
        });
        let decoded = AuditEvent::decode(&event.data()).unwrap();
        assert_eq!(decoded, event);
        assert_eq!(decoded.action(), "transfer");
    }

    #[test]
    fn rejects_unknown_discriminator() {
        let err = AuditEvent::decode(&[0u8; 16]).unwrap_err();
        assert_eq!(
            StablecoinError::from_error(&err),
            Some(StablecoinError::CorruptRecord)
        );
        assert!(AuditEvent::decode(&[1, 2, 3]).is_err());
    }
}
