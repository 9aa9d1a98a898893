use anchor_lang::prelude::*;
use tracing::warn;

use crate::errors::StablecoinError;
use crate::state::MintConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Mint,
    Pause,
    Unpause,
    RotateAuthority,
    Burn { owner: Pubkey },
    Transfer { owner: Pubkey },
}

impl Operation {
    pub fn is_privileged(&self) -> bool {
        matches!(
            self,
            Operation::Mint | Operation::Pause | Operation::Unpause | Operation::RotateAuthority
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::Mint => "mint",
            Operation::Pause => "pause",
            Operation::Unpause => "unpause",
            Operation::RotateAuthority => "rotate_authority",
            Operation::Burn { .. } => "burn",
            Operation::Transfer { .. } => "transfer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotAuthority,
    NotOwner,
    AuthorityBurnDisabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(DenyReason),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Authorization::Allowed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AuthorityGate {
    authority_burn: bool,
}

impl AuthorityGate {
    pub fn new(authority_burn: bool) -> Self {
        Self { authority_burn }
    }

    pub fn authorize(&self, op: &Operation, signer: &Pubkey, config: &MintConfig) -> Authorization {
        let is_authority = *signer == config.authority;
        match op {
            Operation::Mint
            | Operation::Pause
            | Operation::Unpause
            | Operation::RotateAuthority => {
                if is_authority {
                    Authorization::Allowed
                } else {
                    Authorization::Denied(DenyReason::NotAuthority)
                }
            }
            Operation::Transfer { owner } => {
                if signer == owner {
                    Authorization::Allowed
                } else {
                    Authorization::Denied(DenyReason::NotOwner)
                }
            }
            Operation::Burn { owner } => {
                if signer == owner {
                    Authorization::Allowed
                } else if is_authority && self.authority_burn {
                    Authorization::Allowed
                } else if is_authority {
                    Authorization::Denied(DenyReason::AuthorityBurnDisabled)
                } else {
                    Authorization::Denied(DenyReason::NotOwner)
                }
            }
        }
    }

    /// Fail-closed form of [`AuthorityGate::authorize`].
    pub fn require(&self, op: &Operation, signer: &Pubkey, config: &MintConfig) -> Result<()> {
        match self.authorize(op, signer, config) {
            Authorization::Allowed => Ok(()),
            Authorization::Denied(reason) => {
                warn!(op = op.name(), %signer, ?reason, "transition denied");
                err!(StablecoinError::Denied)
            }
        }
    }
}
