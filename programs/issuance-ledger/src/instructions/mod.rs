use anchor_lang::prelude::*;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;

use crate::authority::Operation;
use crate::errors::StablecoinError;
use crate::ledger::Transition;
use crate::locks::Footprint;

pub mod authority;
pub mod burn;
pub mod initialize;
pub mod mint;
pub mod pause;
pub mod transfer;

/// A requested state transition. Transfers always move the signer's tokens.
#[derive(AnchorSerialize, AnchorDeserialize, Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    Mint { to: Pubkey, amount: u64 },
    Burn { from: Pubkey, amount: u64 },
    Transfer { to: Pubkey, amount: u64 },
    Pause,
    Unpause,
    RotateAuthority { new_authority: Pubkey },
}

impl Instruction {
    pub fn name(&self) -> &'static str {
        match self {
            Instruction::Mint { .. } => "mint",
            Instruction::Burn { .. } => "burn",
            Instruction::Transfer { .. } => "transfer",
            Instruction::Pause => "pause",
            Instruction::Unpause => "unpause",
            Instruction::RotateAuthority { .. } => "rotate_authority",
        }
    }

    pub fn operation(&self, signer: &Pubkey) -> Operation {
        match self {
            Instruction::Mint { .. } => Operation::Mint,
            Instruction::Burn { from, .. } => Operation::Burn { owner: *from },
            Instruction::Transfer { .. } => Operation::Transfer { owner: *signer },
            Instruction::Pause => Operation::Pause,
            Instruction::Unpause => Operation::Unpause,
            Instruction::RotateAuthority { .. } => Operation::RotateAuthority,
        }
    }

    pub fn footprint(&self, signer: &Pubkey) -> Footprint {
        match self {
            Instruction::Mint { to, .. } => Footprint::exclusive(vec![*to]),
            Instruction::Burn { from, .. } => Footprint::exclusive(vec![*from]),
            Instruction::Transfer { to, .. } => Footprint::shared(vec![*signer, *to]),
            Instruction::Pause | Instruction::Unpause | Instruction::RotateAuthority { .. } => {
                Footprint::exclusive(Vec::new())
            }
        }
    }

    pub fn validate(&self, signer: &Pubkey) -> Result<()> {
        match self {
            Instruction::Mint { amount, .. } | Instruction::Burn { amount, .. } => {
                require!(*amount > 0, StablecoinError::InvalidAmount);
            }
            Instruction::Transfer { to, amount } => {
                require!(*amount > 0, StablecoinError::InvalidAmount);
                require!(to != signer, StablecoinError::SelfTransfer);
            }
            Instruction::Pause | Instruction::Unpause | Instruction::RotateAuthority { .. } => {}
        }
        Ok(())
    }

    pub fn apply(&self, tx: &mut Transition<'_>) -> Result<()> {
        match self {
            Instruction::Mint { to, amount } => mint::handler(tx, *to, *amount),
            Instruction::Burn { from, amount } => burn::handler(tx, *from, *amount),
            Instruction::Transfer { to, amount } => transfer::handler(tx, *to, *amount),
            Instruction::Pause => pause::pause_handler(tx),
            Instruction::Unpause => pause::unpause_handler(tx),
            Instruction::RotateAuthority { new_authority } => {
                authority::rotate_handler(tx, *new_authority)
            }
        }
    }

    /// Bytes covered by the signer's signature.
    pub fn message(&self) -> Result<Vec<u8>> {
        self.try_to_vec()
            .map_err(|_| error!(StablecoinError::CorruptRecord))
    }

    pub fn sign(&self, keypair: &Keypair) -> Result<SignedInstruction> {
        let message = self.message()?;
        Ok(SignedInstruction {
            instruction: self.clone(),
            signer: keypair.pubkey(),
            signature: keypair.sign_message(&message),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInstruction {
    pub instruction: Instruction,
    pub signer: Pubkey,
    pub signature: Signature,
}
