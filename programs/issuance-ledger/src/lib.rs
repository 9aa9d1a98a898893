use anchor_lang::prelude::*;

pub mod authority;
pub mod constants;
pub mod dispatcher;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod ledger;
pub mod locks;
pub mod settings;
pub mod state;
pub mod store;
pub mod utils;
pub mod verifier;

pub use authority::{Authorization, AuthorityGate, DenyReason, Operation};
pub use dispatcher::{Dispatcher, TransitionResult, TransitionState, TransitionStatus};
pub use errors::StablecoinError;
pub use events::AuditEvent;
pub use instructions::initialize::InitializeArgs;
pub use instructions::{Instruction, SignedInstruction};
pub use ledger::{Receipt, SupplyAudit, SupplyLedger, Transition};
pub use locks::{ConfigAccess, Footprint};
pub use settings::LedgerSettings;
pub use state::{HaltMarker, HolderAccount, MintConfig};
pub use store::{AccountStore, Batch, JournalStore, MemoryStore};
pub use verifier::{Ed25519Verifier, SignatureVerifier};

declare_id!("Ledger1111111111111111111111111111111111111");
