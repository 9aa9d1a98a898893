use std::fmt;
use std::sync::Arc;

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use tracing::{debug, info, warn};

use crate::errors::StablecoinError;
use crate::instructions::{Instruction, SignedInstruction};
use crate::ledger::SupplyLedger;
use crate::verifier::{Ed25519Verifier, SignatureVerifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Idle,
    Validating,
    Applying,
    Committed,
    Rejected,
}

impl fmt::Display for TransitionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransitionState::Idle => "idle",
            TransitionState::Validating => "validating",
            TransitionState::Applying => "applying",
            TransitionState::Committed => "committed",
            TransitionState::Rejected => "rejected",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionStatus {
    Committed,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionResult {
    pub instruction: &'static str,
    pub signer: Pubkey,
    pub status: TransitionStatus,
    pub error: Option<StablecoinError>,
    pub trace: Vec<TransitionState>,
    pub total_supply_after: Option<u64>,
    pub balances_after: Vec<(Pubkey, u64)>,
}

impl TransitionResult {
    pub fn is_committed(&self) -> bool {
        self.status == TransitionStatus::Committed
    }

    pub fn balance_after(&self, owner: &Pubkey) -> Option<u64> {
        self.balances_after
            .iter()
            .find(|(key, _)| key == owner)
            .map(|(_, balance)| *balance)
    }
}

pub struct Dispatcher {
    ledger: Arc<SupplyLedger>,
    verifier: Box<dyn SignatureVerifier>,
}

struct Run {
    instruction: &'static str,
    signer: Pubkey,
    trace: Vec<TransitionState>,
}

impl Run {
    fn start(instruction: &Instruction, signer: Pubkey) -> Self {
        Self {
            instruction: instruction.name(),
            signer,
            trace: vec![TransitionState::Idle, TransitionState::Validating],
        }
    }

    fn reject(mut self, err: Error) -> TransitionResult {
        let kind = StablecoinError::from_error(&err).unwrap_or_else(|| {
            warn!(error = %err, "unclassified error from ledger");
            StablecoinError::CorruptRecord
        });
        let stage = self.trace.last().copied().unwrap_or(TransitionState::Idle);
        self.trace.push(TransitionState::Rejected);
        warn!(
            instruction = self.instruction,
            signer = %self.signer,
            %stage,
            error = ?kind,
            "transition rejected"
        );
        TransitionResult {
            instruction: self.instruction,
            signer: self.signer,
            status: TransitionStatus::Rejected,
            error: Some(kind),
            trace: self.trace,
            total_supply_after: None,
            balances_after: Vec::new(),
        }
    }
}

impl Dispatcher {
    pub fn new(ledger: Arc<SupplyLedger>) -> Self {
        Self::with_verifier(ledger, Box::new(Ed25519Verifier))
    }

    pub fn with_verifier(ledger: Arc<SupplyLedger>, verifier: Box<dyn SignatureVerifier>) -> Self {
        Self { ledger, verifier }
    }

    pub fn ledger(&self) -> &Arc<SupplyLedger> {
        &self.ledger
    }

    /// For callers that have already authenticated `signer`.
    pub fn dispatch(&self, instruction: &Instruction, signer: Pubkey) -> TransitionResult {
        self.run(instruction, Run::start(instruction, signer))
    }

    pub fn dispatch_signed(&self, signed: &SignedInstruction) -> TransitionResult {
        let run = Run::start(&signed.instruction, signed.signer);
        let message = match signed.instruction.message() {
            Ok(message) => message,
            Err(err) => return run.reject(err),
        };
        if !self
            .verifier
            .verify(&message, &signed.signature, &signed.signer)
        {
            warn!(signer = %signed.signer, "signature verification failed");
            return run.reject(error!(StablecoinError::Denied));
        }
        self.run(&signed.instruction, run)
    }

    fn run(&self, instruction: &Instruction, mut run: Run) -> TransitionResult {
        let signer = run.signer;

        if let Err(err) = instruction.validate(&signer) {
            return run.reject(err);
        }
        let mut tx = match self.ledger.begin(signer, &instruction.footprint(&signer)) {
            Ok(tx) => tx,
            Err(err) => return run.reject(err),
        };
        if let Err(err) = tx.require_authorized(&instruction.operation(&signer)) {
            return run.reject(err);
        }

        run.trace.push(TransitionState::Applying);
        debug!(instruction = run.instruction, %signer, "applying");
        if let Err(err) = instruction.apply(&mut tx) {
            return run.reject(err);
        }
        let receipt = match tx.commit() {
            Ok(receipt) => receipt,
            Err(err) => return run.reject(err),
        };

        run.trace.push(TransitionState::Committed);
        info!(
            instruction = run.instruction,
            %signer,
            total_supply = receipt.total_supply,
            "transition committed"
        );
        TransitionResult {
            instruction: run.instruction,
            signer,
            status: TransitionStatus::Committed,
            error: None,
            trace: run.trace,
            total_supply_after: Some(receipt.total_supply),
            balances_after: receipt.balances,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instructions::initialize::InitializeArgs;
    use crate::settings::LedgerSettings;
    use crate::store::MemoryStore;
    use solana_sdk::signature::Keypair;
    use solana_sdk::signer::Signer;

    use super::TransitionState::*;

    fn dispatcher(authority: Pubkey) -> Dispatcher {
        let ledger = SupplyLedger::initialize(
            Arc::new(MemoryStore::new()),
            LedgerSettings::default(),
            InitializeArgs {
                authority,
                name: "USD Stable".into(),
                symbol: "USDS".into(),
                decimals: 6,
            },
        )
        .unwrap();
        Dispatcher::new(Arc::new(ledger))
    }

    #[test]
    fn committed_trace_visits_every_state() {
        let authority = Pubkey::new_unique();
        let holder = Pubkey::new_unique();
        let result = dispatcher(authority).dispatch(
            &Instruction::Mint {
                to: holder,
                amount: 1_000,
            },
            authority,
        );
        assert!(result.is_committed());
        assert_eq!(result.trace, vec![Idle, Validating, Applying, Committed]);
        assert_eq!(result.total_supply_after, Some(1_000));
        assert_eq!(result.balance_after(&holder), Some(1_000));
    }

    #[test]
    fn malformed_params_reject_during_validation() {
        let authority = Pubkey::new_unique();
        let result = dispatcher(authority).dispatch(
            &Instruction::Mint {
                to: authority,
                amount: 0,
            },
            authority,
        );
        assert_eq!(result.status, TransitionStatus::Rejected);
        assert_eq!(result.error, Some(StablecoinError::InvalidAmount));
        assert_eq!(result.trace, vec![Idle, Validating, Rejected]);
    }

    #[test]
    fn handler_failures_reject_during_apply() {
        let authority = Pubkey::new_unique();
        let result = dispatcher(authority).dispatch(&Instruction::Unpause, authority);
        assert_eq!(result.error, Some(StablecoinError::NotPaused));
        assert_eq!(result.trace, vec![Idle, Validating, Applying, Rejected]);
    }

    #[test]
    fn forged_signature_is_denied() {
        let authority = Keypair::new();
        let impostor = Keypair::new();
        let dispatcher = dispatcher(authority.pubkey());

        let mut signed = Instruction::Pause.sign(&impostor).unwrap();
        signed.signer = authority.pubkey();
        let result = dispatcher.dispatch_signed(&signed);
        assert_eq!(result.error, Some(StablecoinError::Denied));
        assert!(!dispatcher.ledger().config().unwrap().paused);

        let signed = Instruction::Pause.sign(&authority).unwrap();
        assert!(dispatcher.dispatch_signed(&signed).is_committed());
        assert!(dispatcher.ledger().config().unwrap().paused);
    }
}
