#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use issuance_ledger::store::Batch;
use issuance_ledger::{
    AccountStore, Dispatcher, InitializeArgs, Instruction, LedgerSettings, MemoryStore,
    StablecoinError, SupplyLedger, TransitionResult,
};

pub fn code(err: &Error) -> Option<StablecoinError> {
    StablecoinError::from_error(err)
}

pub fn usd_stable(authority: Pubkey) -> InitializeArgs {
    InitializeArgs {
        authority,
        name: "USD Stable".into(),
        symbol: "USDS".into(),
        decimals: 6,
    }
}

/// A ledger over an in-memory store with a known authority.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ledger: Arc<SupplyLedger>,
    pub dispatcher: Dispatcher,
    pub authority: Pubkey,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(LedgerSettings::default())
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let authority = Pubkey::new_unique();
        let ledger = Arc::new(
            SupplyLedger::initialize(store.clone(), settings, usd_stable(authority)).unwrap(),
        );
        Self {
            dispatcher: Dispatcher::new(ledger.clone()),
            store,
            ledger,
            authority,
        }
    }

    pub fn mint(&self, to: Pubkey, amount: u64) -> TransitionResult {
        self.dispatcher
            .dispatch(&Instruction::Mint { to, amount }, self.authority)
    }

    pub fn transfer(&self, from: Pubkey, to: Pubkey, amount: u64) -> TransitionResult {
        self.dispatcher
            .dispatch(&Instruction::Transfer { to, amount }, from)
    }

    pub fn burn(&self, signer: Pubkey, from: Pubkey, amount: u64) -> TransitionResult {
        self.dispatcher
            .dispatch(&Instruction::Burn { from, amount }, signer)
    }

    pub fn balance(&self, owner: &Pubkey) -> u64 {
        self.ledger.balance_of(owner).unwrap()
    }

    pub fn total_supply(&self) -> u64 {
        self.ledger.config().unwrap().total_supply
    }

    pub fn supply_holds(&self) -> bool {
        self.ledger.verify_supply().unwrap().is_consistent()
    }
}

/// Memory store whose commits can be made to fail on demand.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    failing: AtomicBool,
}

impl FailingStore {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }
}

impl AccountStore for FailingStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.inner.get(key)
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        self.inner.exists(key)
    }

    fn commit(&self, batch: Batch) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return err!(StablecoinError::StorageUnavailable);
        }
        self.inner.commit(batch)
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.inner.scan(prefix)
    }
}
