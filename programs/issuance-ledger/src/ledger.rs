use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use tracing::{debug, info, warn};

use crate::authority::{Authorization, AuthorityGate, Operation};
use crate::constants::{EVENT_SEED, HOLDER_SEED};
use crate::errors::StablecoinError;
use crate::events::AuditEvent;
use crate::instructions::initialize::{self, InitializeArgs};
use crate::locks::{ConfigAccess, Footprint, LockSet, LockTable};
use crate::settings::LedgerSettings;
use crate::state::{HaltMarker, HolderAccount, MintConfig};
use crate::store::{
    config_key, event_key, event_seq, halt_key, holder_key, AccountStore, Batch,
};
use crate::utils::{decode_record, encode_record, now_unix};

pub struct SupplyLedger {
    store: Arc<dyn AccountStore>,
    locks: LockTable,
    settings: LedgerSettings,
    gate: AuthorityGate,
    halted: AtomicBool,
    next_event: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyAudit {
    pub total_supply: u64,
    pub total_minted: u64,
    pub total_burned: u64,
    pub holder_sum: u128,
    pub holders: usize,
}

impl SupplyAudit {
    pub fn is_consistent(&self) -> bool {
        self.holder_sum == u128::from(self.total_supply)
            && self.total_minted.checked_sub(self.total_burned) == Some(self.total_supply)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub total_supply: u64,
    pub balances: Vec<(Pubkey, u64)>,
}

impl SupplyLedger {
    pub fn initialize(
        store: Arc<dyn AccountStore>,
        settings: LedgerSettings,
        args: InitializeArgs,
    ) -> Result<Self> {
        require!(
            !store.exists(&config_key())?,
            StablecoinError::AlreadyInitialized
        );
        let (config, event) = initialize::handler(&args)?;

        let ledger = Self::with_store(store, settings, 0);
        let seq = ledger.next_event.fetch_add(1, Ordering::SeqCst);
        ledger.store.commit(vec![
            (config_key(), encode_record(&config)?),
            (event_key(seq), event.data()),
        ])?;
        info!(
            authority = %config.authority,
            symbol = %config.symbol,
            decimals = config.decimals,
            "ledger initialized"
        );
        Ok(ledger)
    }

    /// Opens an initialized store. A store whose supply does not add up, or
    /// that was halted and never resumed, opens halted.
    pub fn open(store: Arc<dyn AccountStore>, settings: LedgerSettings) -> Result<Self> {
        require!(store.exists(&config_key())?, StablecoinError::NotInitialized);
        let next_event = store
            .scan(EVENT_SEED)?
            .last()
            .and_then(|(key, _)| event_seq(key))
            .map_or(0, |seq| seq.saturating_add(1));

        let ledger = Self::with_store(store, settings, next_event);
        if let Some(marker) = ledger.halt_marker()? {
            if marker.halted {
                ledger.halted.store(true, Ordering::SeqCst);
                warn!(raised_at = marker.raised_at, "ledger was left halted");
            }
        }
        let audit = ledger.verify_supply()?;
        if !audit.is_consistent() && !ledger.is_halted() {
            ledger.halt(&audit);
        }
        info!(
            total_supply = audit.total_supply,
            holders = audit.holders,
            halted = ledger.is_halted(),
            "ledger opened"
        );
        Ok(ledger)
    }

    fn with_store(store: Arc<dyn AccountStore>, settings: LedgerSettings, next_event: u64) -> Self {
        Self {
            store,
            locks: LockTable::new(settings.stripes(), settings.lock_timeout()),
            gate: AuthorityGate::new(settings.authority_burn),
            settings,
            halted: AtomicBool::new(false),
            next_event: AtomicU64::new(next_event),
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn begin(&self, signer: Pubkey, footprint: &Footprint) -> Result<Transition<'_>> {
        if self.is_halted() {
            warn!(%signer, "rejecting transition: ledger halted");
            return err!(StablecoinError::LedgerHalted);
        }
        let locks = self.locks.acquire(footprint)?;
        // Halt may have been raised while we were waiting.
        require!(!self.is_halted(), StablecoinError::LedgerHalted);
        let config = self.load_config()?;

        Ok(Transition {
            ledger: self,
            _locks: locks,
            signer,
            access: footprint.config,
            footprint: footprint.holders.clone(),
            config,
            config_dirty: false,
            holders: BTreeMap::new(),
            dirty: BTreeSet::new(),
            events: Vec::new(),
            authorized: false,
        })
    }

    pub fn resume_writes(&self) -> Result<SupplyAudit> {
        let audit = self.verify_supply()?;
        if !audit.is_consistent() {
            tracing::error!(
                total_supply = audit.total_supply,
                holder_sum = %audit.holder_sum,
                "refusing to resume writes: supply still inconsistent"
            );
            return err!(StablecoinError::InvariantViolation);
        }
        if self.is_halted() {
            self.write_halt_marker(false, &audit)?;
            self.halted.store(false, Ordering::SeqCst);
            warn!(total_supply = audit.total_supply, "writes resumed");
        }
        Ok(audit)
    }

    pub fn config(&self) -> Result<MintConfig> {
        self.load_config()
    }

    pub fn holder(&self, owner: &Pubkey) -> Result<HolderAccount> {
        let data = self.store.get(&holder_key(owner))?;
        decode_record(&data)
    }

    pub fn balance_of(&self, owner: &Pubkey) -> Result<u64> {
        match self.holder(owner) {
            Ok(holder) => Ok(holder.balance),
            Err(err) if is_not_found(&err) => Ok(0),
            Err(err) => Err(err),
        }
    }

    pub fn holders(&self) -> Result<Vec<HolderAccount>> {
        self.store
            .scan(HOLDER_SEED)?
            .iter()
            .map(|(_, data)| decode_record(data))
            .collect()
    }

    pub fn audit_log(&self) -> Result<Vec<(u64, AuditEvent)>> {
        self.store
            .scan(EVENT_SEED)?
            .iter()
            .map(|(key, data)| {
                let seq = event_seq(key).ok_or_else(|| error!(StablecoinError::CorruptRecord))?;
                Ok((seq, AuditEvent::decode(data)?))
            })
            .collect()
    }

    /// Takes the exclusive config lock. Does not change the halt state.
    pub fn verify_supply(&self) -> Result<SupplyAudit> {
        let _locks = self.locks.acquire(&Footprint::exclusive(Vec::new()))?;
        let config = self.load_config()?;
        let holders = self.holders()?;
        Ok(SupplyAudit {
            total_supply: config.total_supply,
            total_minted: config.total_minted,
            total_burned: config.total_burned,
            holder_sum: holders.iter().map(|h| u128::from(h.balance)).sum(),
            holders: holders.len(),
        })
    }

    fn load_config(&self) -> Result<MintConfig> {
        match self.store.get(&config_key()) {
            Ok(data) => decode_record(&data),
            Err(err) if is_not_found(&err) => err!(StablecoinError::NotInitialized),
            Err(err) => Err(err),
        }
    }

    fn halt_marker(&self) -> Result<Option<HaltMarker>> {
        match self.store.get(&halt_key()) {
            Ok(data) => decode_record(&data).map(Some),
            Err(err) if is_not_found(&err) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn write_halt_marker(&self, halted: bool, audit: &SupplyAudit) -> Result<()> {
        let marker = HaltMarker {
            halted,
            raised_at: now_unix(),
            total_supply: audit.total_supply,
            holder_sum: audit.holder_sum,
        };
        self.store.put(&halt_key(), &encode_record(&marker)?)
    }

    fn halt(&self, audit: &SupplyAudit) {
        // Flag first: writes stop even if the marker cannot be stored.
        self.halted.store(true, Ordering::SeqCst);
        tracing::error!(
            total_supply = audit.total_supply,
            total_minted = audit.total_minted,
            total_burned = audit.total_burned,
            holder_sum = %audit.holder_sum,
            "supply invariant violated; writes halted"
        );
        if let Err(err) = self.write_halt_marker(true, audit) {
            tracing::error!(error = %err, "could not persist halt marker");
        }
    }

    fn audit_staged(
        &self,
        config: &MintConfig,
        staged: &BTreeMap<Pubkey, HolderAccount>,
    ) -> Result<SupplyAudit> {
        let mut holder_sum: u128 = 0;
        let mut holders = 0;
        for (_, data) in self.store.scan(HOLDER_SEED)? {
            let stored: HolderAccount = decode_record(&data)?;
            if !staged.contains_key(&stored.owner) {
                holder_sum += u128::from(stored.balance);
                holders += 1;
            }
        }
        for holder in staged.values() {
            holder_sum += u128::from(holder.balance);
            holders += 1;
        }
        Ok(SupplyAudit {
            total_supply: config.total_supply,
            total_minted: config.total_minted,
            total_burned: config.total_burned,
            holder_sum,
            holders,
        })
    }
}

fn is_not_found(err: &Error) -> bool {
    StablecoinError::from_error(err) == Some(StablecoinError::AccountNotFound)
}

pub struct Transition<'a> {
    ledger: &'a SupplyLedger,
    _locks: LockSet<'a>,
    signer: Pubkey,
    access: ConfigAccess,
    footprint: Vec<Pubkey>,
    config: MintConfig,
    config_dirty: bool,
    holders: BTreeMap<Pubkey, HolderAccount>,
    dirty: BTreeSet<Pubkey>,
    events: Vec<AuditEvent>,
    authorized: bool,
}

impl<'a> Transition<'a> {
    pub fn signer(&self) -> Pubkey {
        self.signer
    }

    pub fn config(&self) -> &MintConfig {
        &self.config
    }

    pub fn authorize(&mut self, op: &Operation) -> Authorization {
        let decision = self.ledger.gate.authorize(op, &self.signer, &self.config);
        if decision.is_allowed() {
            self.authorized = true;
        }
        decision
    }

    pub fn require_authorized(&mut self, op: &Operation) -> Result<()> {
        self.ledger.gate.require(op, &self.signer, &self.config)?;
        self.authorized = true;
        Ok(())
    }

    pub fn require_active(&self) -> Result<()> {
        require!(!self.config.paused, StablecoinError::SystemPaused);
        Ok(())
    }

    pub fn has_account(&mut self, owner: &Pubkey) -> Result<bool> {
        if self.dirty.contains(owner) {
            return Ok(true);
        }
        self.ledger.store.exists(&holder_key(owner))
    }

    pub fn balance(&mut self, owner: &Pubkey) -> Result<u64> {
        Ok(self.slot(owner)?.balance)
    }

    pub fn credit(&mut self, owner: &Pubkey, amount: u64) -> Result<u64> {
        self.ensure_authorized()?;
        let holder = self.slot(owner)?;
        holder.balance = holder
            .balance
            .checked_add(amount)
            .ok_or(StablecoinError::Overflow)?;
        let balance = holder.balance;
        self.dirty.insert(*owner);
        Ok(balance)
    }

    pub fn debit(&mut self, owner: &Pubkey, amount: u64) -> Result<u64> {
        self.ensure_authorized()?;
        let holder = self.slot(owner)?;
        require!(
            holder.balance >= amount,
            StablecoinError::InsufficientBalance
        );
        holder.balance -= amount;
        let balance = holder.balance;
        self.dirty.insert(*owner);
        Ok(balance)
    }

    pub fn config_mut(&mut self) -> Result<&mut MintConfig> {
        self.ensure_authorized()?;
        if self.access != ConfigAccess::Exclusive {
            warn!(signer = %self.signer, "config write under shared lock refused");
            return err!(StablecoinError::Denied);
        }
        self.config_dirty = true;
        Ok(&mut self.config)
    }

    pub fn record(&mut self, event: AuditEvent) -> Result<()> {
        self.ensure_authorized()?;
        self.events.push(event);
        Ok(())
    }

    /// Nothing is written on failure. An invariant violation also halts the
    /// ledger.
    pub fn commit(self) -> Result<Receipt> {
        self.ensure_authorized()?;

        let audit = self.ledger.audit_staged(&self.config, &self.holders)?;
        if !audit.is_consistent() {
            self.ledger.halt(&audit);
            return err!(StablecoinError::InvariantViolation);
        }

        let mut batch: Batch = Vec::with_capacity(1 + self.dirty.len() + self.events.len());
        if self.config_dirty {
            batch.push((config_key(), encode_record(&self.config)?));
        }
        for owner in &self.dirty {
            if let Some(holder) = self.holders.get(owner) {
                batch.push((holder_key(owner), encode_record(holder)?));
            }
        }
        for event in &self.events {
            let seq = self.ledger.next_event.fetch_add(1, Ordering::SeqCst);
            batch.push((event_key(seq), event.data()));
        }

        let records = batch.len();
        self.ledger.store.commit(batch)?;
        debug!(
            signer = %self.signer,
            records,
            total_supply = self.config.total_supply,
            "transition committed"
        );

        let mut seen = BTreeSet::new();
        let balances = self
            .footprint
            .iter()
            .filter(|owner| seen.insert(**owner))
            .filter_map(|owner| self.holders.get(owner).map(|h| (*owner, h.balance)))
            .collect();
        Ok(Receipt {
            total_supply: self.config.total_supply,
            balances,
        })
    }

    fn ensure_authorized(&self) -> Result<()> {
        if !self.authorized {
            warn!(signer = %self.signer, "staging refused before authorization");
            return err!(StablecoinError::Denied);
        }
        Ok(())
    }

    fn slot(&mut self, owner: &Pubkey) -> Result<&mut HolderAccount> {
        if !self.holders.contains_key(owner) {
            if !self.footprint.contains(owner) {
                warn!(%owner, "holder outside transition footprint");
                return err!(StablecoinError::Denied);
            }
            let holder = match self.ledger.store.get(&holder_key(owner)) {
                Ok(data) => decode_record(&data)?,
                Err(err) if is_not_found(&err) => HolderAccount::empty(*owner),
                Err(err) => return Err(err),
            };
            self.holders.insert(*owner, holder);
        }
        self.holders
            .get_mut(owner)
            .ok_or_else(|| error!(StablecoinError::AccountNotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger_with(store: Arc<MemoryStore>, authority: Pubkey) -> SupplyLedger {
        SupplyLedger::initialize(
            store,
            LedgerSettings::default(),
            InitializeArgs {
                authority,
                name: "USD Stable".into(),
                symbol: "USDS".into(),
                decimals: 6,
            },
        )
        .unwrap()
    }

    fn code(err: &Error) -> Option<StablecoinError> {
        StablecoinError::from_error(err)
    }

    #[test]
    fn staging_requires_authorization() {
        let authority = Pubkey::new_unique();
        let ledger = ledger_with(Arc::new(MemoryStore::new()), authority);
        let holder = Pubkey::new_unique();

        let mut tx = ledger
            .begin(authority, &Footprint::exclusive(vec![holder]))
            .unwrap();
        let err = tx.credit(&holder, 5).unwrap_err();
        assert_eq!(code(&err), Some(StablecoinError::Denied));
        assert!(tx.config_mut().is_err());
    }

    #[test]
    fn holders_outside_footprint_are_refused() {
        let authority = Pubkey::new_unique();
        let ledger = ledger_with(Arc::new(MemoryStore::new()), authority);

        let mut tx = ledger.begin(authority, &Footprint::exclusive(vec![])).unwrap();
        tx.require_authorized(&Operation::Mint).unwrap();
        let err = tx.credit(&Pubkey::new_unique(), 5).unwrap_err();
        assert_eq!(code(&err), Some(StablecoinError::Denied));
    }

    #[test]
    fn unbalanced_commit_halts_and_writes_nothing() {
        let authority = Pubkey::new_unique();
        let store = Arc::new(MemoryStore::new());
        let ledger = ledger_with(store.clone(), authority);
        let holder = Pubkey::new_unique();
        let before = store.snapshot();

        let mut tx = ledger
            .begin(authority, &Footprint::exclusive(vec![holder]))
            .unwrap();
        tx.require_authorized(&Operation::Mint).unwrap();
        // Credit without touching supply.
        tx.credit(&holder, 10).unwrap();
        let err = tx.commit().unwrap_err();
        assert_eq!(code(&err), Some(StablecoinError::InvariantViolation));
        assert!(ledger.is_halted());

        // Only the halt marker was written.
        let mut after = store.snapshot();
        let marker: HaltMarker = decode_record(&after.remove(&halt_key()).unwrap()).unwrap();
        assert!(marker.halted);
        assert_eq!(after, before);

        let err = ledger
            .begin(authority, &Footprint::exclusive(vec![]))
            .err()
            .unwrap();
        assert_eq!(code(&err), Some(StablecoinError::LedgerHalted));

        ledger.resume_writes().unwrap();
        assert!(!ledger.is_halted());
        assert!(!ledger.halt_marker().unwrap().unwrap().halted);
    }

    #[test]
    fn shared_transitions_cannot_touch_config() {
        let authority = Pubkey::new_unique();
        let ledger = ledger_with(Arc::new(MemoryStore::new()), authority);

        let mut tx = ledger
            .begin(authority, &Footprint::shared(vec![authority]))
            .unwrap();
        tx.require_authorized(&Operation::Transfer { owner: authority })
            .unwrap();
        let err = tx.config_mut().unwrap_err();
        assert_eq!(code(&err), Some(StablecoinError::Denied));
    }

    #[test]
    fn open_requires_initialized_store() {
        let err = SupplyLedger::open(Arc::new(MemoryStore::new()), LedgerSettings::default())
            .err()
            .unwrap();
        assert_eq!(code(&err), Some(StablecoinError::NotInitialized));
    }

    #[test]
    fn initialize_only_once() {
        let store = Arc::new(MemoryStore::new());
        let authority = Pubkey::new_unique();
        ledger_with(store.clone(), authority);

        let err = SupplyLedger::initialize(
            store,
            LedgerSettings::default(),
            InitializeArgs {
                authority,
                name: "Other".into(),
                symbol: "OTH".into(),
                decimals: 2,
            },
        )
        .err()
        .unwrap();
        assert_eq!(code(&err), Some(StablecoinError::AlreadyInitialized));
    }

    #[test]
    fn unknown_holder_has_zero_balance() {
        let ledger = ledger_with(Arc::new(MemoryStore::new()), Pubkey::new_unique());
        let stranger = Pubkey::new_unique();
        assert_eq!(ledger.balance_of(&stranger).unwrap(), 0);
        let err = ledger.holder(&stranger).unwrap_err();
        assert_eq!(code(&err), Some(StablecoinError::AccountNotFound));
        assert_eq!(ledger.audit_log().unwrap().len(), 1);
    }
}
