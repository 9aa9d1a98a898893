use anchor_lang::prelude::*;

use crate::constants::{CONFIG_SEED, EVENT_SEED, HALT_SEED, HOLDER_SEED};

pub mod journal;
pub mod memory;

pub use journal::JournalStore;
pub use memory::MemoryStore;

pub type Batch = Vec<(Vec<u8>, Vec<u8>)>;

pub trait AccountStore: Send + Sync {
    /// Fails with `AccountNotFound` when the key is absent.
    fn get(&self, key: &[u8]) -> Result<Vec<u8>>;

    fn exists(&self, key: &[u8]) -> Result<bool>;

    fn put(&self, key: &[u8], record: &[u8]) -> Result<()> {
        self.commit(vec![(key.to_vec(), record.to_vec())])
    }

    /// Writes every record of the batch, or none of them.
    fn commit(&self, batch: Batch) -> Result<()>;

    /// Consistent snapshot of all records whose key starts with `prefix`,
    /// ordered by key.
    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

pub fn config_key() -> Vec<u8> {
    CONFIG_SEED.to_vec()
}

pub fn halt_key() -> Vec<u8> {
    HALT_SEED.to_vec()
}

pub fn holder_key(owner: &Pubkey) -> Vec<u8> {
    [HOLDER_SEED, owner.as_ref()].concat()
}

pub fn event_key(seq: u64) -> Vec<u8> {
    [EVENT_SEED, &seq.to_be_bytes()[..]].concat()
}

pub fn event_seq(key: &[u8]) -> Option<u64> {
    let raw = key.strip_prefix(EVENT_SEED)?;
    let bytes: [u8; 8] = raw.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}
