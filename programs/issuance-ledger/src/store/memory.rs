use std::collections::BTreeMap;

use anchor_lang::prelude::*;
use parking_lot::RwLock;

use super::{AccountStore, Batch};
use crate::errors::StablecoinError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl AccountStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.records
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| error!(StablecoinError::AccountNotFound))
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.records.read().contains_key(key))
    }

    fn commit(&self, batch: Batch) -> Result<()> {
        let mut records = self.records.write();
        for (key, record) in batch {
            records.insert(key, record);
        }
        Ok(())
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let records = self.records.read();
        Ok(records
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_reports_missing_keys() {
        let store = MemoryStore::new();
        let err = store.get(b"missing").unwrap_err();
        assert_eq!(
            StablecoinError::from_error(&err),
            Some(StablecoinError::AccountNotFound)
        );
        assert!(!store.exists(b"missing").unwrap());
    }

    #[test]
    fn put_overwrites() {
        let store = MemoryStore::new();
        store.put(b"k", b"one").unwrap();
        store.put(b"k", b"two").unwrap();
        assert_eq!(store.get(b"k").unwrap(), b"two".to_vec());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn scan_is_limited_to_prefix() {
        let store = MemoryStore::new();
        store
            .commit(vec![
                (b"holder-a".to_vec(), vec![1]),
                (b"holder-b".to_vec(), vec![2]),
                (b"config".to_vec(), vec![3]),
                (b"holdes".to_vec(), vec![4]),
            ])
            .unwrap();
        let keys: Vec<Vec<u8>> = store
            .scan(b"holder")
            .unwrap()
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        assert_eq!(keys, vec![b"holder-a".to_vec(), b"holder-b".to_vec()]);
    }
}
