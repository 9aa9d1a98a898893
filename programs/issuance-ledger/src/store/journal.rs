use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anchor_lang::error::Error;
use anchor_lang::prelude::*;
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{AccountStore, Batch};
use crate::errors::StablecoinError;

/// Length prefix (u32 LE) followed by the SHA-256 of the payload.
const FRAME_HEADER_LEN: usize = 4 + 32;

const LOCK_RETRY: Duration = Duration::from_millis(10);

/// Append-only journal of checksummed batches. The handle holds an exclusive
/// lock on the file until it is dropped; a short or mismatched frame ends the
/// journal and is truncated on open.
pub struct JournalStore {
    path: PathBuf,
    sync_writes: bool,
    journal: Mutex<JournalFile>,
    index: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

struct JournalFile {
    file: File,
    len: u64,
}

impl JournalFile {
    fn append(&mut self, frame: &[u8], sync: bool) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(self.len))?;
        self.file.write_all(frame)?;
        self.file.flush()?;
        if sync {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

impl JournalStore {
    /// Fails with `Timeout` if another handle holds the journal.
    pub fn open(path: impl AsRef<Path>, sync_writes: bool) -> Result<Self> {
        Self::open_waiting(path, sync_writes, Duration::ZERO)
    }

    pub fn open_waiting(
        path: impl AsRef<Path>,
        sync_writes: bool,
        wait: Duration,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| unavailable(&path, err))?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|err| unavailable(&path, err))?;
        lock_exclusive(&file, &path, wait)?;

        let mut contents = Vec::new();
        file.read_to_end(&mut contents)
            .map_err(|err| unavailable(&path, err))?;

        let mut index = BTreeMap::new();
        let (valid_len, batches) = replay(&contents, &mut index);
        if valid_len < contents.len() {
            warn!(
                path = %path.display(),
                discarded = contents.len() - valid_len,
                "truncating torn journal tail"
            );
            file.set_len(valid_len as u64)
                .map_err(|err| unavailable(&path, err))?;
            if sync_writes {
                file.sync_all().map_err(|err| unavailable(&path, err))?;
            }
        }
        info!(
            path = %path.display(),
            batches,
            records = index.len(),
            "journal replayed"
        );

        Ok(Self {
            path,
            sync_writes,
            journal: Mutex::new(JournalFile {
                file,
                len: valid_len as u64,
            }),
            index: RwLock::new(index),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccountStore for JournalStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        self.index
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| error!(StablecoinError::AccountNotFound))
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.index.read().contains_key(key))
    }

    fn commit(&self, batch: Batch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let frame = encode_frame(&batch)?;

        let mut journal = self.journal.lock();
        let offset = journal.len;
        if let Err(err) = journal.append(&frame, self.sync_writes) {
            warn!(path = %self.path.display(), error = %err, "journal append failed");
            if let Err(err) = journal.file.set_len(offset) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %err,
                    "could not roll back partial journal frame"
                );
            }
            return err!(StablecoinError::StorageUnavailable);
        }
        journal.len = offset + frame.len() as u64;
        debug!(records = batch.len(), bytes = frame.len(), "journal batch appended");

        // Index order follows journal order while the journal lock is held.
        let mut index = self.index.write();
        for (key, record) in batch {
            index.insert(key, record);
        }
        Ok(())
    }

    fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let index = self.index.read();
        Ok(index
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect())
    }
}

fn lock_exclusive(file: &File, path: &Path, wait: Duration) -> Result<()> {
    let deadline = Instant::now() + wait;
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => {
                if Instant::now() >= deadline {
                    warn!(path = %path.display(), "journal is locked by another handle");
                    return err!(StablecoinError::Timeout);
                }
                thread::sleep(LOCK_RETRY);
            }
            Err(err) => return Err(unavailable(path, err)),
        }
    }
}

fn unavailable(path: &Path, err: io::Error) -> Error {
    warn!(path = %path.display(), error = %err, "journal I/O failed");
    error!(StablecoinError::StorageUnavailable)
}

fn encode_frame(batch: &Batch) -> Result<Vec<u8>> {
    let payload = batch
        .try_to_vec()
        .map_err(|_| error!(StablecoinError::StorageUnavailable))?;
    let len = u32::try_from(payload.len()).map_err(|_| error!(StablecoinError::Overflow))?;

    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(Sha256::digest(&payload).as_slice());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn read_frame(buf: &[u8]) -> Option<(Batch, usize)> {
    if buf.len() < FRAME_HEADER_LEN {
        return None;
    }
    let len = u32::from_le_bytes(buf[..4].try_into().ok()?) as usize;
    let end = FRAME_HEADER_LEN.checked_add(len)?;
    if buf.len() < end {
        return None;
    }
    let payload = &buf[FRAME_HEADER_LEN..end];
    if Sha256::digest(payload).as_slice() != &buf[4..FRAME_HEADER_LEN] {
        return None;
    }
    let batch = Batch::try_from_slice(payload).ok()?;
    Some((batch, end))
}

fn replay(contents: &[u8], index: &mut BTreeMap<Vec<u8>, Vec<u8>>) -> (usize, usize) {
    let mut offset = 0;
    let mut batches = 0;
    while let Some((batch, frame_len)) = read_frame(&contents[offset..]) {
        for (key, record) in batch {
            index.insert(key, record);
        }
        offset += frame_len;
        batches += 1;
    }
    (offset, batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(pairs: &[(&str, &str)]) -> Batch {
        pairs
            .iter()
            .map(|(key, record)| (key.as_bytes().to_vec(), record.as_bytes().to_vec()))
            .collect()
    }

    #[test]
    fn reopen_replays_committed_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        {
            let store = JournalStore::open(&path, true).unwrap();
            store
                .commit(batch(&[("holder-a", "1"), ("holder-b", "2")]))
                .unwrap();
            store.put(b"holder-a", b"3").unwrap();
        }

        let store = JournalStore::open(&path, true).unwrap();
        assert_eq!(store.get(b"holder-a").unwrap(), b"3".to_vec());
        assert_eq!(store.get(b"holder-b").unwrap(), b"2".to_vec());
        assert_eq!(store.scan(b"holder").unwrap().len(), 2);
    }

    #[test]
    fn torn_tail_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        {
            let store = JournalStore::open(&path, false).unwrap();
            store.put(b"config", b"v1").unwrap();
        }
        let intact_len = fs::metadata(&path).unwrap().len();

        // Half of a second frame, as if the process died mid-append.
        let frame = encode_frame(&batch(&[("config", "v2")])).unwrap();
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(&frame[..frame.len() / 2]).unwrap();
        drop(file);

        let store = JournalStore::open(&path, false).unwrap();
        assert_eq!(store.get(b"config").unwrap(), b"v1".to_vec());
        assert_eq!(fs::metadata(&path).unwrap().len(), intact_len);

        store.put(b"config", b"v3").unwrap();
        drop(store);
        let store = JournalStore::open(&path, false).unwrap();
        assert_eq!(store.get(b"config").unwrap(), b"v3".to_vec());
    }

    #[test]
    fn checksum_mismatch_ends_replay() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        {
            let store = JournalStore::open(&path, false).unwrap();
            store.put(b"a", b"1").unwrap();
            store.put(b"b", b"2").unwrap();
        }
        let mut contents = fs::read(&path).unwrap();
        let last = contents.len() - 1;
        contents[last] ^= 0xff;
        fs::write(&path, &contents).unwrap();

        let store = JournalStore::open(&path, false).unwrap();
        assert!(store.exists(b"a").unwrap());
        assert!(!store.exists(b"b").unwrap());
    }

    #[test]
    fn second_handle_is_locked_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.journal");
        let first = JournalStore::open(&path, false).unwrap();
        first.put(b"a", b"1").unwrap();

        let err = JournalStore::open_waiting(&path, false, Duration::from_millis(30))
            .err()
            .unwrap();
        assert_eq!(
            StablecoinError::from_error(&err),
            Some(StablecoinError::Timeout)
        );

        drop(first);
        let second = JournalStore::open(&path, false).unwrap();
        assert_eq!(second.get(b"a").unwrap(), b"1".to_vec());
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.journal");
        let store = JournalStore::open(&path, false).unwrap();
        store.commit(Vec::new()).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }
}
