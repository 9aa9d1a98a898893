use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{Duration, Instant};

use anchor_lang::prelude::*;
use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use crate::errors::StablecoinError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAccess {
    /// Reads the config; holder balances may change, supply may not.
    Shared,
    /// Changes the config (supply, pause flag, authority).
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footprint {
    pub config: ConfigAccess,
    pub holders: Vec<Pubkey>,
}

impl Footprint {
    pub fn shared(holders: Vec<Pubkey>) -> Self {
        Self {
            config: ConfigAccess::Shared,
            holders,
        }
    }

    pub fn exclusive(holders: Vec<Pubkey>) -> Self {
        Self {
            config: ConfigAccess::Exclusive,
            holders,
        }
    }
}

/// Config lock plus a fixed set of holder stripes.
///
/// Lock order is always config first, then stripes by ascending index, so
/// two transitions can never wait on each other in a cycle.
pub struct LockTable {
    config: RwLock<()>,
    stripes: Vec<Mutex<()>>,
    timeout: Duration,
}

enum ConfigGuard<'a> {
    Shared(RwLockReadGuard<'a, ()>),
    Exclusive(RwLockWriteGuard<'a, ()>),
}

pub struct LockSet<'a> {
    _config: ConfigGuard<'a>,
    _stripes: Vec<MutexGuard<'a, ()>>,
}

impl LockTable {
    pub fn new(stripes: usize, timeout: Duration) -> Self {
        Self {
            config: RwLock::new(()),
            stripes: (0..stripes.max(1)).map(|_| Mutex::new(())).collect(),
            timeout,
        }
    }

    pub fn stripe_of(&self, owner: &Pubkey) -> usize {
        let mut hasher = DefaultHasher::new();
        owner.hash(&mut hasher);
        (hasher.finish() % self.stripes.len() as u64) as usize
    }

    /// Acquires everything in the footprint before a single deadline.
    /// On timeout, locks taken so far are released.
    pub fn acquire(&self, footprint: &Footprint) -> Result<LockSet<'_>> {
        let deadline = Instant::now() + self.timeout;

        let config = match footprint.config {
            ConfigAccess::Shared => self.config.try_read_until(deadline).map(ConfigGuard::Shared),
            ConfigAccess::Exclusive => self
                .config
                .try_write_until(deadline)
                .map(ConfigGuard::Exclusive),
        };
        let config = config.ok_or_else(|| {
            debug!(access = ?footprint.config, "config lock wait timed out");
            error!(StablecoinError::Timeout)
        })?;

        let mut indices: Vec<usize> = footprint
            .holders
            .iter()
            .map(|owner| self.stripe_of(owner))
            .collect();
        indices.sort_unstable();
        indices.dedup();

        let mut stripes = Vec::with_capacity(indices.len());
        for index in indices {
            let guard = self.stripes[index].try_lock_until(deadline).ok_or_else(|| {
                debug!(stripe = index, "holder lock wait timed out");
                error!(StablecoinError::Timeout)
            })?;
            stripes.push(guard);
        }

        Ok(LockSet {
            _config: config,
            _stripes: stripes,
        })
    }
}
