use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LOCK_STRIPES, DEFAULT_LOCK_TIMEOUT_MS};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub lock_timeout_ms: u64,
    pub lock_stripes: usize,
    /// Lets the authority burn from any holder without the holder's signature.
    pub authority_burn: bool,
    /// fsync the journal after every batch.
    pub sync_writes: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            lock_stripes: DEFAULT_LOCK_STRIPES,
            authority_burn: true,
            sync_writes: true,
        }
    }
}

impl LedgerSettings {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn stripes(&self) -> usize {
        self.lock_stripes.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_stripes_still_locks() {
        let settings = LedgerSettings {
            lock_stripes: 0,
            ..LedgerSettings::default()
        };
        assert_eq!(settings.stripes(), 1);
    }

    #[test]
    fn defaults_allow_authority_burn() {
        let settings = LedgerSettings::default();
        assert!(settings.authority_burn);
        assert_eq!(settings.lock_timeout(), Duration::from_millis(2_000));
    }
}
