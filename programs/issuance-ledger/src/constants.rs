pub const CONFIG_SEED: &[u8] = b"config";
pub const HOLDER_SEED: &[u8] = b"holder";
pub const EVENT_SEED: &[u8] = b"event";
pub const HALT_SEED: &[u8] = b"halt";

pub const MAX_NAME_LEN: usize = 32;
pub const MAX_SYMBOL_LEN: usize = 10;
pub const MAX_DECIMALS: u8 = 18;

pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 2_000;
pub const DEFAULT_LOCK_STRIPES: usize = 64;
