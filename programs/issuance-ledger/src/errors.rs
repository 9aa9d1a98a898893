use anchor_lang::error::Error;
use anchor_lang::prelude::*;

#[error_code]
#[derive(PartialEq, Eq)]
pub enum StablecoinError {
    #[msg("Signer is not permitted to perform this transition")]
    Denied,

    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Insufficient token balance")]
    InsufficientBalance,

    #[msg("Arithmetic overflow")]
    Overflow,

    #[msg("Account not found")]
    AccountNotFound,

    #[msg("Storage backend unavailable")]
    StorageUnavailable,

    #[msg("Timed out waiting for account locks")]
    Timeout,

    #[msg("Supply invariant violated")]
    InvariantViolation,

    #[msg("System is paused")]
    SystemPaused,

    #[msg("System is not paused")]
    NotPaused,

    #[msg("Cannot transfer to self")]
    SelfTransfer,

    #[msg("Ledger is already initialized")]
    AlreadyInitialized,

    #[msg("Ledger has not been initialized")]
    NotInitialized,

    #[msg("Writes are halted pending manual intervention")]
    LedgerHalted,

    #[msg("Name exceeds maximum length of 32 characters")]
    NameTooLong,

    #[msg("Symbol exceeds maximum length of 10 characters")]
    SymbolTooLong,

    #[msg("Decimals exceed the maximum of 18")]
    InvalidDecimals,

    #[msg("Stored record could not be decoded")]
    CorruptRecord,
}

impl StablecoinError {
    pub const ALL: [StablecoinError; 18] = [
        StablecoinError::Denied,
        StablecoinError::InvalidAmount,
        StablecoinError::InsufficientBalance,
        StablecoinError::Overflow,
        StablecoinError::AccountNotFound,
        StablecoinError::StorageUnavailable,
        StablecoinError::Timeout,
        StablecoinError::InvariantViolation,
        StablecoinError::SystemPaused,
        StablecoinError::NotPaused,
        StablecoinError::SelfTransfer,
        StablecoinError::AlreadyInitialized,
        StablecoinError::NotInitialized,
        StablecoinError::LedgerHalted,
        StablecoinError::NameTooLong,
        StablecoinError::SymbolTooLong,
        StablecoinError::InvalidDecimals,
        StablecoinError::CorruptRecord,
    ];

    pub fn from_error(err: &Error) -> Option<Self> {
        match err {
            Error::AnchorError(anchor) => Self::ALL
                .iter()
                .copied()
                .find(|kind| u32::from(*kind) == anchor.error_code_number),
            Error::ProgramError(_) => None,
        }
    }

    pub fn is_retryable(self) -> bool {
        matches!(self, Self::StorageUnavailable | Self::Timeout)
    }

    pub fn is_fatal(self) -> bool {
        matches!(self, Self::InvariantViolation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anchor_lang::error::ERROR_CODE_OFFSET;

    #[test]
    fn recovers_kind_from_anchor_error() {
        for kind in StablecoinError::ALL {
            let err: Error = kind.into();
            assert_eq!(StablecoinError::from_error(&err), Some(kind));
        }
    }

    #[test]
    fn codes_start_at_anchor_offset() {
        assert_eq!(u32::from(StablecoinError::Denied), ERROR_CODE_OFFSET);
        assert_eq!(
            u32::from(StablecoinError::CorruptRecord),
            ERROR_CODE_OFFSET + 17
        );
    }

    #[test]
    fn classifies_retryable_and_fatal() {
        assert!(StablecoinError::Timeout.is_retryable());
        assert!(StablecoinError::StorageUnavailable.is_retryable());
        assert!(!StablecoinError::InsufficientBalance.is_retryable());
        assert!(StablecoinError::InvariantViolation.is_fatal());
        assert!(!StablecoinError::Denied.is_fatal());
    }
}
