//! Vault error types for `cipherkeep-vault`.

use cipherkeep_core::CoreError;
use thiserror::Error;

/// Errors produced by the secure store, password generator, and manager
/// façade.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum VaultError {
    /// Cryptographic or allocator-level failure (delegated from
    /// `cipherkeep-core`).
    #[error(transparent)]
    Core(#[from] CoreError),

    /// `initialize` called on a store that is already initialized.
    #[error("already initialized")]
    AlreadyInitialized,

    /// An operation was attempted before `initialize`.
    #[error("not initialized")]
    NotInitialized,

    /// No entry exists under the requested name.
    #[error("data not found")]
    DataNotFound,

    /// `dispense` was called for a name with no stored strong secret.
    #[error("no strong password stored")]
    NoStrongPasswordStored,

    /// `start` was called while a strong-secret entry was already in
    /// progress.
    #[error("strong password entry already started")]
    StrongPasswordEntryAlreadyStarted,

    /// `put`/`finish` was called without a preceding `start`.
    #[error("strong password entry not started")]
    StrongPasswordEntryNotStarted,

    /// `put` was called after the entry buffer's capacity was reached.
    #[error("strong password entry full")]
    StrongPasswordEntryFull,

    /// The retry safety budget (10 000 iterations) was exhausted without
    /// satisfying the recipe's required character classes.
    #[error("unable to meet password requirements")]
    UnableToMeetPasswordRequirements,

    /// The requested password length exceeds what the caller's buffer (or
    /// the generator's supported range) can hold.
    #[error("password exceeds supported length")]
    PasswordExceedsSupportedLength,
}
