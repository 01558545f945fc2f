//! `cipherkeep-vault` — the secure store, deterministic password
//! derivation algorithm, and manager façade built on `cipherkeep-core`.
//!
//! This crate holds the stateful pieces: the name-keyed encrypted store
//! (salted encryption, exposure accounting, shared IV), the strong-hash ->
//! recipe-filtered password generator, and the `PasswordManager` façade
//! that owns one store and exposes character-at-a-time strong-secret
//! entry plus a display-only separator formatter.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod manager;
pub mod password;
pub mod separators;
pub mod store;

pub use error::VaultError;
pub use manager::PasswordManager;
pub use password::{generate as generate_password_bytes, strong_mnemonic};
pub use separators::add_separators;
pub use store::{SecureStore, DEFAULT_COUNT, DEFAULT_SIZE};
