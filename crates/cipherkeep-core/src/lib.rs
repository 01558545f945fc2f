//! `cipherkeep-core` — pure cryptographic primitives and secret-lifecycle
//! state machine for the cipherkeep password vault.
//!
//! This crate is the audit target: no I/O, no persistence, no network. It
//! holds the fixed-pool allocator, the secret byte range type, the
//! AES-256-CBC/SHA-512 primitives adapter, the cipher key-lifecycle state
//! machine, the strong-hash work-factor loop, and the recipe
//! character-class engine. Business logic (the secure store, password
//! generation, and the manager façade) lives in `cipherkeep-vault`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod allocator;
pub mod cipher;
pub mod error;
pub mod primitives;
pub mod recipe;
pub mod secret_bytes;
pub mod strong_hash;

pub use allocator::SecureAllocator;
pub use cipher::Cipher;
pub use error::CoreError;
pub use primitives::{CryptoPrimitives, StdPrimitives, BLOCK_SIZE, HASH_SIZE, KEY_SIZE};
pub use recipe::{flags as recipe_flags, Recipe};
pub use secret_bytes::SecretBytes;
pub use strong_hash::strong_hash;
