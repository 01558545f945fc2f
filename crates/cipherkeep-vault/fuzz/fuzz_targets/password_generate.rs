//! Fuzz target for the password-derivation algorithm.
//!
//! Feeds arbitrary secret/mnemonic bytes, a length, and a recipe built from
//! arbitrary flag/specials/separator bytes into `generate` — must never
//! panic for any input, and whatever it returns must have the requested
//! length.
//!
//! # Usage
//!
//! ```sh
//! cargo +nightly install cargo-fuzz
//! cd crates/cipherkeep-vault
//! cargo +nightly fuzz run password_generate -- -max_len=4096
//! ```

#![no_main]

use cipherkeep_core::primitives::StdPrimitives;
use cipherkeep_core::recipe::Recipe;
use cipherkeep_vault::{generate_password_bytes, strong_mnemonic};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }

    let flags = u32::from(data[0]);
    let length = usize::from(data[1]) % 128;
    let split = 2 + usize::from(data[2]) % (data.len().saturating_sub(2).max(1));
    let (specials, rest) = data[2..].split_at(split.min(data.len() - 2));
    let (secret, mnemonic) = rest.split_at(rest.len() / 2);

    let mut recipe = Recipe::new();
    recipe.set_specials(specials);
    recipe.add_flags(flags);
    if let Some(&sep) = rest.last() {
        recipe.set_separator(sep);
    }

    let primitives = StdPrimitives;
    let input = strong_mnemonic(secret, mnemonic);
    if let Ok(password) = generate_password_bytes(&primitives, &input, length, &recipe) {
        assert_eq!(password.len(), length);
    }
});
