//! Fuzz target for `Recipe` construction and querying.
//!
//! Feeds arbitrary bytes into the flag/specials/separator setters and the
//! resulting `has_char`/`verified` queries — must never panic regardless of
//! which bytes are marked special or which flags are set.
//!
//! # Usage
//!
//! ```sh
//! cargo +nightly install cargo-fuzz
//! cd crates/cipherkeep-vault
//! cargo +nightly fuzz run recipe -- -max_len=4096
//! ```

#![no_main]

use cipherkeep_core::recipe::Recipe;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }

    let flags = u32::from_le_bytes([
        data[0],
        *data.get(1).unwrap_or(&0),
        *data.get(2).unwrap_or(&0),
        *data.get(3).unwrap_or(&0),
    ]);

    let mut recipe = Recipe::new();
    recipe.add_flags(flags);
    recipe.set_specials(data);
    if let Some(&sep) = data.last() {
        recipe.set_separator(sep);
    }

    for &byte in data {
        let _ = recipe.has_char(byte);
    }
    let _ = recipe.verified(data);

    recipe.reset(data, flags, data.last().copied());
    recipe.clear();
    let _ = recipe.verified(data);
});
