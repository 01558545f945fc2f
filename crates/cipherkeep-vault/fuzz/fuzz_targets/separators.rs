//! Fuzz target for the separator-insertion display formatter.
//!
//! Feeds an arbitrary password, separator byte, and line width into
//! `add_separators` — must never panic, and must always preserve every
//! original byte in order once separators and newlines are stripped back
//! out.
//!
//! # Usage
//!
//! ```sh
//! cargo +nightly install cargo-fuzz
//! cd crates/cipherkeep-vault
//! cargo +nightly fuzz run separators -- -max_len=4096
//! ```

#![no_main]

use cipherkeep_vault::add_separators;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let separator = data[0];
    let width = usize::from(data[1]);
    let password = &data[2..];

    // `add_separators` only ever inserts bytes equal to `separator` or
    // `b'\n'` between blocks of the original password; if either can
    // already occur inside the password itself, stripping them back out
    // cannot be compared byte-for-byte against the input.
    if password.contains(&separator) || password.contains(&b'\n') {
        let _ = add_separators(password, separator, width);
        return;
    }

    let formatted = add_separators(password, separator, width);
    let stripped: Vec<u8> = formatted
        .into_iter()
        .filter(|&b| b != separator && b != b'\n')
        .collect();
    assert_eq!(stripped, password);
});
