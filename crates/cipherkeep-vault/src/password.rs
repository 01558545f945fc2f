//! The deterministic password-derivation algorithm: `(strong secret,
//! mnemonic, recipe, length) -> password`.
//!
//! `strong_mnemonic` builds the hash input as `strong_secret || mnemonic`
//! (secret first, mnemonic appended after — the order is load-bearing for
//! reproducibility and must not be swapped). [`generate`] then strong-hashes
//! that input and streams the resulting bytes through the recipe filter
//! until `length` accepted characters have been produced and every
//! required character class is present, retrying one character at a time
//! when the recipe is not yet satisfied.

use crate::error::VaultError;
use cipherkeep_core::primitives::CryptoPrimitives;
use cipherkeep_core::recipe::Recipe;
use cipherkeep_core::strong_hash::strong_hash;
use zeroize::Zeroize;

/// Safety budget on the verify/retry loop (spec: `UNABLE_TO_MEET_PASSWORD_REQUIREMENTS`).
pub const RETRY_BUDGET: u32 = 10_000;

/// Build the strong-hash input: `strong_secret || mnemonic`.
#[must_use]
pub fn strong_mnemonic(strong_secret: &[u8], mnemonic: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(strong_secret.len() + mnemonic.len());
    buf.extend_from_slice(strong_secret);
    buf.extend_from_slice(mnemonic);
    buf
}

/// `c = |byte|` read as a signed 8-bit absolute value, with `0x80` (which
/// has no positive two's-complement representation) pinned to zero rather
/// than left as platform-defined behavior.
fn abs_byte(byte: u8) -> u8 {
    if byte == 0x80 {
        return 0;
    }
    (byte as i8).wrapping_abs() as u8
}

/// Derive a `length`-byte password from `strong_mnemonic_bytes`, filtering
/// hash bytes through `recipe` and retrying until every required character
/// class is present.
///
/// # Errors
/// Propagates hash-primitive failures, or returns
/// [`VaultError::UnableToMeetPasswordRequirements`] if the retry safety
/// budget (10 000 iterations) is exhausted without satisfying `recipe`.
pub fn generate<P: CryptoPrimitives>(
    primitives: &P,
    strong_mnemonic_bytes: &[u8],
    length: usize,
    recipe: &Recipe,
) -> Result<Vec<u8>, VaultError> {
    if length == 0 {
        return if recipe.verified(&[]) {
            Ok(Vec::new())
        } else {
            Err(VaultError::UnableToMeetPasswordRequirements)
        };
    }

    let hash_size = primitives.hash_size();
    let mut hash = vec![0u8; hash_size];
    strong_hash(primitives, strong_mnemonic_bytes, &mut hash).map_err(VaultError::Core)?;

    let mut password = vec![0u8; length];
    let mut plen = 0usize;
    let mut pos = 0usize;
    let mut safety = RETRY_BUDGET;

    loop {
        while plen < length {
            while plen < length && pos < hash_size {
                let ch = abs_byte(hash[pos]);
                pos += 1;
                if recipe.has_char(ch) {
                    password[plen] = ch;
                    plen += 1;
                }
            }
            if pos >= hash_size {
                let mut rehashed = vec![0u8; hash_size];
                strong_hash(primitives, &hash, &mut rehashed).map_err(VaultError::Core)?;
                hash.zeroize();
                hash = rehashed;
                pos = 0;
            }
        }

        if recipe.verified(&password) {
            break;
        }

        if safety == 0 {
            password.zeroize();
            hash.zeroize();
            return Err(VaultError::UnableToMeetPasswordRequirements);
        }
        safety -= 1;

        // Discard only the last byte of the current attempt and regenerate
        // that one position -- not a full-window rotation (spec: open
        // question #9.2, pinned to this exact behavior for fixture parity).
        plen = length - 1;
        for n in 0..plen {
            password[n] = password[n + 1];
        }
        password[plen] = 0;
    }

    hash.zeroize();
    Ok(password)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherkeep_core::primitives::StdPrimitives;
    use cipherkeep_core::recipe::flags;

    fn alnum_recipe() -> Recipe {
        let mut recipe = Recipe::new();
        recipe.set_specials(b"!@#$%^&*()-_=+[]{};:,.<>/?\\|~`'\"");
        recipe.add_flags(flags::NUMERIC | flags::LOWERCASE | flags::UPPERCASE);
        recipe
    }

    #[test]
    fn strong_mnemonic_appends_mnemonic_after_secret() {
        let buf = strong_mnemonic(b"secret", b"mnemonic");
        assert_eq!(buf, b"secretmnemonic");
    }

    #[test]
    fn generate_produces_exact_length() {
        let primitives = StdPrimitives;
        let recipe = alnum_recipe();
        let input = strong_mnemonic(b"a strong secret value", b"example.com");
        let password = generate(&primitives, &input, 16, &recipe).unwrap();
        assert_eq!(password.len(), 16);
        for &ch in &password {
            assert!(recipe.has_char(ch));
        }
        assert!(recipe.verified(&password));
    }

    #[test]
    fn generate_is_deterministic() {
        let primitives = StdPrimitives;
        let recipe = alnum_recipe();
        let input = strong_mnemonic(b"a strong secret value", b"example.com");
        let a = generate(&primitives, &input, 24, &recipe).unwrap();
        let b = generate(&primitives, &input, 24, &recipe).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn generate_differs_for_different_mnemonics() {
        let primitives = StdPrimitives;
        let recipe = alnum_recipe();
        let a = generate(
            &primitives,
            &strong_mnemonic(b"a strong secret value", b"site-a"),
            24,
            &recipe,
        )
        .unwrap();
        let b = generate(
            &primitives,
            &strong_mnemonic(b"a strong secret value", b"site-b"),
            24,
            &recipe,
        )
        .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn zero_length_with_no_required_classes_returns_empty() {
        let primitives = StdPrimitives;
        let recipe = Recipe::new();
        let password = generate(&primitives, b"anything", 0, &recipe).unwrap();
        assert!(password.is_empty());
    }

    #[test]
    fn zero_length_with_a_required_class_is_unsatisfiable() {
        let primitives = StdPrimitives;
        let mut recipe = Recipe::new();
        recipe.add_flags(flags::NUMERIC | flags::NUMERIC_REQUIRED);
        assert_eq!(
            generate(&primitives, b"anything", 0, &recipe),
            Err(VaultError::UnableToMeetPasswordRequirements)
        );
    }

    #[test]
    fn abs_byte_pins_0x80_to_zero() {
        assert_eq!(abs_byte(0x80), 0);
        assert_eq!(abs_byte(0xFF), 1);
        assert_eq!(abs_byte(0x01), 1);
        assert_eq!(abs_byte(0x00), 0);
    }

    #[test]
    fn generate_enforces_required_classes_over_a_range_of_lengths() {
        let primitives = StdPrimitives;
        let mut recipe = Recipe::new();
        recipe.set_specials(b"!@#");
        recipe.add_flags(
            flags::NUMERIC
                | flags::LOWERCASE
                | flags::UPPERCASE
                | flags::NUMERIC_REQUIRED
                | flags::LOWERCASE_REQUIRED
                | flags::UPPERCASE_REQUIRED
                | flags::SPECIAL_REQUIRED,
        );
        for len in [8usize, 12, 20, 32] {
            let input = strong_mnemonic(b"yet another strong secret", b"fixture");
            let password = generate(&primitives, &input, len, &recipe).unwrap();
            assert!(recipe.verified(&password), "len={len}");
            assert_eq!(password.len(), len);
        }
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use cipherkeep_core::primitives::StdPrimitives;
    use cipherkeep_core::recipe::flags;
    use proptest::prelude::*;

    fn open_recipe() -> Recipe {
        let mut recipe = Recipe::new();
        recipe.set_specials(b"!@#$%^&*()-_=+");
        recipe.add_flags(flags::NUMERIC | flags::LOWERCASE | flags::UPPERCASE);
        recipe
    }

    proptest! {
        // Each case strong-hashes at least once (ROUNDS * 2 + 1 SHA-512
        // calls); keep the case count low so the suite stays fast.
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn arbitrary_inputs_produce_exact_length_and_accepted_chars(
            secret in prop::collection::vec(any::<u8>(), 1..24),
            mnemonic in prop::collection::vec(any::<u8>(), 0..12),
            length in 1usize..24,
        ) {
            let primitives = StdPrimitives;
            let recipe = open_recipe();
            let input = strong_mnemonic(&secret, &mnemonic);
            let password = generate(&primitives, &input, length, &recipe).unwrap();
            prop_assert_eq!(password.len(), length);
            for &ch in &password {
                prop_assert!(recipe.has_char(ch));
            }
            prop_assert!(recipe.verified(&password));
        }

        #[test]
        fn identical_inputs_are_deterministic(
            secret in prop::collection::vec(any::<u8>(), 1..24),
            mnemonic in prop::collection::vec(any::<u8>(), 0..12),
            length in 1usize..24,
        ) {
            let primitives = StdPrimitives;
            let recipe = open_recipe();
            let input = strong_mnemonic(&secret, &mnemonic);
            let a = generate(&primitives, &input, length, &recipe).unwrap();
            let b = generate(&primitives, &input, length, &recipe).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
