//! The strong-hash loop: the system's only work factor.
//!
//! `strong_hash(data, out)` = one `hash(data, out)` call, then 10 000
//! rounds alternating `hash(out, tmp)` / `hash(tmp, out)`. This is the
//! sole protection against offline brute-forcing of a strong secret from
//! a derived password — not a memory-hard KDF, by design (see module
//! docs on [`crate::primitives`]).

use crate::error::CoreError;
use crate::primitives::CryptoPrimitives;

/// Number of alternating-buffer rounds after the initial hash.
pub const ROUNDS: u32 = 10_000;

/// Compute the strong-hash of `data` into `out` (any length).
///
/// # Errors
/// Propagates any error from the underlying [`CryptoPrimitives::hash`].
pub fn strong_hash<P: CryptoPrimitives>(
    primitives: &P,
    data: &[u8],
    out: &mut [u8],
) -> Result<(), CoreError> {
    primitives.hash(data, out)?;
    let mut tmp = vec![0u8; out.len()];
    for _ in 0..ROUNDS {
        primitives.hash(out, &mut tmp)?;
        primitives.hash(&tmp, out)?;
    }
    tmp.fill(0);
    Ok(())
}
