//! Separator-insertion formatter: purely presentational blocking/wrapping
//! of a generated password for on-screen display.
//!
//! Block count selection prefers fewer, larger blocks: block *sizes* 5, 4,
//! 3 are tried in that order against the password length, and the first
//! one that divides evenly wins (`blocks = length / size`). If that would
//! still produce more than four blocks, the same search re-runs against
//! sizes 8, 7, 6, 5. When nothing divides evenly, the block count falls
//! back to `length / 5 + 1`. This mirrors the original
//! `SeperatedBlocksNeeded` exactly (including its two-tier fallback).

const FIRST_TIER: [usize; 3] = [5, 4, 3];
const SECOND_TIER: [usize; 4] = [8, 7, 6, 5];

fn blocks_needed(length: usize) -> usize {
    if length < 6 {
        return 1;
    }

    let mut blocks = FIRST_TIER
        .iter()
        .find(|&&size| length % size == 0)
        .map_or_else(|| length / 5 + 1, |&size| length / size);

    if blocks > 4 {
        blocks = SECOND_TIER
            .iter()
            .find(|&&size| length % size == 0)
            .map_or_else(|| length / 5 + 1, |&size| length / size);
    }

    blocks
}

/// Split `length` into `blocks` near-even block sizes, with any remainder
/// (`length % blocks`) distributed one extra character at a time across
/// the leading blocks.
///
/// The spec leaves leading-vs-trailing distribution an open question for
/// the non-evenly-divisible case (no fixture exercises it); this resolves
/// it to leading blocks, consistently with how `blocks_needed` itself
/// prefers to front-load larger block sizes.
fn block_sizes(length: usize, blocks: usize) -> Vec<usize> {
    let base = length / blocks;
    let remainder = length % blocks;
    (0..blocks)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect()
}

/// Insert `separator` between blocks of `password`, wrapping to a new line
/// (in place of the next separator) whenever the next block would push
/// the current line past `width` characters. `width == 0` means no limit.
#[must_use]
pub fn add_separators(password: &[u8], separator: u8, width: usize) -> Vec<u8> {
    let length = password.len();
    let blocks = blocks_needed(length);
    if blocks <= 1 {
        return password.to_vec();
    }

    let sizes = block_sizes(length, blocks);
    let mut out = Vec::with_capacity(length + blocks - 1);
    let mut cursor = 0usize;
    let mut line_len = 0usize;

    for (i, &size) in sizes.iter().enumerate() {
        out.extend_from_slice(&password[cursor..cursor + size]);
        cursor += size;
        line_len += size;

        let is_last = i + 1 == sizes.len();
        if is_last {
            break;
        }

        let next_size = sizes[i + 1];
        if width > 0 && line_len + 1 + next_size > width {
            out.push(b'\n');
            line_len = 0;
        } else {
            out.push(separator);
            line_len += 1;
        }
    }

    out
}
