//! Fixed-pool secure allocator.
//!
//! `SecureAllocator` enforces the fixed capacity budget
//! (`count * max_block_size + additional`) that a secure store is allowed to
//! use, and hands out non-overlapping offsets within that budget: space is
//! bump-allocated from the front, freed offsets are tracked in a
//! size-keyed freelist so a later allocation of the same or a smaller size
//! can be satisfied without growing the bump pointer, and a request that
//! would exceed the budget fails with [`CoreError::NoAvailableHeapMemory`].
//!
//! The allocator tracks *where* a buffer is allowed to live, not the bytes
//! themselves — it holds no backing byte array. Each [`crate::secret_bytes::SecretBytes`]
//! owns and individually `mlock`'s its own storage (mirroring this crate's
//! per-value locking convention rather than one shared arena); the pool's
//! offset is consulted only on `alloc`/`free` to keep `available_memory`
//! accounting honest. See `DESIGN.md` for why this split was chosen over a
//! literal shared mlock'd region.

use crate::error::CoreError;
use std::collections::BTreeMap;
use std::sync::Once;

/// RAII guard that `mlock`s a region on creation and `munlock`s it on drop.
///
/// `mlock` is best-effort: failure does not stop allocation, it only means
/// the region may be swapped to disk. A single process-wide warning is
/// printed the first time this happens.
pub(crate) struct LockedRegion {
    ptr: *const u8,
    len: usize,
    locked: bool,
}

// SAFETY: the pointer is only ever used for mlock/munlock, which are
// thread-safe syscalls; the pointed-to bytes are owned by the caller
// (`SecureAllocator` or a `SecretBytes` owning buffer).
unsafe impl Send for LockedRegion {}
unsafe impl Sync for LockedRegion {}

impl LockedRegion {
    pub(crate) fn try_lock(ptr: *const u8, len: usize) -> Self {
        let locked = platform::try_mlock(ptr, len);
        if !locked && len > 0 {
            static WARNED: Once = Once::new();
            WARNED.call_once(|| {
                eprintln!(
                    "[cipherkeep-core] WARNING: mlock failed -- secure pool may be \
                     swapped to disk. Consider raising RLIMIT_MEMLOCK."
                );
            });
        }
        Self { ptr, len, locked }
    }
}

impl Drop for LockedRegion {
    fn drop(&mut self) {
        if self.locked {
            platform::try_munlock(self.ptr, self.len);
        }
    }
}

#[cfg(unix)]
mod platform {
    pub(super) fn try_mlock(ptr: *const u8, len: usize) -> bool {
        if len == 0 {
            return true;
        }
        // SAFETY: mlock accepts any valid pointer/length pair; failure is
        // reported via a non-zero return and handled by the caller.
        unsafe { libc::mlock(ptr.cast(), len) == 0 }
    }

    pub(super) fn try_munlock(ptr: *const u8, len: usize) {
        if len == 0 {
            return;
        }
        // SAFETY: munlock is safe to call; failure here is non-critical.
        unsafe {
            libc::munlock(ptr.cast(), len);
        }
    }
}

#[cfg(not(unix))]
mod platform {
    pub(super) fn try_mlock(_ptr: *const u8, _len: usize) -> bool {
        false
    }

    pub(super) fn try_munlock(_ptr: *const u8, _len: usize) {}
}

/// A bounded address-space budget for sensitive byte buffers.
///
/// Total capacity is `count * max_block_size + additional`, fixed at
/// construction. Allocations first look for an exact-size free offset, then
/// the smallest free offset at least as large as requested, and only fall
/// back to bump-allocating fresh space when the freelist can't help. The
/// returned `usize` is an opaque accounting token, not an address into any
/// byte array the allocator owns — see the module docs for why.
pub struct SecureAllocator {
    capacity: usize,
    bump: usize,
    used_bytes: usize,
    /// Free offsets, keyed by block size.
    free_by_size: BTreeMap<usize, Vec<usize>>,
    /// Live allocations: offset -> actual block size (may exceed the
    /// requested size when a larger freed block was reused whole).
    allocated: BTreeMap<usize, usize>,
}

impl SecureAllocator {
    /// Create a new budget of `count * max_block_size + additional` bytes.
    #[must_use]
    pub fn new(count: usize, max_block_size: usize, additional: usize) -> Self {
        let capacity = count
            .saturating_mul(max_block_size)
            .saturating_add(additional);
        Self {
            capacity,
            bump: 0,
            used_bytes: 0,
            free_by_size: BTreeMap::new(),
            allocated: BTreeMap::new(),
        }
    }

    /// Total capacity of the budget in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes not currently allocated.
    #[must_use]
    pub fn available_memory(&self) -> usize {
        self.capacity().saturating_sub(self.used_bytes)
    }

    /// Reserve `size` bytes against the budget, returning an opaque offset
    /// token to pass back to [`Self::free`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SizeIsZero`] for a zero-length request, or
    /// [`CoreError::NoAvailableHeapMemory`] if the budget is exhausted.
    pub fn alloc(&mut self, size: usize) -> Result<usize, CoreError> {
        if size == 0 {
            return Err(CoreError::SizeIsZero);
        }

        if let Some(offset) = self.take_free_block(size) {
            self.used_bytes = self
                .used_bytes
                .saturating_add(*self.allocated.get(&offset).unwrap_or(&size));
            return Ok(offset);
        }

        if self.bump.saturating_add(size) > self.capacity {
            return Err(CoreError::NoAvailableHeapMemory);
        }
        let offset = self.bump;
        self.bump = self.bump.saturating_add(size);
        self.allocated.insert(offset, size);
        self.used_bytes = self.used_bytes.saturating_add(size);
        Ok(offset)
    }

    /// Exact-size match first, else the smallest free block large enough.
    fn take_free_block(&mut self, size: usize) -> Option<usize> {
        let chosen_size = if self.free_by_size.contains_key(&size) {
            Some(size)
        } else {
            self.free_by_size
                .range(size..)
                .next()
                .map(|(block_size, _)| *block_size)
        }?;
        let offsets = self.free_by_size.get_mut(&chosen_size)?;
        let offset = offsets.pop()?;
        if offsets.is_empty() {
            self.free_by_size.remove(&chosen_size);
        }
        self.allocated.insert(offset, chosen_size);
        Some(offset)
    }

    /// Release a previously allocated offset back to the budget.
    ///
    /// `size` is the size the caller originally requested; the block's
    /// actual reserved capacity (tracked internally, and possibly larger —
    /// a free block can be reused whole for a smaller request) is what
    /// gets returned to the freelist and credited back to
    /// [`Self::available_memory`]. Zeroing the caller's own bytes is the
    /// caller's responsibility (`SecretBytes` does this on destroy/drop).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BadPointer`] if `offset` was not returned by a
    /// prior, still-live [`Self::alloc`] call.
    pub fn free(&mut self, offset: usize, size: usize) -> Result<(), CoreError> {
        let _ = size;
        let Some(actual_size) = self.allocated.remove(&offset) else {
            return Err(CoreError::BadPointer);
        };
        self.used_bytes = self.used_bytes.saturating_sub(actual_size);
        self.free_by_size.entry(actual_size).or_default().push(offset);
        Ok(())
    }

    /// Destroy and recreate the pool with new dimensions.
    pub fn reset(&mut self, count: usize, max_block_size: usize, additional: usize) {
        *self = Self::new(count, max_block_size, additional);
    }
}
