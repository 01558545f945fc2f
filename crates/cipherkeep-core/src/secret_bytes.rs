//! `SecretBytes` — an owned or borrowed byte range with zero-on-drop.
//!
//! An owning `SecretBytes` reserves its capacity against a shared
//! [`SecureAllocator`] (so the pool's `available_memory` accounting stays
//! correct) and keeps its bytes in an individually `mlock`'d buffer. A
//! fixed `SecretBytes` is a view over caller-owned memory: destroying it
//! only zeroes, since there is nothing to free.

use crate::allocator::{LockedRegion, SecureAllocator};
use crate::error::CoreError;
use std::cell::RefCell;
use std::rc::Rc;
use zeroize::Zeroize;

enum Repr<'a> {
    Owned {
        pool: Rc<RefCell<SecureAllocator>>,
        offset: usize,
        bytes: Vec<u8>,
        _lock: LockedRegion,
    },
    Fixed(&'a mut [u8]),
    /// Storage was moved out via [`SecretBytes::move_to`] or already
    /// destroyed. Any further destroy is a no-op.
    Released,
}

/// A byte range that either owns pool-backed storage or borrows a
/// caller-supplied buffer.
pub struct SecretBytes<'a> {
    repr: Repr<'a>,
}

impl<'a> SecretBytes<'a> {
    /// Reserve `n` zero-initialized bytes against `pool`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::SizeIsZero`] or [`CoreError::NoAvailableHeapMemory`]
    /// as reported by the allocator.
    pub fn alloc(pool: &Rc<RefCell<SecureAllocator>>, n: usize) -> Result<Self, CoreError> {
        let offset = pool.borrow_mut().alloc(n)?;
        let bytes = vec![0u8; n];
        let lock = LockedRegion::try_lock(bytes.as_ptr(), bytes.len());
        Ok(Self {
            repr: Repr::Owned {
                pool: Rc::clone(pool),
                offset,
                bytes,
                _lock: lock,
            },
        })
    }

    /// Wrap a caller-owned buffer as a fixed (non-owning) view.
    ///
    /// Destroying a fixed view only zeroes the bytes; there is no backing
    /// pool allocation to free.
    pub fn fixed(buf: &'a mut [u8]) -> Self {
        Self {
            repr: Repr::Fixed(buf),
        }
    }

    /// Number of bytes currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Owned { bytes, .. } => bytes.len(),
            Repr::Fixed(buf) => buf.len(),
            Repr::Released => 0,
        }
    }

    /// `true` if this range holds no bytes (including a released range).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` if this is a caller-owned, non-pool-backed view.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        matches!(self.repr, Repr::Fixed(_))
    }

    /// Borrow the underlying bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        match &self.repr {
            Repr::Owned { bytes, .. } => bytes.as_slice(),
            Repr::Fixed(buf) => buf,
            Repr::Released => &[],
        }
    }

    /// Mutably borrow the underlying bytes.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match &mut self.repr {
            Repr::Owned { bytes, .. } => bytes.as_mut_slice(),
            Repr::Fixed(buf) => buf,
            Repr::Released => &mut [],
        }
    }

    /// `true` if every byte is zero.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    /// Grow or shrink an owning range to `n` bytes, preserving existing
    /// content up to `min(old_len, n)`. Newly added bytes are zeroed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MemoryIsFixed`] on a fixed view.
    pub fn realloc(&mut self, n: usize) -> Result<(), CoreError> {
        // Reserve the new block before disturbing the old one, so a failed
        // allocation leaves this range untouched.
        let new_offset = match &self.repr {
            Repr::Owned { pool, .. } => pool.borrow_mut().alloc(n)?,
            Repr::Fixed(_) => return Err(CoreError::MemoryIsFixed),
            Repr::Released => return Err(CoreError::DataStillExposed),
        };

        let Repr::Owned {
            pool,
            offset,
            bytes,
            ..
        } = &mut self.repr
        else {
            unreachable!("checked above")
        };
        let old_len = bytes.len();
        let mut new_bytes = vec![0u8; n];
        let copy_len = old_len.min(n);
        new_bytes[..copy_len].copy_from_slice(&bytes[..copy_len]);
        bytes.zeroize();
        pool.borrow_mut().free(*offset, old_len)?;
        let lock = LockedRegion::try_lock(new_bytes.as_ptr(), new_bytes.len());
        *offset = new_offset;
        *bytes = new_bytes;
        if let Repr::Owned { _lock, .. } = &mut self.repr {
            *_lock = lock;
        }
        Ok(())
    }

    /// Copy `src` into this range starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BadPointer`] if `offset + src.len()` exceeds
    /// this range's length.
    pub fn copy_from(&mut self, src: &[u8], offset: usize) -> Result<(), CoreError> {
        let end = offset.checked_add(src.len()).ok_or(CoreError::BadPointer)?;
        let dst = self.as_bytes_mut();
        if end > dst.len() {
            return Err(CoreError::BadPointer);
        }
        dst[offset..end].copy_from_slice(src);
        Ok(())
    }

    /// Copy the first `n` bytes of this range into `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::BufferTooSmall`] if `dst` or `self` is shorter
    /// than `n`.
    pub fn copy_to(&self, dst: &mut [u8], n: usize) -> Result<(), CoreError> {
        let src = self.as_bytes();
        if src.len() < n || dst.len() < n {
            return Err(CoreError::BufferTooSmall);
        }
        dst[..n].copy_from_slice(&src[..n]);
        Ok(())
    }

    /// Overwrite every byte with zero, in place.
    pub fn zero(&mut self) {
        self.as_bytes_mut().zeroize();
    }

    /// Transfer this range's storage into `target`, leaving `self` empty
    /// (`Released`). Any storage previously held by `target` is dropped
    /// (and therefore zeroed) first — callers that need to preserve a
    /// prior entry must destroy it explicitly before moving.
    pub fn move_to(&mut self, target: &mut Self) {
        let moved = std::mem::replace(&mut self.repr, Repr::Released);
        target.repr = moved;
    }

    /// Zero the bytes and, for an owning range, free the pool reservation.
    /// A no-op on an already-released range.
    ///
    /// # Errors
    ///
    /// Propagates [`CoreError::BadPointer`] if the pool no longer tracks
    /// this range's offset (should not happen in correct usage).
    pub fn destroy(mut self) -> Result<(), CoreError> {
        self.destroy_in_place()
    }

    fn destroy_in_place(&mut self) -> Result<(), CoreError> {
        match std::mem::replace(&mut self.repr, Repr::Released) {
            Repr::Owned {
                pool,
                offset,
                mut bytes,
                ..
            } => {
                let len = bytes.len();
                bytes.zeroize();
                pool.borrow_mut().free(offset, len)
            }
            Repr::Fixed(buf) => {
                buf.zeroize();
                Ok(())
            }
            Repr::Released => Ok(()),
        }
    }
}

impl Drop for SecretBytes<'_> {
    fn drop(&mut self) {
        let _ = self.destroy_in_place();
    }
}

impl PartialEq for SecretBytes<'_> {
    /// Byte-wise, size-checked equality. **Not constant-time** — this type
    /// holds either randomized ciphertext or caller-visible plaintext;
    /// callers must not use this on key material.
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}
