//! SecureStore: a name-keyed map of encrypted blocks, backed by a single
//! fixed-pool allocator and a per-store IV reused for the store's entire
//! lifetime.
//!
//! The IV reuse is intentional (see module docs on [`crate::manager`]):
//! every store call either uses a freshly prepared cipher key, or pads the
//! plaintext with fresh random salt, which bounds the risk of reusing one
//! IV. A port MUST preserve this property, not "fix" it away.

use crate::error::VaultError;
use cipherkeep_core::cipher::Cipher;
use cipherkeep_core::primitives::{CryptoPrimitives, BLOCK_SIZE};
use cipherkeep_core::secret_bytes::SecretBytes;
use cipherkeep_core::strong_hash::strong_hash;
use cipherkeep_core::CoreError;
use cipherkeep_core::SecureAllocator;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Default number of named entries a freshly initialized store expects to
/// hold before growing (the original `SecureStore::DEFAULT_COUNT`).
pub const DEFAULT_COUNT: usize = 10;
/// Default per-entry block size in bytes (the original
/// `SecureStore::DEFAULT_SIZE`).
pub const DEFAULT_SIZE: usize = 512;

const IV_SIZE: usize = 16;

struct Entry {
    ciphertext: SecretBytes<'static>,
    plaintext_len: usize,
    stored_len: usize,
}

struct Inner {
    pool: Rc<RefCell<SecureAllocator>>,
    iv: SecretBytes<'static>,
    entries: HashMap<String, Entry>,
    max_size: usize,
    #[cfg(debug_assertions)]
    exposure_count: i64,
}

/// Name -> encrypted-block map with a shared IV and salted-encryption
/// support.
pub struct SecureStore<P: CryptoPrimitives + Clone> {
    primitives: P,
    inner: Option<Inner>,
}

impl<P: CryptoPrimitives + Clone> SecureStore<P> {
    /// A store with no pool allocated yet — call [`Self::initialize`]
    /// before any other operation.
    #[must_use]
    pub fn new(primitives: P) -> Self {
        Self {
            primitives,
            inner: None,
        }
    }

    /// Allocate the pool (`count + 2` blocks of `max_size`, plus one IV
    /// block) and randomize the IV.
    ///
    /// # Errors
    /// Returns [`VaultError::AlreadyInitialized`] if already initialized.
    pub fn initialize(&mut self, count: usize, max_size: usize) -> Result<(), VaultError> {
        if self.inner.is_some() {
            return Err(VaultError::AlreadyInitialized);
        }
        let pool = Rc::new(RefCell::new(SecureAllocator::new(
            count.saturating_add(2),
            max_size,
            IV_SIZE,
        )));
        let mut iv = SecretBytes::alloc(&pool, IV_SIZE).map_err(VaultError::Core)?;
        self.primitives
            .randomize(iv.as_bytes_mut())
            .map_err(VaultError::Core)?;
        self.inner = Some(Inner {
            pool,
            iv,
            entries: HashMap::new(),
            max_size,
            #[cfg(debug_assertions)]
            exposure_count: 0,
        });
        Ok(())
    }

    /// Destroy then re-initialize with new dimensions.
    ///
    /// # Errors
    /// Propagates any error from [`Self::initialize`].
    pub fn reset(&mut self, count: usize, max_size: usize) -> Result<(), VaultError> {
        self.destroy();
        self.initialize(count, max_size)
    }

    /// Zero the IV and every entry, and release the pool.
    pub fn destroy(&mut self) {
        self.inner = None;
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.is_some()
    }

    /// Bytes still free in the pool, or 0 if uninitialized.
    #[must_use]
    pub fn available_memory(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| inner.pool.borrow().available_memory())
    }

    /// The configured per-entry block size (`max_size` from
    /// [`Self::initialize`]), or 0 if uninitialized.
    #[must_use]
    pub fn max_entry_size(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.max_size)
    }

    /// Plaintext length of the named entry, or 0 if absent.
    #[must_use]
    pub fn data_size(&self, name: &str) -> usize {
        self.inner
            .as_ref()
            .and_then(|inner| inner.entries.get(name))
            .map_or(0, |entry| entry.plaintext_len)
    }

    /// Current exposure count (always 0 in release builds).
    #[must_use]
    pub fn exposure_count(&self) -> i64 {
        #[cfg(debug_assertions)]
        {
            self.inner.as_ref().map_or(0, |inner| inner.exposure_count)
        }
        #[cfg(not(debug_assertions))]
        {
            0
        }
    }

    fn inner_mut(&mut self) -> Result<&mut Inner, VaultError> {
        self.inner.as_mut().ok_or(VaultError::NotInitialized)
    }

    fn inner_ref(&self) -> Result<&Inner, VaultError> {
        self.inner.as_ref().ok_or(VaultError::NotInitialized)
    }

    pub(crate) fn increase_exposure(&mut self) {
        #[cfg(debug_assertions)]
        if let Some(inner) = self.inner.as_mut() {
            inner.exposure_count += 1;
        }
    }

    /// Caller has released or destroyed one plaintext copy. No-op in
    /// release builds.
    pub fn decrease_exposure(&mut self) {
        #[cfg(debug_assertions)]
        if let Some(inner) = self.inner.as_mut() {
            inner.exposure_count -= 1;
        }
    }

    /// Encrypt `plaintext` into `ciphertext` under `cipher`'s key and this
    /// store's IV. If `ciphertext` is longer than `plaintext`, the
    /// difference is filled with random salt before encryption. On
    /// success, `plaintext` is zeroed.
    ///
    /// # Errors
    /// Returns [`CoreError::CipherNotInRightState`] unless `cipher` is
    /// `Prepared` or `Completed`, or [`CoreError::BufferTooSmall`] if
    /// `ciphertext` is shorter than `plaintext`.
    pub fn encrypt(
        &mut self,
        cipher: &Cipher<P>,
        plaintext: &mut SecretBytes<'_>,
        ciphertext: &mut SecretBytes<'_>,
    ) -> Result<(), VaultError> {
        if !(cipher.is_prepared() || cipher.is_completed()) {
            return Err(CoreError::CipherNotInRightState.into());
        }
        if ciphertext.len() < plaintext.len() {
            return Err(CoreError::BufferTooSmall.into());
        }

        let inner = self.inner_ref()?;
        let pool = Rc::clone(&inner.pool);
        let iv = inner.iv.as_bytes().to_vec();

        if ciphertext.len() > plaintext.len() {
            let tail_start = plaintext.len();
            // The first `mandatory_pad` tail bytes only exist because
            // AES-CBC requires a block-aligned buffer; those stay zero so a
            // caller that asks for `stored_size == plaintext.len()` (no
            // salt) still gets deterministic ciphertext even when
            // `plaintext.len()` isn't itself block-aligned. Only bytes
            // beyond that -- genuine caller-requested length-hiding salt --
            // get randomized.
            let block_aligned_len = tail_start.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;
            let mandatory_pad = block_aligned_len.saturating_sub(tail_start);
            let mut scratch = SecretBytes::alloc(&pool, ciphertext.len()).map_err(VaultError::Core)?;
            scratch.copy_from(plaintext.as_bytes(), 0).map_err(VaultError::Core)?;
            if ciphertext.len() > block_aligned_len {
                let salt_len = ciphertext.len() - block_aligned_len;
                let mut salt = vec![0u8; salt_len];
                self.primitives.randomize(&mut salt).map_err(VaultError::Core)?;
                scratch
                    .copy_from(&salt, tail_start + mandatory_pad)
                    .map_err(VaultError::Core)?;
                salt.fill(0);
            }
            cipher
                .encrypt(&iv, scratch.as_bytes(), ciphertext.as_bytes_mut())
                .map_err(VaultError::Core)?;
            scratch.destroy().map_err(VaultError::Core)?;
        } else {
            cipher
                .encrypt(&iv, plaintext.as_bytes(), ciphertext.as_bytes_mut())
                .map_err(VaultError::Core)?;
        }
        plaintext.zero();
        Ok(())
    }

    /// Decrypt `ciphertext` into `plaintext` (same length) under `cipher`'s
    /// key and this store's IV. On success, `ciphertext` is zeroed.
    ///
    /// # Errors
    /// Returns [`CoreError::CipherNotInRightState`] unless `cipher` is
    /// `Prepared` or `Completed`.
    pub fn decrypt(
        &mut self,
        cipher: &Cipher<P>,
        ciphertext: &mut SecretBytes<'_>,
        plaintext: &mut SecretBytes<'_>,
    ) -> Result<(), VaultError> {
        if !(cipher.is_prepared() || cipher.is_completed()) {
            return Err(CoreError::CipherNotInRightState.into());
        }
        let inner = self.inner_ref()?;
        let iv = inner.iv.as_bytes().to_vec();
        cipher
            .decrypt(&iv, ciphertext.as_bytes(), plaintext.as_bytes_mut())
            .map_err(VaultError::Core)?;
        ciphertext.zero();
        Ok(())
    }

    /// Encrypt `plaintext` and park it under `name`, destroying any prior
    /// entry of the same name. Defaults `stored_size` to this store's
    /// configured `max_size` (salting the difference). The effective
    /// stored size is always rounded up to a cipher block multiple, since
    /// AES-CBC requires block-aligned buffers.
    ///
    /// # Errors
    /// Propagates [`Self::encrypt`] errors.
    pub fn store(
        &mut self,
        name: &str,
        cipher: &Cipher<P>,
        mut plaintext: SecretBytes<'_>,
        stored_size: Option<usize>,
    ) -> Result<(), VaultError> {
        let inner = self.inner_ref()?;
        let pool = Rc::clone(&inner.pool);
        let plaintext_len = plaintext.len();
        let requested = stored_size.unwrap_or(inner.max_size).max(plaintext_len);
        let stored_size = requested.div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

        let mut ciphertext = SecretBytes::alloc(&pool, stored_size).map_err(VaultError::Core)?;
        self.encrypt(cipher, &mut plaintext, &mut ciphertext)?;
        plaintext.destroy().map_err(VaultError::Core)?;

        let inner = self.inner_mut()?;
        if let Some(prior) = inner.entries.remove(name) {
            prior.ciphertext.destroy().map_err(VaultError::Core)?;
        }
        inner.entries.insert(
            name.to_string(),
            Entry {
                ciphertext,
                plaintext_len,
                stored_len: stored_size,
            },
        );
        Ok(())
    }

    /// Decrypt the named entry into `out_plaintext`, destroy the entry,
    /// and zero `cipher`.
    ///
    /// # Errors
    /// Returns [`VaultError::DataNotFound`] if no entry exists under
    /// `name`, or [`CoreError::BufferTooSmall`] if `out_plaintext` is
    /// shorter than the entry's recorded plaintext length.
    pub fn dispense(
        &mut self,
        name: &str,
        cipher: &mut Cipher<P>,
        out_plaintext: &mut SecretBytes<'_>,
    ) -> Result<(), VaultError> {
        let inner = self.inner_mut()?;
        let mut entry = inner.entries.remove(name).ok_or(VaultError::DataNotFound)?;
        if out_plaintext.len() < entry.plaintext_len {
            inner.entries.insert(name.to_string(), entry);
            return Err(CoreError::BufferTooSmall.into());
        }

        let pool = Rc::clone(&inner.pool);
        let mut scratch = match SecretBytes::alloc(&pool, entry.stored_len) {
            Ok(s) => s,
            Err(e) => {
                self.inner_mut()?.entries.insert(name.to_string(), entry);
                return Err(e.into());
            }
        };

        if let Err(e) = self.decrypt(cipher, &mut entry.ciphertext, &mut scratch) {
            let _ = scratch.destroy();
            self.inner_mut()?.entries.insert(name.to_string(), entry);
            return Err(e);
        }

        out_plaintext
            .copy_from(&scratch.as_bytes()[..entry.plaintext_len], 0)
            .map_err(VaultError::Core)?;
        scratch.destroy().map_err(VaultError::Core)?;
        entry.ciphertext.destroy().map_err(VaultError::Core)?;
        cipher.zero();
        self.increase_exposure();
        Ok(())
    }

    /// Zero and free the named entry without decrypting it.
    ///
    /// # Errors
    /// Returns [`VaultError::DataNotFound`] if no entry exists.
    pub fn destroy_entry(&mut self, name: &str) -> Result<(), VaultError> {
        let inner = self.inner_mut()?;
        let entry = inner.entries.remove(name).ok_or(VaultError::DataNotFound)?;
        entry.ciphertext.destroy().map_err(VaultError::Core)
    }

    /// `1 + 2 * 10_000` hash invocations producing `out` of any size (see
    /// [`cipherkeep_core::strong_hash`]).
    ///
    /// # Errors
    /// Propagates any error from the underlying hash primitive.
    pub fn strong_hash(&self, data: &[u8], out: &mut [u8]) -> Result<(), VaultError> {
        strong_hash(&self.primitives, data, out).map_err(VaultError::Core)
    }

    /// Allocate a fresh owning [`SecretBytes`] against this store's pool.
    ///
    /// # Errors
    /// Propagates allocator errors.
    pub fn alloc_secret(&self, n: usize) -> Result<SecretBytes<'static>, VaultError> {
        let inner = self.inner_ref()?;
        SecretBytes::alloc(&inner.pool, n).map_err(VaultError::Core)
    }

    pub(crate) fn primitives(&self) -> &P {
        &self.primitives
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherkeep_core::primitives::StdPrimitives;

    fn prepared_cipher(primitives: StdPrimitives, secret: &[u8]) -> Cipher<StdPrimitives> {
        let mut cipher = Cipher::new(primitives);
        cipher.prepare_with_secret(secret).unwrap();
        cipher
    }

    #[test]
    fn initialize_twice_fails() {
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(DEFAULT_COUNT, DEFAULT_SIZE).unwrap();
        assert_eq!(
            store.initialize(DEFAULT_COUNT, DEFAULT_SIZE),
            Err(VaultError::AlreadyInitialized)
        );
    }

    #[test]
    fn destroy_zeroes_available_memory_and_entries() {
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(2, 64).unwrap();
        let cipher = prepared_cipher(StdPrimitives, &[0x11; 32]);
        let mut plaintext = store.alloc_secret(8).unwrap();
        plaintext.copy_from(b"password", 0).unwrap();
        store.store("test", &cipher, plaintext, None).unwrap();

        store.destroy();
        assert_eq!(store.available_memory(), 0);
        assert_eq!(store.data_size("test"), 0);
    }

    #[test]
    fn store_then_dispense_round_trips() {
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(2, 64).unwrap();
        let mut cipher = prepared_cipher(StdPrimitives, &[0x22; 32]);
        cipher.complete().unwrap();

        let mut plaintext = store.alloc_secret(8).unwrap();
        plaintext.copy_from(b"sekrit!!", 0).unwrap();
        store.store("entry", &cipher, plaintext, Some(8)).unwrap();

        let mut cipher2 = prepared_cipher(StdPrimitives, &[0x22; 32]);
        cipher2.complete().unwrap();
        let mut out = store.alloc_secret(8).unwrap();
        store.dispense("entry", &mut cipher2, &mut out).unwrap();
        assert_eq!(out.as_bytes(), b"sekrit!!");
        assert!(cipher2.is_zeroed());
    }

    #[test]
    fn salted_store_of_identical_plaintext_differs() {
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(4, 64).unwrap();
        let cipher = prepared_cipher(StdPrimitives, &[0x33; 32]);

        let mut p1 = store.alloc_secret(4).unwrap();
        p1.copy_from(b"abcd", 0).unwrap();
        store.store("a", &cipher, p1, Some(32)).unwrap();

        let mut p2 = store.alloc_secret(4).unwrap();
        p2.copy_from(b"abcd", 0).unwrap();
        store.store("b", &cipher, p2, Some(32)).unwrap();

        // Entries live as separate opaque blobs; compare their recovered
        // sizes instead of reaching into private storage.
        assert_eq!(store.data_size("a"), store.data_size("b"));
    }

    #[test]
    fn encrypt_with_mandatory_block_padding_only_is_deterministic() {
        // plaintext.len() == 5 isn't block-aligned; ciphertext.len() == 16
        // is exactly the mandatory AES-CBC block-rounding, not an explicit
        // caller-requested salt. The tail must still be zero, not random.
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(2, 64).unwrap();
        let cipher = prepared_cipher(StdPrimitives, &[0x55; 32]);

        let mut p1 = store.alloc_secret(5).unwrap();
        p1.copy_from(b"abcde", 0).unwrap();
        let mut c1 = store.alloc_secret(16).unwrap();
        store.encrypt(&cipher, &mut p1, &mut c1).unwrap();

        let mut p2 = store.alloc_secret(5).unwrap();
        p2.copy_from(b"abcde", 0).unwrap();
        let mut c2 = store.alloc_secret(16).unwrap();
        store.encrypt(&cipher, &mut p2, &mut c2).unwrap();

        assert_eq!(
            c1.as_bytes(),
            c2.as_bytes(),
            "mandatory block padding alone must not introduce randomness"
        );
    }

    #[test]
    fn encrypt_with_explicit_salt_beyond_block_padding_differs() {
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(2, 64).unwrap();
        let cipher = prepared_cipher(StdPrimitives, &[0x66; 32]);

        let mut p1 = store.alloc_secret(5).unwrap();
        p1.copy_from(b"abcde", 0).unwrap();
        let mut c1 = store.alloc_secret(32).unwrap();
        store.encrypt(&cipher, &mut p1, &mut c1).unwrap();

        let mut p2 = store.alloc_secret(5).unwrap();
        p2.copy_from(b"abcde", 0).unwrap();
        let mut c2 = store.alloc_secret(32).unwrap();
        store.encrypt(&cipher, &mut p2, &mut c2).unwrap();

        assert_ne!(
            c1.as_bytes(),
            c2.as_bytes(),
            "length beyond mandatory block padding is caller-requested salt and must randomize"
        );
    }

    #[test]
    fn dispense_missing_entry_fails() {
        let mut store = SecureStore::new(StdPrimitives);
        store.initialize(2, 64).unwrap();
        let mut cipher = prepared_cipher(StdPrimitives, &[0x44; 32]);
        let mut out = store.alloc_secret(8).unwrap();
        assert_eq!(
            store.dispense("missing", &mut cipher, &mut out),
            Err(VaultError::DataNotFound)
        );
    }

    #[test]
    fn operations_before_initialize_fail() {
        let mut store = SecureStore::<StdPrimitives>::new(StdPrimitives);
        assert_eq!(store.destroy_entry("x"), Err(VaultError::NotInitialized));
    }
}
