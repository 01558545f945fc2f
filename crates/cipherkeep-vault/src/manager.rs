//! `PasswordManager` — the façade tying the secure store, the
//! character-at-a-time strong-secret entry buffer, and password
//! generation/display formatting into one owning object.
//!
//! The manager exclusively owns one [`SecureStore`]; callers never reach
//! the store directly, matching the original `PasswordManager`'s
//! composition (`store` is a private member, not a base class).

use crate::error::VaultError;
use crate::password;
use crate::separators::add_separators;
use crate::store::SecureStore;
use cipherkeep_core::cipher::Cipher;
use cipherkeep_core::primitives::CryptoPrimitives;
use cipherkeep_core::recipe::Recipe;
use cipherkeep_core::secret_bytes::SecretBytes;
use zeroize::Zeroize;

/// Orchestrates the secure store, strong-secret entry, and password
/// derivation behind one owning façade.
pub struct PasswordManager<P: CryptoPrimitives + Clone> {
    store: SecureStore<P>,
    pending_entry: Option<SecretBytes<'static>>,
    pending_len: usize,
}

impl<P: CryptoPrimitives + Clone> PasswordManager<P> {
    /// A manager with no pool allocated yet — call [`Self::initialize`]
    /// before any other operation.
    #[must_use]
    pub fn new(primitives: P) -> Self {
        Self {
            store: SecureStore::new(primitives),
            pending_entry: None,
            pending_len: 0,
        }
    }

    /// Allocate the backing pool for `count` named entries of up to
    /// `length` bytes each, plus one slot for the in-progress strong
    /// secret entry buffer.
    ///
    /// # Errors
    /// Propagates [`SecureStore::initialize`] errors.
    pub fn initialize(&mut self, count: usize, length: usize) -> Result<(), VaultError> {
        self.store.initialize(count.saturating_add(1), length)
    }

    /// Destroy then re-initialize with new dimensions.
    ///
    /// # Errors
    /// Propagates [`SecureStore::initialize`] errors.
    pub fn reset(&mut self, count: usize, length: usize) -> Result<(), VaultError> {
        self.destroy();
        self.initialize(count, length)
    }

    /// Discard any in-progress strong-secret entry and release the store.
    pub fn destroy(&mut self) {
        if let Some(buf) = self.pending_entry.take() {
            let _ = buf.destroy();
        }
        self.pending_len = 0;
        self.store.destroy();
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    /// Greatest number of stored bytes an entry can hold (the store's
    /// configured per-entry block size).
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.store.max_entry_size()
    }

    /// Smallest meaningful password/secret length this manager accepts
    /// (the hash primitive's digest size).
    #[must_use]
    pub fn min_length(&self) -> usize {
        self.store.primitives().hash_size()
    }

    /// The cipher's block size, in bytes (`BlockLength` in the original
    /// façade — a separate figure from [`Self::max_length`], which is the
    /// store's configured per-entry capacity).
    #[must_use]
    pub fn block_length(&self) -> usize {
        self.store.primitives().block_size()
    }

    #[must_use]
    pub fn data_size(&self, name: &str) -> usize {
        self.store.data_size(name)
    }

    #[must_use]
    pub fn exposure_count(&self) -> i64 {
        self.store.exposure_count()
    }

    /// Store `plaintext` under `name`, encrypted under `cipher`'s key.
    ///
    /// # Errors
    /// Propagates [`SecureStore::store`] errors.
    pub fn store_secret(
        &mut self,
        name: &str,
        cipher: &Cipher<P>,
        plaintext: SecretBytes<'_>,
    ) -> Result<(), VaultError> {
        self.store.store(name, cipher, plaintext, None)
    }

    /// Decrypt the named entry into `out_plaintext`, destroying the entry
    /// and zeroing `cipher`.
    ///
    /// # Errors
    /// Propagates [`SecureStore::dispense`] errors.
    pub fn dispense_secret(
        &mut self,
        name: &str,
        cipher: &mut Cipher<P>,
        out_plaintext: &mut SecretBytes<'_>,
    ) -> Result<(), VaultError> {
        self.store.dispense(name, cipher, out_plaintext)
    }

    /// Zero and free the named entry without decrypting it.
    ///
    /// # Errors
    /// Propagates [`SecureStore::destroy_entry`] errors.
    pub fn destroy_entry(&mut self, name: &str) -> Result<(), VaultError> {
        self.store.destroy_entry(name)
    }

    // --- Character-at-a-time strong-secret entry ---------------------

    /// Begin a new strong-secret entry of at most `len` characters.
    ///
    /// # Errors
    /// Returns [`VaultError::StrongPasswordEntryAlreadyStarted`] if an
    /// entry is already in progress, or a core allocation error.
    pub fn strong_password_start(&mut self, len: usize) -> Result<(), VaultError> {
        if self.pending_entry.is_some() {
            return Err(VaultError::StrongPasswordEntryAlreadyStarted);
        }
        if len == 0 {
            return Err(cipherkeep_core::CoreError::SizeIsZero.into());
        }
        let buf = self.store.alloc_secret(len)?;
        self.pending_entry = Some(buf);
        self.pending_len = 0;
        Ok(())
    }

    /// Append one character to the in-progress entry. `'\u{8}'`
    /// (backspace) erases the last character instead.
    ///
    /// # Errors
    /// Returns [`VaultError::StrongPasswordEntryNotStarted`] if no entry
    /// is in progress, or [`VaultError::StrongPasswordEntryFull`] if the
    /// buffer's capacity (set by [`Self::strong_password_start`]) is
    /// already used.
    pub fn strong_password_put(&mut self, ch: u8) -> Result<(), VaultError> {
        let buf = self
            .pending_entry
            .as_mut()
            .ok_or(VaultError::StrongPasswordEntryNotStarted)?;

        const BACKSPACE: u8 = 0x08;
        if ch == BACKSPACE {
            if self.pending_len > 0 {
                self.pending_len -= 1;
                buf.as_bytes_mut()[self.pending_len] = 0;
            }
            return Ok(());
        }

        if self.pending_len >= buf.len() {
            return Err(VaultError::StrongPasswordEntryFull);
        }
        buf.as_bytes_mut()[self.pending_len] = ch;
        self.pending_len += 1;
        Ok(())
    }

    /// Store the in-progress entry as a strong secret under `name`,
    /// encrypted under `cipher`'s key, then release the scratch buffer.
    ///
    /// # Errors
    /// Returns [`VaultError::StrongPasswordEntryNotStarted`] if no entry
    /// is in progress or nothing has been typed yet.
    pub fn strong_password_finish(
        &mut self,
        name: &str,
        cipher: &Cipher<P>,
    ) -> Result<(), VaultError> {
        let buf = self
            .pending_entry
            .take()
            .ok_or(VaultError::StrongPasswordEntryNotStarted)?;
        let len = self.pending_len;
        self.pending_len = 0;

        if len == 0 {
            let _ = buf.destroy();
            return Err(VaultError::StrongPasswordEntryNotStarted);
        }

        let mut scratch = self.store.alloc_secret(len)?;
        scratch.copy_from(&buf.as_bytes()[..len], 0)?;
        buf.destroy()?;
        self.store.store(name, cipher, scratch, None)
    }

    /// Discard the in-progress entry without storing it.
    ///
    /// # Errors
    /// Propagates a core zeroing/free error (should not occur in correct
    /// usage).
    pub fn strong_password_abort(&mut self) -> Result<(), VaultError> {
        self.pending_len = 0;
        match self.pending_entry.take() {
            Some(buf) => buf.destroy().map_err(VaultError::Core),
            None => Ok(()),
        }
    }

    // --- Password generation ------------------------------------------

    /// Derive a `length`-byte password from the strong secret stored under
    /// `name` and `mnemonic`, filtered through `recipe`. The strong secret
    /// is immediately re-encrypted under a freshly prepared key before the
    /// password is derived, so no stale key ever protects it at rest.
    ///
    /// # Errors
    /// Returns [`VaultError::NoStrongPasswordStored`] if `name` holds no
    /// entry, [`VaultError::PasswordExceedsSupportedLength`] if `length` is
    /// zero or exceeds [`Self::max_length`], or propagates store/cipher/
    /// generation errors.
    pub fn generate_password(
        &mut self,
        name: &str,
        mnemonic: &[u8],
        cipher: &mut Cipher<P>,
        length: usize,
        recipe: &Recipe,
    ) -> Result<SecretBytes<'static>, VaultError> {
        let secret_len = self.store.data_size(name);
        if secret_len == 0 {
            return Err(VaultError::NoStrongPasswordStored);
        }
        if length == 0 || length > self.max_length() {
            return Err(VaultError::PasswordExceedsSupportedLength);
        }

        let mut secret = self.store.alloc_secret(secret_len)?;
        self.store.dispense(name, cipher, &mut secret)?;

        let mut mnemonic_bytes = password::strong_mnemonic(secret.as_bytes(), mnemonic);

        // Restore: rotate to a freshly prepared key and re-store the
        // secret under its original name before deriving the password.
        let restore_result = self.restore_secret(name, cipher, secret_len, secret.as_bytes());
        secret.destroy()?;
        restore_result?;

        let derived = password::generate(self.store.primitives(), &mnemonic_bytes, length, recipe);
        mnemonic_bytes.zeroize();
        let derived = derived?;

        let mut out = self.store.alloc_secret(length)?;
        out.copy_from(&derived, 0)?;
        self.store.increase_exposure();
        Ok(out)
    }

    fn restore_secret(
        &mut self,
        name: &str,
        cipher: &mut Cipher<P>,
        secret_len: usize,
        secret_bytes: &[u8],
    ) -> Result<(), VaultError> {
        cipher.prepare()?;
        let mut restore_copy = self.store.alloc_secret(secret_len)?;
        restore_copy.copy_from(secret_bytes, 0)?;
        self.store.store(name, cipher, restore_copy, None)?;
        // Dispense above increased exposure for the secret we just read back
        // out; offset that now that it's safely re-stored under the new key.
        self.store.decrease_exposure();
        Ok(())
    }

    /// Split `password` into separator-delimited blocks for display,
    /// wrapping to a new line whenever the next block would exceed
    /// `width` characters on the current line (`width == 0` = no limit).
    #[must_use]
    pub fn format_with_separators(password: &[u8], separator: u8, width: usize) -> Vec<u8> {
        add_separators(password, separator, width)
    }

    /// Zero and free a password previously returned by
    /// [`Self::generate_password`], decrementing the exposure count.
    ///
    /// # Errors
    /// Propagates a core zeroing/free error.
    pub fn destroy_password(&mut self, password: SecretBytes<'_>) -> Result<(), VaultError> {
        password.destroy()?;
        self.store.decrease_exposure();
        Ok(())
    }

    /// Transfer ownership of an exposed password to `target` without
    /// zeroing it, decrementing the exposure count (the caller now owns
    /// the one remaining plaintext copy).
    pub fn release_password(&mut self, password: &mut SecretBytes<'_>, target: &mut SecretBytes<'_>) {
        password.move_to(target);
        self.store.decrease_exposure();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipherkeep_core::primitives::StdPrimitives;
    use cipherkeep_core::recipe::flags;

    fn alnum_recipe() -> Recipe {
        let mut recipe = Recipe::new();
        recipe.set_specials(b"!@#$%^&*");
        recipe.add_flags(flags::NUMERIC | flags::LOWERCASE | flags::UPPERCASE);
        recipe
    }

    #[test]
    fn strong_password_entry_round_trips_through_store() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();

        manager.strong_password_start(32).unwrap();
        for ch in b"a strong secret value" {
            manager.strong_password_put(*ch).unwrap();
        }
        let mut cipher = Cipher::new(StdPrimitives);
        cipher.prepare().unwrap();
        manager.strong_password_finish("test", &cipher).unwrap();

        assert_eq!(manager.data_size("test"), b"a strong secret value".len());
    }

    #[test]
    fn length_accessors_are_distinct() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        assert_eq!(manager.min_length(), 64);
        assert_eq!(manager.block_length(), 16);
        assert_eq!(manager.max_length(), 128);
    }

    #[test]
    fn starting_twice_fails() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        manager.strong_password_start(8).unwrap();
        assert_eq!(
            manager.strong_password_start(8),
            Err(VaultError::StrongPasswordEntryAlreadyStarted)
        );
    }

    #[test]
    fn backspace_erases_last_character() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        manager.strong_password_start(8).unwrap();
        manager.strong_password_put(b'a').unwrap();
        manager.strong_password_put(b'b').unwrap();
        manager.strong_password_put(0x08).unwrap();
        manager.strong_password_put(b'c').unwrap();

        let mut cipher = Cipher::new(StdPrimitives);
        cipher.prepare().unwrap();
        manager.strong_password_finish("test", &cipher).unwrap();
        assert_eq!(manager.data_size("test"), 2);
    }

    #[test]
    fn put_without_start_fails() {
        let mut manager = PasswordManager::<StdPrimitives>::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        assert_eq!(
            manager.strong_password_put(b'a'),
            Err(VaultError::StrongPasswordEntryNotStarted)
        );
    }

    #[test]
    fn put_past_capacity_fails() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        manager.strong_password_start(2).unwrap();
        manager.strong_password_put(b'a').unwrap();
        manager.strong_password_put(b'b').unwrap();
        assert_eq!(
            manager.strong_password_put(b'c'),
            Err(VaultError::StrongPasswordEntryFull)
        );
    }

    #[test]
    fn abort_discards_pending_entry() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        manager.strong_password_start(8).unwrap();
        manager.strong_password_put(b'x').unwrap();
        manager.strong_password_abort().unwrap();
        assert_eq!(
            manager.strong_password_put(b'y'),
            Err(VaultError::StrongPasswordEntryNotStarted)
        );
    }

    #[test]
    fn generate_password_round_trips_and_rotates_key() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();

        manager.strong_password_start(32).unwrap();
        for ch in b"This is a password. Just a stinkin password." {
            manager.strong_password_put(*ch).unwrap();
        }
        // Buffer is sized 32 but the phrase is longer; re-open with
        // enough room instead.
        manager.strong_password_abort().unwrap();
        manager.strong_password_start(64).unwrap();
        for ch in b"This is a password. Just a stinkin password." {
            manager.strong_password_put(*ch).unwrap();
        }

        let mut cipher = Cipher::new(StdPrimitives);
        cipher.prepare_with_secret(&[0x01u8; 16]).unwrap();
        manager.strong_password_finish("site", &cipher).unwrap();

        let recipe = alnum_recipe();
        let mut cipher2 = Cipher::new(StdPrimitives);
        cipher2.prepare_with_secret(&[0x01u8; 16]).unwrap();
        let password = manager
            .generate_password("site", b"password", &mut cipher2, 8, &recipe)
            .unwrap();
        assert_eq!(password.len(), 8);
        assert!(recipe.verified(password.as_bytes()));

        // The strong secret is still present (re-stored under a fresh key).
        assert_eq!(
            manager.data_size("site"),
            b"This is a password. Just a stinkin password.".len()
        );

        manager.destroy_password(password).unwrap();
    }

    #[test]
    fn generate_password_rejects_length_over_max() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();

        manager.strong_password_start(16).unwrap();
        for ch in b"some strong secret" {
            if manager.strong_password_put(*ch).is_err() {
                break;
            }
        }
        let mut cipher = Cipher::new(StdPrimitives);
        cipher.prepare().unwrap();
        manager.strong_password_finish("site", &cipher).unwrap();

        let recipe = alnum_recipe();
        let mut cipher2 = Cipher::new(StdPrimitives);
        cipher2.prepare().unwrap();
        let too_long = manager.max_length() + 1;
        assert_eq!(
            manager.generate_password("site", b"x", &mut cipher2, too_long, &recipe),
            Err(VaultError::PasswordExceedsSupportedLength)
        );
    }

    #[test]
    fn generate_password_without_stored_secret_fails() {
        let mut manager = PasswordManager::new(StdPrimitives);
        manager.initialize(4, 128).unwrap();
        let mut cipher = Cipher::new(StdPrimitives);
        cipher.prepare().unwrap();
        let recipe = alnum_recipe();
        assert_eq!(
            manager.generate_password("missing", b"x", &mut cipher, 8, &recipe),
            Err(VaultError::NoStrongPasswordStored)
        );
    }
}
