//! Crypto primitives adapter: AES-256-CBC + SHA-512 behind a pluggable
//! trait. `StdPrimitives` is the one concrete, fully implemented backend
//! this crate ships.

use crate::error::CoreError;
use aes::Aes256;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;
/// SHA-512 digest size in bytes.
pub const HASH_SIZE: usize = 64;
/// AES-256 key size in bytes.
pub const KEY_SIZE: usize = 32;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Capability set a concrete crypto backend must provide.
///
/// This collapses the original source's layered `Cryptography -> OS`
/// inheritance chain into a single trait implemented by one backend.
pub trait CryptoPrimitives {
    /// Fill `buf` with cryptographically strong random bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::SecureMemory`] if the platform RNG is unavailable.
    fn randomize(&self, buf: &mut [u8]) -> Result<(), CoreError>;

    /// Block size in bytes (16 for AES).
    fn block_size(&self) -> usize;
    /// Hash output size in bytes (64 for SHA-512).
    fn hash_size(&self) -> usize;
    /// Symmetric key size in bytes (32 for AES-256).
    fn key_size(&self) -> usize;

    /// Hash `data` into `out`, chaining SHA-512 blocks to fill any length.
    ///
    /// # Errors
    /// This backend's hash never fails; the signature stays fallible to
    /// keep the trait backend-agnostic.
    fn hash(&self, data: &[u8], out: &mut [u8]) -> Result<(), CoreError>;

    /// AES-256-CBC encrypt. `plaintext.len()` must be a multiple of
    /// [`Self::block_size`]; `ciphertext.len()` must be at least that long.
    ///
    /// # Errors
    /// Returns [`CoreError::Primitive`] on a non-block-multiple plaintext
    /// length or an undersized ciphertext buffer.
    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> Result<(), CoreError>;

    /// AES-256-CBC decrypt, the inverse of [`Self::encrypt`].
    ///
    /// # Errors
    /// Returns [`CoreError::Primitive`] on malformed input lengths.
    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> Result<(), CoreError>;
}

/// The reference backend: AES-256-CBC via `aes`/`cbc`, SHA-512 via `sha2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdPrimitives;

impl StdPrimitives {
    /// Derive a 32-byte AES key from a secret of any length.
    ///
    /// Secrets already exactly [`KEY_SIZE`] bytes are imported directly.
    /// Any other length is hashed once and the leading 32 bytes of the
    /// 64-byte digest are used — the reference behavior for a mismatched
    /// secret length is unspecified upstream, so this is a documented
    /// choice rather than an attempt to reproduce unknown platform
    /// padding/hashing behavior.
    #[must_use]
    pub fn derive_key(&self, secret: &[u8]) -> [u8; KEY_SIZE] {
        if secret.len() == KEY_SIZE {
            let mut key = [0u8; KEY_SIZE];
            key.copy_from_slice(secret);
            return key;
        }
        let digest = Sha512::digest(secret);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest[..KEY_SIZE]);
        key
    }
}

impl CryptoPrimitives for StdPrimitives {
    fn randomize(&self, buf: &mut [u8]) -> Result<(), CoreError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|_| CoreError::SecureMemory("CSPRNG fill failed"))
    }

    fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    fn hash_size(&self) -> usize {
        HASH_SIZE
    }

    fn key_size(&self) -> usize {
        KEY_SIZE
    }

    fn hash(&self, data: &[u8], out: &mut [u8]) -> Result<(), CoreError> {
        if out.len() <= HASH_SIZE {
            let digest = Sha512::digest(data);
            out.copy_from_slice(&digest[..out.len()]);
            return Ok(());
        }

        // Chain: out[0..64] = H(data); out[k..k+64] = H(out[k-64..k]).
        let first = Sha512::digest(data);
        out[..HASH_SIZE].copy_from_slice(&first);
        let mut filled = HASH_SIZE;
        while filled < out.len() {
            let remaining = out.len() - filled;
            let prev_block_start = filled - HASH_SIZE;
            let digest = Sha512::digest(&out[prev_block_start..filled]);
            let take = remaining.min(HASH_SIZE);
            out[filled..filled + take].copy_from_slice(&digest[..take]);
            filled += take;
        }
        Ok(())
    }

    fn encrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        plaintext: &[u8],
        ciphertext: &mut [u8],
    ) -> Result<(), CoreError> {
        if plaintext.len() % BLOCK_SIZE != 0 {
            return Err(CoreError::Primitive(
                "plaintext length must be a multiple of the block size",
            ));
        }
        if ciphertext.len() < plaintext.len() {
            return Err(CoreError::Primitive("ciphertext buffer too small"));
        }
        let encryptor = Aes256CbcEnc::new_from_slices(key, iv)
            .map_err(|_| CoreError::Primitive("invalid key or IV length"))?;
        ciphertext[..plaintext.len()].copy_from_slice(plaintext);
        encryptor
            .encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(
                &mut ciphertext[..plaintext.len()],
                plaintext.len(),
            )
            .map_err(|_| CoreError::Primitive("block encryption failed"))?;
        Ok(())
    }

    fn decrypt(
        &self,
        key: &[u8],
        iv: &[u8],
        ciphertext: &[u8],
        plaintext: &mut [u8],
    ) -> Result<(), CoreError> {
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(CoreError::Primitive(
                "ciphertext length must be a multiple of the block size",
            ));
        }
        if plaintext.len() < ciphertext.len() {
            return Err(CoreError::Primitive("plaintext buffer too small"));
        }
        let decryptor = Aes256CbcDec::new_from_slices(key, iv)
            .map_err(|_| CoreError::Primitive("invalid key or IV length"))?;
        plaintext[..ciphertext.len()].copy_from_slice(ciphertext);
        decryptor
            .decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(
                &mut plaintext[..ciphertext.len()],
            )
            .map_err(|_| CoreError::Primitive("block decryption failed"))?;
        Ok(())
    }
}
