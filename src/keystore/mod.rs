//! Secure key store capability
//!
//! The signing core never touches private key material. It talks to a
//! platform key store through [`SecureKeyStore`]: generate-or-replace, look
//! up, sign. Each platform backend (Android Keystore, Secure Enclave, TPM)
//! is an adapter implementing this trait inside this crate;
//! [`software::SoftwareKeyStore`] is the in-process adapter used on hosts
//! without such hardware and in tests. Code outside the crate may wrap an
//! adapter but cannot mint a [`KeyRef`] of its own.
//!
//! # Contract
//!
//! - Keys are P-256, signatures are ECDSA over SHA-256
//! - Public keys are returned as DER `SubjectPublicKeyInfo`
//! - Signatures are returned as DER `ECDSA-Sig-Value`
//! - Each operation is atomic; no partial state is observable
//! - Private keys are non-exportable; a [`KeyRef`] is the only way to use one

pub mod software;

use std::fmt;

use crate::error::StoreError;

pub use software::SoftwareKeyStore;

/// Encoded public key (DER `SubjectPublicKeyInfo`)
pub type PublicKeyBytes = Vec<u8>;

/// Encoded signature (DER `ECDSA-Sig-Value`)
pub type SignatureBytes = Vec<u8>;

/// Capability to use one stored private key
///
/// Holds the storage name and the store-assigned generation of the key, never
/// key bytes. It is deliberately neither `Clone` nor `Serialize`, and a
/// rotation makes every previously issued `KeyRef` for that name useless.
///
/// Only store adapters in this crate can mint one:
///
/// ```compile_fail
/// let forged = enclavesign::KeyRef::new("zt_device_crypto.bank.example", 1);
/// ```
pub struct KeyRef {
    storage_name: String,
    generation: u64,
}

impl KeyRef {
    /// Mint a capability for the key stored under `storage_name`
    pub(crate) fn new(storage_name: impl Into<String>, generation: u64) -> Self {
        Self {
            storage_name: storage_name.into(),
            generation,
        }
    }

    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Debug for KeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyRef").field(&self.storage_name).finish()
    }
}

/// A key found by [`SecureKeyStore::lookup`]
#[derive(Debug)]
pub struct KeyEntry {
    pub public_key: PublicKeyBytes,
    pub key_ref: KeyRef,
}

/// Hardware-backed key storage, addressed by storage name
pub trait SecureKeyStore: Send + Sync {
    /// Delete any key under `storage_name`, create a fresh one, return its public key
    fn generate_or_replace(&self, storage_name: &str) -> Result<PublicKeyBytes, StoreError>;

    /// Find the key under `storage_name`; absence is `Ok(None)`
    fn lookup(&self, storage_name: &str) -> Result<Option<KeyEntry>, StoreError>;

    /// Sign `message` (hashed with SHA-256 inside the store)
    ///
    /// Fails with [`StoreError::KeyNotFound`] when the key is gone or the
    /// capability predates a rotation.
    fn sign(&self, key: &KeyRef, message: &[u8]) -> Result<SignatureBytes, StoreError>;
}
