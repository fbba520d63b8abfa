//! In-process P-256 key store
//!
//! Stands in for a hardware keystore on hosts that have none. Private keys
//! live only inside this struct, are never returned, and are zeroized when
//! replaced or dropped. Nothing is persisted: keys die with the process.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use log::debug;
use p256::ecdsa::signature::Signer;
use p256::ecdsa::{Signature, SigningKey};
use p256::pkcs8::EncodePublicKey;
use zeroize::ZeroizeOnDrop;

use super::{KeyEntry, KeyRef, PublicKeyBytes, SecureKeyStore, SignatureBytes};
use crate::entropy::SystemRng;
use crate::error::StoreError;

/// Wrapper for the signing key that guarantees zeroization
#[derive(ZeroizeOnDrop)]
struct SealedKey {
    #[zeroize(skip)] // p256::ecdsa::SigningKey zeroizes its scalar on drop
    inner: SigningKey,
}

struct Slot {
    key: SealedKey,
    public_key: PublicKeyBytes,
    generation: u64,
}

#[derive(Default)]
struct Slots {
    by_name: HashMap<String, Slot>,
    next_generation: u64,
}

/// Software adapter for [`SecureKeyStore`]
pub struct SoftwareKeyStore {
    slots: Mutex<Slots>,
    rng: SystemRng,
    max_keys: Option<usize>,
}

impl SoftwareKeyStore {
    /// Unbounded store
    pub fn new(rng: SystemRng) -> Self {
        Self::with_quota(rng, None)
    }

    /// Store that refuses to create more than `max_keys` distinct names
    pub fn with_quota(rng: SystemRng, max_keys: Option<usize>) -> Self {
        Self {
            slots: Mutex::new(Slots::default()),
            rng,
            max_keys,
        }
    }

    /// Number of stored keys
    ///
    /// Counting is read-only, so a poisoned lock is read through rather than
    /// reported as an empty store.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots>, StoreError> {
        self.slots
            .lock()
            .map_err(|_| StoreError::Backend("key store lock poisoned".into()))
    }
}

impl SecureKeyStore for SoftwareKeyStore {
    fn generate_or_replace(&self, storage_name: &str) -> Result<PublicKeyBytes, StoreError> {
        let mut slots = self.lock()?;

        let replacing = slots.by_name.contains_key(storage_name);
        if let Some(limit) = self.max_keys {
            if !replacing && slots.by_name.len() >= limit {
                return Err(StoreError::QuotaExceeded { limit });
            }
        }

        let key = SigningKey::random(&mut &self.rng);
        let public_key = key
            .verifying_key()
            .to_public_key_der()
            .map_err(|e| StoreError::Backend(format!("public key encoding failed: {e}")))?
            .as_bytes()
            .to_vec();

        slots.next_generation += 1;
        let generation = slots.next_generation;

        // The displaced slot (if any) is dropped here, zeroizing the old key
        slots.by_name.insert(
            storage_name.to_owned(),
            Slot {
                key: SealedKey { inner: key },
                public_key: public_key.clone(),
                generation,
            },
        );

        debug!(
            "{} key {} (generation {})",
            if replacing { "Replaced" } else { "Created" },
            storage_name,
            generation
        );

        Ok(public_key)
    }

    fn lookup(&self, storage_name: &str) -> Result<Option<KeyEntry>, StoreError> {
        let slots = self.lock()?;
        Ok(slots.by_name.get(storage_name).map(|slot| KeyEntry {
            public_key: slot.public_key.clone(),
            key_ref: KeyRef::new(storage_name, slot.generation),
        }))
    }

    fn sign(&self, key: &KeyRef, message: &[u8]) -> Result<SignatureBytes, StoreError> {
        let slots = self.lock()?;
        let slot = slots
            .by_name
            .get(key.storage_name())
            .filter(|slot| slot.generation == key.generation())
            .ok_or_else(|| StoreError::KeyNotFound(key.storage_name().to_owned()))?;

        let signature: Signature = slot
            .key
            .inner
            .try_sign(message)
            .map_err(|e| StoreError::Backend(format!("ECDSA signing failed: {e}")))?;

        Ok(signature.to_der().as_bytes().to_vec())
    }
}
