//! Key lifecycle
//!
//! Per handle the lifecycle is `Unenrolled -> Enrolled`, with every further
//! enrollment rotating the key in place. There is no revoked state and no
//! explicit delete; the only deletion is the one inside generate-or-replace.
//!
//! Resolution never creates a key. Signing against an unenrolled handle is
//! the caller's error to fix by enrolling first.

use std::sync::Arc;

use log::debug;

use crate::error::{LifecycleError, StoreError};
use crate::identifier::KeyHandle;
use crate::keystore::{KeyRef, PublicKeyBytes, SecureKeyStore};

/// One enrolled keypair, as seen from outside the store
#[derive(Debug)]
pub struct DeviceKey {
    pub handle: KeyHandle,
    pub public_key: PublicKeyBytes,
    key_ref: KeyRef,
}

impl DeviceKey {
    /// Capability for store operations on this key
    pub fn key_ref(&self) -> &KeyRef {
        &self.key_ref
    }
}

/// Enroll/resolve policy on top of a [`SecureKeyStore`]
pub struct KeyLifecycleManager {
    store: Arc<dyn SecureKeyStore>,
}

impl KeyLifecycleManager {
    pub fn new(store: Arc<dyn SecureKeyStore>) -> Self {
        Self { store }
    }

    /// Generate a fresh keypair for `handle`, destroying any previous one
    pub fn enroll(&self, handle: &KeyHandle) -> Result<PublicKeyBytes, LifecycleError> {
        let public_key = self
            .store
            .generate_or_replace(handle.storage_name())
            .map_err(LifecycleError::EnrollmentFailed)?;

        if public_key.is_empty() {
            return Err(LifecycleError::EnrollmentFailed(StoreError::Backend(
                "store returned an empty public key".into(),
            )));
        }

        debug!("Enrolled device key {}", handle.storage_name());
        Ok(public_key)
    }

    /// Current key for `handle`, or `None` when nothing is enrolled
    pub fn lookup(&self, handle: &KeyHandle) -> Result<Option<DeviceKey>, LifecycleError> {
        let entry = self
            .store
            .lookup(handle.storage_name())
            .map_err(LifecycleError::Lookup)?;

        Ok(entry.map(|entry| DeviceKey {
            handle: handle.clone(),
            public_key: entry.public_key,
            key_ref: entry.key_ref,
        }))
    }

    /// Current key for `handle`; absence is [`LifecycleError::KeyNotFound`]
    pub fn resolve(&self, handle: &KeyHandle) -> Result<DeviceKey, LifecycleError> {
        self.lookup(handle)?
            .ok_or_else(|| LifecycleError::KeyNotFound(handle.storage_name().to_owned()))
    }
}
