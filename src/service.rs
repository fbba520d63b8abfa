//! Signing service
//!
//! Single entry point for callers. Two operations:
//! - [`SigningService::generate_keypair`] enrolls (or rotates) the device key
//!   for a relying party and returns its public key
//! - [`SigningService::sign`] signs the canonical challenge with an existing
//!   key; it never enrolls on its own
//!
//! Arguments are validated before the store is touched. Every failure leaves
//! as a [`SignerError`] with a readable cause; keys and capabilities never do.
//! Both results are standard base64 without line wrapping.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use log::{debug, info, warn};

use crate::challenge::ChallengeMessage;
use crate::error::{LifecycleError, SignerError, StoreError};
use crate::gate::HandleGate;
use crate::identifier::IdentifierDeriver;
use crate::keystore::SecureKeyStore;
use crate::lifecycle::KeyLifecycleManager;

/// Device-bound challenge signer
pub struct SigningService {
    store: Arc<dyn SecureKeyStore>,
    lifecycle: KeyLifecycleManager,
    deriver: IdentifierDeriver,
    gate: HandleGate,
}

impl SigningService {
    /// Service over `store` using the default namespace
    pub fn new(store: Arc<dyn SecureKeyStore>) -> Self {
        Self::with_deriver(store, IdentifierDeriver::default())
    }

    pub fn with_deriver(store: Arc<dyn SecureKeyStore>, deriver: IdentifierDeriver) -> Self {
        Self {
            lifecycle: KeyLifecycleManager::new(Arc::clone(&store)),
            store,
            deriver,
            gate: HandleGate::new(),
        }
    }

    pub fn deriver(&self) -> &IdentifierDeriver {
        &self.deriver
    }

    /// Enroll a fresh key for `rp_id` (or `rp_id` + `key_id`) and return the
    /// base64 DER public key
    ///
    /// Any earlier key under the same handle is destroyed.
    pub fn generate_keypair(&self, rp_id: &str, key_id: Option<&str>) -> Result<String, SignerError> {
        require(&[("rp_id", rp_id)])?;
        let handle = self.deriver.derive_handle(rp_id, key_id)?;

        let public_key = self
            .gate
            .run(handle.storage_name(), || self.lifecycle.enroll(&handle))
            .map_err(|e| {
                warn!("Key generation failed for {}: {}", handle.storage_name(), e);
                SignerError::KeygenFailed(e.to_string())
            })?;

        info!("Generated device key for rp {}", handle.scope());
        Ok(BASE64.encode(public_key))
    }

    /// Sign `nonce|device_id|rp_id|otp` with the enrolled key and return the
    /// base64 DER signature
    pub fn sign(
        &self,
        rp_id: &str,
        nonce: &str,
        device_id: &str,
        otp: &str,
        key_id: Option<&str>,
    ) -> Result<String, SignerError> {
        require(&[
            ("rp_id", rp_id),
            ("nonce", nonce),
            ("device_id", device_id),
            ("otp", otp),
        ])?;
        let handle = self.deriver.derive_handle(rp_id, key_id)?;

        let signature = self.gate.run(handle.storage_name(), || -> Result<_, SignerError> {
            let key = self.lifecycle.resolve(&handle).map_err(|e| match e {
                LifecycleError::KeyNotFound(name) => SignerError::KeyMissing(format!("{name}; enroll first")),
                other => SignerError::SignFailed(other.to_string()),
            })?;

            let message = ChallengeMessage::new(nonce, device_id, rp_id, otp).canonical_bytes();

            self.store
                .sign(key.key_ref(), &message)
                .map_err(|e| match e {
                    StoreError::KeyNotFound(name) => SignerError::KeyMissing(format!("{name} removed before signing")),
                    other => SignerError::SignFailed(other.to_string()),
                })
        });

        match signature {
            Ok(signature) => {
                debug!("Signed challenge for {}", handle.storage_name());
                Ok(BASE64.encode(signature))
            }
            Err(e) => {
                warn!("Signing failed for {}: {}", handle.storage_name(), e);
                Err(e)
            }
        }
    }
}

/// Reject missing or whitespace-only required fields, naming all of them
fn require(fields: &[(&str, &str)]) -> Result<(), SignerError> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SignerError::InvalidArguments(format!(
            "{} required",
            missing.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::SystemRng;
    use crate::keystore::SoftwareKeyStore;
    use p256::ecdsa::signature::Verifier;
    use p256::ecdsa::{Signature, VerifyingKey};
    use p256::pkcs8::DecodePublicKey;

    fn service() -> SigningService {
        SigningService::new(Arc::new(SoftwareKeyStore::new(SystemRng::new().unwrap())))
    }

    fn verifies(public_key_b64: &str, message: &[u8], signature_b64: &str) -> bool {
        let public_key = BASE64.decode(public_key_b64).unwrap();
        let signature = BASE64.decode(signature_b64).unwrap();
        let key = VerifyingKey::from_public_key_der(&public_key).unwrap();
        let signature = Signature::from_der(&signature).unwrap();
        key.verify(message, &signature).is_ok()
    }

    #[test]
    fn test_generate_then_sign_verifies() {
        let service = service();
        let public_key = service.generate_keypair("example.com", None).unwrap();
        let signature = service
            .sign("example.com", "abc123", "dev-1", "445566", None)
            .unwrap();
        assert!(verifies(
            &public_key,
            b"abc123|dev-1|example.com|445566",
            &signature
        ));
        assert!(!verifies(
            &public_key,
            b"abc123|dev-1|example.com|445567",
            &signature
        ));
    }

    #[test]
    fn test_sign_without_enrollment_is_key_missing() {
        let err = service()
            .sign("example.com", "n", "d", "o", None)
            .unwrap_err();
        assert!(matches!(err, SignerError::KeyMissing(_)));
    }

    #[test]
    fn test_blank_arguments_listed() {
        let err = service().sign(" ", "n", "", "o", None).unwrap_err();
        match err {
            SignerError::InvalidArguments(msg) => assert_eq!(msg, "rp_id, device_id required"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            service().generate_keypair("", None),
            Err(SignerError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_key_id_selects_separate_key() {
        let service = service();
        let main = service.generate_keypair("example.com", None).unwrap();
        let sub = service.generate_keypair("example.com", Some("device-7")).unwrap();
        assert_ne!(main, sub);

        let signature = service
            .sign("example.com", "n", "d", "o", Some("device-7"))
            .unwrap();
        assert!(verifies(&sub, b"n|d|example.com|o", &signature));
        assert!(!verifies(&main, b"n|d|example.com|o", &signature));
    }

    #[test]
    fn test_keygen_failure_carries_cause() {
        let store = SoftwareKeyStore::with_quota(SystemRng::new().unwrap(), Some(1));
        let service = SigningService::new(Arc::new(store));
        service.generate_keypair("a.example", None).unwrap();

        match service.generate_keypair("b.example", None).unwrap_err() {
            SignerError::KeygenFailed(cause) => assert!(cause.contains("quota")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_require() {
        assert!(require(&[("a", "x"), ("b", "y")]).is_ok());
        assert!(require(&[("a", "\t")]).is_err());
    }
}
