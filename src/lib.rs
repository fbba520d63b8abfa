//! enclavesign - device-bound challenge signing
//!
//! Each installed client holds one non-exportable P-256 key per relying
//! party, kept in a hardware-backed key store. A login challenge is signed as:
//! 1. Derive the key's storage name from the relying-party id (and key id)
//! 2. Resolve the enrolled key; never create one implicitly
//! 3. Build the canonical message `nonce|device_id|rp_id|otp`
//! 4. Sign it inside the store (ECDSA P-256 / SHA-256, DER)
//! 5. Return the signature as base64
//!
//! Enrollment destroys any previous key for the same handle. Enroll and sign
//! on the same handle are serialized; different handles run in parallel.

pub mod challenge;
pub mod config;
pub mod dispatcher;
pub mod entropy;
pub mod error;
pub mod gate;
pub mod identifier;
pub mod keystore;
pub mod lifecycle;
pub mod service;

pub use challenge::{canonicalize, ChallengeMessage};
pub use config::SignerConfig;
pub use dispatcher::{Dispatcher, MethodCall, MethodResponse};
pub use error::{ErrorCode, SignerError, StoreError};
pub use identifier::{IdentifierDeriver, KeyHandle};
pub use keystore::{KeyRef, SecureKeyStore, SoftwareKeyStore};
pub use service::SigningService;
