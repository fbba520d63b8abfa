//! Error taxonomy
//!
//! Three layers, each wrapping the one below it:
//! - [`StoreError`] is what a [`crate::keystore::SecureKeyStore`] adapter reports
//! - [`LifecycleError`] is what enrollment and key resolution report
//! - [`SignerError`] is the only error that leaves the signing service
//!
//! Every [`SignerError`] maps onto one caller-facing [`ErrorCode`].

use serde::Serialize;
use thiserror::Error;

/// Failures reported by a secure key store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// No key exists under the storage name (or the capability is stale)
    #[error("no key stored under {0}")]
    KeyNotFound(String),

    /// The security hardware (or its software stand-in) cannot be used
    #[error("secure key hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// The store refuses to hold more keys
    #[error("key quota exceeded ({limit} keys)")]
    QuotaExceeded { limit: usize },

    /// The requested curve or digest is not supported by the backend
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Any other backend failure
    #[error("key store failure: {0}")]
    Backend(String),
}

/// Failures from the key lifecycle layer
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Generate-or-replace failed in the store
    #[error("enrollment failed: {0}")]
    EnrollmentFailed(#[source] StoreError),

    /// Nothing is enrolled for the handle
    #[error("no device key enrolled under {0}")]
    KeyNotFound(String),

    /// The store failed while looking a key up
    #[error("key lookup failed: {0}")]
    Lookup(#[source] StoreError),
}

/// Failures surfaced by [`crate::service::SigningService`]
///
/// Each variant carries a human-readable cause; nothing else crosses the
/// service boundary.
#[derive(Debug, Error)]
pub enum SignerError {
    /// Missing or blank required arguments; detected before any storage access
    #[error("{0}")]
    InvalidArguments(String),

    /// A key handle could not be derived from the supplied identifiers
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Sign was attempted before enrollment
    #[error("device key not found: {0}")]
    KeyMissing(String),

    /// Key generation failed in the store
    #[error("{0}")]
    KeygenFailed(String),

    /// Signing failed after the key was confirmed present
    #[error("{0}")]
    SignFailed(String),
}

impl SignerError {
    /// Caller-facing code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArguments(_) | Self::InvalidIdentifier(_) => ErrorCode::BadArgs,
            Self::KeyMissing(_) => ErrorCode::KeyMissing,
            Self::KeygenFailed(_) => ErrorCode::KeygenFailed,
            Self::SignFailed(_) => ErrorCode::SignFailed,
        }
    }
}

/// Machine-readable error kinds returned to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadArgs,
    KeygenFailed,
    KeyMissing,
    SignFailed,
    NotImplemented,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BadArgs => "bad_args",
            Self::KeygenFailed => "keygen_failed",
            Self::KeyMissing => "key_missing",
            Self::SignFailed => "sign_failed",
            Self::NotImplemented => "not_implemented",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rejected configuration values
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("namespace {0:?} must be non-empty and use only [A-Za-z0-9._-]")]
    InvalidNamespace(String),

    #[error("max_keys must be at least 1")]
    ZeroQuota,
}
