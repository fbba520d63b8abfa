//! Signer configuration

use serde::Deserialize;

use crate::error::ConfigError;
use crate::identifier::{IdentifierDeriver, DEFAULT_NAMESPACE};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Namespace tag prepended to every storage name
    pub namespace: String,

    /// Cap on distinct keys held by the software store (`None` = unbounded)
    pub max_keys: Option<usize>,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
            max_keys: None,
        }
    }
}

impl SignerConfig {
    /// Check the config and build the deriver for its namespace
    pub fn validate(&self) -> Result<IdentifierDeriver, ConfigError> {
        if self.max_keys == Some(0) {
            return Err(ConfigError::ZeroQuota);
        }
        IdentifierDeriver::new(self.namespace.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SignerConfig::default();
        assert_eq!(config.namespace, "zt_device_crypto");
        assert!(config.max_keys.is_none());
        let deriver = config.validate().unwrap();
        assert_eq!(deriver.namespace(), "zt_device_crypto");
    }

    #[test]
    fn test_rejects_bad_namespace() {
        let config = SignerConfig {
            namespace: "keys/device".into(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidNamespace(_))));
    }

    #[test]
    fn test_rejects_zero_quota() {
        let config = SignerConfig {
            max_keys: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroQuota)));
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let config: SignerConfig = serde_json::from_str(r#"{"max_keys": 16}"#).unwrap();
        assert_eq!(config.namespace, "zt_device_crypto");
        assert_eq!(config.max_keys, Some(16));

        let config: SignerConfig = serde_json::from_str(r#"{"namespace": "acme-keys"}"#).unwrap();
        assert_eq!(config.validate().unwrap().namespace(), "acme-keys");
        assert!(config.max_keys.is_none());
    }
}
