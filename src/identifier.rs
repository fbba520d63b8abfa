//! Key handle derivation
//!
//! Maps a relying-party id (and an optional sub-key id) onto the name a key
//! is stored under. The transform is a one-way sanitizer, not a hash:
//! - every character outside `[A-Za-z0-9._-]` becomes `_`
//! - the result is prefixed with a namespace tag so our entries never share
//!   a name with other key material in the same store
//!
//! Inputs that differ only in replaced characters (`a/b` and `a_b`) map to the
//! same name. A non-empty sub id takes the place of the relying party in the
//! name, so a sub id equal to some other relying party's id also collides.

use crate::error::{ConfigError, SignerError};

/// Namespace tag prepended to every storage name
pub const DEFAULT_NAMESPACE: &str = "zt_device_crypto";

/// Replacement for characters outside the storage-safe set
pub const PLACEHOLDER: char = '_';

const SEPARATOR: char = '.';

/// Whether `c` may appear verbatim in a storage name
pub fn is_storage_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')
}

/// Address of one key entry in the secure store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyHandle {
    scope: String,
    sub_id: Option<String>,
    storage_name: String,
}

impl KeyHandle {
    /// Relying-party id the key is scoped to
    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn sub_id(&self) -> Option<&str> {
        self.sub_id.as_deref()
    }

    /// Sanitized, namespaced name used inside the store
    pub fn storage_name(&self) -> &str {
        &self.storage_name
    }
}

/// Derives [`KeyHandle`]s under a fixed namespace
#[derive(Debug, Clone)]
pub struct IdentifierDeriver {
    namespace: String,
}

impl IdentifierDeriver {
    /// Create a deriver for a custom namespace tag
    pub fn new(namespace: impl Into<String>) -> Result<Self, ConfigError> {
        let namespace = namespace.into();
        if namespace.is_empty() || !namespace.chars().all(is_storage_safe) {
            return Err(ConfigError::InvalidNamespace(namespace));
        }
        Ok(Self { namespace })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Derive the handle for `scope`, optionally narrowed by `sub_id`
    ///
    /// A blank `sub_id` is treated as absent. Fails only when `scope` is blank.
    pub fn derive_handle(&self, scope: &str, sub_id: Option<&str>) -> Result<KeyHandle, SignerError> {
        if scope.trim().is_empty() {
            return Err(SignerError::InvalidIdentifier(
                "relying party id is empty".into(),
            ));
        }

        let sub_id = sub_id.filter(|id| !id.trim().is_empty());
        let base = sub_id.unwrap_or(scope);

        let mut storage_name = String::with_capacity(self.namespace.len() + 1 + base.len());
        storage_name.push_str(&self.namespace);
        storage_name.push(SEPARATOR);
        storage_name.extend(
            base.chars()
                .map(|c| if is_storage_safe(c) { c } else { PLACEHOLDER }),
        );

        Ok(KeyHandle {
            scope: scope.to_owned(),
            sub_id: sub_id.map(str::to_owned),
            storage_name,
        })
    }
}

impl Default for IdentifierDeriver {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scope_only() {
        let handle = IdentifierDeriver::default()
            .derive_handle("example.com", None)
            .unwrap();
        assert_eq!(handle.storage_name(), "zt_device_crypto.example.com");
        assert_eq!(handle.scope(), "example.com");
        assert_eq!(handle.sub_id(), None);
    }

    #[test]
    fn test_unsafe_characters_replaced() {
        let handle = IdentifierDeriver::default()
            .derive_handle("https://bank.example/login?x=1", None)
            .unwrap();
        assert_eq!(
            handle.storage_name(),
            "zt_device_crypto.https___bank.example_login_x_1"
        );
    }

    #[test]
    fn test_non_ascii_replaced_per_char() {
        let handle = IdentifierDeriver::default()
            .derive_handle("bänk", None)
            .unwrap();
        assert_eq!(handle.storage_name(), "zt_device_crypto.b_nk");
    }

    #[test]
    fn test_sub_id_takes_precedence() {
        let deriver = IdentifierDeriver::default();
        let handle = deriver.derive_handle("example.com", Some("device-7")).unwrap();
        assert_eq!(handle.storage_name(), "zt_device_crypto.device-7");
        assert_eq!(handle.scope(), "example.com");
        assert_eq!(handle.sub_id(), Some("device-7"));
    }

    #[test]
    fn test_blank_sub_id_ignored() {
        let deriver = IdentifierDeriver::default();
        let plain = deriver.derive_handle("example.com", None).unwrap();
        let blank = deriver.derive_handle("example.com", Some("  ")).unwrap();
        assert_eq!(plain, blank);
    }

    #[test]
    fn test_empty_scope_rejected() {
        let deriver = IdentifierDeriver::default();
        assert!(matches!(
            deriver.derive_handle("", None),
            Err(SignerError::InvalidIdentifier(_))
        ));
        assert!(matches!(
            deriver.derive_handle(" \t", Some("device-7")),
            Err(SignerError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_custom_namespace() {
        let deriver = IdentifierDeriver::new("acme-keys").unwrap();
        let handle = deriver.derive_handle("rp", None).unwrap();
        assert_eq!(handle.storage_name(), "acme-keys.rp");
    }

    #[test]
    fn test_invalid_namespace_rejected() {
        assert!(IdentifierDeriver::new("").is_err());
        assert!(IdentifierDeriver::new("has space").is_err());
    }

    #[test]
    fn test_sanitizer_collision_is_accepted() {
        let deriver = IdentifierDeriver::default();
        let a = deriver.derive_handle("a/b", None).unwrap();
        let b = deriver.derive_handle("a_b", None).unwrap();
        assert_eq!(a.storage_name(), b.storage_name());
    }

    proptest! {
        #[test]
        fn prop_derivation_is_deterministic(scope in "\\PC*[a-z]\\PC*", sub in proptest::option::of("\\PC*")) {
            let deriver = IdentifierDeriver::default();
            let first = deriver.derive_handle(&scope, sub.as_deref()).unwrap();
            let second = deriver.derive_handle(&scope, sub.as_deref()).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_storage_name_is_safe(scope in "\\PC*[a-z]\\PC*", sub in proptest::option::of("\\PC*")) {
            let handle = IdentifierDeriver::default()
                .derive_handle(&scope, sub.as_deref())
                .unwrap();
            prop_assert!(handle.storage_name().starts_with("zt_device_crypto."));
            prop_assert!(handle.storage_name().chars().all(is_storage_safe));
        }

        #[test]
        fn prop_distinct_safe_scopes_do_not_collide(a in "[a-z0-9.-]{1,24}", b in "[a-z0-9.-]{1,24}") {
            prop_assume!(a != b);
            let deriver = IdentifierDeriver::default();
            let ha = deriver.derive_handle(&a, None).unwrap();
            let hb = deriver.derive_handle(&b, None).unwrap();
            prop_assert_ne!(ha.storage_name(), hb.storage_name());
        }
    }
}
