//! Canonical challenge message
//!
//! The signed bytes are the UTF-8 string `nonce|device_id|rp_id|otp`. Verifiers
//! rebuild the same string independently, so the field order and the single
//! ASCII pipe are fixed.
//!
//! Fields are not escaped or length-prefixed. A field that itself contains
//! `|` can shift the boundaries: `("a|b", "c", ..)` and `("a", "b|c", ..)`
//! produce identical bytes. Verifiers that accept such inputs must reject them
//! on their side; changing the encoding here would break every deployed
//! verifier.

/// Separator between fields
pub const FIELD_DELIMITER: char = '|';

/// One challenge to be signed; lives only for a single sign call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChallengeMessage<'a> {
    pub nonce: &'a str,
    pub device_id: &'a str,
    pub rp_id: &'a str,
    pub otp: &'a str,
}

impl<'a> ChallengeMessage<'a> {
    pub fn new(nonce: &'a str, device_id: &'a str, rp_id: &'a str, otp: &'a str) -> Self {
        Self {
            nonce,
            device_id,
            rp_id,
            otp,
        }
    }

    /// Exact bytes to sign
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonicalize(self.nonce, self.device_id, self.rp_id, self.otp)
    }
}

/// Build `nonce|device_id|rp_id|otp` as UTF-8 bytes
///
/// Infallible: every `&str` is already valid UTF-8.
pub fn canonicalize(nonce: &str, device_id: &str, rp_id: &str, otp: &str) -> Vec<u8> {
    let fields = [nonce, device_id, rp_id, otp];
    let len = fields.iter().map(|f| f.len()).sum::<usize>() + fields.len() - 1;

    let mut message = Vec::with_capacity(len);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            message.push(FIELD_DELIMITER as u8);
        }
        message.extend_from_slice(field.as_bytes());
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_vector() {
        let message = canonicalize("abc123", "dev-1", "example.com", "445566");
        assert_eq!(message, b"abc123|dev-1|example.com|445566");
    }

    #[test]
    fn test_struct_matches_free_function() {
        let challenge = ChallengeMessage::new("n1", "d1", "bank.example", "000000");
        assert_eq!(challenge.canonical_bytes(), b"n1|d1|bank.example|000000");
    }

    #[test]
    fn test_each_field_changes_message() {
        let base = canonicalize("abc123", "dev-1", "example.com", "445566");
        let variants = [
            canonicalize("abc124", "dev-1", "example.com", "445566"),
            canonicalize("abc123", "dev-2", "example.com", "445566"),
            canonicalize("abc123", "dev-1", "example.org", "445566"),
            canonicalize("abc123", "dev-1", "example.com", "445567"),
        ];
        for variant in variants {
            assert_ne!(variant, base);
        }
    }

    #[test]
    fn test_field_order_is_fixed() {
        assert_ne!(
            canonicalize("a", "b", "c", "d"),
            canonicalize("b", "a", "c", "d")
        );
    }

    #[test]
    fn test_utf8_passthrough() {
        assert_eq!(
            canonicalize("ñ", "d", "r", "o"),
            "ñ|d|r|o".as_bytes().to_vec()
        );
    }

    #[test]
    fn test_embedded_delimiter_is_ambiguous() {
        // Pins the unescaped encoding; see module docs
        assert_eq!(
            canonicalize("a|b", "c", "rp", "1"),
            canonicalize("a", "b|c", "rp", "1")
        );
    }
}
