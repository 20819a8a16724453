//! Provider credential handling
//!
//! The API key lives in a `SecretString`, which never prints its value
//! through `Debug` or `Display`. Log lines use `hint()` instead.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters of the key kept visible by `hint()`
const HINT_TAIL: usize = 4;

/// Keys shorter than this are never partially shown
const MIN_HINT_LEN: usize = 12;

/// An API key or other credential read from configuration
#[derive(Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for building the `Authorization` header
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Masked form that still tells two keys apart, e.g. `****cdef`
    pub fn hint(&self) -> String {
        let chars = self.0.chars().count();
        if chars == 0 {
            return "<unset>".to_string();
        }
        if chars < MIN_HINT_LEN {
            return "****".to_string();
        }
        let tail: String = self.0.chars().skip(chars - HINT_TAIL).collect();
        format!("****{}", tail)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(****)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecretString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// One-line summary of a settings value with credentials masked
pub trait SafeLogging {
    fn safe_for_logging(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_formats_value() {
        let secret = SecretString::new("sk-1234567890abcdef");
        assert_eq!(format!("{}", secret), "****");
        assert_eq!(format!("{:?}", secret), "SecretString(****)");
        assert_eq!(secret.expose_secret(), "sk-1234567890abcdef");
    }

    #[test]
    fn test_hint() {
        assert_eq!(SecretString::new("sk-1234567890abcdef").hint(), "****cdef");
        assert_eq!(SecretString::new("sk-short").hint(), "****");
        assert_eq!(SecretString::default().hint(), "<unset>");
        assert_eq!(SecretString::new("ключ-ключ-ключ").hint(), "****ключ");
    }

    #[test]
    fn test_transparent_serde() {
        let secret: SecretString = serde_json::from_str(r#""sk-live""#).unwrap();
        assert_eq!(secret, SecretString::from("sk-live"));
        assert_eq!(serde_json::to_string(&secret).unwrap(), r#""sk-live""#);
    }
}
