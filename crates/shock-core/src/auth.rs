//! Authorization header handling.
//!
//! A token string may embed its own scheme (`"bearer abc123"`); a bare token
//! gets the service's default `OAuth` scheme.

use std::fmt;

/// Scheme used when the token string does not name one.
pub const DEFAULT_SCHEME: &str = "OAuth";

/// Token plus the scheme word sent in front of it.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken {
    scheme: String,
    token: String,
}

impl AuthToken {
    pub fn new(scheme: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            token: token.into(),
        }
    }

    /// Parse a raw token string. `"<scheme> <token>"` keeps the embedded scheme,
    /// anything without whitespace is taken as a bare token.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        match raw.split_once(char::is_whitespace) {
            Some((scheme, rest)) if !rest.trim().is_empty() => {
                Some(Self::new(scheme, rest.trim_start()))
            }
            _ => Some(Self::new(DEFAULT_SCHEME, raw)),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.scheme, self.token)
    }
}

// Never print the token itself.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthToken")
            .field("scheme", &self.scheme)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_scheme_is_kept() {
        let auth = AuthToken::parse("bearer abc123").unwrap();
        assert_eq!(auth.scheme(), "bearer");
        assert_eq!(auth.token(), "abc123");
        assert_eq!(auth.header_value(), "bearer abc123");
    }

    #[test]
    fn bare_token_defaults_to_oauth() {
        let auth = AuthToken::parse("abc123").unwrap();
        assert_eq!(auth.scheme(), "OAuth");
        assert_eq!(auth.token(), "abc123");
    }

    #[test]
    fn extra_whitespace_between_scheme_and_token() {
        let auth = AuthToken::parse("  mgrast    tok en ").unwrap();
        assert_eq!(auth.scheme(), "mgrast");
        assert_eq!(auth.token(), "tok en");
    }

    #[test]
    fn empty_token_is_rejected() {
        assert!(AuthToken::parse("").is_none());
        assert!(AuthToken::parse("   ").is_none());
    }

    #[test]
    fn debug_output_hides_token() {
        let auth = AuthToken::parse("secret-value").unwrap();
        assert!(!format!("{:?}", auth).contains("secret-value"));
    }
}
