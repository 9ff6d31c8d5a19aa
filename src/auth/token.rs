//! Session bearer tokens: `opslog_<lookup>_<secret>`.
//!
//! The lookup part indexes the session row; the whole token is verified
//! against the stored Argon2 hash.

use rand::RngCore;

use crate::error::{Error, Result};

const TOKEN_PREFIX: &str = "opslog";
const LOOKUP_BYTES: usize = 4;
const SECRET_BYTES: usize = 16;

/// A freshly minted token. `raw` is handed to the client once and never stored.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub lookup: String,
}

impl IssuedToken {
    #[must_use]
    pub fn issue() -> Self {
        let lookup = random_hex(LOOKUP_BYTES);
        let secret = random_hex(SECRET_BYTES);
        Self {
            raw: format!("{TOKEN_PREFIX}_{lookup}_{secret}"),
            lookup,
        }
    }
}

fn random_hex(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_lower_hex(s: &str, bytes: usize) -> bool {
    s.len() == bytes * 2 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Splits a token into `(lookup, secret)`, rejecting anything that could not
/// have been issued by [`IssuedToken::issue`].
pub fn parse_token(token: &str) -> Result<(String, String)> {
    let invalid = || Error::Auth("invalid session token".to_string());

    let rest = token
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or_else(invalid)?;
    let (lookup, secret) = rest.split_once('_').ok_or_else(invalid)?;

    if !is_lower_hex(lookup, LOOKUP_BYTES) || !is_lower_hex(secret, SECRET_BYTES) {
        return Err(invalid());
    }

    Ok((lookup.to_string(), secret.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_parses_back() {
        let issued = IssuedToken::issue();
        assert!(issued.raw.starts_with("opslog_"));

        let (lookup, secret) = parse_token(&issued.raw).unwrap();
        assert_eq!(lookup, issued.lookup);
        assert_eq!(lookup.len(), 8);
        assert_eq!(secret.len(), 32);
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = IssuedToken::issue();
        let b = IssuedToken::issue();
        assert_ne!(a.raw, b.raw);
    }

    #[test]
    fn test_parse_token_rejects_malformed() {
        let (lookup, secret) =
            parse_token("opslog_12345678_0123456789abcdef0123456789abcdef").unwrap();
        assert_eq!(lookup, "12345678");
        assert_eq!(secret, "0123456789abcdef0123456789abcdef");

        assert!(parse_token("session_12345678_0123456789abcdef0123456789abcdef").is_err());
        assert!(parse_token("opslog_12345678").is_err());
        assert!(parse_token("opslog_1234567Z_0123456789abcdef0123456789abcdef").is_err());
        assert!(parse_token("opslog_12345678_0123456789ABCDEF0123456789abcdef").is_err());
        assert!(matches!(parse_token(""), Err(Error::Auth(_))));
    }
}
