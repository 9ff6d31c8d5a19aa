use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::error::{Error, Result};

const MIN_PASSWORD_LEN: usize = 8;

// Tokens are checked on every request; their secrets are 128 random bits.
const TOKEN_MEMORY_KIB: u32 = 64 * 1024;
const TOKEN_ITERATIONS: u32 = 1;
const TOKEN_PARALLELISM: u32 = 4;
const TOKEN_OUTPUT_LEN: usize = 32;

/// Argon2id hashing shared by passwords and session tokens. The two differ
/// only in cost parameters and in the label used for error messages.
pub struct SecretHasher {
    argon2: Argon2<'static>,
    label: &'static str,
}

impl SecretHasher {
    /// Argon2id defaults, for user-chosen passwords.
    #[must_use]
    pub fn for_passwords() -> Self {
        Self {
            argon2: Argon2::default(),
            label: "password",
        }
    }

    #[must_use]
    pub fn for_tokens() -> Self {
        let params = Params::new(
            TOKEN_MEMORY_KIB,
            TOKEN_ITERATIONS,
            TOKEN_PARALLELISM,
            Some(TOKEN_OUTPUT_LEN),
        )
        .unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            label: "token",
        }
    }

    pub fn hash(&self, secret: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(secret.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Config(format!("failed to hash {}: {e}", self.label)))
    }

    /// `Ok(false)` on mismatch; `Err` only when `hash` is unreadable.
    pub fn verify(&self, secret: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("stored {} hash is invalid: {e}", self.label)))?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!(
                "failed to verify {}: {e}",
                self.label
            ))),
        }
    }
}

/// Hashes a sign-in password after checking its length.
pub fn hash_password(password: &str) -> Result<String> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    SecretHasher::for_passwords().hash(password)
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    SecretHasher::for_passwords().verify(password, hash)
}
