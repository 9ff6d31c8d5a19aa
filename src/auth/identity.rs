use std::sync::Arc;

use chrono::{Duration, SubsecRound, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use super::credentials::{SecretHasher, hash_password, verify_password};
use super::token::{IssuedToken, parse_token};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{CurrentUser, Profile, Session, SessionRecord, User};

const INVALID_CREDENTIALS: &str = "invalid login credentials";

/// Result of a successful sign-in. `token` is shown to the caller once.
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub session: Session,
    pub token: String,
}

/// Identity provider backed by the store: accounts, sessions and profiles.
pub struct Identity {
    store: Arc<dyn Store>,
    tokens: SecretHasher,
    session_ttl: Option<Duration>,
}

impl Identity {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            tokens: SecretHasher::for_tokens(),
            session_ttl: None,
        }
    }

    #[must_use]
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = Some(ttl);
        self
    }

    /// Creates an account and its profile.
    pub fn register_user(
        &self,
        email: &str,
        password: &str,
        business_unit: Option<&str>,
    ) -> Result<User> {
        let email = normalize_email(email)?;
        if self.store.get_user_by_email(&email)?.is_some() {
            return Err(Error::AlreadyExists);
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: hash_password(password)?,
            created_at: now,
        };
        self.store.create_user(&user)?;
        self.store.upsert_profile(&Profile {
            user_id: user.id.clone(),
            business_unit: clean_unit(business_unit),
            updated_at: now,
        })?;

        info!("Registered user {}", user.email);
        Ok(user)
    }

    pub fn set_business_unit(&self, email: &str, business_unit: Option<&str>) -> Result<Profile> {
        let user = self
            .store
            .get_user_by_email(email)?
            .ok_or(Error::NotFound)?;

        let profile = Profile {
            user_id: user.id,
            business_unit: clean_unit(business_unit),
            updated_at: Utc::now(),
        };
        self.store.upsert_profile(&profile)?;
        Ok(profile)
    }

    pub fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn> {
        let user = self
            .store
            .get_user_by_email(email)?
            .ok_or_else(|| Error::Auth(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            warn!("Failed sign-in for {}", user.email);
            return Err(Error::Auth(INVALID_CREDENTIALS.to_string()));
        }

        let issued = IssuedToken::issue();
        let token_hash = self.tokens.hash(&issued.raw)?;
        // Stored timestamps keep microseconds.
        let now = Utc::now().trunc_subsecs(6);
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            token_hash,
            token_lookup: issued.lookup,
            user_id: user.id.clone(),
            created_at: now,
            expires_at: self.session_ttl.map(|ttl| now + ttl),
        };
        self.store.create_session(&record)?;

        info!("User {} signed in", user.email);
        Ok(SignedIn {
            session: session_for(&record, &user),
            token: issued.raw,
        })
    }

    /// Re-establishes a session from a previously issued token.
    pub fn restore(&self, raw_token: &str) -> Result<Session> {
        let (lookup, _secret) = parse_token(raw_token)?;

        let record = self
            .store
            .get_session_by_lookup(&lookup)?
            .ok_or_else(|| Error::Auth("invalid session token".to_string()))?;

        if !self.tokens.verify(raw_token, &record.token_hash)? {
            return Err(Error::Auth("invalid session token".to_string()));
        }

        if let Some(expires_at) = &record.expires_at {
            if expires_at < &Utc::now() {
                return Err(Error::Auth("session expired".to_string()));
            }
        }

        let user = self
            .store
            .get_user(&record.user_id)?
            .ok_or_else(|| Error::Auth("user no longer exists".to_string()))?;

        Ok(session_for(&record, &user))
    }

    pub fn sign_out(&self, session: &Session) -> Result<()> {
        if !self.store.delete_session(&session.id)? {
            warn!("Session {} was already signed out", session.id);
        }
        Ok(())
    }
}

/// The identity behind `session`, or `NoUser` when nobody is signed in.
pub fn current_user(session: Option<&Session>) -> Result<CurrentUser> {
    session.map(CurrentUser::from).ok_or(Error::NoUser)
}

fn session_for(record: &SessionRecord, user: &User) -> Session {
    Session {
        id: record.id.clone(),
        user_id: user.id.clone(),
        email: user.email.clone(),
        created_at: record.created_at,
        expires_at: record.expires_at,
    }
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(Error::BadRequest(format!("invalid email address '{email}'"))),
    }
}

fn clean_unit(unit: Option<&str>) -> Option<String> {
    unit.map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteStore;

    fn identity() -> Identity {
        let store = SqliteStore::open_in_memory().unwrap();
        store.initialize().unwrap();
        Identity::new(Arc::new(store))
    }

    #[test]
    fn test_sign_in_and_restore() {
        let identity = identity();
        let user = identity
            .register_user("Guard@Example.com", "hunter2hunter2", Some("shipyard"))
            .unwrap();

        let signed_in = identity.sign_in("guard@example.com", "hunter2hunter2").unwrap();
        assert_eq!(signed_in.session.user_id, user.id);

        let restored = identity.restore(&signed_in.token).unwrap();
        assert_eq!(restored, signed_in.session);
    }

    #[test]
    fn test_wrong_password_is_auth_error() {
        let identity = identity();
        identity
            .register_user("guard@example.com", "hunter2hunter2", None)
            .unwrap();

        let result = identity.sign_in("guard@example.com", "not-the-password");
        assert!(matches!(result, Err(Error::Auth(msg)) if msg == INVALID_CREDENTIALS));
        assert!(matches!(
            identity.sign_in("nobody@example.com", "hunter2hunter2"),
            Err(Error::Auth(_))
        ));
    }

    #[test]
    fn test_sign_out_invalidates_token() {
        let identity = identity();
        identity
            .register_user("guard@example.com", "hunter2hunter2", None)
            .unwrap();
        let signed_in = identity.sign_in("guard@example.com", "hunter2hunter2").unwrap();

        identity.sign_out(&signed_in.session).unwrap();
        assert!(matches!(identity.restore(&signed_in.token), Err(Error::Auth(_))));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let identity = identity().with_session_ttl(Duration::seconds(-1));
        identity
            .register_user("guard@example.com", "hunter2hunter2", None)
            .unwrap();
        let signed_in = identity.sign_in("guard@example.com", "hunter2hunter2").unwrap();

        assert!(matches!(
            identity.restore(&signed_in.token),
            Err(Error::Auth(msg)) if msg == "session expired"
        ));
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let identity = identity();
        identity
            .register_user("guard@example.com", "hunter2hunter2", None)
            .unwrap();
        assert!(matches!(
            identity.register_user(" GUARD@example.com ", "hunter2hunter2", None),
            Err(Error::AlreadyExists)
        ));
    }

    #[test]
    fn test_current_user_requires_session() {
        assert!(matches!(current_user(None), Err(Error::NoUser)));
    }
}
