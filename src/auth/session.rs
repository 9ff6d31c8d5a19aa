use std::sync::Arc;

use tokio::sync::watch;

use super::identity::Identity;
use crate::error::Result;
use crate::types::Session;

/// Application-level holder of the signed-in session.
///
/// Cloning shares the same state. Every change is published on one watch
/// channel; [`SessionContext::subscribe`] is the only way to observe it.
#[derive(Clone)]
pub struct SessionContext {
    tx: Arc<watch::Sender<Option<Session>>>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.tx.borrow().is_some()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.tx.subscribe()
    }

    /// Replaces the held session and returns the previous one.
    pub fn set(&self, session: Session) -> Option<Session> {
        self.tx.send_replace(Some(session))
    }

    pub fn clear(&self) -> Option<Session> {
        self.tx.send_replace(None)
    }

    /// Signs in and stores the session. Returns the raw token for persisting
    /// across launches.
    pub fn sign_in(&self, identity: &Identity, email: &str, password: &str) -> Result<String> {
        let signed_in = identity.sign_in(email, password)?;
        self.set(signed_in.session);
        Ok(signed_in.token)
    }

    /// Re-establishes a still-valid session on launch. An invalid token leaves
    /// the context signed out.
    pub fn restore(&self, identity: &Identity, raw_token: &str) -> Result<()> {
        match identity.restore(raw_token) {
            Ok(session) => {
                self.set(session);
                Ok(())
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    pub fn sign_out(&self, identity: &Identity) -> Result<()> {
        if let Some(session) = self.clear() {
            identity.sign_out(&session)?;
        }
        Ok(())
    }
}
