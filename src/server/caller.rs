use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::access::{AccessScope, BusinessUnitState, resolve_business_unit};
use crate::auth::{AuthError, RequireSession};
use crate::server::AppState;
use crate::types::{CurrentUser, Session};

/// Signed-in caller together with their resolved business unit.
///
/// Resolution failures do not reject the request; they surface later as
/// `ProfileResolution` when a query or write needs the scope.
pub struct Caller {
    pub session: Session,
    pub user: CurrentUser,
    pub unit: BusinessUnitState,
}

impl Caller {
    #[must_use]
    pub fn scope(&self) -> AccessScope {
        self.unit.scope()
    }
}

impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let RequireSession(session) = RequireSession::from_request_parts(parts, state).await?;
        let unit = resolve_business_unit(state.store.as_ref(), Some(&session));

        Ok(Caller {
            user: CurrentUser::from(&session),
            session,
            unit,
        })
    }
}
