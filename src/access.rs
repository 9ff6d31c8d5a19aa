//! Business-unit resolution and the access scope derived from it.

use serde::Serialize;
use tracing::warn;

use crate::auth::current_user;
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::Session;

/// Business unit value that lifts every row restriction.
pub const MASTER_UNIT: &str = "master";

/// Outcome of looking up the signed-in user's business unit.
///
/// Failures are captured in `error` rather than returned; callers must treat
/// `loading == false && error.is_some()` as "do not assume master access".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusinessUnitState {
    pub business_unit: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

impl BusinessUnitState {
    /// State before the lookup has completed.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            business_unit: None,
            loading: true,
            error: None,
        }
    }

    #[must_use]
    pub fn resolved(business_unit: Option<String>) -> Self {
        Self {
            business_unit,
            loading: false,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            business_unit: None,
            loading: false,
            error: Some(message.into()),
        }
    }

    #[must_use]
    pub fn can_see_all_data(&self) -> bool {
        can_see_all_data(self.business_unit.as_deref())
    }

    #[must_use]
    pub fn scope(&self) -> AccessScope {
        AccessScope::from_state(self)
    }

    /// The unit to stamp on new rows. Refuses while the lookup is in
    /// progress or has failed, so rows are never written with a missing scope.
    pub fn settled_unit(&self) -> Result<Option<&str>> {
        if self.loading {
            return Err(Error::ProfileResolution(
                "profile is still loading".to_string(),
            ));
        }
        if let Some(error) = &self.error {
            return Err(Error::ProfileResolution(error.clone()));
        }
        Ok(self.business_unit.as_deref())
    }
}

/// Looks up the business unit of the user behind `session`.
pub fn resolve_business_unit(store: &dyn Store, session: Option<&Session>) -> BusinessUnitState {
    let user = match current_user(session) {
        Ok(user) => user,
        Err(e) => return BusinessUnitState::failed(e.to_string()),
    };

    match store.get_profile(&user.id) {
        Ok(Some(profile)) => BusinessUnitState::resolved(profile.business_unit),
        Ok(None) => {
            warn!("No profile row for user {}", user.id);
            BusinessUnitState::failed("profile not found")
        }
        Err(e) => {
            warn!("Profile lookup for user {} failed: {e}", user.id);
            BusinessUnitState::failed(e.user_message())
        }
    }
}

/// `None` for master or unresolved units, otherwise the unit verbatim.
///
/// A `None` result alone does not mean "see everything"; check
/// [`can_see_all_data`] or use [`AccessScope`].
#[must_use]
pub fn derive_scope(business_unit: Option<&str>) -> Option<String> {
    match business_unit {
        None => None,
        Some(unit) if unit.to_lowercase() == MASTER_UNIT => None,
        Some(unit) => Some(unit.to_string()),
    }
}

#[must_use]
pub fn can_see_all_data(business_unit: Option<&str>) -> bool {
    business_unit.is_some_and(|unit| unit.to_lowercase() == MASTER_UNIT)
}

/// Which rows of a scoped table a user may see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "business_unit", rename_all = "snake_case")]
pub enum AccessScope {
    /// Not safe to query yet: lookup pending, failed, or no unit assigned.
    Unresolved,
    /// Master access, no restriction.
    All,
    /// Only rows whose `business_unit` equals this value exactly.
    BusinessUnit(String),
}

impl AccessScope {
    #[must_use]
    pub fn from_state(state: &BusinessUnitState) -> Self {
        if state.loading || state.error.is_some() {
            return AccessScope::Unresolved;
        }
        let unit = state.business_unit.as_deref();
        if can_see_all_data(unit) {
            return AccessScope::All;
        }
        match derive_scope(unit) {
            Some(unit) => AccessScope::BusinessUnit(unit),
            None => AccessScope::Unresolved,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self, AccessScope::Unresolved)
    }

    /// Whether a single row with `row_unit` is visible. Unscoped tables
    /// should not call this.
    #[must_use]
    pub fn permits(&self, row_unit: Option<&str>) -> bool {
        match self {
            AccessScope::Unresolved => false,
            AccessScope::All => true,
            AccessScope::BusinessUnit(unit) => row_unit == Some(unit.as_str()),
        }
    }
}
