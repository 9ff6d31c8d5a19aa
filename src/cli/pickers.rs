use std::fmt;

use chrono::{DateTime, Utc};
use inquire::{InquireError, Select, Text};

use crate::store::Store;
use crate::types::User;

/// User with their business unit, for pickers and listings.
pub struct UserDisplay {
    pub user: User,
    pub business_unit: Option<String>,
}

impl fmt::Display for UserDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.business_unit.as_deref().unwrap_or("<no unit>");
        write!(f, "{}  [{unit}]", self.user.email)
    }
}

pub fn load_user_displays(store: &dyn Store) -> anyhow::Result<Vec<UserDisplay>> {
    store
        .list_users()?
        .into_iter()
        .map(|user| {
            let business_unit = store
                .get_profile(&user.id)?
                .and_then(|profile| profile.business_unit);
            Ok(UserDisplay {
                user,
                business_unit,
            })
        })
        .collect()
}

/// Use `email` if given, otherwise let the operator pick. `None` means the
/// prompt was cancelled.
pub fn get_or_pick_user_email(
    store: &dyn Store,
    email: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<Option<String>> {
    if let Some(email) = email {
        return Ok(Some(email));
    }
    if non_interactive {
        anyhow::bail!("--email is required in non-interactive mode");
    }

    let users = load_user_displays(store)?;
    if users.is_empty() {
        anyhow::bail!("No users found. Add one with 'opslog admin user add'.");
    }

    match Select::new("Select user:", users).prompt() {
        Ok(choice) => Ok(Some(choice.user.email)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Prompt for a business unit; blank means none.
pub fn prompt_business_unit() -> anyhow::Result<Option<String>> {
    let unit = Text::new("Business unit (blank for none, 'master' for all data):").prompt()?;
    let unit = unit.trim();
    Ok((!unit.is_empty()).then(|| unit.to_string()))
}

/// Format a datetime as relative time (e.g., "2 days ago")
#[must_use]
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let diff = Utc::now().signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }
    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    let (count, unit) = if diff.num_minutes() < 60 {
        (diff.num_minutes(), "minute")
    } else if diff.num_hours() < 24 {
        (diff.num_hours(), "hour")
    } else if diff.num_days() < 30 {
        (diff.num_days(), "day")
    } else if diff.num_days() < 365 {
        (diff.num_days() / 30, "month")
    } else {
        (diff.num_days() / 365, "year")
    };

    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn test_format_relative_time() {
        let now = Utc::now();
        assert_eq!(format_relative_time(&now), "just now");
        assert_eq!(format_relative_time(&(now - Duration::minutes(1))), "1 minute ago");
        assert_eq!(format_relative_time(&(now - Duration::hours(5))), "5 hours ago");
        assert_eq!(format_relative_time(&(now - Duration::days(400))), "1 year ago");
        assert_eq!(format_relative_time(&(now + Duration::hours(1))), "in the future");
    }
}
