use std::sync::Arc;

use inquire::{Password, Text};
use serde::Serialize;

use crate::auth::Identity;
use crate::error::Error;
use crate::store::Store;

use super::init_store;
use super::pickers::{
    format_relative_time, get_or_pick_user_email, load_user_displays, prompt_business_unit,
};

#[derive(Serialize)]
struct UserOutput {
    id: String,
    email: String,
    business_unit: Option<String>,
    created_at: String,
}

pub fn run_user_add(
    data_dir: String,
    email: Option<String>,
    business_unit: Option<String>,
    password: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(init_store(&data_dir)?);

    let email = if let Some(email) = email {
        email
    } else if non_interactive {
        anyhow::bail!("--email is required in non-interactive mode");
    } else {
        Text::new("Email:")
            .with_validator(|input: &str| {
                if input.contains('@') && !input.trim().starts_with('@') {
                    Ok(inquire::validator::Validation::Valid)
                } else {
                    Ok(inquire::validator::Validation::Invalid(
                        "Enter an email address".into(),
                    ))
                }
            })
            .prompt()?
    };

    let password = if let Some(password) = password {
        password
    } else if non_interactive {
        anyhow::bail!("--password is required in non-interactive mode");
    } else {
        Password::new("Password:").prompt()?
    };

    let business_unit = match business_unit {
        Some(unit) => Some(unit),
        None if non_interactive => None,
        None => prompt_business_unit()?,
    };

    let identity = Identity::new(store);
    let user = match identity.register_user(&email, &password, business_unit.as_deref()) {
        Ok(user) => user,
        Err(Error::AlreadyExists) => anyhow::bail!("User '{}' already exists", email.trim()),
        Err(e) => return Err(e.into()),
    };

    println!();
    match business_unit.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        Some(unit) => println!("Created user \"{}\" in business unit \"{unit}\"", user.email),
        None => {
            println!("Created user \"{}\" without a business unit", user.email);
            println!("  They cannot list or create records until one is set.");
        }
    }
    println!();

    Ok(())
}

pub fn run_user_set_unit(
    data_dir: String,
    email: Option<String>,
    business_unit: Option<String>,
    clear: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store: Arc<dyn Store> = Arc::new(init_store(&data_dir)?);

    let Some(email) = get_or_pick_user_email(store.as_ref(), email, non_interactive)? else {
        return Ok(());
    };

    let business_unit = if clear {
        None
    } else if let Some(unit) = business_unit {
        Some(unit)
    } else if non_interactive {
        anyhow::bail!("--business-unit or --clear is required in non-interactive mode");
    } else {
        prompt_business_unit()?
    };

    let identity = Identity::new(store);
    let profile = match identity.set_business_unit(&email, business_unit.as_deref()) {
        Ok(profile) => profile,
        Err(Error::NotFound) => anyhow::bail!("No user with email '{email}'"),
        Err(e) => return Err(e.into()),
    };

    match profile.business_unit {
        Some(unit) => println!("Business unit for {email} set to \"{unit}\""),
        None => println!("Business unit for {email} cleared"),
    }

    Ok(())
}

pub fn run_user_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;
    let users = load_user_displays(&store)?;

    if json {
        let output: Vec<UserOutput> = users
            .into_iter()
            .map(|u| UserOutput {
                id: u.user.id,
                email: u.user.email,
                business_unit: u.business_unit,
                created_at: u.user.created_at.to_rfc3339(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }

    for u in &users {
        println!(
            "{u}  created {}",
            format_relative_time(&u.user.created_at)
        );
    }

    Ok(())
}
