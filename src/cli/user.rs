use chrono::Utc;
use inquire::{Confirm, Text};
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::store::Store;
use crate::types::User;

use super::init_store;
use super::pickers::{confirm_action, create_token_for_user, get_or_pick_user, pick_expiration};

fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err("A valid email address is required".to_string());
    }
    Ok(())
}

pub fn run_user_add(
    data_dir: String,
    email: Option<String>,
    create_token_flag: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let email = if let Some(email) = email {
        validate_email(&email).map_err(anyhow::Error::msg)?;
        email
    } else if non_interactive {
        anyhow::bail!("--email is required in non-interactive mode");
    } else {
        Text::new("Email:")
            .with_validator(|input: &str| {
                Ok(validate_email(input)
                    .map(|()| inquire::validator::Validation::Valid)
                    .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
            })
            .prompt()?
    };

    if store.get_user_by_email(&email)?.is_some() {
        anyhow::bail!("User '{}' already exists", email);
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        created_at: now,
        updated_at: now,
    };

    store.create_user(&user)?;

    println!();
    println!("Created user \"{email}\"");

    let should_create_token = if create_token_flag {
        true
    } else if non_interactive {
        false
    } else {
        Confirm::new("Create access token?")
            .with_default(true)
            .prompt()?
    };

    if should_create_token {
        let expires_in = if non_interactive {
            None
        } else {
            match pick_expiration()? {
                Some(exp) => exp,
                None => {
                    println!("Token creation cancelled.");
                    return Ok(());
                }
            }
        };

        let generator = TokenGenerator::new();
        let (token, raw_token) = create_token_for_user(&generator, Some(user.id), expires_in)?;
        store.create_token(&token)?;

        println!();
        println!("Token created: {raw_token}");
        println!("  Save this now - it cannot be retrieved later.");
    }

    println!();

    Ok(())
}

pub fn run_user_remove(
    data_dir: String,
    user_id: Option<String>,
    non_interactive: bool,
    yes: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let user = match get_or_pick_user(&store, user_id, non_interactive)? {
        Some(user) => user,
        None => return Ok(()),
    };

    let confirmed = confirm_action(
        &format!(
            "Delete user '{}'? This also deletes their students, lessons, payments, and tokens.",
            user.email
        ),
        yes,
        non_interactive,
    )?;

    if !confirmed {
        println!("Cancelled.");
        return Ok(());
    }

    store.delete_user(&user.id)?;

    println!();
    println!("Deleted user '{}'", user.email);
    println!();

    Ok(())
}
