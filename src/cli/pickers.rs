use std::fmt;

use chrono::{DateTime, Duration, Utc};
use inquire::{InquireError, Select};
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::store::Store;
use crate::types::{Token, User};

/// User entry for interactive selection
pub struct UserDisplay {
    pub user: User,
}

impl fmt::Display for UserDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}...)", self.user.email, &self.user.id[..8])
    }
}

/// Token with resolved owner email for display
pub struct TokenDisplay {
    pub token: Token,
    pub email: Option<String>,
}

impl fmt::Display for TokenDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let owner = self.email.as_deref().unwrap_or("admin");
        let created = format_relative_time(&self.token.created_at);
        let last_used = match &self.token.last_used_at {
            Some(dt) => format_relative_time(dt),
            None => "never used".to_string(),
        };
        write!(
            f,
            "tutorlog_{}...  {}  created {}  {}",
            &self.token.token_lookup, owner, created, last_used
        )
    }
}

/// Token expiration option for display
#[derive(Clone)]
pub struct ExpirationOption {
    pub label: &'static str,
    pub days: Option<i64>,
}

impl fmt::Display for ExpirationOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Format a datetime as relative time (e.g., "2 days ago")
#[must_use]
pub fn format_relative_time(dt: &DateTime<Utc>) -> String {
    let now = Utc::now();
    let diff = now.signed_duration_since(*dt);

    if diff.num_seconds() < 0 {
        return "in the future".to_string();
    }

    if diff.num_seconds() < 60 {
        return "just now".to_string();
    }

    if diff.num_minutes() < 60 {
        let mins = diff.num_minutes();
        return if mins == 1 {
            "1 minute ago".to_string()
        } else {
            format!("{mins} minutes ago")
        };
    }

    if diff.num_hours() < 24 {
        let hours = diff.num_hours();
        return if hours == 1 {
            "1 hour ago".to_string()
        } else {
            format!("{hours} hours ago")
        };
    }

    if diff.num_days() < 30 {
        let days = diff.num_days();
        return if days == 1 {
            "1 day ago".to_string()
        } else {
            format!("{days} days ago")
        };
    }

    if diff.num_days() < 365 {
        let months = diff.num_days() / 30;
        return if months == 1 {
            "1 month ago".to_string()
        } else {
            format!("{months} months ago")
        };
    }

    let years = diff.num_days() / 365;
    if years == 1 {
        "1 year ago".to_string()
    } else {
        format!("{years} years ago")
    }
}

/// Load tokens with their owners' emails resolved
fn load_tokens_with_emails(store: &impl Store) -> anyhow::Result<Vec<TokenDisplay>> {
    let tokens = store.list_tokens("", 1000)?;
    let mut displays = Vec::with_capacity(tokens.len());

    for token in tokens {
        let email = match &token.user_id {
            Some(user_id) => store.get_user(user_id)?.map(|u| u.email),
            None => None,
        };

        displays.push(TokenDisplay { token, email });
    }

    Ok(displays)
}

/// Pick a user from the list
pub fn pick_user(store: &impl Store) -> anyhow::Result<Option<User>> {
    let users: Vec<UserDisplay> = store
        .list_users("", 1000)?
        .into_iter()
        .map(|user| UserDisplay { user })
        .collect();

    if users.is_empty() {
        println!("No users found.");
        return Ok(None);
    }

    let selection = Select::new("Select user:", users)
        .with_page_size(15)
        .with_help_message("Type to filter, Enter to select")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(display) => Ok(Some(display.user)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Pick a token from the list
pub fn pick_token(store: &impl Store) -> anyhow::Result<Option<Token>> {
    let tokens = load_tokens_with_emails(store)?;

    if tokens.is_empty() {
        println!("No tokens found.");
        return Ok(None);
    }

    let selection = Select::new("Select token:", tokens)
        .with_page_size(15)
        .with_help_message("Type to filter, Enter to select")
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(display) => Ok(Some(display.token)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Pick token expiration
pub fn pick_expiration() -> anyhow::Result<Option<Option<Duration>>> {
    let options = vec![
        ExpirationOption {
            label: "30 days",
            days: Some(30),
        },
        ExpirationOption {
            label: "90 days",
            days: Some(90),
        },
        ExpirationOption {
            label: "1 year",
            days: Some(365),
        },
        ExpirationOption {
            label: "Never",
            days: None,
        },
    ];

    let selection = Select::new("Token expiration:", options)
        .with_page_size(4)
        .with_vim_mode(true)
        .prompt();

    match selection {
        Ok(opt) => Ok(Some(opt.days.map(Duration::days))),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Get all tokens for listing
pub fn list_tokens(store: &impl Store) -> anyhow::Result<Vec<TokenDisplay>> {
    load_tokens_with_emails(store)
}

/// Get a user by ID or interactively pick one
pub fn get_or_pick_user(
    store: &impl Store,
    user_id: Option<String>,
    non_interactive: bool,
) -> anyhow::Result<Option<User>> {
    if let Some(id) = user_id {
        let user = store
            .get_user(&id)?
            .ok_or_else(|| anyhow::anyhow!("User not found: {}", id))?;
        Ok(Some(user))
    } else if non_interactive {
        anyhow::bail!("--user-id is required in non-interactive mode");
    } else {
        pick_user(store)
    }
}

/// Resolve a token's owner email from its user_id
pub fn resolve_token_email(store: &impl Store, token: &Token) -> anyhow::Result<Option<String>> {
    if let Some(ref uid) = token.user_id {
        if let Some(user) = store.get_user(uid)? {
            return Ok(Some(user.email));
        }
    }
    Ok(None)
}

/// Request confirmation for a destructive operation
pub fn confirm_action(message: &str, yes: bool, non_interactive: bool) -> anyhow::Result<bool> {
    if yes {
        Ok(true)
    } else if non_interactive {
        anyhow::bail!("--yes is required for destructive operations in non-interactive mode");
    } else {
        Ok(inquire::Confirm::new(message)
            .with_default(false)
            .prompt()?)
    }
}

/// Create a new token record for a user
pub fn create_token_for_user(
    generator: &TokenGenerator,
    user_id: Option<String>,
    expires_in: Option<Duration>,
) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let now = Utc::now();
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin: user_id.is_none(),
        user_id,
        created_at: now,
        expires_at: expires_in.map(|d| now + d),
        last_used_at: None,
    };
    Ok((token, raw_token))
}
