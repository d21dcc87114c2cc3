use std::fs;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tutorlog::auth::TokenGenerator;
use tutorlog::cli::{self, AdminCommands, TokenCommands, UserCommands};
use tutorlog::config::ServerConfig;
use tutorlog::server::{AppState, create_router};
use tutorlog::store::{SqliteStore, Store};
use tutorlog::types::{Token, User};

fn create_token(
    generator: &TokenGenerator,
    is_admin: bool,
    user_id: Option<String>,
) -> anyhow::Result<(Token, String)> {
    let (raw_token, lookup, hash) = generator.generate()?;
    let token = Token {
        id: Uuid::new_v4().to_string(),
        token_hash: hash,
        token_lookup: lookup,
        is_admin,
        user_id,
        created_at: Utc::now(),
        expires_at: None,
        last_used_at: None,
    };
    Ok((token, raw_token))
}

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "tutorlog")]
#[command(about = "A self-hosted tuition tracker", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "4000")]
        port: u16,

        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,
    },
}

fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: std::path::PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let db_path = data_path.join("tutorlog.db");
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;

    let token_file = data_path.join(".admin_token");

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (token, raw_token) = create_token(&generator, true, None)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_tutor_account_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_tutor_account_prompt(
    store: &SqliteStore,
    generator: &TokenGenerator,
) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create the tutor account now?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let email = inquire::Text::new("Email:")
        .with_validator(|input: &str| {
            if input.trim().is_empty() || !input.contains('@') {
                Err("A valid email address is required".into())
            } else {
                Ok(inquire::validator::Validation::Valid)
            }
        })
        .prompt()?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: email.clone(),
        created_at: now,
        updated_at: now,
    };

    store.create_user(&user)?;

    let (user_token, raw_token) = create_token(generator, false, Some(user.id))?;
    store.create_token(&user_token)?;

    println!();
    println!("========================================");
    println!("Created user '{email}' with token:");
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tutorlog=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => {
                run_init(data_dir, non_interactive)?;
            }
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    email,
                    create_token,
                    non_interactive,
                } => {
                    cli::run_user_add(data_dir, email, create_token, non_interactive)?;
                }
                UserCommands::Remove {
                    data_dir,
                    user_id,
                    non_interactive,
                    yes,
                } => {
                    cli::run_user_remove(data_dir, user_id, non_interactive, yes)?;
                }
            },
            AdminCommands::Token { command } => match command {
                TokenCommands::Create {
                    data_dir,
                    user_id,
                    expires_days,
                    non_interactive,
                    list,
                    json,
                } => {
                    cli::run_token_create(data_dir, user_id, expires_days, non_interactive, list, json)?;
                }
                TokenCommands::Revoke {
                    data_dir,
                    token_id,
                    non_interactive,
                    list,
                    json,
                    yes,
                } => {
                    cli::run_token_revoke(data_dir, token_id, non_interactive, list, json, yes)?;
                }
            },
            AdminCommands::Info { data_dir, json } => {
                cli::run_info(data_dir, json)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            let config = ServerConfig {
                host,
                port,
                data_dir: data_dir.into(),
            };

            let token_file = config.data_dir.join(".admin_token");
            if !token_file.exists() {
                bail!(
                    "Server not initialized. Run 'tutorlog admin init' first to create the database and admin token."
                );
            }

            let store = SqliteStore::new(config.db_path())?;
            if !store.has_admin_token()? {
                bail!(
                    "Server not initialized. Run 'tutorlog admin init' first to create the database and admin token."
                );
            }

            info!("Admin token available at {}", token_file.display());

            let state = Arc::new(AppState::new(Arc::new(store)));

            let app = create_router(state);
            let addr = config.socket_addr()?;

            info!("Starting server on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
