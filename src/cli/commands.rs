use clap::Subcommand;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Skip interactive prompts
        #[arg(long)]
        non_interactive: bool,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },

    /// Manage access tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Show server status information
    Info {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommands {
    /// Add a new user with an optional token
    Add {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Email address for the new user
        #[arg(long)]
        email: Option<String>,

        /// Create a token for the new user
        #[arg(long)]
        create_token: bool,

        /// Skip interactive prompts (requires --email)
        #[arg(long)]
        non_interactive: bool,
    },

    /// Remove a user
    Remove {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// User ID to remove
        #[arg(long)]
        user_id: Option<String>,

        /// Skip interactive prompts (requires --user-id)
        #[arg(long)]
        non_interactive: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Create a new access token
    Create {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// User ID for the token
        #[arg(long)]
        user_id: Option<String>,

        /// Token expiration in days (omit for no expiration)
        #[arg(long)]
        expires_days: Option<i64>,

        /// Skip interactive prompts (requires --user-id)
        #[arg(long)]
        non_interactive: bool,

        /// List existing tokens instead of creating one
        #[arg(long)]
        list: bool,

        /// Output lists as JSON
        #[arg(long)]
        json: bool,
    },

    /// Revoke an access token
    Revoke {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Token ID to revoke
        #[arg(long)]
        token_id: Option<String>,

        /// Skip interactive prompts (requires --token-id)
        #[arg(long)]
        non_interactive: bool,

        /// List existing tokens instead of revoking one
        #[arg(long)]
        list: bool,

        /// Output lists as JSON
        #[arg(long)]
        json: bool,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}
