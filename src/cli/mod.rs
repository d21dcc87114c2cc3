mod commands;
mod info;
pub mod pickers;
mod token;
mod user;

pub use commands::{AdminCommands, TokenCommands, UserCommands};
pub use info::run_info;
pub use token::{run_token_create, run_token_revoke};
pub use user::{run_user_add, run_user_remove};

use crate::store::SqliteStore;

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: std::path::PathBuf = data_dir.into();
    let db_path = data_path.join("tutorlog.db");

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'tutorlog admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}
