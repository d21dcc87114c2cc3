//! # Tutorlog
//!
//! A self-hosted tuition tracker, usable both as a standalone binary and as a library.
//!
//! Records students, the lessons taught to them, and month-by-month payment
//! status. When a lesson submission reaches a student's payment threshold the
//! server withholds the lesson and asks the client to settle the current
//! month's payment status before the lesson is committed.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! tutorlog = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use tutorlog::server::{AppState, create_router};
//! use tutorlog::store::SqliteStore;
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/tutorlog.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store)));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod flow;
pub mod server;
pub mod store;
pub mod types;
