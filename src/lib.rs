//! # Opslog
//!
//! Record-keeping backend for gate, mail, incident and operational logs,
//! usable both as a standalone server and as a library.
//!
//! Every listing goes through the same pipeline: the signed-in user's
//! business unit is resolved into an [`access::AccessScope`], combined with a
//! date range and a search term into a [`query::QuerySpec`], and executed by
//! a [`store::Store`] one page at a time.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! opslog = { version = "0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use opslog::config::ServerConfig;
//! use opslog::server::{AppState, create_router};
//! use opslog::store::{SqliteStore, Store};
//!
//! let config = ServerConfig::default();
//! let store = SqliteStore::new(config.db_path()).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(Arc::new(store), &config));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod access;
pub mod auth;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
pub mod listing;
pub mod photos;
pub mod query;
pub mod records;
pub mod server;
pub mod store;
pub mod types;
