//! Nginx configuration management service.
//!
//! Edits the primary config and per-server files through a backup, apply,
//! validate, reload protocol that rolls back whenever validation fails.

pub mod api;
pub mod backup;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod process;
pub mod resources;
pub mod transaction;

pub use config::AdminConfig;
pub use error::{ConfError, ConfResult, ErrorKind};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
