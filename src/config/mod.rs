//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AdminConfig (validated, immutable)
//!     → handed to each component constructor at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AdminConfig;
pub use schema::AuthConfig;
pub use schema::ListenerConfig;
pub use schema::LogFormat;
pub use schema::NginxConfig;
pub use schema::ObservabilityConfig;
pub use schema::TimeoutConfig;
