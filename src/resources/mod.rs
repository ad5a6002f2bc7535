//! File resources exposed over the API.
//!
//! # Data Flow
//! ```text
//! config_file.rs  → primary nginx.conf: read, save (transaction), test, snapshot
//! servers.rs      → servers/*.conf: list, read, save (transaction), create,
//!                   rename, delete (best-effort backup first)
//! backups.rs      → list, restore, delete snapshots
//! ```

pub mod backups;
pub mod config_file;
pub mod servers;

pub use backups::{BackupResource, RestoreOutcome};
pub use config_file::ConfigResource;
pub use servers::{CreatedServer, ServerFile, ServerInfo, ServerResource, DEFAULT_SERVER_TEMPLATE};
