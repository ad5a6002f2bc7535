//! Backup subsystem.
//!
//! # Data Flow
//! ```text
//! artifact content
//!     → store.rs (exclusive create under a stamped name, fsync)
//!     → <backups_dir>/<artifact>.<YYYYMMDD_HHMMSS>.backup
//! ```
//!
//! # Design Decisions
//! - Names double as identity and sort key
//! - Snapshots are immutable; only explicit deletes remove them
//! - No automatic pruning

pub mod clock;
pub mod naming;
pub mod store;

pub use clock::{Clock, SystemClock};
pub use store::{Backup, BackupInfo, BackupStore};
