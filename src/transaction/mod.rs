//! Safe configuration update protocol.
//!
//! # Data Flow
//! ```text
//! new content
//!     → lock.rs (per-path mutex)
//!     → apply.rs: read current → BackupStore::create → write_atomic
//!                 → Validator::validate → (rollback | Reloader::reload)
//!     → TransactionOutcome
//! ```

pub mod apply;
pub mod fsio;
pub mod lock;

pub use apply::{ConfigTransaction, TransactionOutcome, TransactionState};
pub use lock::PathLocks;
