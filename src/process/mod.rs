//! External process subsystem.
//!
//! # Data Flow
//! ```text
//! validator.rs   → `nginx -t -c <file>`        → ValidationResult
//! controller.rs  → `nginx -s reload|stop`, `nginx -c <file>`, `pgrep -x nginx`
//!                                               → ProcessResult / ProcessStatus
//! command.rs     → spawn, capture stdout+stderr, enforce deadline
//! ```
//!
//! # Design Decisions
//! - One trait seam (`ExternalCommand`) so tests inject scripted fakes
//! - Non-zero exits are results, never errors
//! - Every command has a deadline; expiry is reported as `timed_out`

pub mod command;
pub mod controller;
pub mod validator;

pub use command::{ExternalCommand, ProcessResult, SystemCommand, ValidationResult};
pub use controller::{ProcessController, ProcessStatus, Reloader};
pub use validator::{FixedTargetValidator, ProcessValidator, Validator};
