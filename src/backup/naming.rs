//! Backup and artifact file name rules.
//!
//! Backups are named `<artifact>.<YYYYMMDD_HHMMSS>.backup`, so lexical order
//! of names equals creation order. Same-second collisions get a two digit
//! counter on the stamp (`_01`, `_02`, ...), which still sorts after the
//! plain stamp because `_` > `.` in ASCII.

use chrono::NaiveDateTime;

use crate::error::{ConfError, ConfResult};

pub const BACKUP_SUFFIX: &str = ".backup";
pub const SERVER_SUFFIX: &str = ".conf";
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Backup prefix of the primary configuration, whatever its file is called.
pub const PRIMARY_ARTIFACT: &str = "nginx.conf";

/// Highest disambiguating counter tried within one second.
pub const MAX_SEQUENCE: u32 = 99;

const STAMP_LEN: usize = 15;

/// Letters, digits, `.`, `_` and `-` only; never empty, `.` or `..`.
pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() || name == "." || name == ".." {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

pub fn ensure_safe_name(name: &str) -> ConfResult<()> {
    if is_safe_name(name) {
        Ok(())
    } else {
        Err(ConfError::InvalidName(name.to_string()))
    }
}

/// Append `.conf` when missing, then check the result.
pub fn normalize_server_name(name: &str) -> ConfResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfError::InvalidName("name is required".to_string()));
    }
    ensure_safe_name(name)?;
    let file_name = if name.ends_with(SERVER_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{SERVER_SUFFIX}")
    };
    ensure_safe_name(&file_name)?;
    Ok(file_name)
}

pub fn format_stamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Build a backup name; `sequence` 0 means no counter.
pub fn backup_name(artifact: &str, stamp: &str, sequence: u32) -> String {
    if sequence == 0 {
        format!("{artifact}.{stamp}{BACKUP_SUFFIX}")
    } else {
        format!("{artifact}.{stamp}_{sequence:02}{BACKUP_SUFFIX}")
    }
}

/// Backup names must be safe file names ending in `.backup`.
pub fn ensure_backup_name(name: &str) -> ConfResult<()> {
    if is_safe_name(name) && name.ends_with(BACKUP_SUFFIX) && name.len() > BACKUP_SUFFIX.len() {
        Ok(())
    } else {
        Err(ConfError::InvalidName(name.to_string()))
    }
}

/// The artifact a backup belongs to, or `None` if the name does not follow
/// the `<artifact>.<stamp>.backup` grammar.
pub fn artifact_of(backup: &str) -> Option<&str> {
    let rest = backup.strip_suffix(BACKUP_SUFFIX)?;
    let (artifact, stamp) = rest.rsplit_once('.')?;
    if artifact.is_empty() || !is_stamp(stamp) {
        return None;
    }
    Some(artifact)
}

fn is_stamp(stamp: &str) -> bool {
    let (base, counter) = match stamp.split_at_checked(STAMP_LEN) {
        Some(parts) => parts,
        None => return false,
    };
    if NaiveDateTime::parse_from_str(base, TIMESTAMP_FORMAT).is_err() {
        return false;
    }
    match counter.strip_prefix('_') {
        None => counter.is_empty(),
        Some(digits) => digits.len() == 2 && digits.chars().all(|c| c.is_ascii_digit()),
    }
}
