//! Policy name normalization, as done by the policy editor command.
//!
//! A name is one file name, optionally under the `include/` directory:
//! `30-user`, `include/admin-ro`. Empty and `.` segments are dropped
//! (`include//./admin-ro` becomes `include/admin-ro`); anything that would
//! escape the policy directory or name another directory is rejected.

use std::io::Write;

use crate::error::ToolExit;
use crate::stdio;

/// Parent directory of include policies.
pub const INCLUDE_DIR: &str = "include";

const MAX_NAME_LEN: usize = 255;

/// Validate `raw` and return its canonical form.
///
/// On rejection a diagnostic is printed and the routine exits with
/// [`crate::FAILURE_STATUS`].
pub fn validate_name(raw: &str) -> Result<String, ToolExit> {
    match normalize(raw) {
        Ok(name) => Ok(name),
        Err(reason) => {
            writeln!(stdio::stdout(), "invalid policy name {raw:?}: {reason}")?;
            Err(ToolExit::failure())
        }
    }
}

/// Pure normalization; `Err` holds the reason for rejection.
pub fn normalize(raw: &str) -> Result<String, String> {
    if raw.starts_with('/') {
        return Err("absolute names are not allowed".to_string());
    }

    let segments: Vec<&str> = raw
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if segments.contains(&"..") {
        return Err("parent directory references are not allowed".to_string());
    }

    let file = match segments.as_slice() {
        [] => return Err("name is empty".to_string()),
        [file] => {
            if *file == INCLUDE_DIR {
                return Err(format!("'{INCLUDE_DIR}' is reserved for the include directory"));
            }
            file
        }
        [dir, file] if *dir == INCLUDE_DIR => file,
        [dir, _] => {
            return Err(format!(
                "only the '{INCLUDE_DIR}' subdirectory is supported, got '{dir}'"
            ))
        }
        _ => return Err("too many path segments".to_string()),
    };

    check_file_name(file)?;
    Ok(segments.join("/"))
}

fn check_file_name(file: &str) -> Result<(), String> {
    if file.len() > MAX_NAME_LEN {
        return Err(format!("longer than {MAX_NAME_LEN} characters"));
    }
    let mut chars = file.chars();
    let leading_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
    if !leading_ok {
        return Err("must start with a letter, digit or underscore".to_string());
    }
    if let Some(bad) = chars.find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '+' | '-'))) {
        return Err(format!("invalid character {bad:?}"));
    }
    Ok(())
}
