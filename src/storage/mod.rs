//! Fixture storage: scenario JSON files and response body files

pub mod body;
mod scenario;

pub use body::{body_filename, extension_for, load_body, save_body, DEFAULT_EXTENSION};
pub use scenario::{Headers, Outcome, Response, Scenario, Sequence, Step};

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::{HttprecError, Result};

/// Extension of scenario files
pub const SCENARIO_EXTENSION: &str = "json";

/// Extension of the human-readable URL list
pub const URL_LIST_EXTENSION: &str = "url";

/// `<name>.<extension>`, appended rather than substituted so dotted names survive
#[must_use]
pub fn sibling_file(name: &Path, extension: &str) -> PathBuf {
    let mut file: OsString = name.as_os_str().to_owned();
    file.push(".");
    file.push(extension);
    PathBuf::from(file)
}

/// Validate a scenario name and return its file-name prefix
///
/// Names may include directories (`fixtures/login`); the last component is
/// used as the prefix for body files.
///
/// # Errors
///
/// Returns error if the name has no usable final component
pub fn scenario_prefix(name: &Path) -> Result<&str> {
    let prefix = name
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| HttprecError::InvalidScenarioName(name.display().to_string()))?;

    if prefix.is_empty() {
        return Err(HttprecError::InvalidScenarioName(
            "Scenario name cannot be empty".to_string(),
        ));
    }

    if prefix.starts_with('.') {
        return Err(HttprecError::InvalidScenarioName(
            "Scenario name cannot start with dot".to_string(),
        ));
    }

    if prefix.contains('\0') {
        return Err(HttprecError::InvalidScenarioName(
            "Scenario name cannot contain null bytes".to_string(),
        ));
    }

    Ok(prefix)
}
