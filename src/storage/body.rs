//! Response body files stored alongside a scenario

use std::fs;
use std::io;
use std::path::Path;

use tracing::debug;

use super::scenario::Headers;
use crate::{HttprecError, Result};

/// Extension used when the content type is absent or unknown
pub const DEFAULT_EXTENSION: &str = ".data";

/// Name of the body file for one hop: `<prefix>-<sequence>-<hop><ext>`
///
/// `sequence` and `hop` are the 1-based numbers written into the name; the
/// caller decides them.
#[must_use]
pub fn body_filename(prefix: &str, sequence: usize, hop: usize, extension: &str) -> String {
    format!("{prefix}-{sequence}-{hop}{extension}")
}

/// File extension for a response, inferred from its `Content-Type` values
///
/// Parameters such as `charset` are ignored. Among the extensions known for
/// the first recognized media type, the longest wins; ties keep the first one
/// listed. Common web types use [`COMMON_EXTENSIONS`]; anything else falls
/// back to the `mime_guess` table.
pub fn extension_for(headers: &Headers) -> String {
    headers
        .iter()
        .filter(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        .flat_map(|(_, values)| values.iter())
        .find_map(|value| longest_extension(value))
        .map_or_else(|| DEFAULT_EXTENSION.to_string(), |ext| format!(".{ext}"))
}

/// Conventional extensions for the media types web servers usually send
///
/// The full `mime_guess` table also lists rare aliases (`shtml`, `jfif`,
/// `pkgundef`) that would otherwise win the longest-extension rule.
pub const COMMON_EXTENSIONS: &[(&str, &[&str])] = &[
    ("application/javascript", &["js", "mjs"]),
    ("application/json", &["json"]),
    ("application/pdf", &["pdf"]),
    ("application/wasm", &["wasm"]),
    ("application/xml", &["xml"]),
    ("image/avif", &["avif"]),
    ("image/gif", &["gif"]),
    ("image/jpeg", &["jpeg", "jpg"]),
    ("image/png", &["png"]),
    ("image/svg+xml", &["svg"]),
    ("image/webp", &["webp"]),
    ("text/css", &["css"]),
    ("text/html", &["htm", "html"]),
    ("text/javascript", &["js", "mjs"]),
    ("text/plain", &["txt"]),
    ("text/xml", &["xml"]),
];

fn longest_extension(content_type: &str) -> Option<&'static str> {
    let media_type = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let extensions = COMMON_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == media_type)
        .map(|(_, extensions)| *extensions)
        .or_else(|| mime_guess::get_mime_extensions_str(&media_type))?;

    let mut best: Option<&'static str> = None;
    for &ext in extensions {
        if best.map_or(true, |b| ext.len() > b.len()) {
            best = Some(ext);
        }
    }
    best
}

/// Write a body file, replacing any previous content
///
/// # Errors
///
/// Returns error if the file cannot be written
pub fn save_body(path: &Path, body: &[u8]) -> Result<()> {
    debug!("Saving {} byte body to {}", body.len(), path.display());
    fs::write(path, body)?;
    Ok(())
}

/// Read a body file back
///
/// # Errors
///
/// Returns `Io` if the file is missing or unreadable
pub fn load_body(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            HttprecError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("body file missing: {}", path.display()),
            ))
        } else {
            HttprecError::Io(e)
        }
    })
}
