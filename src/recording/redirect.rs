//! Redirect target resolution

use url::Url;

use crate::{HttprecError, Result};

/// Canonical form of a URL as it is stored in a scenario
///
/// An empty path becomes `/`, matching what `hyper::Uri` and
/// [`resolve_redirect`] produce. Unparseable input is returned unchanged so
/// the transport can report the failure.
pub fn normalize_url(uri: &str) -> String {
    Url::parse(uri).map_or_else(|_| uri.to_string(), Into::into)
}

/// Resolve a `Location` header against the URL that produced it
///
/// Absolute locations are returned as parsed. Relative ones inherit scheme
/// and host from `current` and keep their own path and query.
///
/// # Errors
///
/// Returns `InvalidUrl` if either URL cannot be parsed
pub fn resolve_redirect(current: &str, location: &str) -> Result<String> {
    match Url::parse(location) {
        Ok(absolute) => Ok(absolute.into()),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let base = Url::parse(current)
                .map_err(|e| HttprecError::InvalidUrl(format!("{current}: {e}")))?;
            base.join(location)
                .map(Into::into)
                .map_err(|e| HttprecError::InvalidUrl(format!("{location}: {e}")))
        }
        Err(e) => Err(HttprecError::InvalidUrl(format!("{location}: {e}"))),
    }
}
