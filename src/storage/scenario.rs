//! Scenario files: named, ordered collections of recorded sequences

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{HttprecError, Result};

/// Response header map: header name to every value received for it
pub type Headers = BTreeMap<String, Vec<String>>;

/// A persisted, ordered collection of recorded sequences
///
/// A scenario is identified by the file it was loaded from or created for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Recorded sequences, oldest first
    #[serde(default)]
    pub sequences: Vec<Sequence>,
    #[serde(skip)]
    path: PathBuf,
}

/// One recorded interaction, including every redirect hop taken
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Hops in the order they were issued
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One HTTP hop: the request and what came back
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Request method
    pub method: String,
    /// Full request URL
    pub request_url: String,
    /// Error or response, never both
    #[serde(flatten)]
    pub outcome: Outcome,
}

/// Result of a single hop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// Transport-level failure; the hop produced no response
    Error(String),
    /// Response received from the server
    Response(Response),
}

/// Recorded response metadata; the body lives in a separate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    #[serde(default)]
    pub headers: Headers,
    /// Body file name, relative to the scenario's directory.
    /// Redirect hops carry no body file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_filename: Option<String>,
}

impl Scenario {
    /// Load the scenario at `path`, or start an empty one if the file does not exist
    ///
    /// Returns the scenario and whether it was freshly created.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn init(path: impl AsRef<Path>) -> Result<(Self, bool)> {
        let path = path.as_ref();
        match fs::read(path) {
            Ok(data) => Ok((Self::parse(path, &data)?, false)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Creating new scenario: {}", path.display());
                Ok((
                    Self {
                        sequences: Vec::new(),
                        path: path.to_path_buf(),
                    },
                    true,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load an existing scenario
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the file is absent, `Parse` if it is malformed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                HttprecError::FileNotFound(path.display().to_string())
            } else {
                HttprecError::Io(e)
            }
        })?;
        Self::parse(path, &data)
    }

    fn parse(path: &Path, data: &[u8]) -> Result<Self> {
        let mut scenario: Self =
            serde_json::from_slice(data).map_err(|source| HttprecError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        scenario.path = path.to_path_buf();
        Ok(scenario)
    }

    /// File this scenario was loaded from or created for
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that body file names are relative to
    pub fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Number of sequences held
    pub fn count(&self) -> usize {
        self.sequences.len()
    }

    /// Append a sequence as a unit
    pub fn add_sequence(&mut self, sequence: Sequence) {
        self.sequences.push(sequence);
    }

    /// Serialize the whole scenario as JSON to `path`
    ///
    /// The file is written next to its destination and renamed into place,
    /// so a previous version is never left half-written.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_vec_pretty(self).map_err(|source| HttprecError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        write_atomic(path, &data)
    }

    /// Write one line per distinct top-level request URL, in recording order
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn save_as_url_list(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut list = String::new();
        for url in self.top_level_urls() {
            list.push_str(url);
            list.push('\n');
        }
        write_atomic(path.as_ref(), list.as_bytes())
    }

    /// First request URL of each sequence, de-duplicated, first seen first
    pub fn top_level_urls(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.sequences
            .iter()
            .filter_map(|seq| seq.steps.first())
            .map(|step| step.request_url.as_str())
            .filter(|url| seen.insert(*url))
            .collect()
    }
}

impl Sequence {
    /// The last hop, if any
    pub fn terminal(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// True if the sequence ended with a non-redirect response
    pub fn is_complete(&self) -> bool {
        self.terminal()
            .and_then(Step::response)
            .is_some_and(|r| !r.is_redirect())
    }
}

impl Step {
    /// Step for a hop that produced a response
    #[must_use]
    pub fn with_response(method: &str, request_url: &str, response: Response) -> Self {
        Self {
            method: method.to_string(),
            request_url: request_url.to_string(),
            outcome: Outcome::Response(response),
        }
    }

    /// Step for a hop that failed before any response
    #[must_use]
    pub fn with_error(method: &str, request_url: &str, error: impl Into<String>) -> Self {
        Self {
            method: method.to_string(),
            request_url: request_url.to_string(),
            outcome: Outcome::Error(error.into()),
        }
    }

    /// Recorded response, unless the hop failed
    pub fn response(&self) -> Option<&Response> {
        match &self.outcome {
            Outcome::Response(r) => Some(r),
            Outcome::Error(_) => None,
        }
    }

    /// Recorded error message, if the hop failed
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            Outcome::Error(e) => Some(e),
            Outcome::Response(_) => None,
        }
    }

    /// True if this hop answered with a 3xx
    pub fn is_redirect(&self) -> bool {
        self.response().is_some_and(Response::is_redirect)
    }
}

impl Response {
    /// True for 3xx statuses
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// All values for a header, matched case-insensitively
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(key, _)| key.eq_ignore_ascii_case(name))
            .flat_map(|(_, values)| values.iter().map(String::as_str))
    }

    /// First value for a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| HttprecError::Io(e.error))?;
    Ok(())
}
