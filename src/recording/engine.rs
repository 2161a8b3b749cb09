//! Recorder: walks one redirect chain and appends it to a scenario

use std::fs;
use std::path::{Path, PathBuf};

use tracing::instrument::WithSubscriber;
use tracing::{debug, info, warn, Dispatch};

use super::{normalize_url, resolve_redirect, MAX_HOPS, RECORD_METHOD};
use crate::config::RecorderConfig;
use crate::network::{HttpClient, Transport};
use crate::storage::{
    body_filename, extension_for, save_body, scenario_prefix, sibling_file, Response, Scenario,
    Sequence, Step, SCENARIO_EXTENSION, URL_LIST_EXTENSION,
};
use crate::{HttprecError, Result};

/// Why a recorded sequence ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A non-redirect response was recorded along with its body
    Response,
    /// The request failed before any response; the last step holds the error
    TransportError,
    /// A redirect had no usable `Location`
    InvalidRedirect,
    /// Every allowed hop was a redirect
    HopLimit,
}

/// Summary of one [`Recorder::record`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordReport {
    /// Scenario file written
    pub scenario_file: PathBuf,
    /// 1-based position of the new sequence in the scenario
    pub sequence_ordinal: usize,
    /// Number of steps recorded
    pub hops: usize,
    /// Body file written for the final response, if any
    pub body_file: Option<PathBuf>,
    /// How the sequence ended
    pub termination: Termination,
}

impl RecordReport {
    /// True if recording stopped at the hop limit
    pub fn truncated(&self) -> bool {
        self.termination == Termination::HopLimit
    }
}

/// Records live HTTP exchanges, following redirects by hand
///
/// Log output goes to the [`Dispatch`] held by the recorder, which defaults to
/// the one current when it was built.
pub struct Recorder<T = HttpClient> {
    transport: T,
    max_hops: usize,
    logger: Dispatch,
}

impl Recorder<HttpClient> {
    /// Recorder over the network with default timeouts and hop limit
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&RecorderConfig::default())
    }

    /// Recorder over the network with the given settings
    #[must_use]
    pub fn from_config(config: &RecorderConfig) -> Self {
        Self::with_transport(HttpClient::new(config)).max_hops(config.max_hops)
    }
}

impl Default for Recorder<HttpClient> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> Recorder<T> {
    /// Recorder over any transport
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            max_hops: MAX_HOPS,
            logger: tracing::dispatcher::get_default(Dispatch::clone),
        }
    }

    /// Set the hop limit
    #[must_use]
    pub fn max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops.max(1);
        self
    }

    /// Send this recorder's log output to `logger`
    #[must_use]
    pub fn with_logger(mut self, logger: Dispatch) -> Self {
        self.logger = logger;
        self
    }

    /// Record `uri` as a new sequence of the scenario `scenario_name`
    ///
    /// `scenario_name` is a path without extension; `<name>.json` and
    /// `<name>.url` are rewritten and the body file lands next to them.
    /// Failed hops and bad redirects end the sequence but still count as a
    /// successful recording.
    ///
    /// # Errors
    ///
    /// Returns error if the scenario is malformed or any file cannot be written
    pub async fn record(
        &self,
        uri: &str,
        scenario_name: impl AsRef<Path>,
    ) -> Result<RecordReport> {
        self.record_into(uri, scenario_name.as_ref())
            .with_subscriber(self.logger.clone())
            .await
    }

    async fn record_into(&self, uri: &str, name: &Path) -> Result<RecordReport> {
        let prefix = scenario_prefix(name)?;
        let scenario_file = sibling_file(name, SCENARIO_EXTENSION);

        let (mut scenario, created) = Scenario::init(&scenario_file)?;
        if created {
            info!("Creating scenario {}", scenario_file.display());
        } else {
            info!(
                "Updating existing scenario: it contains {} sequences",
                scenario.count()
            );
        }

        let dir = scenario.dir().to_path_buf();
        fs::create_dir_all(&dir)?;

        let sequence_ordinal = scenario.count() + 1;
        let (sequence, body_file, termination) =
            self.capture(uri, prefix, sequence_ordinal, &dir).await?;

        let hops = sequence.steps.len();
        if termination == Termination::HopLimit {
            warn!("Stopped recording {uri} after {hops} redirects");
        }

        scenario.add_sequence(sequence);
        scenario.save_to(&scenario_file)?;
        scenario.save_as_url_list(sibling_file(name, URL_LIST_EXTENSION))?;

        debug!(
            "Saved sequence {} ({} hops) to {}",
            sequence_ordinal,
            hops,
            scenario_file.display()
        );

        Ok(RecordReport {
            scenario_file,
            sequence_ordinal,
            hops,
            body_file,
            termination,
        })
    }

    /// Walk the redirect chain starting at `uri`
    async fn capture(
        &self,
        uri: &str,
        prefix: &str,
        sequence_ordinal: usize,
        dir: &Path,
    ) -> Result<(Sequence, Option<PathBuf>, Termination)> {
        let mut sequence = Sequence::default();
        let mut current = normalize_url(uri);

        for hop in 0..self.max_hops {
            let exchange = match self.transport.get(&current).await {
                Ok(exchange) => exchange,
                Err(e) => {
                    warn!("Recording error for {current}: {e}");
                    let message = match e {
                        HttprecError::Transport(message) => message,
                        other => other.to_string(),
                    };
                    sequence
                        .steps
                        .push(Step::with_error(RECORD_METHOD, &current, message));
                    return Ok((sequence, None, Termination::TransportError));
                }
            };

            if exchange.is_redirect() {
                let location = exchange.header("location").map(str::to_string);
                info!(
                    "Recording redirect to: {}",
                    location.as_deref().unwrap_or("<missing>")
                );

                let response = Response {
                    status: exchange.status,
                    headers: exchange.headers,
                    body_filename: None,
                };
                sequence
                    .steps
                    .push(Step::with_response(RECORD_METHOD, &current, response));

                let Some(location) = location else {
                    warn!("Redirect from {current} has no Location header");
                    return Ok((sequence, None, Termination::InvalidRedirect));
                };

                match resolve_redirect(&current, &location) {
                    Ok(next) => current = next,
                    Err(e) => {
                        warn!("Not following redirect: {e}");
                        return Ok((sequence, None, Termination::InvalidRedirect));
                    }
                }
                continue;
            }

            info!("Recording response: {}", exchange.status);

            let extension = extension_for(&exchange.headers);
            let filename = body_filename(prefix, sequence_ordinal, hop + 1, &extension);
            let body_path = dir.join(&filename);
            save_body(&body_path, &exchange.body)?;

            let response = Response {
                status: exchange.status,
                headers: exchange.headers,
                body_filename: Some(filename),
            };
            sequence
                .steps
                .push(Step::with_response(RECORD_METHOD, &current, response));

            return Ok((sequence, Some(body_path), Termination::Response));
        }

        Ok((sequence, None, Termination::HopLimit))
    }
}
