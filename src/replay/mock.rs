//! Mock HTTP client answering from recorded scenarios

use std::path::PathBuf;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Request, Response};
use tracing::{debug, warn};

use super::index::ReplayIndex;
use super::{MatchPolicy, ReplayStats};
use crate::config::Config;
use crate::network::{Exchange, Transport};
use crate::storage::{load_body, sibling_file, Outcome, SCENARIO_EXTENSION};
use crate::{HttprecError, Result};

/// Recorded scenarios standing in for a live server
///
/// ```no_run
/// # async fn demo() -> httprec::Result<()> {
/// use httprec::network::Transport;
///
/// let mock = httprec::Mock::new("fixtures/");
/// mock.load_scenario("ProcessOne")?;
///
/// let client = mock.client();
/// let page = client.get("https://www.process-one.net/").await?;
/// assert_eq!(page.status, 200);
/// # Ok(())
/// # }
/// ```
pub struct Mock {
    fixtures_dir: PathBuf,
    policy: MatchPolicy,
    index: Arc<ReplayIndex>,
}

impl Mock {
    /// Mock resolving scenario names against `fixtures_dir`
    #[must_use]
    pub fn new(fixtures_dir: impl Into<PathBuf>) -> Self {
        Self {
            fixtures_dir: fixtures_dir.into(),
            policy: MatchPolicy::default(),
            index: Arc::new(ReplayIndex::new()),
        }
    }

    /// Mock using the fixture directory and match policy from `config`
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.fixtures_dir.clone()).with_policy(config.replay.match_policy)
    }

    /// Set the match policy for clients created afterwards
    #[must_use]
    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Current match policy
    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    /// Load `<fixtures_dir>/<name>.json`
    ///
    /// Scenarios accumulate; earlier loads take precedence when URLs repeat.
    ///
    /// # Errors
    ///
    /// Returns `FileNotFound` if the scenario is missing, `Parse` if malformed
    pub fn load_scenario(&self, name: &str) -> Result<()> {
        let path = sibling_file(&self.fixtures_dir.join(name), SCENARIO_EXTENSION);
        self.index.load(&path)
    }

    /// Client handle answering from the loaded scenarios
    pub fn client(&self) -> MockClient {
        MockClient {
            index: Arc::clone(&self.index),
            policy: self.policy,
        }
    }

    /// Lookup statistics across all clients
    pub fn stats(&self) -> ReplayStats {
        self.index.stats()
    }
}

/// Request-issuing handle backed by recorded fixtures
///
/// Never touches the network: unrecorded URLs fail with
/// [`HttprecError::NotFound`], and a hop that failed while recording fails
/// again with the recorded [`HttprecError::Transport`] message.
#[derive(Clone)]
pub struct MockClient {
    index: Arc<ReplayIndex>,
    policy: MatchPolicy,
}

impl MockClient {
    /// Replay the recorded outcome for `url`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss, `Transport` for a recorded failure, and
    /// `Io` if the body file is missing
    pub fn replay(&self, method: &str, url: &str) -> Result<Exchange> {
        let Some(matched) = self.index.lookup(url, self.policy) else {
            warn!("Replay miss: {method} {url}");
            return Err(HttprecError::NotFound {
                method: method.to_string(),
                url: url.to_string(),
            });
        };

        match matched.step.outcome {
            Outcome::Error(message) => {
                debug!("Replaying recorded error for {url}");
                Err(HttprecError::Transport(message))
            }
            Outcome::Response(response) => {
                let body = match &response.body_filename {
                    Some(name) => Bytes::from(load_body(&matched.dir.join(name))?),
                    None => Bytes::new(),
                };
                debug!("Replay hit: {method} {url} -> {}", response.status);
                Ok(Exchange {
                    status: response.status,
                    headers: response.headers,
                    body,
                })
            }
        }
    }

    /// Answer a hyper request from the fixtures
    ///
    /// Only the method and full URI of the request are consulted.
    ///
    /// # Errors
    ///
    /// As [`MockClient::replay`], plus `InvalidFixture` if the recorded status
    /// or headers are not valid HTTP
    pub fn send<B>(&self, request: &Request<B>) -> Result<Response<Full<Bytes>>> {
        let exchange = self.replay(request.method().as_str(), &request.uri().to_string())?;
        into_http_response(exchange)
    }
}

impl Transport for MockClient {
    async fn get(&self, uri: &str) -> Result<Exchange> {
        self.replay("GET", uri)
    }
}

fn into_http_response(exchange: Exchange) -> Result<Response<Full<Bytes>>> {
    let mut builder = Response::builder().status(exchange.status);
    for (name, values) in &exchange.headers {
        for value in values {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    builder
        .body(Full::new(exchange.body))
        .map_err(|e| HttprecError::InvalidFixture(e.to_string()))
}
