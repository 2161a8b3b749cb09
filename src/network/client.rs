//! HTTP client for fetching live responses while recording

use std::error::Error as StdError;
use std::time::Duration;

use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper::header::{HeaderMap, USER_AGENT};
use hyper::{Method, Request, Uri};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tracing::{debug, warn};

use super::{Exchange, Transport};
use crate::config::RecorderConfig;
use crate::storage::Headers;
use crate::{HttprecError, Result};

const AGENT: &str = concat!("httprec/", env!("CARGO_PKG_VERSION"));

/// HTTP(S) client that reports redirects instead of following them
pub struct HttpClient {
    client: Client<HttpsConnector<HttpConnector>, Empty<Bytes>>,
    request_timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client with the given timeouts
    #[must_use]
    pub fn new(config: &RecorderConfig) -> Self {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        http.set_connect_timeout(Some(config.connect_timeout()));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(90))
            .build(HttpsConnector::new_with_connector(http));

        Self {
            client,
            request_timeout: config.request_timeout(),
        }
    }

    async fn fetch(&self, uri: &str) -> Result<Exchange> {
        let parsed = uri
            .parse::<Uri>()
            .map_err(|e| HttprecError::Transport(format!("Invalid URI '{uri}': {e}")))?;

        debug!("GET {}", parsed);

        let request = Request::builder()
            .method(Method::GET)
            .uri(parsed)
            .header(USER_AGENT, AGENT)
            .body(Empty::new())
            .map_err(|e| HttprecError::Transport(format!("Failed to build request: {e}")))?;

        let response = self.client.request(request).await.map_err(|e| {
            warn!("Request failed: {e}");
            HttprecError::Transport(error_chain(&e))
        })?;

        let status = response.status().as_u16();
        let headers = convert_headers(response.headers());

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| HttprecError::Transport(format!("Failed to read response body: {e}")))?
            .to_bytes();

        Ok(Exchange {
            status,
            headers,
            body,
        })
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(&RecorderConfig::default())
    }
}

impl Transport for HttpClient {
    async fn get(&self, uri: &str) -> Result<Exchange> {
        tokio::time::timeout(self.request_timeout, self.fetch(uri))
            .await
            .map_err(|_| {
                HttprecError::Transport(format!(
                    "Request to {uri} timed out after {}ms",
                    self.request_timeout.as_millis()
                ))
            })?
    }
}

/// Group header values by name, keeping every value in arrival order
fn convert_headers(headers: &HeaderMap) -> Headers {
    let mut converted = Headers::new();
    for (name, value) in headers {
        converted
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    converted
}

/// Flatten an error and its sources into one line
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
