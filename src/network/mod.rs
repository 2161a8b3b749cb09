//! Transport seam between the recorder and the network
//!
//! The recorder only needs GET requests that surface redirects instead of
//! following them. [`HttpClient`] does that over hyper; the replay
//! [`MockClient`](crate::replay::MockClient) implements the same trait from
//! recorded fixtures.

mod client;

pub use client::HttpClient;

use std::future::Future;

use bytes::Bytes;

use crate::storage::Headers;
use crate::Result;

/// A response as seen by the transport: status, headers and full body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// HTTP status code
    pub status: u16,
    /// Response headers
    pub headers: Headers,
    /// Response body
    pub body: Bytes,
}

impl Exchange {
    /// True for 3xx statuses
    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }

    /// First value of a header, matched case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .and_then(|(_, values)| values.first())
            .map(String::as_str)
    }
}

/// Something that can issue a GET without following redirects
pub trait Transport {
    /// Fetch `uri` once
    ///
    /// A 3xx comes back as a normal [`Exchange`]. Network, DNS, TLS and
    /// timeout failures come back as [`HttprecError::Transport`](crate::HttprecError::Transport).
    fn get(&self, uri: &str) -> impl Future<Output = Result<Exchange>> + Send;
}
