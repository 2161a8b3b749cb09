//! httprec - record live HTTP exchanges as fixture scenarios and replay them
//!
//! A [`recording::Recorder`] walks a redirect chain against a real server and
//! appends it as one sequence to a scenario file. A [`replay::Mock`] loads the
//! scenario back and answers requests from it without touching the network.

#![deny(unsafe_code)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_precision_loss,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod error;
pub mod network;
pub mod recording;
pub mod replay;
pub mod storage;

pub use error::{HttprecError, Result};
pub use recording::{RecordReport, Recorder};
pub use replay::{MatchPolicy, Mock, MockClient};
pub use storage::{Response, Scenario, Sequence, Step};
