//! Recording live redirect chains into scenario files

mod engine;
mod redirect;

pub use engine::{RecordReport, Recorder, Termination};
pub use redirect::{normalize_url, resolve_redirect};

/// Maximum number of hops recorded for one sequence
pub const MAX_HOPS: usize = 10;

/// Method used for every recorded hop
pub const RECORD_METHOD: &str = "GET";
