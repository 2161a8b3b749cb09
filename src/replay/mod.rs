//! Replaying recorded scenarios in place of a live server
//!
//! Candidates are searched in the order scenarios were loaded, then in
//! recording order; the first step whose request URL equals the requested URL
//! (exact string comparison) answers. Which steps are candidates depends on
//! the [`MatchPolicy`].

mod index;
mod mock;

pub use index::{Matched, ReplayIndex, ReplayStats};
pub use mock::{Mock, MockClient};

use serde::{Deserialize, Serialize};

/// Which recorded steps may answer a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchPolicy {
    /// Only the last step of each sequence; requests for a URL that redirected
    /// during recording are not found
    #[default]
    TerminalOnly,
    /// Any step; redirect hops come back as recorded 3xx responses
    AnyStep,
    /// Any step; a redirect hop is followed through the rest of its sequence
    /// and the final recorded outcome is returned
    FollowRedirects,
}
