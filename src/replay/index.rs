//! Ordered lookup over loaded scenarios

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use tracing::{debug, info};

use super::MatchPolicy;
use crate::storage::{Scenario, Step};
use crate::Result;

/// A step chosen to answer a request, with the directory its body lives in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matched {
    /// Step whose outcome is replayed
    pub step: Step,
    /// Directory body file names are relative to
    pub dir: PathBuf,
}

/// Loaded scenarios in load order, with hit/miss counters
#[derive(Default)]
pub struct ReplayIndex {
    scenarios: RwLock<Vec<Scenario>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl ReplayIndex {
    /// Create an empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a scenario file and append it after those already loaded
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing or malformed
    pub fn load(&self, path: &Path) -> Result<()> {
        debug!("Loading scenario: {}", path.display());
        let scenario = Scenario::load(path)?;
        self.insert(scenario);
        Ok(())
    }

    /// Append an already loaded scenario
    pub fn insert(&self, scenario: Scenario) {
        info!(
            "Loaded scenario '{}': {} sequences",
            scenario.path().display(),
            scenario.count()
        );
        self.write().push(scenario);
    }

    /// First step answering `url` under `policy`
    pub fn lookup(&self, url: &str, policy: MatchPolicy) -> Option<Matched> {
        let scenarios = self.read();
        let found = scenarios.iter().find_map(|scenario| {
            scenario.sequences.iter().find_map(|sequence| {
                let steps = &sequence.steps;
                let position = match policy {
                    MatchPolicy::TerminalOnly => steps
                        .last()
                        .filter(|step| step.request_url == url)
                        .map(|_| steps.len() - 1),
                    MatchPolicy::AnyStep | MatchPolicy::FollowRedirects => {
                        steps.iter().position(|step| step.request_url == url)
                    }
                }?;

                let answer = match policy {
                    MatchPolicy::FollowRedirects => follow(steps, position),
                    _ => &steps[position],
                };

                Some(Matched {
                    step: answer.clone(),
                    dir: scenario.dir().to_path_buf(),
                })
            })
        });

        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Number of loaded scenarios
    pub fn scenario_count(&self) -> usize {
        self.read().len()
    }

    /// Number of sequences across loaded scenarios
    pub fn sequence_count(&self) -> usize {
        self.read().iter().map(Scenario::count).sum()
    }

    /// Lookup statistics
    pub fn stats(&self) -> ReplayStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        ReplayStats {
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            sequences: self.sequence_count(),
        }
    }

    /// Drop loaded scenarios and reset counters
    pub fn clear(&self) {
        self.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<Scenario>> {
        self.scenarios
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Scenario>> {
        self.scenarios
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// From a matched hop, walk recorded redirects to where the chain ended
fn follow(steps: &[Step], start: usize) -> &Step {
    let mut position = start;
    while steps[position].is_redirect() && position + 1 < steps.len() {
        position += 1;
    }
    &steps[position]
}

/// Replay statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayStats {
    /// Lookups answered
    pub hits: usize,
    /// Lookups with no recorded interaction
    pub misses: usize,
    /// Hit rate (0.0 to 1.0)
    pub hit_rate: f64,
    /// Sequences available
    pub sequences: usize,
}
