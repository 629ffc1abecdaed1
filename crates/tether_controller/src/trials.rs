//! Trial queue.
//!
//! An ordered, wrapping list of scenarios. It is never empty: a missing or
//! broken feed degrades to the single built-in scenario.

use std::io::BufRead;
use std::path::Path;

use tether_shared::ScenarioConfig;

use crate::error::FeedError;

/// Ordered, wrapping sequence of scenarios.
#[derive(Debug, Clone, PartialEq)]
pub struct TrialQueue {
    trials: Vec<ScenarioConfig>,
    index: usize,
}

impl TrialQueue {
    /// Queue over `trials`. An empty list becomes the built-in scenario.
    #[must_use]
    pub fn new(trials: Vec<ScenarioConfig>) -> Self {
        if trials.is_empty() {
            tracing::warn!("Trial list is empty, using the built-in scenario");
            return Self::builtin();
        }
        Self { trials, index: 0 }
    }

    /// Queue holding only the built-in scenario.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            trials: vec![ScenarioConfig::builtin()],
            index: 0,
        }
    }

    /// Parses one JSON scenario per line. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// The first unreadable or malformed line.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, FeedError> {
        let mut trials = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line.map_err(|source| FeedError::Read { line: i + 1, source })?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let trial = serde_json::from_str(line)
                .map_err(|source| FeedError::Parse { line: i + 1, source })?;
            trials.push(trial);
        }
        Ok(Self::new(trials))
    }

    /// Opens and parses a feed file.
    ///
    /// # Errors
    ///
    /// The file is unreachable or has a malformed line.
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let queue = Self::from_reader(std::io::BufReader::new(file))?;
        tracing::info!("Loaded {} trials from {}", queue.len(), path.display());
        Ok(queue)
    }

    /// Like [`TrialQueue::try_load`], but any failure falls back to the
    /// built-in scenario.
    #[must_use]
    pub fn load(path: impl AsRef<Path>) -> Self {
        Self::try_load(path).unwrap_or_else(|e| {
            tracing::warn!("{}, using the built-in scenario", e);
            Self::builtin()
        })
    }

    /// Scenario at the current index.
    #[must_use]
    pub fn current(&self) -> &ScenarioConfig {
        &self.trials[self.index % self.trials.len()]
    }

    /// Scenario that [`TrialQueue::advance`] will move to.
    #[must_use]
    pub fn peek_next(&self) -> &ScenarioConfig {
        &self.trials[(self.index + 1) % self.trials.len()]
    }

    /// Moves to the next scenario, wrapping at the end.
    pub fn advance(&mut self) {
        self.index = (self.index + 1) % self.trials.len();
        tracing::info!("Trial {} / {}", self.index + 1, self.trials.len());
    }

    /// Jumps to `index`, wrapping.
    pub fn select(&mut self, index: usize) {
        self.index = index % self.trials.len();
    }

    /// Current index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Number of scenarios.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trials.len()
    }

    /// Never true once constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }

    /// All scenarios in order.
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioConfig> {
        self.trials.iter()
    }
}

impl Default for TrialQueue {
    fn default() -> Self {
        Self::builtin()
    }
}
