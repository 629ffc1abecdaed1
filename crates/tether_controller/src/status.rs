//! Status surface.
//!
//! One line of text for whatever presentation layer is watching:
//! `"Trial 3 / 10 - Ready"`.

use std::sync::Arc;

use parking_lot::RwLock;

/// Write-only observer of the session.
pub trait StatusSink: Send {
    /// Replaces the current status text.
    fn set_status(&mut self, text: &str);
}

/// Coarse session state shown to the operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CoarseState {
    /// Player has control.
    Ready,
    /// Controller stopped; neutral commands only.
    Stopped,
    /// Rendering paused by the operator.
    Paused,
    /// Screen blanked between rounds.
    Blank,
    /// Win animation running.
    Animating,
}

impl CoarseState {
    /// Display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Ready => "Ready",
            Self::Stopped => "Stopped",
            Self::Paused => "Paused",
            Self::Blank => "Blank",
            Self::Animating => "Animating",
        }
    }
}

/// Formats the status line. `trial_index` is zero-based.
#[must_use]
pub fn format_status(trial_index: usize, total: usize, state: CoarseState) -> String {
    format!("Trial {} / {} - {}", trial_index + 1, total, state.label())
}

/// Sink that logs each change through `tracing`.
#[derive(Debug, Default)]
pub struct LogStatus {
    last: String,
}

impl StatusSink for LogStatus {
    fn set_status(&mut self, text: &str) {
        if self.last != text {
            tracing::info!("Status: {}", text);
            self.last = text.to_owned();
        }
    }
}

/// Sink that keeps the latest text for another thread or a test to read.
#[derive(Debug, Clone, Default)]
pub struct SharedStatus {
    text: Arc<RwLock<String>>,
    updates: Arc<RwLock<u64>>,
}

impl SharedStatus {
    /// Creates an empty status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest text.
    #[must_use]
    pub fn get(&self) -> String {
        self.text.read().clone()
    }

    /// Number of changes seen.
    #[must_use]
    pub fn updates(&self) -> u64 {
        *self.updates.read()
    }
}

impl StatusSink for SharedStatus {
    fn set_status(&mut self, text: &str) {
        let mut current = self.text.write();
        if *current != text {
            *current = text.to_owned();
            *self.updates.write() += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_is_one_based() {
        assert_eq!(format_status(0, 3, CoarseState::Ready), "Trial 1 / 3 - Ready");
        assert_eq!(format_status(2, 3, CoarseState::Blank), "Trial 3 / 3 - Blank");
    }

    #[test]
    fn shared_status_counts_changes_only() {
        let reader = SharedStatus::new();
        let mut writer = reader.clone();
        writer.set_status("Trial 1 / 1 - Ready");
        writer.set_status("Trial 1 / 1 - Ready");
        writer.set_status("Trial 1 / 1 - Stopped");
        assert_eq!(reader.get(), "Trial 1 / 1 - Stopped");
        assert_eq!(reader.updates(), 2);
    }
}
