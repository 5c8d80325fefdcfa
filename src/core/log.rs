//! Append-only change log.
//!
//! Every primitive state transition returns a `LogEntry` describing
//! what changed. Deterministic resolution and oracle-applied verdicts
//! share this surface, so the log is a complete audit trail of the game
//! regardless of which path mutated state.

use im::Vector;
use serde::{Deserialize, Serialize};

use crate::core::Phase;

/// One recorded state change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub turn: u32,
    pub phase: Phase,
    pub detail: String,
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[T{} {}] {}", self.turn, self.phase, self.detail)
    }
}

/// The full game log. Backed by `im::Vector` so state snapshots share
/// structure instead of copying the history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeLog {
    entries: Vector<LogEntry>,
}

impl ChangeLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry and return a copy of it.
    pub fn record(&mut self, turn: u32, phase: Phase, detail: impl Into<String>) -> LogEntry {
        let entry = LogEntry {
            turn,
            phase,
            detail: detail.into(),
        };
        self.entries.push_back(entry.clone());
        entry
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    /// The most recent entry, if any.
    #[must_use]
    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_appends() {
        let mut log = ChangeLog::new();
        assert!(log.is_empty());

        let entry = log.record(1, Phase::Upkeep, "Player 0 loses 2 life");
        assert_eq!(log.len(), 1);
        assert_eq!(log.last(), Some(&entry));
    }

    #[test]
    fn test_snapshots_share_history() {
        let mut log = ChangeLog::new();
        log.record(1, Phase::Draw, "Player 0 draws a card");

        let snapshot = log.clone();
        log.record(1, Phase::Main1, "Player 0 plays Swamp");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_display() {
        let mut log = ChangeLog::new();
        let entry = log.record(3, Phase::End, "turn passes");
        assert_eq!(format!("{entry}"), "[T3 end step] turn passes");
    }
}
