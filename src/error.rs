//! The engine's error taxonomy.
//!
//! Illegal actions, rejected oracle verdicts, and an unreachable
//! oracle are all recoverable: the offending action is discarded and
//! the acting side picks again from the same state. Only a broken
//! internal invariant ends the game as a failure.

use derive_more::{Display, Error};

/// Everything that can go wrong while running a game.
#[derive(Clone, Debug, Display, Error, PartialEq, Eq)]
pub enum EngineError {
    /// An announced action is outside the legal set. The state is
    /// untouched; the actor picks again.
    #[display("illegal action: {detail}")]
    IllegalAction { detail: String },

    /// The rules oracle could not be reached or did not answer in
    /// time. The pending interaction fails; the actor chooses again.
    #[display("rules oracle unavailable: {detail}")]
    OracleUnavailable { detail: String },

    /// The oracle answered, but its verdict declared the interaction
    /// illegal or described changes the engine refuses to apply. No
    /// state was mutated.
    #[display("oracle verdict rejected: {detail}")]
    OracleVerdictRejected { detail: String },

    /// An internal consistency check failed. Carries a state dump for
    /// the post-mortem.
    #[display("invariant violation: {detail}\n{dump}")]
    InvariantViolation { detail: String, dump: String },
}

impl EngineError {
    /// An `IllegalAction` with the given detail.
    #[must_use]
    pub fn illegal(detail: impl Into<String>) -> Self {
        Self::IllegalAction {
            detail: detail.into(),
        }
    }

    /// An `InvariantViolation` without a state dump attached. Prefer
    /// `GameState::invariant_violation` when a state is at hand.
    #[must_use]
    pub fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
            dump: String::new(),
        }
    }

    /// True for errors that abort the game rather than re-offering the
    /// choice to the actor.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}
