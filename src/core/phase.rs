//! Turn structure: phases and steps.
//!
//! The full Modern turn is modeled as a flat sequence of steps. Priority
//! is not offered during Untap or (normally) Cleanup; the state machine
//! handles that, this module only names the steps and their order.

use serde::{Deserialize, Serialize};

/// One step of a turn, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Untap,
    Upkeep,
    Draw,
    Main1,
    BeginCombat,
    DeclareAttackers,
    DeclareBlockers,
    CombatDamage,
    EndCombat,
    Main2,
    End,
    Cleanup,
}

impl Phase {
    /// All steps in turn order.
    pub const ALL: [Phase; 12] = [
        Phase::Untap,
        Phase::Upkeep,
        Phase::Draw,
        Phase::Main1,
        Phase::BeginCombat,
        Phase::DeclareAttackers,
        Phase::DeclareBlockers,
        Phase::CombatDamage,
        Phase::EndCombat,
        Phase::Main2,
        Phase::End,
        Phase::Cleanup,
    ];

    /// The next step of this turn, or `None` after Cleanup (the turn
    /// passes to the other player).
    #[must_use]
    pub fn next(self) -> Option<Phase> {
        let idx = Self::ALL.iter().position(|p| *p == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    /// True for the two main phases, where sorcery-speed actions are legal.
    #[must_use]
    pub fn is_main(self) -> bool {
        matches!(self, Phase::Main1 | Phase::Main2)
    }

    /// True for the combat steps.
    #[must_use]
    pub fn is_combat(self) -> bool {
        matches!(
            self,
            Phase::BeginCombat
                | Phase::DeclareAttackers
                | Phase::DeclareBlockers
                | Phase::CombatDamage
                | Phase::EndCombat
        )
    }

    /// True for steps where no player receives priority.
    #[must_use]
    pub fn skips_priority(self) -> bool {
        matches!(self, Phase::Untap | Phase::Cleanup)
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::Untap => "untap",
            Phase::Upkeep => "upkeep",
            Phase::Draw => "draw",
            Phase::Main1 => "first main",
            Phase::BeginCombat => "beginning of combat",
            Phase::DeclareAttackers => "declare attackers",
            Phase::DeclareBlockers => "declare blockers",
            Phase::CombatDamage => "combat damage",
            Phase::EndCombat => "end of combat",
            Phase::Main2 => "second main",
            Phase::End => "end step",
            Phase::Cleanup => "cleanup",
        };
        write!(f, "{name}")
    }
}
