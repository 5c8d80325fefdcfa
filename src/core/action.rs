//! Player actions and targets.
//!
//! Every decision a player can announce while holding priority (plus
//! the turn-based declarations for combat) is one `Action`. The legal
//! enumerator produces these; the engine consumes them. Anything not in
//! the enumerated set is rejected before it can touch game state.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::InstanceId;
use crate::core::PlayerId;

/// Something a spell or ability points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Target {
    Card(InstanceId),
    Player(PlayerId),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Target::Card(id) => write!(f, "{id}"),
            Target::Player(p) => write!(f, "{p}"),
        }
    }
}

/// The closed set of action kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    PlayLand,
    CastSpell,
    ActivateAbility,
    Attack,
    Block,
    PassPriority,
    Concede,
}

/// One announced action.
///
/// `card` is the land played, spell cast, source of the activated
/// ability, attacker, or blocker, depending on `kind`. For a block,
/// `targets` holds the attacker being blocked. `mode` selects among the
/// modes of a modal spell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub player: PlayerId,
    pub card: Option<InstanceId>,
    pub targets: SmallVec<[Target; 2]>,
    pub mode: Option<String>,
    /// Human-readable summary for logs and the interactive front end.
    pub description: String,
}

impl Action {
    /// Pass priority without acting.
    #[must_use]
    pub fn pass(player: PlayerId) -> Self {
        Self {
            kind: ActionKind::PassPriority,
            player,
            card: None,
            targets: SmallVec::new(),
            mode: None,
            description: "pass priority".into(),
        }
    }

    /// Concede the game.
    #[must_use]
    pub fn concede(player: PlayerId) -> Self {
        Self {
            kind: ActionKind::Concede,
            player,
            card: None,
            targets: SmallVec::new(),
            mode: None,
            description: "concede".into(),
        }
    }

    /// Play a land from hand.
    #[must_use]
    pub fn play_land(player: PlayerId, card: InstanceId, name: &str) -> Self {
        Self {
            kind: ActionKind::PlayLand,
            player,
            card: Some(card),
            targets: SmallVec::new(),
            mode: None,
            description: format!("play {name}"),
        }
    }

    /// Cast a spell, with whatever targets it requires.
    #[must_use]
    pub fn cast(
        player: PlayerId,
        card: InstanceId,
        name: &str,
        targets: impl IntoIterator<Item = Target>,
    ) -> Self {
        let targets: SmallVec<[Target; 2]> = targets.into_iter().collect();
        let description = if targets.is_empty() {
            format!("cast {name}")
        } else {
            let shown: Vec<String> = targets.iter().map(ToString::to_string).collect();
            format!("cast {name} targeting {}", shown.join(", "))
        };
        Self {
            kind: ActionKind::CastSpell,
            player,
            card: Some(card),
            targets,
            mode: None,
            description,
        }
    }

    /// Select a mode on a modal spell action.
    #[must_use]
    pub fn with_mode(mut self, mode: &str) -> Self {
        self.description = format!("{} ({mode})", self.description);
        self.mode = Some(mode.to_string());
        self
    }

    /// Activate an ability of a permanent.
    #[must_use]
    pub fn activate(
        player: PlayerId,
        source: InstanceId,
        ability: &str,
        targets: impl IntoIterator<Item = Target>,
    ) -> Self {
        Self {
            kind: ActionKind::ActivateAbility,
            player,
            card: Some(source),
            targets: targets.into_iter().collect(),
            mode: Some(ability.to_string()),
            description: format!("activate {ability}"),
        }
    }

    /// Declare one creature as an attacker.
    #[must_use]
    pub fn attack(player: PlayerId, attacker: InstanceId, name: &str) -> Self {
        Self {
            kind: ActionKind::Attack,
            player,
            card: Some(attacker),
            targets: SmallVec::new(),
            mode: None,
            description: format!("attack with {name}"),
        }
    }

    /// Declare one creature as a blocker of one attacker.
    #[must_use]
    pub fn block(player: PlayerId, blocker: InstanceId, attacker: InstanceId, name: &str) -> Self {
        Self {
            kind: ActionKind::Block,
            player,
            card: Some(blocker),
            targets: SmallVec::from_slice(&[Target::Card(attacker)]),
            mode: None,
            description: format!("block with {name}"),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.player, self.description)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_has_no_card() {
        let action = Action::pass(PlayerId::new(0));
        assert_eq!(action.kind, ActionKind::PassPriority);
        assert!(action.card.is_none());
        assert!(action.targets.is_empty());
    }

    #[test]
    fn test_cast_description_names_targets() {
        let action = Action::cast(
            PlayerId::new(0),
            InstanceId::new(7),
            "Lightning Bolt",
            [Target::Player(PlayerId::new(1))],
        );
        assert_eq!(
            action.description,
            "cast Lightning Bolt targeting Player 1"
        );
    }

    #[test]
    fn test_block_records_attacker_as_target() {
        let attacker = InstanceId::new(3);
        let action = Action::block(PlayerId::new(1), InstanceId::new(9), attacker, "Wall");
        assert_eq!(action.targets.as_slice(), &[Target::Card(attacker)]);
    }
}
