//! The stack: pending spells, abilities, and triggers.
//!
//! Entries resolve strictly last-in first-out. An entry whose targets
//! have all gone stale by the time it resolves fizzles: it leaves the
//! stack with no effect, which is a normal resolution, not an error.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::cards::InstanceId;
use crate::core::{PlayerId, Target};
use crate::engine::triggers::TriggerEffect;
use crate::rules::effects::EffectTemplate;
use crate::state::GameState;

/// What an entry does when it resolves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StackPayload {
    /// A spell: the card object on the stack zone plus its bound
    /// script. An empty script is a plain permanent.
    Spell { effects: Vec<EffectTemplate> },
    /// An activated ability (the source stays on the battlefield).
    Ability { effects: Vec<EffectTemplate> },
    /// A triggered ability whose numbers are computed at resolution.
    Trigger(TriggerEffect),
}

/// One object waiting on the stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEntry {
    pub controller: PlayerId,
    /// The spell card on the stack, or the source permanent for
    /// abilities and triggers.
    pub source: InstanceId,
    /// True if the entry was announced with a targeting requirement.
    pub targeted: bool,
    pub targets: SmallVec<[Target; 2]>,
    pub payload: StackPayload,
    pub description: String,
}

impl StackEntry {
    /// True for entries that are not a spell card on the stack zone.
    #[must_use]
    pub fn is_ability(&self) -> bool {
        !matches!(self.payload, StackPayload::Spell { .. })
    }

    /// True if every target this entry was announced with has become
    /// illegal. Card targets go stale when the object changes zones;
    /// player targets never do.
    #[must_use]
    pub fn fizzled(&self, state: &GameState) -> bool {
        if !self.targeted {
            return false;
        }
        !self.targets.iter().any(|target| match target {
            Target::Player(_) => true,
            Target::Card(id) => state.exists(*id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::core::PlayerMap;
    use crate::zones::{ZoneId, ZonePosition};

    const P0: PlayerId = PlayerId::new(0);

    fn fresh_state() -> GameState {
        let decks = PlayerMap::new(|_| vec!["Swamp".to_string(); 5]);
        GameState::new(CardCatalog::standard(), &decks, 5).unwrap()
    }

    fn entry(targeted: bool, targets: &[Target]) -> StackEntry {
        StackEntry {
            controller: P0,
            source: InstanceId::new(999),
            targeted,
            targets: SmallVec::from_slice(targets),
            payload: StackPayload::Ability { effects: vec![] },
            description: "test entry".into(),
        }
    }

    #[test]
    fn test_untargeted_never_fizzles() {
        let state = fresh_state();
        assert!(!entry(false, &[]).fizzled(&state));
    }

    #[test]
    fn test_player_target_never_fizzles() {
        let state = fresh_state();
        assert!(!entry(true, &[Target::Player(P0)]).fizzled(&state));
    }

    #[test]
    fn test_stale_card_target_fizzles() {
        let mut state = fresh_state();
        let card = state.zones.top(ZoneId::library(P0)).unwrap();
        let e = entry(true, &[Target::Card(card)]);
        assert!(!e.fizzled(&state));

        // Moving the card retires the instance; the target is stale.
        state
            .move_card(card, ZoneId::hand(P0), ZonePosition::Top)
            .unwrap();
        assert!(e.fizzled(&state));
    }

    #[test]
    fn test_one_live_target_keeps_the_spell() {
        let mut state = fresh_state();
        let card = state.zones.top(ZoneId::library(P0)).unwrap();
        let e = entry(true, &[Target::Card(card), Target::Player(P0)]);

        state
            .move_card(card, ZoneId::hand(P0), ZonePosition::Top)
            .unwrap();
        assert!(!e.fizzled(&state));
    }
}
