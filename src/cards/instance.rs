//! Card instances: one physical object in one zone.
//!
//! An instance is tied to the zone it sits in. When a card changes
//! zones the engine retires the old instance and allocates a fresh one,
//! so an `InstanceId` held by a stack entry or target silently goes
//! stale when the object moves. Stale targets are exactly how fizzling
//! falls out of resolution.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::definition::CardId;
use crate::core::PlayerId;
use crate::zones::ZoneId;

/// Unique identifier for one card object in one zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceId(pub u32);

impl InstanceId {
    /// Create a new instance ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutable per-object card state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardInstance {
    pub id: InstanceId,
    pub card: CardId,
    pub owner: PlayerId,
    pub controller: PlayerId,
    pub zone: ZoneId,
    pub tapped: bool,
    /// Summoning sickness: set when a creature arrives, cleared at its
    /// controller's untap step.
    pub sick: bool,
    pub is_token: bool,
    /// Counters by kind ("+1/+1", "loyalty", "lore", ...). Always
    /// non-negative; a kind at zero is removed from the map.
    pub counters: FxHashMap<String, u32>,
    /// Damage marked this turn. Cleared at cleanup.
    pub damage: i32,
    /// Set when a once-per-turn ability of this permanent is activated.
    /// Cleared at its controller's untap step.
    pub ability_used: bool,
    /// True once this object has been dealt damage by a deathtouch
    /// source this turn.
    pub deathtouched: bool,
    /// Turn this object arrived in its current zone. Newest-copy
    /// selection for the legend rule compares these.
    pub arrived_turn: u32,
}

impl CardInstance {
    /// Create a fresh instance in the given zone.
    #[must_use]
    pub fn new(id: InstanceId, card: CardId, owner: PlayerId, zone: ZoneId, turn: u32) -> Self {
        Self {
            id,
            card,
            owner,
            controller: owner,
            zone,
            tapped: false,
            sick: false,
            is_token: false,
            counters: FxHashMap::default(),
            damage: 0,
            ability_used: false,
            deathtouched: false,
            arrived_turn: turn,
        }
    }

    /// Counters of one kind on this object.
    #[must_use]
    pub fn counters_of(&self, kind: &str) -> u32 {
        self.counters.get(kind).copied().unwrap_or(0)
    }

    /// Add counters of one kind.
    pub fn add_counters(&mut self, kind: &str, n: u32) {
        if n == 0 {
            return;
        }
        *self.counters.entry(kind.to_string()).or_insert(0) += n;
    }

    /// Remove up to `n` counters of one kind. Returns how many were
    /// actually removed.
    pub fn remove_counters(&mut self, kind: &str, n: u32) -> u32 {
        let Some(current) = self.counters.get_mut(kind) else {
            return 0;
        };
        let removed = n.min(*current);
        *current -= removed;
        if *current == 0 {
            self.counters.remove(kind);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zones::ZoneKind;

    fn instance() -> CardInstance {
        CardInstance::new(
            InstanceId::new(1),
            CardId::new(0),
            PlayerId::new(0),
            ZoneId::battlefield(),
            1,
        )
    }

    #[test]
    fn test_new_instance_is_clean() {
        let card = instance();
        assert!(!card.tapped);
        assert!(!card.sick);
        assert_eq!(card.damage, 0);
        assert!(card.counters.is_empty());
        assert_eq!(card.zone.kind, ZoneKind::Battlefield);
    }

    #[test]
    fn test_counter_bookkeeping() {
        let mut card = instance();

        card.add_counters("+1/+1", 2);
        assert_eq!(card.counters_of("+1/+1"), 2);

        assert_eq!(card.remove_counters("+1/+1", 5), 2);
        assert_eq!(card.counters_of("+1/+1"), 0);
        // A kind at zero disappears from the map entirely.
        assert!(card.counters.is_empty());
    }

    #[test]
    fn test_remove_missing_kind() {
        let mut card = instance();
        assert_eq!(card.remove_counters("loyalty", 1), 0);
    }
}
