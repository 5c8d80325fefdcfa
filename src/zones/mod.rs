//! Zones and the zone manager.
//!
//! The manager is the single owner of card location data. It keeps two
//! views, a location map and per-zone member lists, and the pair must
//! stay mutually consistent: every membership question answers the same
//! whether asked through the location map or the member lists.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::cards::InstanceId;
use crate::core::PlayerId;
use crate::error::EngineError;

/// The kinds of zone in a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Library,
    Hand,
    Battlefield,
    Graveyard,
    Exile,
    Stack,
    Command,
}

impl ZoneKind {
    /// True where card order is part of the game state (library,
    /// graveyard, stack).
    #[must_use]
    pub fn is_ordered(self) -> bool {
        matches!(self, ZoneKind::Library | ZoneKind::Graveyard | ZoneKind::Stack)
    }

    /// True for zones that belong to a single player.
    #[must_use]
    pub fn is_per_player(self) -> bool {
        matches!(
            self,
            ZoneKind::Library | ZoneKind::Hand | ZoneKind::Graveyard | ZoneKind::Command
        )
    }

    /// True for zones whose contents are hidden from the opponent.
    #[must_use]
    pub fn is_hidden(self) -> bool {
        matches!(self, ZoneKind::Library | ZoneKind::Hand)
    }
}

impl std::fmt::Display for ZoneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ZoneKind::Library => "library",
            ZoneKind::Hand => "hand",
            ZoneKind::Battlefield => "battlefield",
            ZoneKind::Graveyard => "graveyard",
            ZoneKind::Exile => "exile",
            ZoneKind::Stack => "stack",
            ZoneKind::Command => "command",
        };
        write!(f, "{name}")
    }
}

/// A concrete zone: a kind plus its owner for per-player zones.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    pub kind: ZoneKind,
    /// `Some` exactly when the kind is per-player.
    pub owner: Option<PlayerId>,
}

impl ZoneId {
    #[must_use]
    pub const fn library(owner: PlayerId) -> Self {
        Self {
            kind: ZoneKind::Library,
            owner: Some(owner),
        }
    }

    #[must_use]
    pub const fn hand(owner: PlayerId) -> Self {
        Self {
            kind: ZoneKind::Hand,
            owner: Some(owner),
        }
    }

    #[must_use]
    pub const fn graveyard(owner: PlayerId) -> Self {
        Self {
            kind: ZoneKind::Graveyard,
            owner: Some(owner),
        }
    }

    #[must_use]
    pub const fn command(owner: PlayerId) -> Self {
        Self {
            kind: ZoneKind::Command,
            owner: Some(owner),
        }
    }

    #[must_use]
    pub const fn battlefield() -> Self {
        Self {
            kind: ZoneKind::Battlefield,
            owner: None,
        }
    }

    #[must_use]
    pub const fn exile() -> Self {
        Self {
            kind: ZoneKind::Exile,
            owner: None,
        }
    }

    #[must_use]
    pub const fn stack() -> Self {
        Self {
            kind: ZoneKind::Stack,
            owner: None,
        }
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.owner {
            Some(owner) => write!(f, "{}'s {}", owner, self.kind),
            None => write!(f, "the {}", self.kind),
        }
    }
}

/// Position for inserting a card into an ordered zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZonePosition {
    /// Top of the zone (where draws come from).
    Top,
    /// Bottom of the zone (where mulliganed cards go).
    Bottom,
}

/// Tracks which zone every card instance is in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ZoneManager {
    /// instance -> zone, for every instance in the game.
    locations: FxHashMap<InstanceId, ZoneId>,

    /// Per-zone member lists. Order is meaningful only for ordered
    /// zone kinds; index 0 is the bottom, the last index is the top.
    members: FxHashMap<ZoneId, Vec<InstanceId>>,
}

impl ZoneManager {
    /// Create a new empty zone manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a card to a zone.
    ///
    /// A card that is already tracked cannot be added again; that would
    /// desynchronize the two views, so it is an `InvariantViolation`.
    pub fn add(
        &mut self,
        card: InstanceId,
        zone: ZoneId,
        position: ZonePosition,
    ) -> Result<(), EngineError> {
        if let Some(existing) = self.locations.get(&card) {
            return Err(EngineError::invariant(format!(
                "card {card} added to {zone} but already in {existing}"
            )));
        }

        self.locations.insert(card, zone);
        let members = self.members.entry(zone).or_default();
        match position {
            ZonePosition::Top => members.push(card),
            ZonePosition::Bottom => members.insert(0, card),
        }
        Ok(())
    }

    /// Remove a card from the manager entirely.
    ///
    /// Returns the zone it was in, or `None` if not tracked.
    pub fn remove(&mut self, card: InstanceId) -> Option<ZoneId> {
        let zone = self.locations.remove(&card)?;
        if let Some(members) = self.members.get_mut(&zone) {
            members.retain(|&c| c != card);
        }
        Some(zone)
    }

    /// The zone a card is in.
    #[must_use]
    pub fn zone_of(&self, card: InstanceId) -> Option<ZoneId> {
        self.locations.get(&card).copied()
    }

    /// True if a card is in a specific zone.
    #[must_use]
    pub fn is_in(&self, card: InstanceId, zone: ZoneId) -> bool {
        self.locations.get(&card) == Some(&zone)
    }

    /// All cards in a zone. Ordered bottom-to-top for ordered zones.
    #[must_use]
    pub fn cards_in(&self, zone: ZoneId) -> &[InstanceId] {
        self.members.get(&zone).map_or(&[], Vec::as_slice)
    }

    /// Number of cards in a zone.
    #[must_use]
    pub fn size(&self, zone: ZoneId) -> usize {
        self.members.get(&zone).map_or(0, Vec::len)
    }

    /// The top card of an ordered zone.
    #[must_use]
    pub fn top(&self, zone: ZoneId) -> Option<InstanceId> {
        self.members.get(&zone)?.last().copied()
    }

    /// Remove and return the top card of an ordered zone.
    pub fn pop_top(&mut self, zone: ZoneId) -> Option<InstanceId> {
        let members = self.members.get_mut(&zone)?;
        let card = members.pop()?;
        self.locations.remove(&card);
        Some(card)
    }

    /// Shuffle an ordered zone in place.
    pub fn shuffle(&mut self, zone: ZoneId, rng: &mut crate::core::GameRng) {
        if let Some(members) = self.members.get_mut(&zone) {
            rng.shuffle(members);
        }
    }

    /// Verify the two views agree. Returns the first inconsistency
    /// found, as an `InvariantViolation`.
    pub fn verify(&self) -> Result<(), EngineError> {
        for (&card, &zone) in &self.locations {
            let listed = self
                .members
                .get(&zone)
                .is_some_and(|m| m.contains(&card));
            if !listed {
                return Err(EngineError::invariant(format!(
                    "card {card} located in {zone} but missing from its member list"
                )));
            }
        }
        for (&zone, members) in &self.members {
            for &card in members {
                if self.locations.get(&card) != Some(&zone) {
                    return Err(EngineError::invariant(format!(
                        "card {card} listed in {zone} but located elsewhere"
                    )));
                }
            }
        }
        Ok(())
    }
}
