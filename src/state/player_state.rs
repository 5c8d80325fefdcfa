//! Per-player mutable state.

use serde::{Deserialize, Serialize};

use crate::core::ManaPool;

/// Everything about a player that is not a card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    pub life: i32,
    pub poison: u32,
    pub mana: ManaPool,
    /// Lands played this turn. Reset at untap.
    pub lands_played: u32,
    /// Loss reason once this player has lost; the state-based-action
    /// pass turns it into the terminal result.
    pub has_lost: Option<String>,
    /// Set by an attempted draw from an empty library.
    pub drew_from_empty: bool,
    /// Mulligans taken before this game started.
    pub mulligans: u32,
}

impl PlayerState {
    /// A player at the start of a game.
    #[must_use]
    pub fn new() -> Self {
        Self {
            life: 20,
            poison: 0,
            mana: ManaPool::new(),
            lands_played: 0,
            has_lost: None,
            drew_from_empty: false,
            mulligans: 0,
        }
    }

    /// True once any loss condition has marked this player.
    #[must_use]
    pub fn lost(&self) -> bool {
        self.has_lost.is_some()
    }
}

impl Default for PlayerState {
    fn default() -> Self {
        Self::new()
    }
}
