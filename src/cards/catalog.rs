//! Card catalog: read-only definition lookup by name or id.
//!
//! The catalog is populated once before a match starts. Building it
//! from an external card database is out of scope; decks reference
//! catalog entries by exact name.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::definition::{CardDefinition, CardId, CardType};
use crate::core::ManaColor;

/// All card definitions known to a match.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CardCatalog {
    cards: FxHashMap<CardId, CardDefinition>,
    by_name: FxHashMap<String, CardId>,
    next_id: u32,
}

impl CardCatalog {
    /// Create a new empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under the next free id and return that id.
    ///
    /// Panics on a duplicate name; the catalog is authored before play,
    /// not built from user input.
    pub fn register(&mut self, build: impl FnOnce(CardId) -> CardDefinition) -> CardId {
        let id = CardId::new(self.next_id);
        self.next_id += 1;

        let card = build(id);
        if self.by_name.contains_key(&card.name) {
            panic!("duplicate card name {:?}", card.name);
        }
        self.by_name.insert(card.name.clone(), id);
        self.cards.insert(id, card);
        id
    }

    /// Look up a definition by id.
    #[must_use]
    pub fn get(&self, id: CardId) -> Option<&CardDefinition> {
        self.cards.get(&id)
    }

    /// Look up a definition by exact name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&CardDefinition> {
        self.by_name.get(name).and_then(|id| self.cards.get(id))
    }

    /// Look up a card id by exact name.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<CardId> {
        self.by_name.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over all definitions.
    pub fn iter(&self) -> impl Iterator<Item = &CardDefinition> {
        self.cards.values()
    }

    /// The standard mono-black discard card set plus the token cards it
    /// can create. Tests and the default match setup build decks from
    /// these names.
    #[must_use]
    pub fn standard() -> Self {
        let mut catalog = Self::new();

        catalog.register(|id| {
            CardDefinition::new(id, "Swamp", &[CardType::Land])
                .with_subtypes(&["Swamp"])
                .with_produces(&[ManaColor::Black])
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Mountain", &[CardType::Land])
                .with_subtypes(&["Mountain"])
                .with_produces(&[ManaColor::Red])
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Urza's Saga", &[CardType::Enchantment, CardType::Land])
                .with_subtypes(&["Urza's", "Saga"])
                .with_produces(&[ManaColor::Colorless])
        });

        catalog.register(|id| {
            CardDefinition::new(id, "Thoughtseize", &[CardType::Sorcery])
                .with_cost("{B}")
                .with_text(
                    "Target player reveals their hand. You choose a nonland card from it. \
                     That player discards that card. You lose 2 life.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Inquisition of Kozilek", &[CardType::Sorcery])
                .with_cost("{B}")
                .with_text(
                    "Target player reveals their hand. You choose a nonland card from it \
                     with mana value 3 or less. That player discards that card.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Wrench Mind", &[CardType::Sorcery])
                .with_cost("{B}{B}")
                .with_text("Target player discards two cards.")
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Raven's Crime", &[CardType::Sorcery])
                .with_cost("{B}")
                .with_text("Target player discards a card.")
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Smallpox", &[CardType::Sorcery])
                .with_cost("{B}{B}")
                .with_text(
                    "Each player loses 1 life, discards a card, sacrifices a creature, \
                     then sacrifices a land.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Fatal Push", &[CardType::Instant])
                .with_cost("{B}")
                .with_text("Destroy target creature if it has mana value 2 or less.")
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Lightning Bolt", &[CardType::Instant])
                .with_cost("{R}")
                .with_text("Lightning Bolt deals 3 damage to any target.")
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Sheoldred's Edict", &[CardType::Instant])
                .with_cost("{1}{B}")
                .with_text(
                    "Choose one: target opponent sacrifices a creature; or target \
                     opponent sacrifices a planeswalker.",
                )
        });

        catalog.register(|id| {
            CardDefinition::new(id, "The Rack", &[CardType::Artifact])
                .with_cost("{1}")
                .with_text(
                    "At the beginning of each opponent's upkeep, The Rack deals X damage \
                     to that player, where X is 3 minus the number of cards in their hand.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Shrieking Affliction", &[CardType::Enchantment])
                .with_cost("{B}")
                .with_text(
                    "At the beginning of each opponent's upkeep, if that player has one \
                     or fewer cards in hand, they lose 3 life.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Ensnaring Bridge", &[CardType::Artifact])
                .with_cost("{3}")
                .with_text(
                    "Creatures with power greater than the number of cards in your hand \
                     can't attack.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Leyline of the Void", &[CardType::Enchantment])
                .with_cost("{2}{B}{B}")
                .with_text(
                    "If Leyline of the Void is in your opening hand, you may begin the \
                     game with it on the battlefield. If a card would be put into an \
                     opponent's graveyard from anywhere, exile it instead.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Orcish Bowmasters", &[CardType::Creature])
                .with_cost("{1}{B}")
                .with_stats(1, 1)
                .with_keywords(&["Flash"])
                .with_subtypes(&["Orc", "Archer"])
                .with_text(
                    "Whenever an opponent draws a card except the first one they draw in \
                     each of their draw steps, Orcish Bowmasters deals 1 damage to any \
                     target. Then amass Orcs 1.",
                )
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Dauthi Voidwalker", &[CardType::Creature])
                .with_cost("{B}{B}")
                .with_stats(3, 2)
                .with_keywords(&["Shadow"])
                .with_subtypes(&["Dauthi", "Rogue"])
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Liliana of the Veil", &[CardType::Planeswalker])
                .with_cost("{1}{B}{B}")
                .with_loyalty(3)
                .with_keywords(&["Legendary"])
                .with_subtypes(&["Liliana"])
                .with_text(
                    "+1: Each player discards a card. -2: Target player sacrifices a \
                     creature.",
                )
        });

        catalog.register(|id| {
            CardDefinition::new(id, "Orc Army", &[CardType::Creature])
                .with_stats(0, 0)
                .with_subtypes(&["Orc", "Army"])
                .as_token()
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Construct", &[CardType::Artifact, CardType::Creature])
                .with_stats(0, 0)
                .with_subtypes(&["Construct"])
                .as_token()
        });
        catalog.register(|id| {
            CardDefinition::new(id, "Treasure", &[CardType::Artifact])
                .with_subtypes(&["Treasure"])
                .with_produces(&[
                    ManaColor::White,
                    ManaColor::Blue,
                    ManaColor::Black,
                    ManaColor::Red,
                    ManaColor::Green,
                ])
                .as_token()
        });

        catalog
    }
}
