//! Card definitions: the static, printed side of a card.
//!
//! A `CardDefinition` holds the unchanging properties of a card name.
//! Per-game data (zone, counters, damage) lives on `CardInstance`.

use serde::{Deserialize, Serialize};

use crate::core::{ManaColor, ManaCost};

/// Unique identifier for a card definition.
///
/// Identifies the card name ("Lightning Bolt"), not a specific copy in
/// a game.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardId(pub u32);

impl CardId {
    /// Create a new card ID.
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

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Card({})", self.0)
    }
}

/// The card types relevant to Modern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardType {
    Artifact,
    Creature,
    Enchantment,
    Instant,
    Land,
    Planeswalker,
    Sorcery,
}

/// Static card definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDefinition {
    pub id: CardId,
    pub name: String,
    /// `None` for lands.
    pub mana_cost: Option<ManaCost>,
    pub types: Vec<CardType>,
    pub subtypes: Vec<String>,
    /// Keyword abilities ("Flying", "Deathtouch", "Haste", ...).
    pub keywords: Vec<String>,
    pub power: Option<i32>,
    pub toughness: Option<i32>,
    pub loyalty: Option<i32>,
    pub oracle_text: String,
    /// True for cards that enter the game only as tokens.
    pub is_token: bool,
    /// Colors of mana this card can produce by tapping (lands and
    /// mana-producing artifacts).
    pub produces: Vec<ManaColor>,
}

impl CardDefinition {
    /// Create a new definition with the given types; everything else is
    /// filled in through the builder methods.
    #[must_use]
    pub fn new(id: CardId, name: impl Into<String>, types: &[CardType]) -> Self {
        Self {
            id,
            name: name.into(),
            mana_cost: None,
            types: types.to_vec(),
            subtypes: Vec::new(),
            keywords: Vec::new(),
            power: None,
            toughness: None,
            loyalty: None,
            oracle_text: String::new(),
            is_token: false,
            produces: Vec::new(),
        }
    }

    /// Set the mana cost from brace notation. Panics on a malformed
    /// cost string; definitions are authored, not user input.
    #[must_use]
    pub fn with_cost(mut self, cost: &str) -> Self {
        self.mana_cost = Some(
            ManaCost::parse(cost)
                .unwrap_or_else(|| panic!("malformed mana cost {cost:?} on {}", self.name)),
        );
        self
    }

    /// Set power and toughness.
    #[must_use]
    pub fn with_stats(mut self, power: i32, toughness: i32) -> Self {
        self.power = Some(power);
        self.toughness = Some(toughness);
        self
    }

    /// Set starting loyalty.
    #[must_use]
    pub fn with_loyalty(mut self, loyalty: i32) -> Self {
        self.loyalty = Some(loyalty);
        self
    }

    /// Add subtypes.
    #[must_use]
    pub fn with_subtypes(mut self, subtypes: &[&str]) -> Self {
        self.subtypes
            .extend(subtypes.iter().map(|s| s.to_string()));
        self
    }

    /// Add keyword abilities.
    #[must_use]
    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.keywords
            .extend(keywords.iter().map(|s| s.to_string()));
        self
    }

    /// Set the oracle text.
    #[must_use]
    pub fn with_text(mut self, text: &str) -> Self {
        self.oracle_text = text.to_string();
        self
    }

    /// Mark as a token-only card.
    #[must_use]
    pub fn as_token(mut self) -> Self {
        self.is_token = true;
        self
    }

    /// Set the colors of mana this card produces by tapping.
    #[must_use]
    pub fn with_produces(mut self, colors: &[ManaColor]) -> Self {
        self.produces.extend_from_slice(colors);
        self
    }

    /// Converted mana cost; 0 for lands.
    #[must_use]
    pub fn cmc(&self) -> u32 {
        self.mana_cost.as_ref().map_or(0, ManaCost::cmc)
    }

    #[must_use]
    pub fn has_type(&self, card_type: CardType) -> bool {
        self.types.contains(&card_type)
    }

    #[must_use]
    pub fn is_land(&self) -> bool {
        self.has_type(CardType::Land)
    }

    #[must_use]
    pub fn is_creature(&self) -> bool {
        self.has_type(CardType::Creature)
    }

    #[must_use]
    pub fn is_planeswalker(&self) -> bool {
        self.has_type(CardType::Planeswalker)
    }

    /// True for instants (castable any time priority is held).
    #[must_use]
    pub fn is_instant_speed(&self) -> bool {
        self.has_type(CardType::Instant) || self.has_keyword("Flash")
    }

    /// True for permanents (anything that goes to the battlefield on
    /// resolution).
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        !self.has_type(CardType::Instant) && !self.has_type(CardType::Sorcery)
    }

    #[must_use]
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    #[must_use]
    pub fn has_subtype(&self, subtype: &str) -> bool {
        self.subtypes.iter().any(|s| s == subtype)
    }

    /// Legendary permanents are subject to the legend rule.
    #[must_use]
    pub fn is_legendary(&self) -> bool {
        self.has_keyword("Legendary")
    }

    /// Sagas advance a lore counter each turn and are sacrificed after
    /// their final chapter.
    #[must_use]
    pub fn is_saga(&self) -> bool {
        self.has_subtype("Saga")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let bolt = CardDefinition::new(CardId::new(1), "Lightning Bolt", &[CardType::Instant])
            .with_cost("{R}")
            .with_text("Lightning Bolt deals 3 damage to any target.");

        assert_eq!(bolt.cmc(), 1);
        assert!(bolt.is_instant_speed());
        assert!(!bolt.is_permanent());
        assert!(!bolt.is_creature());
    }

    #[test]
    fn test_land_has_no_cost() {
        let swamp = CardDefinition::new(CardId::new(2), "Swamp", &[CardType::Land])
            .with_subtypes(&["Swamp"])
            .with_produces(&[ManaColor::Black]);

        assert_eq!(swamp.cmc(), 0);
        assert!(swamp.is_land());
        assert!(swamp.mana_cost.is_none());
        assert_eq!(swamp.produces, vec![ManaColor::Black]);
    }

    #[test]
    fn test_keywords_and_subtypes() {
        let card = CardDefinition::new(CardId::new(3), "Test", &[CardType::Creature])
            .with_stats(1, 1)
            .with_keywords(&["Flash", "Deathtouch"])
            .with_subtypes(&["Snake"]);

        assert!(card.is_instant_speed());
        assert!(card.has_keyword("Deathtouch"));
        assert!(card.has_subtype("Snake"));
        assert!(!card.has_keyword("Flying"));
    }
}
