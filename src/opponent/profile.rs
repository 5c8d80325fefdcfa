//! Strategy profiles: declarative decision policies.
//!
//! A profile is an ordered list of priority rules plus a mulligan
//! policy and a sideboard plan. Rules are data, not code, so profiles
//! can be authored, serialized, and swapped between games without
//! touching the decision engine.

use serde::{Deserialize, Serialize};

use crate::core::{ActionKind, Phase};

/// One rule in a profile's priority order. The first rule that matches
/// the current situation and has a matching legal action decides.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriorityRule {
    /// Label for logs.
    pub name: String,
    /// Steps in which this rule applies; empty means any step.
    pub phases: Vec<Phase>,
    /// Earliest turn this rule applies.
    pub min_turn: u32,
    /// Latest turn this rule applies; `None` means forever.
    pub max_turn: Option<u32>,
    /// Action kinds this rule will take.
    pub kinds: Vec<ActionKind>,
    /// Card name preference order; empty means any card. A legal
    /// action matches if its description names one of these.
    pub cards: Vec<String>,
}

impl PriorityRule {
    #[must_use]
    pub fn applies(&self, phase: Phase, turn: u32) -> bool {
        if turn < self.min_turn {
            return false;
        }
        if self.max_turn.is_some_and(|last| turn > last) {
            return false;
        }
        self.phases.is_empty() || self.phases.contains(&phase)
    }
}

/// When to send a hand back.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MulliganRule {
    /// Keep only hands with at least this many lands.
    pub min_lands: usize,
    /// Keep only hands with at most this many lands.
    pub max_lands: usize,
    /// Keep only hands with at least this many discard spells.
    pub min_discard: usize,
    /// Keep only hands with at least this many nonland permanents.
    pub min_threats: usize,
    /// Stop mulliganing after this many, whatever the hand.
    pub max_mulligans: u32,
}

impl Default for MulliganRule {
    fn default() -> Self {
        Self {
            min_lands: 2,
            max_lands: 5,
            min_discard: 1,
            min_threats: 0,
            max_mulligans: 2,
        }
    }
}

/// One sideboard exchange applied between games of a match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SideboardSwap {
    /// Opposing archetype this swap answers.
    pub against: String,
    /// Card name taken out of the deck.
    pub remove: String,
    /// Card name brought in.
    pub add: String,
    /// How many copies to exchange.
    pub count: usize,
}

/// A complete decision policy for one player.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub name: String,
    pub rules: Vec<PriorityRule>,
    pub mulligan: MulliganRule,
    pub sideboard: Vec<SideboardSwap>,
}

impl StrategyProfile {
    /// The stock discard-prison policy: strip the hand early, land the
    /// punisher permanents, and let the upkeep triggers close the game.
    #[must_use]
    pub fn rack_prison() -> Self {
        let rule = |name: &str, kinds: Vec<ActionKind>, cards: Vec<&str>| PriorityRule {
            name: name.into(),
            phases: Vec::new(),
            min_turn: 1,
            max_turn: None,
            kinds,
            cards: cards.into_iter().map(String::from).collect(),
        };

        Self {
            name: "rack_prison".into(),
            rules: vec![
                rule("land drop", vec![ActionKind::PlayLand], vec![]),
                rule(
                    "strip the hand",
                    vec![ActionKind::CastSpell],
                    vec![
                        "Thoughtseize",
                        "Inquisition of Kozilek",
                        "Wrench Mind",
                        "Raven's Crime",
                    ],
                ),
                rule(
                    "answer threats",
                    vec![ActionKind::CastSpell],
                    vec!["Fatal Push", "Sheoldred's Edict"],
                ),
                rule(
                    "land the punishers",
                    vec![ActionKind::CastSpell],
                    vec![
                        "The Rack",
                        "Shrieking Affliction",
                        "Liliana of the Veil",
                        "Orcish Bowmasters",
                        "Ensnaring Bridge",
                    ],
                ),
                rule(
                    "liliana",
                    vec![ActionKind::ActivateAbility],
                    vec!["+1"],
                ),
                rule("attack", vec![ActionKind::Attack], vec![]),
                rule("block", vec![ActionKind::Block], vec![]),
            ],
            mulligan: MulliganRule::default(),
            sideboard: vec![SideboardSwap {
                against: "graveyard".into(),
                remove: "Wrench Mind".into(),
                add: "Leyline of the Void".into(),
                count: 4,
            }],
        }
    }

    /// Sideboard swaps relevant against one archetype.
    pub fn swaps_against<'a>(
        &'a self,
        archetype: &'a str,
    ) -> impl Iterator<Item = &'a SideboardSwap> {
        self.sideboard.iter().filter(move |s| s.against == archetype)
    }
}
