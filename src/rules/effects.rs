//! Deterministic effect templates and the script library.
//!
//! Spells the engine resolves on its own are expressed as scripts: a
//! targeting requirement plus a sequence of effect templates. The
//! template set is closed; a card whose text maps to no script takes
//! the oracle path instead.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::cards::InstanceId;
use crate::core::{LogEntry, PlayerId, Target};
use crate::error::EngineError;
use crate::state::GameState;
use crate::zones::{ZoneId, ZonePosition};

/// What a scripted spell or ability must point at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetSpec {
    /// No targets.
    None,
    /// Any creature on the battlefield.
    Creature,
    /// A creature with converted mana cost at most this.
    CreatureMaxCmc(u32),
    /// A creature, planeswalker, or player.
    AnyTarget,
    /// A player.
    Player,
    /// A nonland card in an opponent's hand, optionally capped by cmc.
    OpponentNonlandInHand { max_cmc: Option<u32> },
}

/// One deterministic effect. Targets referenced by `Target`-taking
/// variants are the bound targets of the containing script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectTemplate {
    /// Deal damage to the bound target.
    DealDamage(i32),
    /// Destroy the bound creature or planeswalker target.
    DestroyTarget,
    /// The bound target (a card in a hand) is discarded.
    DiscardTarget,
    /// The bound player target discards cards of their choice.
    TargetPlayerDiscards(u32),
    /// The bound player target sacrifices a creature.
    TargetPlayerSacrificesCreature,
    /// The bound player target sacrifices a planeswalker.
    TargetPlayerSacrificesPlaneswalker,
    /// Each player discards cards of their choice.
    EachPlayerDiscards(u32),
    EachPlayerLosesLife(i32),
    EachPlayerSacrificesCreature,
    EachPlayerSacrificesLand,
    /// The controller draws cards.
    Draw(u32),
    GainLife(i32),
    /// The controller loses life (Thoughtseize's own cost).
    LoseLifeSelf(i32),
    /// Put counters on the bound card target.
    AddCountersTarget { kind: String, n: u32 },
    /// The controller creates tokens by catalog name.
    CreateToken { name: String, n: u32 },
    /// Return the bound card target to its owner's hand.
    ReturnTargetToHand,
}

/// One mode of a modal spell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellMode {
    pub name: String,
    pub targets: TargetSpec,
    pub effects: Vec<EffectTemplate>,
}

/// The deterministic script behind a castable card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellScript {
    pub targets: TargetSpec,
    pub effects: Vec<EffectTemplate>,
    /// Non-empty for modal spells; `targets`/`effects` are then unused.
    pub modes: Vec<SpellMode>,
}

impl SpellScript {
    #[must_use]
    pub fn new(targets: TargetSpec, effects: Vec<EffectTemplate>) -> Self {
        Self {
            targets,
            effects,
            modes: Vec::new(),
        }
    }

    #[must_use]
    pub fn modal(modes: Vec<SpellMode>) -> Self {
        Self {
            targets: TargetSpec::None,
            effects: Vec::new(),
            modes,
        }
    }

    /// The targeting requirement and effects for a chosen mode, or the
    /// spell's own if it is not modal.
    pub fn for_mode(&self, mode: Option<&str>) -> Result<(&TargetSpec, &[EffectTemplate]), EngineError> {
        match mode {
            None if self.modes.is_empty() => Ok((&self.targets, &self.effects)),
            None => Err(EngineError::illegal("modal spell cast without a mode")),
            Some(name) => self
                .modes
                .iter()
                .find(|m| m.name == name)
                .map(|m| (&m.targets, m.effects.as_slice()))
                .ok_or_else(|| EngineError::illegal(format!("unknown mode {name:?}"))),
        }
    }
}

/// An activated ability expressed as a script.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityScript {
    /// Display key, also the `mode` carried on the action ("+1", "-2").
    pub key: String,
    /// Loyalty delta for planeswalker abilities; 0 for others.
    pub loyalty_cost: i32,
    /// True if activation requires tapping the source.
    pub taps_source: bool,
    /// True if the ability is restricted to sorcery speed.
    pub sorcery_speed: bool,
    pub targets: TargetSpec,
    pub effects: Vec<EffectTemplate>,
}

/// Maps card names to their deterministic scripts.
#[derive(Clone, Debug, Default)]
pub struct ScriptLibrary {
    spells: FxHashMap<String, SpellScript>,
    abilities: FxHashMap<String, Vec<AbilityScript>>,
}

impl ScriptLibrary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_spell(&mut self, name: &str, script: SpellScript) {
        self.spells.insert(name.to_string(), script);
    }

    pub fn add_ability(&mut self, name: &str, ability: AbilityScript) {
        self.abilities
            .entry(name.to_string())
            .or_default()
            .push(ability);
    }

    /// The spell script for a card name, if the card resolves
    /// deterministically.
    #[must_use]
    pub fn spell(&self, name: &str) -> Option<&SpellScript> {
        self.spells.get(name)
    }

    /// Activated abilities scripted for a card name.
    #[must_use]
    pub fn abilities(&self, name: &str) -> &[AbilityScript] {
        self.abilities.get(name).map_or(&[], Vec::as_slice)
    }

    /// True if casting this card needs the rules oracle.
    #[must_use]
    pub fn needs_oracle(&self, name: &str) -> bool {
        !self.spells.contains_key(name)
    }

    /// Scripts for the standard catalog's spells and abilities.
    #[must_use]
    pub fn standard() -> Self {
        let mut lib = Self::new();

        lib.add_spell(
            "Thoughtseize",
            SpellScript::new(
                TargetSpec::OpponentNonlandInHand { max_cmc: None },
                vec![EffectTemplate::DiscardTarget, EffectTemplate::LoseLifeSelf(2)],
            ),
        );
        lib.add_spell(
            "Inquisition of Kozilek",
            SpellScript::new(
                TargetSpec::OpponentNonlandInHand { max_cmc: Some(3) },
                vec![EffectTemplate::DiscardTarget],
            ),
        );
        lib.add_spell(
            "Wrench Mind",
            SpellScript::new(
                TargetSpec::Player,
                vec![EffectTemplate::TargetPlayerDiscards(2)],
            ),
        );
        lib.add_spell(
            "Raven's Crime",
            SpellScript::new(
                TargetSpec::Player,
                vec![EffectTemplate::TargetPlayerDiscards(1)],
            ),
        );
        lib.add_spell(
            "Smallpox",
            SpellScript::new(
                TargetSpec::None,
                vec![
                    EffectTemplate::EachPlayerLosesLife(1),
                    EffectTemplate::EachPlayerDiscards(1),
                    EffectTemplate::EachPlayerSacrificesCreature,
                    EffectTemplate::EachPlayerSacrificesLand,
                ],
            ),
        );
        lib.add_spell(
            "Fatal Push",
            SpellScript::new(TargetSpec::CreatureMaxCmc(2), vec![EffectTemplate::DestroyTarget]),
        );
        lib.add_spell(
            "Lightning Bolt",
            SpellScript::new(TargetSpec::AnyTarget, vec![EffectTemplate::DealDamage(3)]),
        );
        lib.add_spell(
            "Sheoldred's Edict",
            SpellScript::modal(vec![
                SpellMode {
                    name: "creature".into(),
                    targets: TargetSpec::Player,
                    effects: vec![EffectTemplate::TargetPlayerSacrificesCreature],
                },
                SpellMode {
                    name: "planeswalker".into(),
                    targets: TargetSpec::Player,
                    effects: vec![EffectTemplate::TargetPlayerSacrificesPlaneswalker],
                },
            ]),
        );

        // Permanents with no cast-time decisions resolve as themselves.
        for name in [
            "The Rack",
            "Shrieking Affliction",
            "Ensnaring Bridge",
            "Leyline of the Void",
            "Orcish Bowmasters",
            "Dauthi Voidwalker",
            "Liliana of the Veil",
        ] {
            lib.add_spell(name, SpellScript::new(TargetSpec::None, Vec::new()));
        }

        lib.add_ability(
            "Liliana of the Veil",
            AbilityScript {
                key: "+1".into(),
                loyalty_cost: 1,
                taps_source: false,
                sorcery_speed: true,
                targets: TargetSpec::None,
                effects: vec![EffectTemplate::EachPlayerDiscards(1)],
            },
        );
        lib.add_ability(
            "Liliana of the Veil",
            AbilityScript {
                key: "-2".into(),
                loyalty_cost: -2,
                taps_source: false,
                sorcery_speed: true,
                targets: TargetSpec::Player,
                effects: vec![EffectTemplate::TargetPlayerSacrificesCreature],
            },
        );

        lib
    }
}

/// Apply one effect template against bound targets.
///
/// Missing card targets are skipped silently; the fizzle check has
/// already run by the time this is called, so a partially-stale target
/// list means the spell resolves against what remains.
pub fn apply_effect(
    state: &mut GameState,
    controller: PlayerId,
    targets: &SmallVec<[Target; 2]>,
    effect: &EffectTemplate,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();
    debug!(?effect, %controller, "applying effect");

    match effect {
        EffectTemplate::DealDamage(amount) => {
            for target in targets {
                match *target {
                    Target::Player(player) => entries.push(state.adjust_life(player, -amount)),
                    Target::Card(id) if state.exists(id) => {
                        entries.push(state.mark_damage(id, *amount, false)?);
                    }
                    Target::Card(_) => {}
                }
            }
        }
        EffectTemplate::DestroyTarget => {
            for target in targets {
                if let Target::Card(id) = *target {
                    if state.exists(id) {
                        entries.push(destroy(state, id)?);
                    }
                }
            }
        }
        EffectTemplate::DiscardTarget => {
            for target in targets {
                if let Target::Card(id) = *target {
                    if let Ok(card) = state.card(id) {
                        let holder = card.owner;
                        if state.zones.is_in(id, ZoneId::hand(holder)) {
                            let (_, entry) = state.discard(holder, id)?;
                            entries.push(entry);
                        }
                    }
                }
            }
        }
        EffectTemplate::TargetPlayerDiscards(n) => {
            for target in targets {
                if let Target::Player(player) = *target {
                    entries.extend(discard_own_choice(state, player, *n)?);
                }
            }
        }
        EffectTemplate::TargetPlayerSacrificesCreature => {
            for target in targets {
                if let Target::Player(player) = *target {
                    entries.extend(sacrifice_creature(state, player)?);
                }
            }
        }
        EffectTemplate::TargetPlayerSacrificesPlaneswalker => {
            for target in targets {
                if let Target::Player(player) = *target {
                    entries.extend(sacrifice_planeswalker(state, player)?);
                }
            }
        }
        EffectTemplate::EachPlayerDiscards(n) => {
            for player in apnap_order(state) {
                entries.extend(discard_own_choice(state, player, *n)?);
            }
        }
        EffectTemplate::EachPlayerLosesLife(amount) => {
            for player in apnap_order(state) {
                entries.push(state.adjust_life(player, -amount));
            }
        }
        EffectTemplate::EachPlayerSacrificesCreature => {
            for player in apnap_order(state) {
                entries.extend(sacrifice_creature(state, player)?);
            }
        }
        EffectTemplate::EachPlayerSacrificesLand => {
            for player in apnap_order(state) {
                entries.extend(sacrifice_land(state, player)?);
            }
        }
        EffectTemplate::Draw(n) => {
            state.draw_cards(controller, *n as usize)?;
        }
        EffectTemplate::GainLife(amount) => {
            entries.push(state.adjust_life(controller, *amount));
        }
        EffectTemplate::LoseLifeSelf(amount) => {
            entries.push(state.adjust_life(controller, -amount));
        }
        EffectTemplate::AddCountersTarget { kind, n } => {
            for target in targets {
                if let Target::Card(id) = *target {
                    if state.exists(id) {
                        entries.push(state.add_counters(id, kind, *n)?);
                    }
                }
            }
        }
        EffectTemplate::CreateToken { name, n } => {
            entries.extend(create_tokens(state, controller, name, *n)?);
        }
        EffectTemplate::ReturnTargetToHand => {
            for target in targets {
                if let Target::Card(id) = *target {
                    if let Ok(card) = state.card(id) {
                        let owner = card.owner;
                        let (_, entry) =
                            state.move_card(id, ZoneId::hand(owner), ZonePosition::Top)?;
                        entries.push(entry);
                    }
                }
            }
        }
    }
    Ok(entries)
}

/// Put a permanent into its owner's graveyard, unless indestructible.
pub fn destroy(state: &mut GameState, id: InstanceId) -> Result<LogEntry, EngineError> {
    if state.definition(id)?.has_keyword("Indestructible") {
        let name = state.name_of(id);
        return Ok(state.note(format!("{name} is indestructible and survives")));
    }
    let owner = state.card(id)?.owner;
    let (_, entry) = state.move_card(id, ZoneId::graveyard(owner), ZonePosition::Top)?;
    Ok(entry)
}

/// Create `n` tokens of a catalog name under a player's control.
pub fn create_tokens(
    state: &mut GameState,
    controller: PlayerId,
    name: &str,
    n: u32,
) -> Result<Vec<LogEntry>, EngineError> {
    let card = state
        .catalog
        .id_of(name)
        .ok_or_else(|| EngineError::illegal(format!("unknown token name {name:?}")))?;
    let mut entries = Vec::new();
    for _ in 0..n {
        state.new_card(card, controller, ZoneId::battlefield(), ZonePosition::Top)?;
        entries.push(state.note(format!("{controller} creates a {name} token")));
    }
    Ok(entries)
}

/// A player discards cards of their own choice. The engine's stand-in
/// choice keeps lands and pitches the highest-cost spell first.
fn discard_own_choice(
    state: &mut GameState,
    player: PlayerId,
    n: u32,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();
    for _ in 0..n {
        let Some(pick) = discard_pick(state, player) else {
            break;
        };
        let (_, entry) = state.discard(player, pick)?;
        entries.push(entry);
    }
    Ok(entries)
}

/// Default discard choice: highest-cmc nonland, then excess lands.
#[must_use]
pub fn discard_pick(state: &GameState, player: PlayerId) -> Option<InstanceId> {
    let hand: Vec<_> = state.hand_of(player).map(|c| c.id).collect();
    hand.iter()
        .copied()
        .filter(|&id| state.definition(id).map_or(false, |d| !d.is_land()))
        .max_by_key(|&id| state.definition(id).map_or(0, |d| d.cmc()))
        .or_else(|| hand.first().copied())
}

fn sacrifice_creature(
    state: &mut GameState,
    player: PlayerId,
) -> Result<Vec<LogEntry>, EngineError> {
    // Sacrificing ignores indestructible.
    let pick = state
        .creatures_of(player)
        .map(|c| c.id)
        .min_by_key(|&id| {
            (
                state.effective_power(id).unwrap_or(0),
                state.effective_toughness(id).unwrap_or(0),
            )
        });
    let Some(id) = pick else {
        let entry = state.note(format!("{player} has no creature to sacrifice"));
        return Ok(vec![entry]);
    };
    let owner = state.card(id)?.owner;
    let name = state.name_of(id);
    let (_, moved) = state.move_card(id, ZoneId::graveyard(owner), ZonePosition::Top)?;
    let entry = state.note(format!("{player} sacrifices {name}"));
    Ok(vec![moved, entry])
}

fn sacrifice_planeswalker(
    state: &mut GameState,
    player: PlayerId,
) -> Result<Vec<LogEntry>, EngineError> {
    let pick = state
        .battlefield_of(player)
        .filter(|c| {
            state
                .catalog
                .get(c.card)
                .is_some_and(|d| d.is_planeswalker())
        })
        .map(|c| c.id)
        .next();
    let Some(id) = pick else {
        let entry = state.note(format!("{player} has no planeswalker to sacrifice"));
        return Ok(vec![entry]);
    };
    let owner = state.card(id)?.owner;
    let name = state.name_of(id);
    let (_, moved) = state.move_card(id, ZoneId::graveyard(owner), ZonePosition::Top)?;
    let entry = state.note(format!("{player} sacrifices {name}"));
    Ok(vec![moved, entry])
}

fn sacrifice_land(state: &mut GameState, player: PlayerId) -> Result<Vec<LogEntry>, EngineError> {
    let pick = state
        .battlefield_of(player)
        .filter(|c| state.catalog.get(c.card).is_some_and(|d| d.is_land()))
        .map(|c| c.id)
        .next();
    let Some(id) = pick else {
        let entry = state.note(format!("{player} has no land to sacrifice"));
        return Ok(vec![entry]);
    };
    let owner = state.card(id)?.owner;
    let name = state.name_of(id);
    let (_, moved) = state.move_card(id, ZoneId::graveyard(owner), ZonePosition::Top)?;
    let entry = state.note(format!("{player} sacrifices {name}"));
    Ok(vec![moved, entry])
}

/// "Each player" effects apply in turn order starting with the active
/// player.
fn apnap_order(state: &GameState) -> [PlayerId; 2] {
    [state.active_player, state.active_player.opponent()]
}
