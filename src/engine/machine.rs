//! The turn and priority state machine.
//!
//! A step advances only when both players pass in succession with an
//! empty stack; passes on a non-empty stack resolve the top entry
//! instead. Any action resets the pass count. Mana abilities never use
//! the stack: payment taps sources and floats mana inline during the
//! cast. Per-step automatics (untap, upkeep triggers, the draw, combat
//! damage, cleanup) run when their step begins.

use tracing::{debug, info};

use crate::cards::InstanceId;
use crate::core::{Action, ActionKind, LogEntry, ManaColor, ManaCost, Phase, PlayerId};
use crate::engine::stack::{StackEntry, StackPayload};
use crate::engine::triggers::{self, TriggerEvent};
use crate::error::EngineError;
use crate::rules::effects::{self, EffectTemplate, ScriptLibrary, TargetSpec};
use crate::rules::sba;
use crate::state::GameState;
use crate::zones::{ZoneId, ZonePosition};

/// Maximum hand size enforced at cleanup.
const MAX_HAND_SIZE: usize = 7;

/// Applies actions and drives the turn structure.
pub struct ResolutionEngine {
    scripts: ScriptLibrary,
    consecutive_passes: u32,
}

impl ResolutionEngine {
    #[must_use]
    pub fn new(scripts: ScriptLibrary) -> Self {
        Self {
            scripts,
            consecutive_passes: 0,
        }
    }

    #[must_use]
    pub fn scripts(&self) -> &ScriptLibrary {
        &self.scripts
    }

    /// True if the engine can resolve this action without the oracle.
    #[must_use]
    pub fn can_resolve(&self, state: &GameState, action: &Action) -> bool {
        match action.kind {
            ActionKind::CastSpell => action
                .card
                .and_then(|id| state.definition(id).ok())
                .is_some_and(|d| !self.scripts.needs_oracle(&d.name)),
            _ => true,
        }
    }

    /// Record that an interaction was resolved outside the
    /// deterministic path, by an applied oracle verdict. The pass count
    /// restarts and the actor retains priority, exactly as if the
    /// engine had resolved it.
    pub fn note_adjudicated(&mut self, state: &mut GameState, player: PlayerId) {
        self.consecutive_passes = 0;
        state.priority_player = player;
    }

    /// Apply one announced action. The action must come from the legal
    /// set for the player currently holding priority.
    pub fn apply_action(
        &mut self,
        state: &mut GameState,
        action: &Action,
    ) -> Result<Vec<LogEntry>, EngineError> {
        if state.result.is_some() {
            return Err(EngineError::illegal("the game is over"));
        }
        if action.player != state.priority_player {
            return Err(EngineError::illegal(format!(
                "{} does not hold priority",
                action.player
            )));
        }
        debug!(action = %action, "applying action");

        match action.kind {
            ActionKind::PassPriority => self.pass_priority(state),
            ActionKind::Concede => {
                let mut entries = vec![state.concede(action.player)];
                entries.extend(sba::run_to_fixpoint(state)?);
                Ok(entries)
            }
            ActionKind::PlayLand => self.play_land(state, action),
            ActionKind::CastSpell => self.cast_spell(state, action),
            ActionKind::ActivateAbility => self.activate_ability(state, action),
            ActionKind::Attack => self.declare_attacker(state, action),
            ActionKind::Block => self.declare_blocker(state, action),
        }
    }

    // --------------------------------------------------------------
    // Priority and steps
    // --------------------------------------------------------------

    fn pass_priority(&mut self, state: &mut GameState) -> Result<Vec<LogEntry>, EngineError> {
        self.consecutive_passes += 1;
        if self.consecutive_passes < 2 {
            state.priority_player = state.priority_player.opponent();
            return Ok(Vec::new());
        }

        self.consecutive_passes = 0;
        if state.stack.is_empty() {
            self.advance_step(state)
        } else {
            let mut entries = self.resolve_top(state)?;
            entries.extend(sba::run_to_fixpoint(state)?);
            state.priority_player = state.active_player;
            Ok(entries)
        }
    }

    /// Move to the next step both players have passed out of, running
    /// each step's automatics. Steps that offer no priority are passed
    /// through in the same call.
    fn advance_step(&mut self, state: &mut GameState) -> Result<Vec<LogEntry>, EngineError> {
        let mut entries = Vec::new();
        loop {
            state.clear_mana_pools();
            match state.phase.next() {
                Some(phase) => state.phase = phase,
                None => begin_turn(state, &mut entries),
            }
            debug!(phase = %state.phase, turn = state.turn, "entering step");

            entries.extend(self.enter_phase(state)?);
            entries.extend(sba::run_to_fixpoint(state)?);
            if state.result.is_some() {
                return Ok(entries);
            }
            if !state.phase.skips_priority() {
                break;
            }
        }
        state.priority_player = state.active_player;
        Ok(entries)
    }

    fn enter_phase(&mut self, state: &mut GameState) -> Result<Vec<LogEntry>, EngineError> {
        let mut entries = Vec::new();
        let active = state.active_player;

        match state.phase {
            Phase::Untap => {
                state.players[active].lands_played = 0;
                state.draw_step_draws[active] = 0;
                let ids: Vec<InstanceId> =
                    state.battlefield_of(active).map(|c| c.id).collect();
                for id in ids {
                    if state.card(id)?.tapped {
                        entries.push(state.set_tapped(id, false)?);
                    }
                    let card = state.card_mut(id)?;
                    card.sick = false;
                    card.ability_used = false;
                }
            }
            Phase::Upkeep => {
                let pending = triggers::collect(state, TriggerEvent::UpkeepOf(active));
                triggers::flush_apnap(state, pending);
            }
            Phase::Draw => {
                // The player on the play skips the very first draw step.
                if state.turn > 1 {
                    let drawn = state.draw_cards(active, 1)?;
                    if !drawn.is_empty() {
                        let event = TriggerEvent::DrewCard {
                            player: active,
                            draw_step_draw: Some(state.draw_step_draws[active]),
                        };
                        let pending = triggers::collect(state, event);
                        triggers::flush_apnap(state, pending);
                    }
                }
            }
            Phase::Main1 => {
                // Sagas advance toward their next chapter.
                let sagas: Vec<InstanceId> = state
                    .battlefield_of(active)
                    .filter(|c| state.catalog.get(c.card).is_some_and(|d| d.is_saga()))
                    .map(|c| c.id)
                    .collect();
                for saga in sagas {
                    entries.push(state.add_counters(saga, "lore", 1)?);
                }
            }
            Phase::CombatDamage => {
                entries.extend(combat_damage(state)?);
            }
            Phase::EndCombat => {
                state.combat.clear();
            }
            Phase::Cleanup => {
                while state.hand_size(active) > MAX_HAND_SIZE {
                    let Some(pick) = effects::discard_pick(state, active) else {
                        break;
                    };
                    let (_, entry) = state.discard(active, pick)?;
                    entries.push(entry);
                }
                let ids: Vec<InstanceId> = state.battlefield().map(|c| c.id).collect();
                for id in ids {
                    let card = state.card_mut(id)?;
                    card.damage = 0;
                    card.deathtouched = false;
                }
            }
            _ => {}
        }
        Ok(entries)
    }

    // --------------------------------------------------------------
    // Actions
    // --------------------------------------------------------------

    fn play_land(
        &mut self,
        state: &mut GameState,
        action: &Action,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let player = action.player;
        let card = action
            .card
            .ok_or_else(|| EngineError::illegal("land drop names no card"))?;
        if player != state.active_player || !state.phase.is_main() || !state.stack.is_empty() {
            return Err(EngineError::illegal("lands are played at sorcery speed"));
        }
        if state.players[player].lands_played >= 1 {
            return Err(EngineError::illegal("already played a land this turn"));
        }
        if !state.zones.is_in(card, ZoneId::hand(player)) {
            return Err(EngineError::illegal("land is not in hand"));
        }

        let (_, entry) = state.move_card(card, ZoneId::battlefield(), ZonePosition::Top)?;
        state.players[player].lands_played += 1;
        self.consecutive_passes = 0;
        state.priority_player = player;
        Ok(vec![entry])
    }

    fn cast_spell(
        &mut self,
        state: &mut GameState,
        action: &Action,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let player = action.player;
        let card = action
            .card
            .ok_or_else(|| EngineError::illegal("cast names no card"))?;
        if !state.zones.is_in(card, ZoneId::hand(player)) {
            return Err(EngineError::illegal("spell is not in hand"));
        }
        let definition = state.definition(card)?.clone();
        let sorcery_window = player == state.active_player
            && state.phase.is_main()
            && state.stack.is_empty();
        if !definition.is_instant_speed() && !sorcery_window {
            return Err(EngineError::illegal(format!(
                "{} is sorcery speed",
                definition.name
            )));
        }
        let script = self
            .scripts
            .spell(&definition.name)
            .ok_or_else(|| {
                EngineError::illegal(format!(
                    "{} has no deterministic script; adjudication required",
                    definition.name
                ))
            })?
            .clone();
        let (spec, effects) = script.for_mode(action.mode.as_deref())?;
        let targeted = *spec != TargetSpec::None;
        if targeted && action.targets.is_empty() {
            return Err(EngineError::illegal(format!(
                "{} requires a target",
                definition.name
            )));
        }

        let cost = definition
            .mana_cost
            .clone()
            .unwrap_or_else(|| ManaCost::from_generic(0));
        let mut entries = auto_pay(state, player, &cost)?;

        let (on_stack, entry) = state.move_card(card, ZoneId::stack(), ZonePosition::Top)?;
        entries.push(entry);
        state.stack.push(StackEntry {
            controller: player,
            source: on_stack,
            targeted,
            targets: action.targets.clone(),
            payload: StackPayload::Spell {
                effects: effects.to_vec(),
            },
            description: action.description.clone(),
        });
        info!(spell = %definition.name, caster = %player, "spell cast");

        self.consecutive_passes = 0;
        state.priority_player = player;
        Ok(entries)
    }

    fn activate_ability(
        &mut self,
        state: &mut GameState,
        action: &Action,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let player = action.player;
        let source = action
            .card
            .ok_or_else(|| EngineError::illegal("activation names no source"))?;
        if !state.zones.is_in(source, ZoneId::battlefield())
            || state.card(source)?.controller != player
        {
            return Err(EngineError::illegal("source is not a controlled permanent"));
        }
        let definition = state.definition(source)?.clone();
        let key = action
            .mode
            .as_deref()
            .ok_or_else(|| EngineError::illegal("activation names no ability"))?;
        let ability = self
            .scripts
            .abilities(&definition.name)
            .iter()
            .find(|a| a.key == key)
            .cloned()
            .ok_or_else(|| {
                EngineError::illegal(format!("{} has no ability {key:?}", definition.name))
            })?;

        let mut entries = Vec::new();
        if ability.loyalty_cost > 0 {
            entries.push(state.add_counters(source, "loyalty", ability.loyalty_cost as u32)?);
        } else if ability.loyalty_cost < 0 {
            let need = ability.loyalty_cost.unsigned_abs();
            if state.card(source)?.counters_of("loyalty") < need {
                return Err(EngineError::illegal("not enough loyalty"));
            }
            entries.push(state.remove_counters(source, "loyalty", need)?);
        }
        if ability.taps_source {
            entries.push(state.set_tapped(source, true)?);
        }
        if definition.is_planeswalker() {
            state.card_mut(source)?.ability_used = true;
        }

        state.stack.push(StackEntry {
            controller: player,
            source,
            targeted: ability.targets != TargetSpec::None,
            targets: action.targets.clone(),
            payload: StackPayload::Ability {
                effects: ability.effects.clone(),
            },
            description: action.description.clone(),
        });

        self.consecutive_passes = 0;
        state.priority_player = player;
        Ok(entries)
    }

    fn declare_attacker(
        &mut self,
        state: &mut GameState,
        action: &Action,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let attacker = action
            .card
            .ok_or_else(|| EngineError::illegal("attack names no creature"))?;
        if state.phase != Phase::DeclareAttackers || action.player != state.active_player {
            return Err(EngineError::illegal("attackers are declared in the attack step"));
        }
        if state.combat.attackers.contains(&attacker) {
            return Err(EngineError::illegal("already attacking"));
        }
        let mut entries = vec![state.set_tapped(attacker, true)?];
        state.combat.attackers.push(attacker);
        entries.push(state.note(format!("{} attacks", state.name_of(attacker))));
        self.consecutive_passes = 0;
        Ok(entries)
    }

    fn declare_blocker(
        &mut self,
        state: &mut GameState,
        action: &Action,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let blocker = action
            .card
            .ok_or_else(|| EngineError::illegal("block names no creature"))?;
        if state.phase != Phase::DeclareBlockers
            || action.player != state.active_player.opponent()
        {
            return Err(EngineError::illegal("blockers are declared in the block step"));
        }
        let attacker = action
            .targets
            .first()
            .and_then(|t| match t {
                crate::core::Target::Card(id) => Some(*id),
                crate::core::Target::Player(_) => None,
            })
            .ok_or_else(|| EngineError::illegal("block names no attacker"))?;
        if !state.combat.attackers.contains(&attacker) {
            return Err(EngineError::illegal("that creature is not attacking"));
        }
        state.combat.blocks.insert(blocker, attacker);
        let entry = state.note(format!(
            "{} blocks {}",
            state.name_of(blocker),
            state.name_of(attacker)
        ));
        self.consecutive_passes = 0;
        Ok(vec![entry])
    }

    // --------------------------------------------------------------
    // Resolution
    // --------------------------------------------------------------

    /// Resolve the top entry of the stack.
    pub fn resolve_top(&mut self, state: &mut GameState) -> Result<Vec<LogEntry>, EngineError> {
        let Some(entry) = state.stack.pop() else {
            return Err(state.invariant_violation("resolving an empty stack"));
        };
        let mut entries = vec![state.note(format!("resolving {}", entry.description))];

        if entry.fizzled(state) {
            entries.push(state.note(format!("{} fizzles", entry.description)));
            if let StackPayload::Spell { .. } = entry.payload {
                let owner = state.card(entry.source)?.owner;
                let (_, moved) =
                    state.move_card(entry.source, ZoneId::graveyard(owner), ZonePosition::Top)?;
                entries.push(moved);
            }
            return Ok(entries);
        }

        match &entry.payload {
            StackPayload::Spell { effects: script } => {
                let mut drew = 0u32;
                for effect in script {
                    entries.extend(effects::apply_effect(
                        state,
                        entry.controller,
                        &entry.targets,
                        effect,
                    )?);
                    if let EffectTemplate::Draw(n) = effect {
                        drew += n;
                    }
                }

                let definition = state.definition(entry.source)?.clone();
                if definition.is_permanent() {
                    let (fresh, moved) =
                        state.move_card(entry.source, ZoneId::battlefield(), ZonePosition::Top)?;
                    entries.push(moved);
                    if definition.is_saga() {
                        entries.push(state.add_counters(fresh, "lore", 1)?);
                    }
                } else {
                    let owner = state.card(entry.source)?.owner;
                    let (_, moved) = state.move_card(
                        entry.source,
                        ZoneId::graveyard(owner),
                        ZonePosition::Top,
                    )?;
                    entries.push(moved);
                }

                for _ in 0..drew {
                    let pending = triggers::collect(
                        state,
                        TriggerEvent::DrewCard {
                            player: entry.controller,
                            draw_step_draw: None,
                        },
                    );
                    triggers::flush_apnap(state, pending);
                }
            }
            StackPayload::Ability { effects: script } => {
                for effect in script {
                    entries.extend(effects::apply_effect(
                        state,
                        entry.controller,
                        &entry.targets,
                        effect,
                    )?);
                }
            }
            StackPayload::Trigger(effect) => {
                entries.extend(triggers::resolve(
                    state,
                    entry.controller,
                    effect,
                    &entry.targets,
                )?);
            }
        }
        Ok(entries)
    }
}

/// Switch the turn to the other player.
fn begin_turn(state: &mut GameState, entries: &mut Vec<LogEntry>) {
    state.active_player = state.active_player.opponent();
    state.turn += 1;
    state.phase = Phase::Untap;
    entries.push(state.note(format!(
        "turn {} begins for {}",
        state.turn, state.active_player
    )));
}

/// Deal combat damage simultaneously: every assignment is collected
/// before any damage is marked.
fn combat_damage(state: &mut GameState) -> Result<Vec<LogEntry>, EngineError> {
    let defender = state.active_player.opponent();
    let mut to_cards: Vec<(InstanceId, i32, bool)> = Vec::new();
    let mut to_player = 0i32;

    for &attacker in &state.combat.attackers.clone() {
        if !state.exists(attacker) {
            continue;
        }
        let power = state.effective_power(attacker)?;
        let deathtouch = state.definition(attacker)?.has_keyword("Deathtouch");
        let blockers: Vec<InstanceId> = state
            .combat
            .blockers_of(attacker)
            .filter(|&b| state.exists(b))
            .collect();

        if blockers.is_empty() {
            to_player += power.max(0);
        } else {
            // Attacker damage goes down the blocker order: lethal to
            // each blocker in turn, the remainder to the last.
            let mut remaining = power.max(0);
            for (i, &blocker) in blockers.iter().enumerate() {
                let lethal = if deathtouch {
                    1
                } else {
                    (state.effective_toughness(blocker)? - state.card(blocker)?.damage).max(0)
                };
                let assigned = if i + 1 == blockers.len() {
                    remaining
                } else {
                    remaining.min(lethal)
                };
                if assigned > 0 {
                    to_cards.push((blocker, assigned, deathtouch));
                }
                remaining -= assigned;

                let blocker_power = state.effective_power(blocker)?;
                let blocker_deathtouch =
                    state.definition(blocker)?.has_keyword("Deathtouch");
                to_cards.push((attacker, blocker_power, blocker_deathtouch));
            }
        }
    }

    let mut entries = Vec::new();
    for (card, amount, deathtouch) in to_cards {
        if amount > 0 {
            entries.push(state.mark_damage(card, amount, deathtouch)?);
        }
    }
    if to_player > 0 {
        entries.push(state.adjust_life(defender, -to_player));
    }
    Ok(entries)
}

/// Tap mana sources and pay a cost from the resulting pool.
///
/// Colored requirements pick sources producing the missing color;
/// generic requirements take any source. Treasures are sacrificed as
/// they are tapped.
pub(crate) fn auto_pay(
    state: &mut GameState,
    player: PlayerId,
    cost: &ManaCost,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();

    while !state.players[player].mana.can_pay(cost) {
        let pips_unmet: Vec<ManaColor> = ManaColor::ALL
            .into_iter()
            .filter(|&c| state.players[player].mana.amount(c) < cost.pips_of(c))
            .collect();

        let pick = state
            .battlefield_of(player)
            .filter(|c| !c.tapped)
            .filter_map(|c| state.catalog.get(c.card).map(|d| (c.id, d)))
            .filter(|(_, d)| !d.produces.is_empty())
            .find(|(_, d)| {
                pips_unmet.is_empty() || d.produces.iter().any(|p| pips_unmet.contains(p))
            })
            .map(|(id, d)| {
                let color = d
                    .produces
                    .iter()
                    .find(|p| pips_unmet.contains(p))
                    .copied()
                    .unwrap_or(d.produces[0]);
                (id, color, d.has_subtype("Treasure"))
            });

        let Some((source, color, is_treasure)) = pick else {
            return Err(EngineError::illegal(format!("{player} cannot pay {cost}")));
        };
        entries.push(state.set_tapped(source, true)?);
        entries.push(state.add_mana(player, color, 1));
        if is_treasure {
            let owner = state.card(source)?.owner;
            let (_, moved) =
                state.move_card(source, ZoneId::graveyard(owner), ZonePosition::Top)?;
            entries.push(moved);
        }
    }

    if !state.players[player].mana.pay(cost) {
        return Err(state.invariant_violation(format!("pool covered {cost} but payment failed")));
    }
    entries.push(state.note(format!("{player} pays {cost}")));
    Ok(entries)
}
