//! Triggered abilities: detection and APNAP stacking.
//!
//! Trigger conditions are scanned when their event happens; the
//! resulting entries wait in a pending queue and go onto the stack in
//! APNAP order (the active player's triggers are pushed first, so the
//! non-active player's resolve first). Numbers that depend on state,
//! like upkeep damage from hand size, are computed when the trigger
//! resolves, not when it fires.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::cards::InstanceId;
use crate::core::{LogEntry, PlayerId, Target};
use crate::engine::stack::{StackEntry, StackPayload};
use crate::error::EngineError;
use crate::rules::effects;
use crate::state::GameState;

/// Names with built-in trigger conditions.
const RACK: &str = "The Rack";
const AFFLICTION: &str = "Shrieking Affliction";
const BOWMASTERS: &str = "Orcish Bowmasters";

/// A triggered ability waiting to resolve. Amounts are computed at
/// resolution time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerEffect {
    /// Upkeep damage equal to three minus the player's hand size.
    RackDamage { player: PlayerId },
    /// Lose 3 life at upkeep while holding one or fewer cards.
    AfflictionDrain { player: PlayerId },
    /// One damage to the target, then amass Orcs 1.
    BowmastersStrike { target: Target },
}

/// An event the trigger scanner reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriggerEvent {
    /// The named player's upkeep has begun.
    UpkeepOf(PlayerId),
    /// The named player drew a card. `draw_step_draw` is which draw of
    /// their current draw step this was, if it happened there.
    DrewCard {
        player: PlayerId,
        draw_step_draw: Option<u32>,
    },
}

/// One fired trigger, not yet on the stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingTrigger {
    pub controller: PlayerId,
    pub source: InstanceId,
    pub effect: TriggerEffect,
    pub description: String,
}

/// Scan the battlefield for triggers firing on `event`.
#[must_use]
pub fn collect(state: &GameState, event: TriggerEvent) -> Vec<PendingTrigger> {
    let mut pending = Vec::new();

    match event {
        TriggerEvent::UpkeepOf(player) => {
            for card in state.battlefield_of(player.opponent()) {
                let Some(definition) = state.catalog.get(card.card) else {
                    continue;
                };
                match definition.name.as_str() {
                    RACK => pending.push(PendingTrigger {
                        controller: card.controller,
                        source: card.id,
                        effect: TriggerEffect::RackDamage { player },
                        description: format!("{RACK} trigger on {player}"),
                    }),
                    AFFLICTION => pending.push(PendingTrigger {
                        controller: card.controller,
                        source: card.id,
                        effect: TriggerEffect::AfflictionDrain { player },
                        description: format!("{AFFLICTION} trigger on {player}"),
                    }),
                    _ => {}
                }
            }
        }
        TriggerEvent::DrewCard {
            player,
            draw_step_draw,
        } => {
            // The first draw of a player's own draw step is exempt.
            if draw_step_draw == Some(1) {
                return pending;
            }
            for card in state.battlefield_of(player.opponent()) {
                let Some(definition) = state.catalog.get(card.card) else {
                    continue;
                };
                if definition.name == BOWMASTERS {
                    pending.push(PendingTrigger {
                        controller: card.controller,
                        source: card.id,
                        effect: TriggerEffect::BowmastersStrike {
                            target: Target::Player(player),
                        },
                        description: format!("{BOWMASTERS} trigger on {player}'s draw"),
                    });
                }
            }
        }
    }

    debug!(?event, fired = pending.len(), "trigger scan");
    pending
}

/// Push pending triggers onto the stack in APNAP order.
///
/// The active player's triggers go on first and therefore resolve
/// last; within one controller, triggers keep the order they fired in.
pub fn flush_apnap(state: &mut GameState, pending: Vec<PendingTrigger>) {
    let order = [state.active_player, state.active_player.opponent()];
    for controller in order {
        for trigger in pending.iter().filter(|t| t.controller == controller) {
            let targeted =
                matches!(trigger.effect, TriggerEffect::BowmastersStrike { .. });
            let targets = match trigger.effect {
                TriggerEffect::BowmastersStrike { target } => SmallVec::from_slice(&[target]),
                _ => SmallVec::new(),
            };
            state.stack.push(StackEntry {
                controller,
                source: trigger.source,
                targeted,
                targets,
                payload: StackPayload::Trigger(trigger.effect.clone()),
                description: trigger.description.clone(),
            });
            state.note(format!("{} goes on the stack", trigger.description));
        }
    }
}

/// Resolve one trigger's effect.
pub fn resolve(
    state: &mut GameState,
    controller: PlayerId,
    effect: &TriggerEffect,
    targets: &SmallVec<[Target; 2]>,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();
    match effect {
        TriggerEffect::RackDamage { player } => {
            let shortfall = 3 - state.hand_size(*player) as i32;
            if shortfall > 0 {
                entries.push(state.adjust_life(*player, -shortfall));
            } else {
                entries.push(state.note(format!("{RACK} deals no damage to {player}")));
            }
        }
        TriggerEffect::AfflictionDrain { player } => {
            if state.hand_size(*player) <= 1 {
                entries.push(state.adjust_life(*player, -3));
            } else {
                entries.push(state.note(format!("{AFFLICTION} does nothing to {player}")));
            }
        }
        TriggerEffect::BowmastersStrike { .. } => {
            for target in targets {
                match *target {
                    Target::Player(player) => entries.push(state.adjust_life(player, -1)),
                    Target::Card(id) if state.exists(id) => {
                        entries.push(state.mark_damage(id, 1, false)?);
                    }
                    Target::Card(_) => {}
                }
            }
            entries.extend(amass_orcs(state, controller, 1)?);
        }
    }
    Ok(entries)
}

/// Amass Orcs N: put counters on an existing Army, or create a 0/0 Orc
/// Army token and put them there.
pub fn amass_orcs(
    state: &mut GameState,
    controller: PlayerId,
    n: u32,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();
    let army = state
        .battlefield_of(controller)
        .find(|c| {
            state
                .catalog
                .get(c.card)
                .is_some_and(|d| d.has_subtype("Army"))
        })
        .map(|c| c.id);

    let army = match army {
        Some(id) => id,
        None => {
            entries.extend(effects::create_tokens(state, controller, "Orc Army", 1)?);
            state
                .find_on_battlefield(controller, "Orc Army")
                .map(|c| c.id)
                .ok_or_else(|| state.invariant_violation("amass created no Army"))?
        }
    };
    entries.push(state.add_counters(army, "+1/+1", n)?);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::core::PlayerMap;
    use crate::zones::{ZoneId, ZonePosition};

    const P0: PlayerId = PlayerId::new(0);
    const P1: PlayerId = PlayerId::new(1);

    fn fresh_state() -> GameState {
        let decks = PlayerMap::new(|_| vec!["Swamp".to_string(); 10]);
        GameState::new(CardCatalog::standard(), &decks, 9).unwrap()
    }

    fn put(state: &mut GameState, name: &str, player: PlayerId) -> InstanceId {
        let card = state.catalog.id_of(name).unwrap();
        state
            .new_card(card, player, ZoneId::battlefield(), ZonePosition::Top)
            .unwrap()
    }

    #[test]
    fn test_rack_fires_on_opponents_upkeep_only() {
        let mut state = fresh_state();
        put(&mut state, "The Rack", P0);

        assert_eq!(collect(&state, TriggerEvent::UpkeepOf(P1)).len(), 1);
        assert!(collect(&state, TriggerEvent::UpkeepOf(P0)).is_empty());
    }

    #[test]
    fn test_rack_damage_scales_with_hand() {
        let mut state = fresh_state();
        put(&mut state, "The Rack", P0);

        // Empty hand: full 3.
        resolve(
            &mut state,
            P0,
            &TriggerEffect::RackDamage { player: P1 },
            &SmallVec::new(),
        )
        .unwrap();
        assert_eq!(state.players[P1].life, 17);

        state.draw_cards(P1, 3).unwrap();
        resolve(
            &mut state,
            P0,
            &TriggerEffect::RackDamage { player: P1 },
            &SmallVec::new(),
        )
        .unwrap();
        assert_eq!(state.players[P1].life, 17);
    }

    #[test]
    fn test_affliction_threshold() {
        let mut state = fresh_state();
        put(&mut state, "Shrieking Affliction", P0);

        state.draw_cards(P1, 1).unwrap();
        resolve(
            &mut state,
            P0,
            &TriggerEffect::AfflictionDrain { player: P1 },
            &SmallVec::new(),
        )
        .unwrap();
        assert_eq!(state.players[P1].life, 17);

        state.draw_cards(P1, 1).unwrap();
        resolve(
            &mut state,
            P0,
            &TriggerEffect::AfflictionDrain { player: P1 },
            &SmallVec::new(),
        )
        .unwrap();
        assert_eq!(state.players[P1].life, 17);
    }

    #[test]
    fn test_first_draw_step_draw_exempt_from_bowmasters() {
        let mut state = fresh_state();
        put(&mut state, "Orcish Bowmasters", P0);

        let exempt = collect(
            &state,
            TriggerEvent::DrewCard {
                player: P1,
                draw_step_draw: Some(1),
            },
        );
        assert!(exempt.is_empty());

        let extra = collect(
            &state,
            TriggerEvent::DrewCard {
                player: P1,
                draw_step_draw: Some(2),
            },
        );
        assert_eq!(extra.len(), 1);
    }

    #[test]
    fn test_amass_grows_existing_army() {
        let mut state = fresh_state();
        amass_orcs(&mut state, P0, 1).unwrap();
        let army = state.find_on_battlefield(P0, "Orc Army").unwrap().id;
        assert_eq!(state.card(army).unwrap().counters_of("+1/+1"), 1);

        amass_orcs(&mut state, P0, 1).unwrap();
        assert_eq!(state.card(army).unwrap().counters_of("+1/+1"), 2);
        // Still one Army.
        assert_eq!(state.creatures_of(P0).count(), 1);
    }

    #[test]
    fn test_apnap_pushes_active_players_triggers_first() {
        let mut state = fresh_state();
        state.active_player = P0;
        let rack = put(&mut state, "The Rack", P1);
        let affliction = put(&mut state, "Shrieking Affliction", P0);

        let pending = vec![
            PendingTrigger {
                controller: P1,
                source: rack,
                effect: TriggerEffect::RackDamage { player: P0 },
                description: "rack".into(),
            },
            PendingTrigger {
                controller: P0,
                source: affliction,
                effect: TriggerEffect::AfflictionDrain { player: P1 },
                description: "affliction".into(),
            },
        ];
        flush_apnap(&mut state, pending);

        // Active player's trigger is below, so the non-active player's
        // resolves first from the top.
        assert_eq!(state.stack[0].controller, P0);
        assert_eq!(state.stack[1].controller, P1);
    }
}
