//! State-based actions.
//!
//! Each pass scans the whole state without mutating it, collects every
//! condition that holds, applies them all, then rescans. The pass
//! repeats until a scan finds nothing, so chained consequences (a
//! creature dies, which was the last blocker, which ...) settle in one
//! call. Events detected in the same pass are applied together:
//! creatures that trade in combat die simultaneously.

use tracing::debug;

use crate::cards::InstanceId;
use crate::core::{LogEntry, PlayerId};
use crate::error::EngineError;
use crate::state::{GameResult, GameState};
use crate::zones::{ZoneId, ZoneKind, ZonePosition};

/// Poison counters required to lose the game.
const POISON_THRESHOLD: u32 = 10;

/// Lore counter count of a saga's final chapter.
const SAGA_FINAL_CHAPTER: u32 = 3;

/// Passes before the fixpoint loop is declared broken.
const MAX_PASSES: u32 = 50;

/// One detected state-based action.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Sba {
    PlayerLoses(PlayerId, &'static str),
    Dies(InstanceId),
    TokenCeases(InstanceId),
    SagaSacrificed(InstanceId),
}

/// Run state-based actions to fixpoint, then settle the game result.
///
/// Returns the log entries for everything applied. Calling this on a
/// state where nothing holds returns an empty list and changes nothing.
pub fn run_to_fixpoint(state: &mut GameState) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();
    for _ in 0..MAX_PASSES {
        let detected = scan(state)?;
        if detected.is_empty() {
            settle_result(state, &mut entries);
            return Ok(entries);
        }
        debug!(count = detected.len(), "applying state-based actions");
        for sba in detected {
            apply(state, sba, &mut entries)?;
        }
    }
    Err(state.invariant_violation("state-based actions failed to reach a fixpoint"))
}

/// Detect every condition that holds right now, without mutating.
fn scan(state: &GameState) -> Result<Vec<Sba>, EngineError> {
    let mut found = Vec::new();

    for player in PlayerId::both() {
        let ps = &state.players[player];
        if ps.lost() {
            continue;
        }
        if ps.life <= 0 {
            found.push(Sba::PlayerLoses(player, "life total is 0 or less"));
        } else if ps.poison >= POISON_THRESHOLD {
            found.push(Sba::PlayerLoses(player, "has 10 or more poison counters"));
        } else if ps.drew_from_empty {
            found.push(Sba::PlayerLoses(player, "drew from an empty library"));
        }
    }

    // Tokens anywhere but the battlefield cease to exist.
    for kind in [ZoneKind::Graveyard, ZoneKind::Hand, ZoneKind::Library] {
        for player in PlayerId::both() {
            let zone = ZoneId {
                kind,
                owner: Some(player),
            };
            for &id in state.zones.cards_in(zone) {
                if state.card(id)?.is_token {
                    found.push(Sba::TokenCeases(id));
                }
            }
        }
    }
    for &id in state.zones.cards_in(ZoneId::exile()) {
        if state.card(id)?.is_token {
            found.push(Sba::TokenCeases(id));
        }
    }

    let mut legends: Vec<(PlayerId, &str, InstanceId)> = Vec::new();
    for card in state.battlefield() {
        let definition = state.definition(card.id)?;

        if definition.is_creature() {
            let toughness = state.effective_toughness(card.id)?;
            let indestructible = definition.has_keyword("Indestructible");
            if toughness <= 0 {
                found.push(Sba::Dies(card.id));
            } else if !indestructible
                && (card.damage >= toughness || (card.deathtouched && card.damage > 0))
            {
                found.push(Sba::Dies(card.id));
            }
        }

        if definition.is_planeswalker() && card.counters_of("loyalty") == 0 {
            found.push(Sba::Dies(card.id));
        }

        if definition.is_saga() && card.counters_of("lore") >= SAGA_FINAL_CHAPTER {
            found.push(Sba::SagaSacrificed(card.id));
        }

        if definition.is_legendary() {
            legends.push((card.controller, definition.name.as_str(), card.id));
        }
    }

    // Legend rule: a controller with duplicate legendary names keeps
    // the newest copy.
    for &(controller, name, id) in &legends {
        let newest = legends
            .iter()
            .filter(|(c, n, _)| *c == controller && *n == name)
            .map(|&(_, _, other)| {
                let card = state.card(other)?;
                Ok::<_, EngineError>((card.arrived_turn, other.raw(), other))
            })
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .max()
            .map(|(_, _, other)| other);
        if newest != Some(id) {
            found.push(Sba::Dies(id));
        }
    }

    found.dedup();
    Ok(found)
}

fn apply(state: &mut GameState, sba: Sba, entries: &mut Vec<LogEntry>) -> Result<(), EngineError> {
    match sba {
        Sba::PlayerLoses(player, reason) => {
            state.players[player].has_lost = Some(reason.to_string());
            entries.push(state.note(format!("{player} loses the game: {reason}")));
        }
        Sba::Dies(id) | Sba::SagaSacrificed(id) => {
            // The pass may have been detected before an earlier action
            // in the same pass moved the object.
            if state.exists(id) {
                let owner = state.card(id)?.owner;
                let name = state.name_of(id);
                let (_, entry) =
                    state.move_card(id, ZoneId::graveyard(owner), ZonePosition::Top)?;
                entries.push(entry);
                entries.push(state.note(format!("{name} dies")));
            }
        }
        Sba::TokenCeases(id) => {
            if state.exists(id) {
                entries.push(state.remove_card(id)?);
            }
        }
    }
    Ok(())
}

/// Convert loss marks into the terminal result once the scan is clean.
fn settle_result(state: &mut GameState, entries: &mut Vec<LogEntry>) {
    if state.result.is_some() {
        return;
    }
    let p0_lost = state.players[PlayerId::new(0)].lost();
    let p1_lost = state.players[PlayerId::new(1)].lost();
    state.result = match (p0_lost, p1_lost) {
        (true, true) => Some(GameResult::Draw),
        (true, false) => Some(GameResult::Winner(PlayerId::new(1))),
        (false, true) => Some(GameResult::Winner(PlayerId::new(0))),
        (false, false) => None,
    };
    match state.result {
        Some(GameResult::Draw) => {
            entries.push(state.note("the game is a draw"));
        }
        Some(GameResult::Winner(winner)) => {
            entries.push(state.note(format!("{winner} wins the game")));
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::core::PlayerMap;

    const P0: PlayerId = PlayerId::new(0);
    const P1: PlayerId = PlayerId::new(1);

    fn fresh_state() -> GameState {
        let decks = PlayerMap::new(|_| vec!["Swamp".to_string(); 5]);
        GameState::new(CardCatalog::standard(), &decks, 3).unwrap()
    }

    fn put(state: &mut GameState, name: &str, player: PlayerId) -> InstanceId {
        let card = state.catalog.id_of(name).unwrap();
        state
            .new_card(card, player, ZoneId::battlefield(), ZonePosition::Top)
            .unwrap()
    }

    #[test]
    fn test_clean_state_is_stable() {
        let mut state = fresh_state();
        let before = state.log.len();

        let entries = run_to_fixpoint(&mut state).unwrap();

        assert!(entries.is_empty());
        assert_eq!(state.log.len(), before);
        assert!(state.result.is_none());
    }

    #[test]
    fn test_life_zero_loses() {
        let mut state = fresh_state();
        state.adjust_life(P1, -20);

        run_to_fixpoint(&mut state).unwrap();

        assert!(state.players[P1].lost());
        assert_eq!(state.result, Some(GameResult::Winner(P0)));
    }

    #[test]
    fn test_simultaneous_losses_draw() {
        let mut state = fresh_state();
        state.adjust_life(P0, -20);
        state.adjust_life(P1, -25);

        run_to_fixpoint(&mut state).unwrap();

        assert_eq!(state.result, Some(GameResult::Draw));
    }

    #[test]
    fn test_poison_threshold() {
        let mut state = fresh_state();
        state.add_poison(P0, 9);
        run_to_fixpoint(&mut state).unwrap();
        assert!(state.result.is_none());

        state.add_poison(P0, 1);
        run_to_fixpoint(&mut state).unwrap();
        assert_eq!(state.result, Some(GameResult::Winner(P1)));
    }

    #[test]
    fn test_lethal_damage_dies() {
        let mut state = fresh_state();
        let orc = put(&mut state, "Orcish Bowmasters", P0);
        state.mark_damage(orc, 1, false).unwrap();

        run_to_fixpoint(&mut state).unwrap();

        assert!(!state.exists(orc));
        assert_eq!(state.zones.size(ZoneId::graveyard(P0)), 1);
    }

    #[test]
    fn test_deathtouch_damage_dies() {
        let mut state = fresh_state();
        let dauthi = put(&mut state, "Dauthi Voidwalker", P0);
        state.mark_damage(dauthi, 1, true).unwrap();

        run_to_fixpoint(&mut state).unwrap();
        assert!(!state.exists(dauthi));
    }

    #[test]
    fn test_zero_toughness_dies() {
        let mut state = fresh_state();
        let orc = put(&mut state, "Orcish Bowmasters", P0);
        state.add_counters(orc, "-1/-1", 1).unwrap();

        run_to_fixpoint(&mut state).unwrap();
        assert!(!state.exists(orc));
    }

    #[test]
    fn test_legend_rule_keeps_newest() {
        let mut state = fresh_state();
        let old = put(&mut state, "Liliana of the Veil", P0);
        state.turn = 2;
        let new = put(&mut state, "Liliana of the Veil", P0);

        run_to_fixpoint(&mut state).unwrap();

        assert!(!state.exists(old));
        assert!(state.exists(new));
    }

    #[test]
    fn test_loyalty_zero_dies() {
        let mut state = fresh_state();
        let liliana = put(&mut state, "Liliana of the Veil", P0);
        state.remove_counters(liliana, "loyalty", 3).unwrap();

        run_to_fixpoint(&mut state).unwrap();
        assert!(!state.exists(liliana));
    }

    #[test]
    fn test_token_ceases_outside_battlefield() {
        let mut state = fresh_state();
        let card = state.catalog.id_of("Orc Army").unwrap();
        let token = state
            .new_card(card, P0, ZoneId::battlefield(), ZonePosition::Top)
            .unwrap();
        state.add_counters(token, "+1/+1", 1).unwrap();

        // Destroy it; the move puts it in the graveyard, the next pass
        // removes it from the game.
        let (in_graveyard, _) = state
            .move_card(token, ZoneId::graveyard(P0), ZonePosition::Top)
            .unwrap();
        run_to_fixpoint(&mut state).unwrap();

        assert!(!state.exists(in_graveyard));
        assert_eq!(state.zones.size(ZoneId::graveyard(P0)), 0);
    }

    #[test]
    fn test_combat_trade_dies_in_one_pass() {
        let mut state = fresh_state();
        let a = put(&mut state, "Dauthi Voidwalker", P0);
        let b = put(&mut state, "Dauthi Voidwalker", P1);
        state.mark_damage(a, 3, false).unwrap();
        state.mark_damage(b, 3, false).unwrap();

        let entries = run_to_fixpoint(&mut state).unwrap();

        assert!(!state.exists(a));
        assert!(!state.exists(b));
        // Both deaths appear, with no survivor window between them.
        let deaths = entries.iter().filter(|e| e.detail.contains("dies")).count();
        assert_eq!(deaths, 2);
    }

    #[test]
    fn test_fixpoint_result_is_stable() {
        let mut state = fresh_state();
        state.adjust_life(P1, -20);
        run_to_fixpoint(&mut state).unwrap();
        let dump = state.dump();

        // Running again finds nothing more to do.
        let entries = run_to_fixpoint(&mut state).unwrap();
        assert!(entries.is_empty());
        assert_eq!(state.dump(), dump);
    }
}
