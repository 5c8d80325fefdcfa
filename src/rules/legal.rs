//! Legal action enumeration.
//!
//! Produces the complete set of actions a player may announce right
//! now. The engine rejects anything outside this set, so enumeration is
//! the authority on timing, affordability, and targeting legality.
//! Duplicate copies of a card in hand collapse to one action.

use rustc_hash::FxHashSet;

use crate::cards::{CardDefinition, CardInstance, InstanceId};
use crate::core::{Action, ManaColor, ManaCost, Phase, PlayerId, Target};
use crate::rules::effects::{ScriptLibrary, TargetSpec};
use crate::state::GameState;

/// Name of the static effect capping attacker power by hand size.
const ATTACK_CAP_BRIDGE: &str = "Ensnaring Bridge";

/// Enumerate every action `player` may legally announce.
///
/// Pass and concede are always present while the game is live; a
/// finished game has no legal actions.
#[must_use]
pub fn legal_actions(state: &GameState, scripts: &ScriptLibrary, player: PlayerId) -> Vec<Action> {
    if state.result.is_some() {
        return Vec::new();
    }

    let mut actions = vec![Action::pass(player), Action::concede(player)];

    let sorcery_speed = player == state.active_player
        && state.phase.is_main()
        && state.stack.is_empty();

    if sorcery_speed {
        enumerate_land_drops(state, player, &mut actions);
    }
    enumerate_casts(state, scripts, player, sorcery_speed, &mut actions);
    enumerate_abilities(state, scripts, player, sorcery_speed, &mut actions);

    if state.phase == Phase::DeclareAttackers
        && player == state.active_player
        && state.stack.is_empty()
    {
        enumerate_attacks(state, player, &mut actions);
    }
    if state.phase == Phase::DeclareBlockers
        && player == state.active_player.opponent()
        && state.stack.is_empty()
    {
        enumerate_blocks(state, player, &mut actions);
    }

    actions
}

fn enumerate_land_drops(state: &GameState, player: PlayerId, actions: &mut Vec<Action>) {
    if state.players[player].lands_played >= 1 {
        return;
    }
    let mut seen = FxHashSet::default();
    for card in state.hand_of(player) {
        let Ok(definition) = state.definition(card.id) else {
            continue;
        };
        if definition.is_land() && seen.insert(definition.name.clone()) {
            actions.push(Action::play_land(player, card.id, &definition.name));
        }
    }
}

fn enumerate_casts(
    state: &GameState,
    scripts: &ScriptLibrary,
    player: PlayerId,
    sorcery_speed: bool,
    actions: &mut Vec<Action>,
) {
    let mut seen = FxHashSet::default();
    for card in state.hand_of(player) {
        let Ok(definition) = state.definition(card.id) else {
            continue;
        };
        if definition.is_land() || !seen.insert(definition.name.clone()) {
            continue;
        }
        if !definition.is_instant_speed() && !sorcery_speed {
            continue;
        }
        let Some(cost) = &definition.mana_cost else {
            continue;
        };
        if !can_afford(state, player, cost) {
            continue;
        }

        match scripts.spell(&definition.name) {
            None => {
                // Unscripted cards still enumerate untargeted; the
                // oracle adjudicates the resolution.
                actions.push(Action::cast(player, card.id, &definition.name, []));
            }
            Some(script) if script.modes.is_empty() => {
                for targets in enumerate_targets(state, player, &script.targets) {
                    actions.push(Action::cast(player, card.id, &definition.name, targets));
                }
            }
            Some(script) => {
                for mode in &script.modes {
                    for targets in enumerate_targets(state, player, &mode.targets) {
                        actions.push(
                            Action::cast(player, card.id, &definition.name, targets)
                                .with_mode(&mode.name),
                        );
                    }
                }
            }
        }
    }
}

fn enumerate_abilities(
    state: &GameState,
    scripts: &ScriptLibrary,
    player: PlayerId,
    sorcery_speed: bool,
    actions: &mut Vec<Action>,
) {
    for card in state.battlefield_of(player) {
        let Ok(definition) = state.definition(card.id) else {
            continue;
        };
        for ability in scripts.abilities(&definition.name) {
            if ability.sorcery_speed && !sorcery_speed {
                continue;
            }
            if ability.taps_source && (card.tapped || card.sick) {
                continue;
            }
            if card.ability_used && definition.is_planeswalker() {
                continue;
            }
            if ability.loyalty_cost < 0
                && card.counters_of("loyalty") < ability.loyalty_cost.unsigned_abs()
            {
                continue;
            }
            for targets in enumerate_targets(state, player, &ability.targets) {
                actions.push(Action::activate(player, card.id, &ability.key, targets));
            }
        }
    }
}

fn enumerate_attacks(state: &GameState, player: PlayerId, actions: &mut Vec<Action>) {
    let power_cap = attack_power_cap(state);
    for card in state.creatures_of(player) {
        if card.tapped || state.combat.attackers.contains(&card.id) {
            continue;
        }
        let Ok(definition) = state.definition(card.id) else {
            continue;
        };
        if card.sick && !definition.has_keyword("Haste") {
            continue;
        }
        let power = state.effective_power(card.id).unwrap_or(0);
        if power_cap.is_some_and(|cap| power > cap) {
            continue;
        }
        actions.push(Action::attack(player, card.id, &definition.name));
    }
}

fn enumerate_blocks(state: &GameState, player: PlayerId, actions: &mut Vec<Action>) {
    for blocker in state.creatures_of(player) {
        if blocker.tapped || state.combat.blocks.contains_key(&blocker.id) {
            continue;
        }
        let Ok(blocker_def) = state.definition(blocker.id) else {
            continue;
        };
        for &attacker in &state.combat.attackers {
            let Ok(attacker_def) = state.definition(attacker) else {
                continue;
            };
            if can_block(attacker_def, blocker_def) {
                actions.push(Action::block(player, blocker.id, attacker, &blocker_def.name));
            }
        }
    }
}

/// Evasion keywords: flying needs flying or reach, shadow blocks only
/// shadow.
fn can_block(attacker: &CardDefinition, blocker: &CardDefinition) -> bool {
    if attacker.has_keyword("Flying")
        && !blocker.has_keyword("Flying")
        && !blocker.has_keyword("Reach")
    {
        return false;
    }
    if attacker.has_keyword("Shadow") != blocker.has_keyword("Shadow") {
        return false;
    }
    true
}

/// The tightest attacker power cap imposed by any bridge-style static
/// effect on the battlefield, or `None`.
#[must_use]
pub fn attack_power_cap(state: &GameState) -> Option<i32> {
    state
        .battlefield()
        .filter(|c| {
            state
                .catalog
                .get(c.card)
                .is_some_and(|d| d.name == ATTACK_CAP_BRIDGE)
        })
        .map(|c| state.hand_size(c.controller) as i32)
        .min()
}

/// True if `player` could pay `cost` using their pool plus their
/// untapped mana sources.
#[must_use]
pub fn can_afford(state: &GameState, player: PlayerId, cost: &ManaCost) -> bool {
    let mut pool = state.players[player].mana.clone();
    let mut producers: Vec<&CardInstance> = state
        .battlefield_of(player)
        .filter(|c| {
            !c.tapped
                && state
                    .catalog
                    .get(c.card)
                    .is_some_and(|d| !d.produces.is_empty())
        })
        .collect();

    // Mono-color sources commit first so flexible sources stay free
    // for the generic portion.
    producers.sort_by_key(|c| {
        state
            .catalog
            .get(c.card)
            .map_or(usize::MAX, |d| d.produces.len())
    });

    let mut available = producers.len() as u32 + pool.total();
    for color in ManaColor::ALL {
        let mut need = u32::from(cost.pips_of(color));
        if need == 0 {
            continue;
        }
        let from_pool = need.min(u32::from(pool.amount(color)));
        need -= from_pool;
        pool.pay(&pips_only(color, from_pool as u8));
        available -= from_pool;

        producers.retain(|c| {
            if need == 0 {
                return true;
            }
            let makes_color = state
                .catalog
                .get(c.card)
                .is_some_and(|d| d.produces.contains(&color));
            if makes_color {
                need -= 1;
                available -= 1;
                false
            } else {
                true
            }
        });
        if need > 0 {
            return false;
        }
    }

    available >= cost.cmc() - colored_total(cost)
}

fn colored_total(cost: &ManaCost) -> u32 {
    ManaColor::ALL
        .iter()
        .map(|&c| u32::from(cost.pips_of(c)))
        .sum()
}

fn pips_only(color: ManaColor, n: u8) -> ManaCost {
    let symbol = match color {
        ManaColor::White => "{W}",
        ManaColor::Blue => "{U}",
        ManaColor::Black => "{B}",
        ManaColor::Red => "{R}",
        ManaColor::Green => "{G}",
        ManaColor::Colorless => "{C}",
    };
    ManaCost::parse(&symbol.repeat(n as usize)).unwrap_or_default()
}

/// Expand a targeting requirement into concrete target lists. An empty
/// result means the requirement cannot currently be met, which makes
/// the cast illegal.
fn enumerate_targets(
    state: &GameState,
    caster: PlayerId,
    spec: &TargetSpec,
) -> Vec<Vec<Target>> {
    match spec {
        TargetSpec::None => vec![Vec::new()],
        TargetSpec::Creature => creatures(state, None)
            .into_iter()
            .map(|id| vec![Target::Card(id)])
            .collect(),
        TargetSpec::CreatureMaxCmc(cap) => creatures(state, Some(*cap))
            .into_iter()
            .map(|id| vec![Target::Card(id)])
            .collect(),
        TargetSpec::AnyTarget => {
            let mut out: Vec<Vec<Target>> = creatures(state, None)
                .into_iter()
                .chain(planeswalkers(state))
                .map(|id| vec![Target::Card(id)])
                .collect();
            for player in PlayerId::both() {
                out.push(vec![Target::Player(player)]);
            }
            out
        }
        TargetSpec::Player => PlayerId::both()
            .into_iter()
            .map(|p| vec![Target::Player(p)])
            .collect(),
        TargetSpec::OpponentNonlandInHand { max_cmc } => state
            .hand_of(caster.opponent())
            .filter(|c| {
                state.catalog.get(c.card).is_some_and(|d| {
                    !d.is_land() && max_cmc.map_or(true, |cap| d.cmc() <= cap)
                })
            })
            .map(|c| vec![Target::Card(c.id)])
            .collect(),
    }
}

fn creatures(state: &GameState, max_cmc: Option<u32>) -> Vec<InstanceId> {
    state
        .battlefield()
        .filter(|c| {
            state.catalog.get(c.card).is_some_and(|d| {
                d.is_creature() && max_cmc.map_or(true, |cap| d.cmc() <= cap)
            })
        })
        .map(|c| c.id)
        .collect()
}

fn planeswalkers(state: &GameState) -> Vec<InstanceId> {
    state
        .battlefield()
        .filter(|c| {
            state
                .catalog
                .get(c.card)
                .is_some_and(CardDefinition::is_planeswalker)
        })
        .map(|c| c.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CardCatalog;
    use crate::core::{ActionKind, PlayerMap};
    use crate::zones::{ZoneId, ZonePosition};

    const P0: PlayerId = PlayerId::new(0);
    const P1: PlayerId = PlayerId::new(1);

    fn fresh_state() -> GameState {
        let decks = PlayerMap::new(|_| vec!["Swamp".to_string(); 20]);
        let mut state =
            GameState::new(CardCatalog::standard(), &decks, 11).unwrap();
        state.phase = Phase::Main1;
        state
    }

    fn give_hand(state: &mut GameState, player: PlayerId, name: &str) -> InstanceId {
        let card = state.catalog.id_of(name).unwrap();
        state
            .new_card(card, player, ZoneId::hand(player), ZonePosition::Top)
            .unwrap()
    }

    fn put_battlefield(state: &mut GameState, player: PlayerId, name: &str) -> InstanceId {
        let card = state.catalog.id_of(name).unwrap();
        state
            .new_card(card, player, ZoneId::battlefield(), ZonePosition::Top)
            .unwrap()
    }

    fn kinds(actions: &[Action]) -> Vec<ActionKind> {
        actions.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_pass_and_concede_always_present() {
        let state = fresh_state();
        let scripts = ScriptLibrary::standard();

        let actions = legal_actions(&state, &scripts, P0);
        assert!(kinds(&actions).contains(&ActionKind::PassPriority));
        assert!(kinds(&actions).contains(&ActionKind::Concede));
    }

    #[test]
    fn test_finished_game_has_no_actions() {
        let mut state = fresh_state();
        state.result = Some(crate::state::GameResult::Winner(P0));

        assert!(legal_actions(&state, &ScriptLibrary::standard(), P0).is_empty());
    }

    #[test]
    fn test_one_land_drop_per_turn() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        give_hand(&mut state, P0, "Swamp");

        let actions = legal_actions(&state, &scripts, P0);
        assert!(kinds(&actions).contains(&ActionKind::PlayLand));

        state.players[P0].lands_played = 1;
        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::PlayLand));
    }

    #[test]
    fn test_duplicate_hand_cards_collapse() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        give_hand(&mut state, P0, "Swamp");
        give_hand(&mut state, P0, "Swamp");

        let actions = legal_actions(&state, &scripts, P0);
        let drops = actions
            .iter()
            .filter(|a| a.kind == ActionKind::PlayLand)
            .count();
        assert_eq!(drops, 1);
    }

    #[test]
    fn test_sorcery_needs_main_phase_and_empty_stack() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        put_battlefield(&mut state, P0, "Swamp");
        give_hand(&mut state, P0, "Thoughtseize");
        give_hand(&mut state, P1, "Wrench Mind");

        let actions = legal_actions(&state, &scripts, P0);
        assert!(kinds(&actions).contains(&ActionKind::CastSpell));

        state.phase = Phase::Upkeep;
        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::CastSpell));
    }

    #[test]
    fn test_instant_castable_off_turn() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        state.phase = Phase::Upkeep;
        put_battlefield(&mut state, P1, "Swamp");
        give_hand(&mut state, P1, "Fatal Push");
        put_battlefield(&mut state, P0, "Orcish Bowmasters");

        let actions = legal_actions(&state, &scripts, P1);
        let casts: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::CastSpell)
            .collect();
        assert_eq!(casts.len(), 1);
        assert!(casts[0].description.contains("Fatal Push"));
    }

    #[test]
    fn test_cast_requires_affordable_mana() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        give_hand(&mut state, P0, "Wrench Mind");

        // No lands: unaffordable.
        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::CastSpell));

        put_battlefield(&mut state, P0, "Swamp");
        put_battlefield(&mut state, P0, "Swamp");
        let actions = legal_actions(&state, &scripts, P0);
        assert!(kinds(&actions).contains(&ActionKind::CastSpell));
    }

    #[test]
    fn test_colored_pips_not_covered_by_colorless_sources() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        give_hand(&mut state, P0, "Thoughtseize");
        give_hand(&mut state, P1, "Wrench Mind");
        // Urza's Saga taps for colorless only; {B} stays unaffordable.
        put_battlefield(&mut state, P0, "Urza's Saga");

        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::CastSpell));
    }

    #[test]
    fn test_targeted_discard_enumerates_opponent_hand() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        put_battlefield(&mut state, P0, "Swamp");
        give_hand(&mut state, P0, "Inquisition of Kozilek");
        give_hand(&mut state, P1, "Swamp");
        give_hand(&mut state, P1, "The Rack");
        give_hand(&mut state, P1, "Leyline of the Void");

        let actions = legal_actions(&state, &scripts, P0);
        let casts: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::CastSpell)
            .collect();
        // Lands never; the leyline exceeds the cmc 3 cap.
        assert_eq!(casts.len(), 1);
        assert!(casts[0].description.contains("Inquisition"));
    }

    #[test]
    fn test_modal_spell_enumerates_each_mode() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        put_battlefield(&mut state, P0, "Swamp");
        put_battlefield(&mut state, P0, "Swamp");
        give_hand(&mut state, P0, "Sheoldred's Edict");

        let actions = legal_actions(&state, &scripts, P0);
        let modes: FxHashSet<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::CastSpell)
            .filter_map(|a| a.mode.clone())
            .collect();
        assert!(modes.contains("creature"));
        assert!(modes.contains("planeswalker"));
    }

    #[test]
    fn test_attackers_need_untapped_and_unsick() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        state.phase = Phase::DeclareAttackers;

        let sick = put_battlefield(&mut state, P0, "Dauthi Voidwalker");
        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::Attack));

        state.card_mut(sick).unwrap().sick = false;
        let actions = legal_actions(&state, &scripts, P0);
        assert!(kinds(&actions).contains(&ActionKind::Attack));
    }

    #[test]
    fn test_bridge_caps_attacker_power() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        state.phase = Phase::DeclareAttackers;

        let dauthi = put_battlefield(&mut state, P0, "Dauthi Voidwalker");
        state.card_mut(dauthi).unwrap().sick = false;
        put_battlefield(&mut state, P1, "Ensnaring Bridge");

        // Bridge controller's hand is empty; a 3-power creature is shut out.
        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::Attack));

        for _ in 0..3 {
            give_hand(&mut state, P1, "Swamp");
        }
        let actions = legal_actions(&state, &scripts, P0);
        assert!(kinds(&actions).contains(&ActionKind::Attack));
    }

    #[test]
    fn test_shadow_blocking_restriction() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        state.phase = Phase::DeclareBlockers;

        let attacker = put_battlefield(&mut state, P0, "Dauthi Voidwalker");
        state.combat.attackers.push(attacker);
        let blocker = put_battlefield(&mut state, P1, "Orcish Bowmasters");
        state.card_mut(blocker).unwrap().sick = false;

        // A non-shadow creature cannot block a shadow attacker.
        let actions = legal_actions(&state, &scripts, P1);
        assert!(!kinds(&actions).contains(&ActionKind::Block));
    }

    #[test]
    fn test_loyalty_ability_gating() {
        let mut state = fresh_state();
        let scripts = ScriptLibrary::standard();
        let liliana = put_battlefield(&mut state, P0, "Liliana of the Veil");

        let actions = legal_actions(&state, &scripts, P0);
        let abilities: Vec<_> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::ActivateAbility)
            .collect();
        // +1 always; -2 affordable at 3 loyalty, once per target player.
        assert!(abilities.iter().any(|a| a.mode.as_deref() == Some("+1")));
        assert!(abilities.iter().any(|a| a.mode.as_deref() == Some("-2")));

        state.card_mut(liliana).unwrap().ability_used = true;
        let actions = legal_actions(&state, &scripts, P0);
        assert!(!kinds(&actions).contains(&ActionKind::ActivateAbility));
    }
}
