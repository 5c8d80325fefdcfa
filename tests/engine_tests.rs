//! Engine integration tests.
//!
//! Full cast-and-resolve flows through the public API: priority, the
//! stack, scripted effects, combat, and the turn structure working
//! together.

use rackline::rules::legal_actions;
use rackline::{
    Action, ActionKind, CardCatalog, GameState, InstanceId, Phase, PlayerId, PlayerMap,
    ResolutionEngine, ScriptLibrary, ZoneId, ZonePosition,
};

const P0: PlayerId = PlayerId::new(0);
const P1: PlayerId = PlayerId::new(1);

fn fresh() -> (ResolutionEngine, GameState) {
    let decks = PlayerMap::new(|_| vec!["Swamp".to_string(); 30]);
    let mut state = GameState::new(CardCatalog::standard(), &decks, 19).unwrap();
    state.phase = Phase::Main1;
    (ResolutionEngine::new(ScriptLibrary::standard()), state)
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

fn cast_first_matching(
    engine: &mut ResolutionEngine,
    state: &mut GameState,
    player: PlayerId,
    fragment: &str,
) {
    let action = legal_actions(state, engine.scripts(), player)
        .into_iter()
        .find(|a| a.kind == ActionKind::CastSpell && a.description.contains(fragment))
        .unwrap_or_else(|| panic!("no castable action matching {fragment:?}"));
    engine.apply_action(state, &action).unwrap();
}

fn resolve_stack(engine: &mut ResolutionEngine, state: &mut GameState) {
    let mut guard = 0;
    while !state.stack.is_empty() {
        let pass = Action::pass(state.priority_player);
        engine.apply_action(state, &pass).unwrap();
        guard += 1;
        assert!(guard < 100, "stack never emptied");
    }
}

// =============================================================================
// Targeted discard
// =============================================================================

/// Thoughtseize strips a chosen nonland card and costs its caster 2
/// life.
#[test]
fn test_thoughtseize_flow() {
    let (mut engine, mut state) = fresh();
    put_battlefield(&mut state, P0, "Swamp");
    give_hand(&mut state, P0, "Thoughtseize");
    give_hand(&mut state, P1, "Swamp");
    give_hand(&mut state, P1, "The Rack");

    cast_first_matching(&mut engine, &mut state, P0, "Thoughtseize");
    resolve_stack(&mut engine, &mut state);

    // The Rack was the only legal pick; the Swamp stays.
    assert_eq!(state.hand_size(P1), 1);
    assert_eq!(state.players[P0].life, 18);
    let in_graveyard: Vec<String> = state
        .zones
        .cards_in(ZoneId::graveyard(P1))
        .iter()
        .map(|&id| state.name_of(id))
        .collect();
    assert_eq!(in_graveyard, vec!["The Rack".to_string()]);
}

/// Wrench Mind takes two cards of the holder's choice.
#[test]
fn test_wrench_mind_discards_two() {
    let (mut engine, mut state) = fresh();
    put_battlefield(&mut state, P0, "Swamp");
    put_battlefield(&mut state, P0, "Swamp");
    give_hand(&mut state, P0, "Wrench Mind");
    give_hand(&mut state, P1, "Swamp");
    give_hand(&mut state, P1, "The Rack");
    give_hand(&mut state, P1, "Fatal Push");

    cast_first_matching(&mut engine, &mut state, P0, "Wrench Mind targeting Player 1");
    resolve_stack(&mut engine, &mut state);

    assert_eq!(state.hand_size(P1), 1);
    assert_eq!(state.zones.size(ZoneId::graveyard(P1)), 2);
}

// =============================================================================
// Symmetric effects
// =============================================================================

/// Smallpox hits both players: life, a discard, a creature, a land.
#[test]
fn test_smallpox_symmetry() {
    let (mut engine, mut state) = fresh();
    for _ in 0..3 {
        put_battlefield(&mut state, P0, "Swamp");
    }
    put_battlefield(&mut state, P1, "Swamp");
    put_battlefield(&mut state, P0, "Orcish Bowmasters");
    put_battlefield(&mut state, P1, "Dauthi Voidwalker");
    give_hand(&mut state, P0, "Smallpox");
    give_hand(&mut state, P0, "The Rack");
    give_hand(&mut state, P1, "The Rack");

    cast_first_matching(&mut engine, &mut state, P0, "Smallpox");
    resolve_stack(&mut engine, &mut state);

    assert_eq!(state.players[P0].life, 19);
    assert_eq!(state.players[P1].life, 19);
    assert_eq!(state.hand_size(P0), 0);
    assert_eq!(state.hand_size(P1), 0);
    assert_eq!(state.creatures_of(P0).count(), 0);
    assert_eq!(state.creatures_of(P1).count(), 0);
    // P0 sacrificed one of three lands (two were tapped for the cast);
    // P1 lost their only land.
    assert_eq!(
        state
            .battlefield_of(P0)
            .filter(|c| state.catalog.get(c.card).is_some_and(|d| d.is_land()))
            .count(),
        2
    );
    assert_eq!(
        state
            .battlefield_of(P1)
            .filter(|c| state.catalog.get(c.card).is_some_and(|d| d.is_land()))
            .count(),
        0
    );
}

// =============================================================================
// Planeswalkers
// =============================================================================

/// Liliana's +1 makes both players discard and raises her loyalty.
#[test]
fn test_liliana_plus_one() {
    let (mut engine, mut state) = fresh();
    let liliana = put_battlefield(&mut state, P0, "Liliana of the Veil");
    give_hand(&mut state, P0, "The Rack");
    give_hand(&mut state, P1, "Fatal Push");

    let action = legal_actions(&state, engine.scripts(), P0)
        .into_iter()
        .find(|a| a.kind == ActionKind::ActivateAbility && a.mode.as_deref() == Some("+1"))
        .unwrap();
    engine.apply_action(&mut state, &action).unwrap();
    resolve_stack(&mut engine, &mut state);

    assert_eq!(state.card(liliana).unwrap().counters_of("loyalty"), 4);
    assert_eq!(state.hand_size(P0), 0);
    assert_eq!(state.hand_size(P1), 0);

    // Once per turn.
    let again = legal_actions(&state, engine.scripts(), P0)
        .into_iter()
        .any(|a| a.kind == ActionKind::ActivateAbility);
    assert!(!again);
}

/// Liliana's -2 forces the targeted player to sacrifice a creature, and
/// spends loyalty she must actually have.
#[test]
fn test_liliana_minus_two() {
    let (mut engine, mut state) = fresh();
    let liliana = put_battlefield(&mut state, P0, "Liliana of the Veil");
    let creature = put_battlefield(&mut state, P1, "Dauthi Voidwalker");

    let action = legal_actions(&state, engine.scripts(), P0)
        .into_iter()
        .find(|a| {
            a.kind == ActionKind::ActivateAbility
                && a.mode.as_deref() == Some("-2")
                && a.targets.contains(&rackline::Target::Player(P1))
        })
        .unwrap();
    engine.apply_action(&mut state, &action).unwrap();
    resolve_stack(&mut engine, &mut state);

    assert!(!state.exists(creature));
    assert_eq!(state.card(liliana).unwrap().counters_of("loyalty"), 1);
}

// =============================================================================
// Combat
// =============================================================================

/// A shadow creature cannot be blocked by a non-shadow creature and
/// connects for its power.
#[test]
fn test_shadow_connects() {
    let (mut engine, mut state) = fresh();
    let dauthi = put_battlefield(&mut state, P0, "Dauthi Voidwalker");
    state.card_mut(dauthi).unwrap().sick = false;
    let bystander = put_battlefield(&mut state, P1, "Orcish Bowmasters");
    state.card_mut(bystander).unwrap().sick = false;

    state.phase = Phase::DeclareAttackers;
    state.priority_player = P0;
    engine
        .apply_action(&mut state, &Action::attack(P0, dauthi, "Dauthi Voidwalker"))
        .unwrap();

    // No legal block exists for the bowmasters.
    engine.apply_action(&mut state, &Action::pass(P0)).unwrap();
    engine.apply_action(&mut state, &Action::pass(P1)).unwrap();
    assert_eq!(state.phase, Phase::DeclareBlockers);
    assert!(!legal_actions(&state, engine.scripts(), P1)
        .iter()
        .any(|a| a.kind == ActionKind::Block));

    let mut guard = 0;
    while state.phase != Phase::Main2 {
        let pass = Action::pass(state.priority_player);
        engine.apply_action(&mut state, &pass).unwrap();
        guard += 1;
        assert!(guard < 50);
    }
    assert_eq!(state.players[P1].life, 17);
}

// =============================================================================
// Turn structure
// =============================================================================

/// Passing a full turn around hands the turn to the other player, who
/// untaps and draws.
#[test]
fn test_turn_rotation_and_draw() {
    let (mut engine, mut state) = fresh();
    let land = put_battlefield(&mut state, P1, "Swamp");
    state.card_mut(land).unwrap().tapped = true;

    let mut guard = 0;
    while !(state.turn == 2 && state.phase == Phase::Main1) {
        let pass = Action::pass(state.priority_player);
        engine.apply_action(&mut state, &pass).unwrap();
        guard += 1;
        assert!(guard < 100);
    }

    assert_eq!(state.active_player, P1);
    assert_eq!(state.hand_size(P1), 1);
    assert!(!state.card(land).unwrap().tapped);
}

/// Mana floated in one step is gone in the next.
#[test]
fn test_mana_pools_empty_between_steps() {
    let (mut engine, mut state) = fresh();
    state.add_mana(P0, rackline::ManaColor::Black, 2);

    engine.apply_action(&mut state, &Action::pass(P0)).unwrap();
    engine.apply_action(&mut state, &Action::pass(P1)).unwrap();

    assert_eq!(state.phase, Phase::BeginCombat);
    assert!(state.players[P0].mana.is_empty());
}

/// Conceding ends the game immediately in the opponent's favor.
#[test]
fn test_concession() {
    let (mut engine, mut state) = fresh();
    engine
        .apply_action(&mut state, &Action::concede(P0))
        .unwrap();

    assert_eq!(
        state.result,
        Some(rackline::GameResult::Winner(P1))
    );
    assert!(legal_actions(&state, engine.scripts(), P1).is_empty());
}
