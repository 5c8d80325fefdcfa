//! The scripted opponent: a deterministic decision engine driven by a
//! strategy profile.

pub mod profile;

pub use profile::{MulliganRule, PriorityRule, SideboardSwap, StrategyProfile};

use tracing::debug;

use crate::cards::{CardDefinition, InstanceId};
use crate::core::{Action, ActionKind, PlayerId, Target};
use crate::orchestrator::Agent;
use crate::state::GameState;

/// Plays one side of a match by walking its profile's rules in order
/// and taking the first legal action a rule endorses. The same state
/// and legal set always produce the same choice.
pub struct OpponentBrain {
    profile: StrategyProfile,
    label: String,
}

impl OpponentBrain {
    #[must_use]
    pub fn new(profile: StrategyProfile) -> Self {
        let label = profile.name.clone();
        Self { profile, label }
    }

    #[must_use]
    pub fn profile(&self) -> &StrategyProfile {
        &self.profile
    }

    /// The first legal action endorsed by one rule, preferring listed
    /// card names in their listed order.
    fn pick_for_rule<'a>(
        rule: &PriorityRule,
        legal: &'a [Action],
        player: PlayerId,
    ) -> Option<&'a Action> {
        let candidates: Vec<&Action> = legal
            .iter()
            .filter(|a| rule.kinds.contains(&a.kind))
            .filter(|a| !targets_self(a, player))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        if rule.cards.is_empty() {
            return Some(candidates[0]);
        }
        for name in &rule.cards {
            if let Some(action) = candidates.iter().find(|a| {
                a.description.contains(name.as_str())
                    || a.mode.as_deref() == Some(name.as_str())
            }) {
                return Some(action);
            }
        }
        None
    }
}

/// True if the action points a harmful effect back at its own actor.
fn targets_self(action: &Action, player: PlayerId) -> bool {
    action
        .targets
        .iter()
        .any(|t| matches!(t, Target::Player(p) if *p == player))
}

/// An instant or sorcery whose resolution strips a hand.
fn is_discard_spell(definition: &CardDefinition) -> bool {
    !definition.is_permanent() && definition.oracle_text.contains("discard")
}

/// A nonland permanent the deck wins through.
fn is_threat(definition: &CardDefinition) -> bool {
    !definition.is_land() && definition.is_permanent()
}

impl Agent for OpponentBrain {
    fn name(&self) -> &str {
        &self.label
    }

    fn choose_action(&mut self, state: &GameState, player: PlayerId, legal: &[Action]) -> Action {
        for rule in &self.profile.rules {
            if !rule.applies(state.phase, state.turn) {
                continue;
            }
            if let Some(action) = Self::pick_for_rule(rule, legal, player) {
                debug!(rule = %rule.name, action = %action, "profile rule fired");
                return action.clone();
            }
        }
        legal
            .iter()
            .find(|a| a.kind == ActionKind::PassPriority)
            .or_else(|| legal.first())
            .cloned()
            .unwrap_or_else(|| Action::pass(player))
    }

    fn keep_hand(&mut self, state: &GameState, player: PlayerId, mulligans: u32) -> bool {
        let rule = &self.profile.mulligan;
        if mulligans >= rule.max_mulligans {
            return true;
        }
        let mut lands = 0;
        let mut discard = 0;
        let mut threats = 0;
        for card in state.hand_of(player) {
            let Some(definition) = state.catalog.get(card.card) else {
                continue;
            };
            if definition.is_land() {
                lands += 1;
            } else if is_discard_spell(definition) {
                discard += 1;
            } else if is_threat(definition) {
                threats += 1;
            }
        }
        lands >= rule.min_lands
            && lands <= rule.max_lands
            && discard >= rule.min_discard
            && threats >= rule.min_threats
    }

    fn adjust_deck(&mut self, deck: &mut Vec<String>, opposing_archetype: &str) {
        for swap in self.profile.swaps_against(opposing_archetype) {
            let mut removed = 0;
            deck.retain(|name| {
                if removed < swap.count && name == &swap.remove {
                    removed += 1;
                    false
                } else {
                    true
                }
            });
            deck.extend(std::iter::repeat(swap.add.clone()).take(removed));
        }
    }

    fn cards_to_bottom(&mut self, state: &GameState, player: PlayerId, n: usize) -> Vec<InstanceId> {
        // Bottom the most expensive spells first; lands only if nothing
        // else is left.
        let mut hand: Vec<InstanceId> = state.hand_of(player).map(|c| c.id).collect();
        hand.sort_by_key(|&id| {
            state.definition(id).map_or((0, 0), |d| {
                (u32::from(d.is_land()), u32::MAX - d.cmc())
            })
        });
        hand.truncate(n);
        hand
    }
}
