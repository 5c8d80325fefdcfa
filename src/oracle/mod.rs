//! The rules oracle boundary.
//!
//! Interactions with no deterministic script are sent to an external
//! rules authority as a JSON snapshot plus a question. The verdict
//! comes back as a list of typed state changes; the adapter validates
//! every change against the current state before applying any of them,
//! so a bad verdict leaves the game untouched. The oracle proposes,
//! the engine disposes.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::cards::InstanceId;
use crate::core::{LogEntry, PlayerId};
use crate::error::EngineError;
use crate::state::GameState;
use crate::zones::{ZoneId, ZoneKind, ZonePosition};

/// One consultation sent to the oracle.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RulingRequest {
    /// Full game state, serialized for the oracle's benefit.
    pub snapshot: serde_json::Value,
    /// The interaction being adjudicated, e.g. the announced action.
    pub interaction: String,
    /// What the engine wants to know.
    pub question: String,
}

/// A single mutation the oracle wants applied. The set is closed and
/// maps one-to-one onto the state's primitive transitions; a verdict
/// cannot express anything the engine could not do itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum StateChange {
    AdjustLife { player: PlayerId, delta: i32 },
    AddPoison { player: PlayerId, n: u32 },
    MoveCard { card: InstanceId, to: ZoneId },
    SetTapped { card: InstanceId, tapped: bool },
    AddCounters { card: InstanceId, kind: String, n: u32 },
    RemoveCounters { card: InstanceId, kind: String, n: u32 },
    MarkDamage { card: InstanceId, amount: i32 },
    DrawCards { player: PlayerId, n: u32 },
    Discard { player: PlayerId, card: InstanceId },
    CreateToken { player: PlayerId, name: String, n: u32 },
}

/// The oracle's verdict on one consultation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RulingResponse {
    /// Whether the interaction is legal at all.
    pub legal: bool,
    /// Human-readable resolution steps, logged verbatim.
    pub resolution: Vec<String>,
    /// The mutations that implement the resolution.
    pub state_changes: Vec<StateChange>,
    /// The oracle's explanation, kept for the log.
    pub reasoning: String,
}

/// A blocking rules authority.
///
/// Implementations own their transport; failures of any kind surface
/// as `OracleUnavailable`.
pub trait RulesOracle {
    fn consult(&self, request: &RulingRequest) -> Result<RulingResponse, EngineError>;
}

/// Validates and applies oracle verdicts.
pub struct OracleAdapter {
    oracle: Box<dyn RulesOracle>,
    timeout: Duration,
}

impl OracleAdapter {
    #[must_use]
    pub fn new(oracle: Box<dyn RulesOracle>, timeout: Duration) -> Self {
        Self { oracle, timeout }
    }

    /// Consult the oracle about an interaction and apply its verdict.
    ///
    /// A verdict that declares the interaction illegal, or that asks
    /// for a change failing validation, is rejected whole: no part of
    /// it reaches the state.
    pub fn adjudicate(
        &self,
        state: &mut GameState,
        interaction: &str,
        question: &str,
    ) -> Result<Vec<LogEntry>, EngineError> {
        let request = RulingRequest {
            snapshot: snapshot(state),
            interaction: interaction.to_string(),
            question: question.to_string(),
        };
        info!(interaction, "consulting rules oracle");

        let started = Instant::now();
        let response = self.oracle.consult(&request)?;
        if started.elapsed() > self.timeout {
            return Err(EngineError::OracleUnavailable {
                detail: format!(
                    "verdict arrived after the {}ms deadline",
                    self.timeout.as_millis()
                ),
            });
        }

        if !response.legal {
            warn!(reasoning = %response.reasoning, "oracle rejected interaction");
            return Err(EngineError::OracleVerdictRejected {
                detail: response.reasoning,
            });
        }
        for change in &response.state_changes {
            validate_change(state, change)?;
        }

        let mut entries = Vec::new();
        for line in &response.resolution {
            entries.push(state.note(format!("oracle: {line}")));
        }
        for change in &response.state_changes {
            entries.extend(apply_change(state, change)?);
        }
        Ok(entries)
    }
}

/// Check one proposed change against the current state without
/// applying it.
fn validate_change(state: &GameState, change: &StateChange) -> Result<(), EngineError> {
    let reject = |detail: String| {
        Err(EngineError::OracleVerdictRejected { detail })
    };
    match change {
        StateChange::AdjustLife { .. } | StateChange::AddPoison { .. } => Ok(()),
        StateChange::MoveCard { card, to } => {
            if !state.exists(*card) {
                return reject(format!("move of nonexistent card {card}"));
            }
            if to.kind == ZoneKind::Stack {
                return reject("oracle verdicts may not place cards on the stack".into());
            }
            Ok(())
        }
        StateChange::SetTapped { card, .. } | StateChange::AddCounters { card, .. } => {
            if state.exists(*card) {
                Ok(())
            } else {
                reject(format!("change to nonexistent card {card}"))
            }
        }
        StateChange::RemoveCounters { card, kind, n } => {
            let Ok(instance) = state.card(*card) else {
                return reject(format!("change to nonexistent card {card}"));
            };
            if instance.counters_of(kind) < *n {
                return reject(format!("removing {n} {kind} counters {card} does not have"));
            }
            Ok(())
        }
        StateChange::MarkDamage { card, amount } => {
            if !state.exists(*card) {
                return reject(format!("damage to nonexistent card {card}"));
            }
            if *amount < 0 {
                return reject(format!("negative damage {amount}"));
            }
            Ok(())
        }
        StateChange::DrawCards { .. } => Ok(()),
        StateChange::Discard { player, card } => {
            if state.zones.is_in(*card, ZoneId::hand(*player)) {
                Ok(())
            } else {
                reject(format!("discard of {card} which is not in {player}'s hand"))
            }
        }
        StateChange::CreateToken { name, .. } => {
            match state.catalog.lookup(name) {
                Some(definition) if definition.is_token => Ok(()),
                Some(_) => reject(format!("{name:?} is not a token definition")),
                None => reject(format!("unknown token name {name:?}")),
            }
        }
    }
}

fn apply_change(
    state: &mut GameState,
    change: &StateChange,
) -> Result<Vec<LogEntry>, EngineError> {
    let mut entries = Vec::new();
    match change {
        StateChange::AdjustLife { player, delta } => {
            entries.push(state.adjust_life(*player, *delta));
        }
        StateChange::AddPoison { player, n } => {
            entries.push(state.add_poison(*player, *n));
        }
        StateChange::MoveCard { card, to } => {
            let (_, entry) = state.move_card(*card, *to, ZonePosition::Top)?;
            entries.push(entry);
        }
        StateChange::SetTapped { card, tapped } => {
            entries.push(state.set_tapped(*card, *tapped)?);
        }
        StateChange::AddCounters { card, kind, n } => {
            entries.push(state.add_counters(*card, kind, *n)?);
        }
        StateChange::RemoveCounters { card, kind, n } => {
            entries.push(state.remove_counters(*card, kind, *n)?);
        }
        StateChange::MarkDamage { card, amount } => {
            entries.push(state.mark_damage(*card, *amount, false)?);
        }
        StateChange::DrawCards { player, n } => {
            state.draw_cards(*player, *n as usize)?;
        }
        StateChange::Discard { player, card } => {
            let (_, entry) = state.discard(*player, *card)?;
            entries.push(entry);
        }
        StateChange::CreateToken { player, name, n } => {
            entries.extend(crate::rules::effects::create_tokens(state, *player, name, *n)?);
        }
    }
    Ok(entries)
}

/// Serialize the parts of the state the oracle needs to rule.
#[must_use]
pub fn snapshot(state: &GameState) -> serde_json::Value {
    let players: Vec<serde_json::Value> = PlayerId::both()
        .into_iter()
        .map(|player| {
            let hand: Vec<String> = state.hand_of(player).map(|c| state.name_of(c.id)).collect();
            let graveyard: Vec<String> = state
                .zones
                .cards_in(ZoneId::graveyard(player))
                .iter()
                .map(|&id| state.name_of(id))
                .collect();
            json!({
                "player": player.index(),
                "life": state.players[player].life,
                "poison": state.players[player].poison,
                "hand": hand,
                "graveyard": graveyard,
                "library_count": state.zones.size(ZoneId::library(player)),
            })
        })
        .collect();

    let battlefield: Vec<serde_json::Value> = state
        .battlefield()
        .map(|card| {
            json!({
                "instance": card.id.raw(),
                "name": state.name_of(card.id),
                "controller": card.controller.index(),
                "tapped": card.tapped,
                "damage": card.damage,
                "counters": &card.counters,
            })
        })
        .collect();

    let stack: Vec<String> = state.stack.iter().map(|e| e.description.clone()).collect();

    json!({
        "turn": state.turn,
        "phase": state.phase.to_string(),
        "active_player": state.active_player.index(),
        "priority_player": state.priority_player.index(),
        "players": players,
        "battlefield": battlefield,
        "stack": stack,
    })
}
