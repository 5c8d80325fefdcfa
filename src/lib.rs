//! # rackline
//!
//! A deterministic two-player Modern duel simulator built around a
//! mono-black discard deck and the opponents it meets.
//!
//! ## Design Principles
//!
//! 1. **One mutation surface**: every change to a game goes through
//!    `GameState`'s primitive transitions, whether it came from a
//!    scripted resolution or an oracle verdict. Everything lands in
//!    the change log.
//!
//! 2. **Enumerate, then act**: the legal-action enumerator is the
//!    authority on what a player may do; the engine rejects anything
//!    outside the enumerated set before it can touch state.
//!
//! 3. **Deterministic by seed**: shuffles are the only randomness.
//!    A match seed replays the same games, action for action.
//!
//! 4. **The oracle proposes, the engine disposes**: interactions with
//!    no deterministic script go to an external rules authority, whose
//!    verdict is validated change by change before any of it applies.
//!
//! ## Modules
//!
//! - `core`: player IDs, phases, mana, actions, the change log, RNG
//! - `cards`: printed definitions, the catalog, physical card objects
//! - `zones`: zone identity and the card-location tracker
//! - `state`: the game state model and its mutation primitives
//! - `rules`: legal action enumeration, effect scripts, state-based actions
//! - `engine`: the stack, triggers, and the turn state machine
//! - `oracle`: the external rules-oracle boundary
//! - `opponent`: profile-driven deterministic opponents
//! - `orchestrator`: game setup, the priority loop, match bookkeeping

pub mod cards;
pub mod core;
pub mod engine;
pub mod error;
pub mod opponent;
pub mod oracle;
pub mod orchestrator;
pub mod rules;
pub mod state;
pub mod zones;

// Re-export commonly used types
pub use crate::cards::{CardCatalog, CardDefinition, CardId, CardInstance, InstanceId};
pub use crate::core::{
    Action, ActionKind, ChangeLog, GameRng, GameRngState, LogEntry, ManaColor, ManaCost, ManaPool,
    Phase, PlayerId, PlayerMap, Target,
};
pub use crate::engine::{ResolutionEngine, StackEntry, StackPayload};
pub use crate::error::EngineError;
pub use crate::opponent::{OpponentBrain, StrategyProfile};
pub use crate::oracle::{OracleAdapter, RulesOracle, RulingRequest, RulingResponse, StateChange};
pub use crate::orchestrator::{Agent, GameReport, MatchReport, MatchRunner};
pub use crate::rules::{ScriptLibrary, TargetSpec};
pub use crate::state::{GameResult, GameState, PlayerState};
pub use crate::zones::{ZoneId, ZoneKind, ZoneManager, ZonePosition};
