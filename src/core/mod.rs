//! Core value types: players, phases, mana, actions, the change log,
//! and deterministic RNG.

mod action;
mod log;
mod mana;
mod phase;
mod player;
mod rng;

pub use action::{Action, ActionKind, Target};
pub use log::{ChangeLog, LogEntry};
pub use mana::{ManaColor, ManaCost, ManaPool};
pub use phase::Phase;
pub use player::{PlayerId, PlayerMap};
pub use rng::{GameRng, GameRngState};
