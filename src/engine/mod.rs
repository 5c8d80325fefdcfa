//! Deterministic resolution: the stack, triggered abilities, and the
//! turn state machine.

pub mod machine;
pub mod stack;
pub mod triggers;

pub use machine::ResolutionEngine;
pub use stack::{StackEntry, StackPayload};
pub use triggers::{PendingTrigger, TriggerEffect, TriggerEvent};
