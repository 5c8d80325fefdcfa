//! Rules knowledge: legal action enumeration, deterministic effect
//! scripts, and state-based actions.

pub mod effects;
pub mod legal;
pub mod sba;

pub use effects::{
    AbilityScript, EffectTemplate, ScriptLibrary, SpellMode, SpellScript, TargetSpec,
};
pub use legal::{attack_power_cap, can_afford, legal_actions};
pub use sba::run_to_fixpoint;
