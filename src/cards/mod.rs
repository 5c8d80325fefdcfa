//! Card data: static definitions, the catalog, and per-game instances.

mod catalog;
mod definition;
mod instance;

pub use catalog::CardCatalog;
pub use definition::{CardDefinition, CardId, CardType};
pub use instance::{CardInstance, InstanceId};
