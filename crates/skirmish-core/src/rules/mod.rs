//! Rule configuration - the schema and the game systems built on it.

pub mod schema;
mod system;

pub use schema::{RuleKind, RuleSet, RuleSpec, RuleValue, RULES};
pub use system::{GameSystem, DEFAULT_SYSTEM};
