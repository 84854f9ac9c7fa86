//! Encounter state - entities, matches and the manager that owns them.

mod encounter;
mod entity;
mod facing;
mod manager;
mod vars;

pub use encounter::{Match, Step};
pub use entity::Entity;
pub use facing::Facing;
pub use manager::{ChannelScope, DefaultScope, MatchManager};
pub use vars::{parse_var_value, Vars};
