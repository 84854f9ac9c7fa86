//! Skirmish Core - grid encounter engine
//!
//! This crate tracks tactical encounters ("matches") on a bounded grid:
//! entities with position, health, facing and initiative, a deterministic
//! turn order, and game systems that configure how new matches behave.
//! Front ends drive it through the [`CommandRegistry`], handing over only a
//! channel identity and a way to send text back.

pub mod commands;
pub mod config;
pub mod error;
pub mod rules;
pub mod state;

pub use commands::{
    builtin_registry, CommandError, CommandHandler, CommandRegistry, CommandSpec,
    DispatchOutcome, Invocation, ReplyContext,
};
pub use config::{EngineConfig, GridLimits};
pub use error::{ErrorKind, Result, SkirmishError};
pub use rules::{GameSystem, RuleSet, RuleValue, DEFAULT_SYSTEM};
pub use state::{ChannelScope, DefaultScope, Entity, Facing, Match, MatchManager};
