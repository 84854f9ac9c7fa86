//! Read-only views: `map`, `list` and `state`.

use async_trait::async_trait;

use super::{code_block, roster};
use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::state::MatchManager;

pub(super) fn map_spec() -> CommandSpec {
    CommandSpec::new("map").description("Draw the grid of this channel's match")
}

pub(super) fn list_spec() -> CommandSpec {
    CommandSpec::new("list").description("List entities, turn order first")
}

pub(super) fn state_spec() -> CommandSpec {
    CommandSpec::new("state").description("Match summary, grid and entities in one reply")
}

pub(super) struct MapCommand;

#[async_trait]
impl CommandHandler for MapCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let m = mgr.active_match(inv.channel())?;
        inv.reply(code_block(&m.render_grid())).await
    }
}

pub(super) struct ListCommand;

#[async_trait]
impl CommandHandler for ListCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let m = mgr.active_match(inv.channel())?;
        inv.reply(roster(m)).await
    }
}

pub(super) struct StateCommand;

#[async_trait]
impl CommandHandler for StateCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let m = mgr.active_match(inv.channel())?;
        let current = m
            .current_entity()
            .map(|e| format!("**{}**", e.name()))
            .unwrap_or_else(|| "nobody".to_string());
        inv.reply(format!(
            "**{}** `{}` - round {}, {current} to act\n{}\n{}",
            m.name(),
            m.id(),
            m.turn_number(),
            code_block(&m.render_grid()),
            roster(m)
        ))
        .await
    }
}
