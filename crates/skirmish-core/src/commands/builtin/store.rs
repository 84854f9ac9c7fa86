//! `store` - JSON snapshots of the whole engine state.

use std::path::Path;

use async_trait::async_trait;

use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::state::MatchManager;

pub(super) fn spec() -> CommandSpec {
    CommandSpec::new("store")
        .usage("<save|load> <path>")
        .description("Save or load every match and system (paths are local to the host)")
        .sub("save", "<path>", "Write a snapshot")
        .sub("load", "<path>", "Replace all state with a snapshot")
}

pub(super) struct StoreCommand;

#[async_trait]
impl CommandHandler for StoreCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let sub = inv.sub();
        match sub.as_deref() {
            Some(verb @ ("save" | "load")) => {
                inv.require(2, Some(verb))?;
                let path = Path::new(&inv.rest()[0]);
                if verb == "save" {
                    mgr.save(path)?;
                    inv.reply(format!("Saved to `{}`.", path.display())).await
                } else {
                    mgr.load(path)?;
                    inv.reply(format!("Loaded from `{}`.", path.display())).await
                }
            }
            _ => Err(inv.usage(None)),
        }
    }
}
