//! `help` - usage text from the registry's metadata.

use async_trait::async_trait;

use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::state::MatchManager;

pub(super) fn spec() -> CommandSpec {
    CommandSpec::new("help")
        .usage("[command] [subcommand]")
        .description("Show help for commands")
}

pub(super) struct HelpCommand;

#[async_trait]
impl CommandHandler for HelpCommand {
    async fn call(&self, inv: Invocation<'_>, _mgr: &mut MatchManager) -> Result<(), CommandError> {
        let path: Vec<&str> = inv
            .args
            .iter()
            .take(2)
            .map(|a| a.trim_start_matches(inv.prefix()))
            .collect();
        let help = inv.registry().help_for(&path)?;
        inv.reply(help.to_string()).await
    }
}
