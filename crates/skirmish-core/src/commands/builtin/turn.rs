//! `turn` - initiative order and the round counter.

use async_trait::async_trait;

use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::state::{Match, MatchManager};

pub(super) fn spec() -> CommandSpec {
    CommandSpec::new("turn")
        .usage("[show|next|set] ...")
        .description("Show and advance the turn order")
        .sub("show", "", "Show the turn order and round")
        .sub("next", "", "Advance to the next entity")
        .sub("set", "<id>", "Make an entity the active one")
}

pub(super) struct TurnCommand;

#[async_trait]
impl CommandHandler for TurnCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let m = mgr.active_match_mut(inv.channel())?;
        let reply = match inv.sub().as_deref() {
            None | Some("show") => order(m, inv.prefix()),
            Some("next") => match m.next_turn().map(str::to_owned) {
                Some(id) => {
                    let name = m.entity(&id)?.name().to_string();
                    format!("Round {}: it is now **{name}**'s turn (`{id}`).", m.turn_number())
                }
                None => format!(
                    "No turn order yet. Set initiatives with `{}ent init <id> <n>`.",
                    inv.prefix()
                ),
            },
            Some("set") => {
                inv.require(2, Some("set"))?;
                let id = &inv.rest()[0];
                m.set_active(id)?;
                let name = m.entity(id)?.name().to_string();
                format!("It is now **{name}**'s turn (`{id}`).")
            }
            Some(_) => return Err(inv.usage(None)),
        };
        inv.reply(reply).await
    }
}

fn order(m: &Match, prefix: &str) -> String {
    if m.turn_order().is_empty() {
        return format!("Turn order is empty. Set initiatives with `{prefix}ent init <id> <n>`.");
    }
    let lines: Vec<String> = m
        .turn_order()
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let e = m.entity(id).ok()?;
            let marker = if index == m.active_index() { "➡️" } else { "  " };
            Some(format!(
                "{marker} `{id}` **{}** (init {})",
                e.name(),
                e.initiative().unwrap_or_default()
            ))
        })
        .collect();
    format!("Round {}\n{}", m.turn_number(), lines.join("\n"))
}
