//! `match` - create, select and manage matches.

use async_trait::async_trait;

use crate::commands::args::parse_num;
use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::state::MatchManager;

pub(super) fn spec() -> CommandSpec {
    CommandSpec::new("match")
        .usage("[list|new|use|delete|rename|clone|info] ...")
        .description("Create, select and manage matches")
        .sub("list", "", "List every match")
        .sub(
            "new",
            "<id> <name> <width> <height> [system]",
            "Create a match and use it in this channel",
        )
        .sub("use", "<id>", "Point this channel at a match")
        .sub("delete", "<id>", "Delete a match")
        .sub("rename", "<id> <name>", "Rename a match")
        .sub("clone", "<source> <new_id> [name]", "Copy a match under a new id")
        .sub("info", "[id]", "Show a match's grid, system and rules")
}

pub(super) struct MatchCommand;

#[async_trait]
impl CommandHandler for MatchCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let sub = inv.sub();
        let rest = inv.rest();
        match sub.as_deref() {
            None | Some("list") => {
                let active = mgr.get_active_for_channel(inv.channel());
                let lines: Vec<String> = mgr
                    .list()
                    .map(|m| {
                        let marker = if Some(m.id()) == active { " (in use here)" } else { "" };
                        format!(
                            "**{}** - `{}` {}x{}, system `{}`{marker}",
                            m.name(),
                            m.id(),
                            m.grid_width(),
                            m.grid_height(),
                            m.system_name()
                        )
                    })
                    .collect();
                if lines.is_empty() {
                    inv.reply(format!(
                        "No matches yet. Use `{}match new <id> <name> <width> <height>`.",
                        inv.prefix()
                    ))
                    .await
                } else {
                    inv.reply(format!("Matches:\n{}", lines.join("\n"))).await
                }
            }
            Some("new") => {
                inv.require(5, Some("new"))?;
                let width = parse_num(&rest[2], "width")?;
                let height = parse_num(&rest[3], "height")?;
                let system = rest.get(4).map(String::as_str);
                let created = mgr.create_match(
                    &rest[0],
                    &rest[1],
                    width,
                    height,
                    Some(inv.scope()),
                    system,
                )?;
                let reply = format!(
                    "Created match **{}** (`{}`, {}x{}, system `{}`). This channel now uses it.",
                    created.name(),
                    created.id(),
                    width,
                    height,
                    created.system_name()
                );
                mgr.set_active_for_channel(inv.channel(), &rest[0])?;
                inv.reply(reply).await
            }
            Some("use") => {
                inv.require(2, Some("use"))?;
                mgr.set_active_for_channel(inv.channel(), &rest[0])?;
                inv.reply(format!("Channel now using match `{}`.", rest[0])).await
            }
            Some("delete") => {
                inv.require(2, Some("delete"))?;
                let removed = mgr.delete_match(&rest[0])?;
                inv.reply(format!("Deleted match **{}** (`{}`).", removed.name(), removed.id()))
                    .await
            }
            Some("rename") => {
                inv.require(3, Some("rename"))?;
                let name = rest[1..].join(" ");
                mgr.rename_match(&rest[0], &name)?;
                inv.reply(format!("Match `{}` is now **{name}**.", rest[0])).await
            }
            Some("clone") => {
                inv.require(3, Some("clone"))?;
                let name = (rest.len() > 2).then(|| rest[2..].join(" "));
                let copy = mgr.clone_match(&rest[0], &rest[1], name.as_deref())?;
                inv.reply(format!(
                    "Cloned `{}` to **{}** (`{}`).",
                    rest[0],
                    copy.name(),
                    copy.id()
                ))
                .await
            }
            Some("info") => {
                let m = match rest.first() {
                    Some(id) => mgr.get(id)?,
                    None => mgr.active_match(inv.channel())?,
                };
                let rules: Vec<String> = m
                    .rules()
                    .iter()
                    .map(|(name, value)| format!("  {name} = {value}"))
                    .collect();
                let current = m
                    .current_entity()
                    .map(|e| format!("**{}** (`{}`)", e.name(), e.id()))
                    .unwrap_or_else(|| "nobody".to_string());
                inv.reply(format!(
                    "**{}** `{}`\nGrid: {}x{}\nSystem: `{}`\nRound {}, current turn: {current}\nEntities: {}\nRules:\n{}",
                    m.name(),
                    m.id(),
                    m.grid_width(),
                    m.grid_height(),
                    m.system_name(),
                    m.turn_number(),
                    m.entity_count(),
                    rules.join("\n")
                ))
                .await
            }
            Some(_) => Err(inv.usage(None)),
        }
    }
}
