//! `ent` - spawn, move and annotate entities in the active match.

use async_trait::async_trait;

use super::roster;
use crate::commands::args::{
    parse_coords, parse_delta, parse_facing, parse_initiative, parse_num, parse_steps,
};
use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::error::SkirmishError;
use crate::state::{parse_var_value, Entity, MatchManager};

pub(super) fn spec() -> CommandSpec {
    CommandSpec::new("ent")
        .usage("[add|info|remove|rename|tp|move|face|hp|init|team|status|var] ...")
        .description("Spawn, move and annotate entities in this channel's match")
        .sub(
            "add",
            "<id> <name> <hp> <x> <y> [initiative]",
            "Spawn an entity; it faces the centre unless the system says otherwise",
        )
        .sub("info", "<id>", "Show everything about one entity")
        .sub("remove", "<id>", "Take an entity off the grid")
        .aliases(&["del", "rm"])
        .sub("rename", "<id> <name>", "Change an entity's display name")
        .sub("tp", "<id> <x> <y>", "Teleport to a cell, keeping facing")
        .sub(
            "move",
            "<id> <steps...>",
            "Walk step by step, e.g. `r2 u1` or `right 2 up`",
        )
        .sub("face", "<id> <up|down|left|right>", "Turn an entity")
        .sub("hp", "<id> <+n|-n>", "Heal (positive) or damage (negative)")
        .sub("init", "<id> <n|clear>", "Set or clear initiative")
        .sub("team", "<id> [team|clear]", "Show, set or clear an entity's team")
        .sub("status", "<id> <add|remove> <tag>", "Add or remove a status tag")
        .sub(
            "var",
            "<id> <set|get|unset> <path> [value]",
            "Read or write a dotted-path variable",
        )
}

pub(super) struct EntityCommand;

#[async_trait]
impl CommandHandler for EntityCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let sub = inv.sub();
        let rest = inv.rest();
        let m = mgr.active_match_mut(inv.channel())?;

        let Some(sub) = sub else {
            return inv.reply(format!("Entities:\n{}", roster(m))).await;
        };

        let reply = match sub.as_str() {
            "add" => {
                inv.require(6, Some("add"))?;
                let hp = parse_num(&rest[2], "hp")?;
                let (x, y) = parse_coords(&rest[3], &rest[4])?;
                let initiative = match rest.get(5) {
                    Some(raw) => parse_initiative(raw)?,
                    None => None,
                };
                let e = m.spawn(Entity::new(&rest[0], &rest[1], hp), x, y, initiative)?;
                format!(
                    "Added **{}** (`{}`) at ({x},{y}) facing {}.",
                    e.name(),
                    e.id(),
                    e.facing()
                )
            }
            "info" => {
                inv.require(2, Some("info"))?;
                let e = m.entity(&rest[0])?;
                let status: Vec<&str> = e.status().iter().map(String::as_str).collect();
                let vars = serde_json::to_string_pretty(e.vars().as_map())
                    .map_err(anyhow::Error::from)?;
                format!(
                    "**{}** `{}`\nHP {}/{}{}\nAt ({},{}) facing {}\nInitiative: {}\nTeam: {}\nStatus: {}\nVars:\n```json\n{vars}\n```",
                    e.name(),
                    e.id(),
                    e.hp(),
                    e.max_hp(),
                    if e.is_alive() { "" } else { " (down)" },
                    e.x(),
                    e.y(),
                    e.facing(),
                    e.initiative().map_or_else(|| "none".to_string(), |n| n.to_string()),
                    e.team().unwrap_or("none"),
                    if status.is_empty() { "none".to_string() } else { status.join(", ") },
                )
            }
            "remove" | "del" | "rm" => {
                inv.require(2, Some("remove"))?;
                let removed = m.remove_entity(&rest[0])?;
                format!("Removed **{}** (`{}`).", removed.name(), removed.id())
            }
            "rename" => {
                inv.require(3, Some("rename"))?;
                let name = rest[1..].join(" ");
                m.rename_entity(&rest[0], name.as_str())?;
                format!("`{}` is now **{name}**.", rest[0])
            }
            "tp" => {
                inv.require(4, Some("tp"))?;
                let (x, y) = parse_coords(&rest[1], &rest[2])?;
                m.teleport(&rest[0], x, y)?;
                format!("Teleported `{}` to ({x},{y}).", rest[0])
            }
            "move" => {
                inv.require(3, Some("move"))?;
                let steps = parse_steps(&rest[1..])?;
                let (x, y) = m.move_directions(&rest[0], &steps)?;
                let facing = m.entity(&rest[0])?.facing();
                format!("Moved `{}` to ({x},{y}), now facing {facing}.", rest[0])
            }
            "face" => {
                inv.require(3, Some("face"))?;
                let facing = parse_facing(&rest[1])?;
                m.entity_mut(&rest[0])?.face(facing);
                format!("`{}` now faces {facing}.", rest[0])
            }
            "hp" => {
                inv.require(3, Some("hp"))?;
                let delta = parse_delta(&rest[1])?;
                let id = rest[0].as_str();
                let hp = if delta >= 0 {
                    m.heal(id, delta)?
                } else {
                    m.damage(id, delta.saturating_neg())?
                };
                let e = m.entity(id)?;
                let verb = if delta >= 0 { "Healed" } else { "Damaged" };
                let mut line = format!(
                    "{verb} `{id}` by {}. HP {hp}/{}.",
                    delta.unsigned_abs(),
                    e.max_hp()
                );
                if !e.is_alive() {
                    line.push_str(" They are down.");
                }
                line
            }
            "init" => {
                inv.require(3, Some("init"))?;
                let initiative = parse_initiative(&rest[1])?;
                m.set_initiative(&rest[0], initiative)?;
                match initiative {
                    Some(n) => format!("Set initiative of `{}` to {n}.", rest[0]),
                    None => format!("Cleared initiative of `{}`.", rest[0]),
                }
            }
            "team" => {
                inv.require(2, Some("team"))?;
                let e = m.entity_mut(&rest[0])?;
                match rest.get(1).map(String::as_str) {
                    None => format!("`{}` team: {}", rest[0], e.team().unwrap_or("none")),
                    Some(raw) if matches!(raw.to_lowercase().as_str(), "clear" | "none") => {
                        e.set_team(None);
                        format!("Cleared team of `{}`.", rest[0])
                    }
                    Some(team) => {
                        e.set_team(Some(team.to_string()));
                        format!("`{}` joins team **{team}**.", rest[0])
                    }
                }
            }
            "status" => {
                inv.require(4, Some("status"))?;
                let e = m.entity_mut(&rest[0])?;
                let tag = rest[2..].join(" ");
                match rest[1].to_lowercase().as_str() {
                    "add" => {
                        if e.add_status(tag.as_str()) {
                            format!("`{}` gains **{tag}**.", rest[0])
                        } else {
                            format!("`{}` already has **{tag}**.", rest[0])
                        }
                    }
                    "remove" | "rm" | "del" => {
                        if e.remove_status(&tag) {
                            format!("`{}` loses **{tag}**.", rest[0])
                        } else {
                            format!("`{}` does not have **{tag}**.", rest[0])
                        }
                    }
                    _ => return Err(inv.usage(Some("status"))),
                }
            }
            "var" => {
                inv.require(4, Some("var"))?;
                let e = m.entity_mut(&rest[0])?;
                let path = rest[2].as_str();
                match rest[1].to_lowercase().as_str() {
                    "set" => {
                        inv.require(5, Some("var"))?;
                        let value = parse_var_value(&rest[3..].join(" "));
                        e.vars_mut().set_path(path, value.clone())?;
                        format!("Set `{}` {path} = {value}.", rest[0])
                    }
                    "get" => match e.vars().get_path(path) {
                        Some(value) => format!("`{}` {path} = {value}", rest[0]),
                        None => {
                            return Err(SkirmishError::not_found(format!(
                                "`{}` has no variable `{path}`",
                                rest[0]
                            ))
                            .into())
                        }
                    },
                    "unset" => match e.vars_mut().remove_path(path) {
                        Some(_) => format!("Removed `{}` {path}.", rest[0]),
                        None => format!("`{}` has no variable `{path}`.", rest[0]),
                    },
                    _ => return Err(inv.usage(Some("var"))),
                }
            }
            _ => return Err(inv.usage(None)),
        };
        inv.reply(reply).await
    }
}
