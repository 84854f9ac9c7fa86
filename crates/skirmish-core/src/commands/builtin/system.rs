//! `system` - game systems and the defaults that pick one for new matches.

use async_trait::async_trait;

use crate::commands::{CommandError, CommandHandler, CommandSpec, Invocation};
use crate::error::SkirmishError;
use crate::rules::{RULES, DEFAULT_SYSTEM};
use crate::state::{DefaultScope, MatchManager};

pub(super) fn spec() -> CommandSpec {
    CommandSpec::new("system")
        .usage("[list|new|show|set|unset|delete|rules|default] ...")
        .description("Manage game systems (named rule presets for new matches)")
        .sub("list", "", "List systems and which defaults apply here")
        .sub("new", "<name>", "Create a system with no overrides")
        .sub("show", "[name]", "Show every rule of a system (default: the one used here)")
        .sub("set", "<name> <rule> <value>", "Override a rule")
        .sub("unset", "<name> <rule>", "Drop an override")
        .sub("delete", "<name>", "Delete a system (not `default`)")
        .sub("rules", "", "Describe every rule and its allowed values")
        .sub(
            "default",
            "[global|server|channel] [name|clear]",
            "Show or bind the system new matches use",
        )
}

pub(super) struct SystemCommand;

#[async_trait]
impl CommandHandler for SystemCommand {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError> {
        let rest = inv.rest();
        let reply = match inv.sub().as_deref() {
            None | Some("list") => {
                let here = mgr.resolve_system_name(None, Some(inv.scope()))?;
                let lines: Vec<String> = mgr
                    .systems()
                    .map(|s| {
                        let marker = if s.name() == here { " (used here)" } else { "" };
                        format!("`{}` - {} override(s){marker}", s.name(), s.settings().len())
                    })
                    .collect();
                format!("Game systems:\n{}", lines.join("\n"))
            }
            Some("new") => {
                inv.require(2, Some("new"))?;
                let system = mgr.create_system(&rest[0])?;
                format!("Created system `{}`.", system.name())
            }
            Some("show") => {
                let name = match rest.first() {
                    Some(name) => name.clone(),
                    None => mgr.resolve_system_name(None, Some(inv.scope()))?,
                };
                let system = mgr.system(&name)?;
                let lines: Vec<String> = RULES
                    .iter()
                    .filter_map(|rule| {
                        let value = system.get(rule.name)?;
                        let marker = if system.settings().contains_key(rule.name) {
                            " (override)"
                        } else {
                            ""
                        };
                        Some(format!("  {} = {value}{marker}", rule.name))
                    })
                    .collect();
                format!("System `{}`:\n{}", system.name(), lines.join("\n"))
            }
            Some("set") => {
                inv.require(4, Some("set"))?;
                let value = mgr.set_system_rule(&rest[0], &rest[1], &rest[2..].join(" "))?;
                format!(
                    "System `{}`: {} = {value}. Existing matches keep their rules.",
                    rest[0],
                    rest[1].to_lowercase()
                )
            }
            Some("unset") => {
                inv.require(3, Some("unset"))?;
                if mgr.unset_system_rule(&rest[0], &rest[1])? {
                    format!("System `{}`: {} back to default.", rest[0], rest[1].to_lowercase())
                } else {
                    format!("System `{}` has no override for {}.", rest[0], rest[1].to_lowercase())
                }
            }
            Some("delete") => {
                inv.require(2, Some("delete"))?;
                let removed = mgr.delete_system(&rest[0])?;
                format!(
                    "Deleted system `{}`. Defaults that used it fall back to `{DEFAULT_SYSTEM}`.",
                    removed.name()
                )
            }
            Some("rules") => {
                let lines: Vec<String> = RULES
                    .iter()
                    .map(|rule| {
                        format!(
                            "`{}` ({}, default {}) - {}",
                            rule.name,
                            rule.kind.label(),
                            rule.default.to_value(),
                            rule.description
                        )
                    })
                    .collect();
                format!("Rules:\n{}", lines.join("\n"))
            }
            Some("default") => default_binding(&inv, mgr)?,
            Some(_) => return Err(inv.usage(None)),
        };
        inv.reply(reply).await
    }
}

/// `system default [tier] [name|clear]`
fn default_binding(inv: &Invocation<'_>, mgr: &mut MatchManager) -> Result<String, CommandError> {
    let rest = inv.rest();
    let Some(tier) = rest.first() else {
        let scope = inv.scope();
        let show = |found: Option<&str>| {
            found.map_or_else(|| "-".to_string(), |s| format!("`{s}`"))
        };
        let server = scope
            .server
            .and_then(|server| mgr.default_system_for(DefaultScope::Server(server)));
        return Ok(format!(
            "Global: {}\nServer: {}\nChannel: {}\nNew matches here use `{}`.",
            show(mgr.default_system_for(DefaultScope::Global)),
            show(server),
            show(mgr.default_system_for(DefaultScope::Channel(scope.channel))),
            mgr.resolve_system_name(None, Some(scope))?
        ));
    };

    let scope = match tier.to_lowercase().as_str() {
        "global" => DefaultScope::Global,
        "server" => DefaultScope::Server(inv.ctx.server_key().ok_or_else(|| {
            SkirmishError::validation("this channel has no server; use `channel` or `global`")
        })?),
        "channel" => DefaultScope::Channel(inv.channel()),
        _ => return Err(inv.usage(Some("default"))),
    };
    let Some(name) = rest.get(1) else {
        return Ok(match mgr.default_system_for(scope) {
            Some(name) => format!("{} default: `{name}`.", tier.to_lowercase()),
            None => format!("No {} default is set.", tier.to_lowercase()),
        });
    };

    if matches!(name.to_lowercase().as_str(), "clear" | "none") {
        mgr.clear_default_system(scope);
        Ok(format!("Cleared the {} default.", tier.to_lowercase()))
    } else {
        mgr.set_default_system(scope, name)?;
        Ok(format!("New matches under the {} default now use `{name}`.", tier.to_lowercase()))
    }
}
