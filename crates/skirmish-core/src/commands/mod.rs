//! Command registry - the single entry point front ends call.
//!
//! Handlers are registered by name together with usage and help metadata.
//! [`CommandRegistry::run`] looks a command up, runs it against the manager
//! and turns every failure into a reply, so nothing a handler does escapes
//! to the caller.

pub mod args;
pub mod builtin;
mod context;

use std::collections::BTreeMap;
use std::fmt;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use tracing::Instrument;

pub use builtin::builtin_registry;
pub use context::{CommandError, Invocation, ReplyContext};

use crate::error::{ErrorKind, Result, SkirmishError};
use crate::state::MatchManager;

/// A command implementation.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn call(&self, inv: Invocation<'_>, mgr: &mut MatchManager) -> Result<(), CommandError>;
}

/// Usage and help metadata for one subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcommandSpec {
    pub name: String,
    pub aliases: Vec<String>,
    /// Argument synopsis, without the command path
    pub usage: String,
    pub description: String,
}

impl SubcommandSpec {
    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// Usage and help metadata for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: String,
    pub usage: String,
    pub description: String,
    pub subcommands: Vec<SubcommandSpec>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            usage: String::new(),
            description: String::new(),
            subcommands: Vec::new(),
        }
    }

    /// Argument synopsis for the bare command.
    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn sub(
        mut self,
        name: impl Into<String>,
        usage: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.subcommands.push(SubcommandSpec {
            name: name.into().to_lowercase(),
            aliases: Vec::new(),
            usage: usage.into(),
            description: description.into(),
        });
        self
    }

    /// Extra names for the most recently declared subcommand.
    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        if let Some(last) = self.subcommands.last_mut() {
            last.aliases
                .extend(aliases.iter().map(|a| a.to_lowercase()));
        }
        self
    }

    pub fn subcommand(&self, name: &str) -> Option<&SubcommandSpec> {
        let name = name.to_lowercase();
        self.subcommands.iter().find(|s| s.answers_to(&name))
    }
}

/// Rendered help for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Help {
    pub title: String,
    pub body: String,
}

impl fmt::Display for Help {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "**{}**\n{}", self.title, self.body)
    }
}

/// How a [`CommandRegistry::run`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Completed,
    UnknownCommand,
    /// Arguments did not fit; help was sent instead
    Usage,
    /// A domain error was reported to the caller
    Rejected(ErrorKind),
    /// Unexpected error or panic
    Failed,
}

struct Registered {
    spec: CommandSpec,
    handler: Box<dyn CommandHandler>,
}

/// Name -> handler table.
pub struct CommandRegistry {
    prefix: String,
    commands: BTreeMap<String, Registered>,
}

impl CommandRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            commands: BTreeMap::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Register (or replace) a command.
    pub fn register(&mut self, spec: CommandSpec, handler: impl CommandHandler + 'static) {
        if self.commands.contains_key(&spec.name) {
            tracing::warn!(command = %spec.name, "Replacing registered command");
        }
        self.commands.insert(
            spec.name.clone(),
            Registered {
                spec,
                handler: Box::new(handler),
            },
        );
    }

    pub fn spec(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(&name.to_lowercase()).map(|r| &r.spec)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    /// `[]` lists every command, `[root]` one command and its subcommands,
    /// `[root, sub]` a single subcommand.
    pub fn help_for<S: AsRef<str>>(&self, path: &[S]) -> Result<Help> {
        let p = &self.prefix;
        match path {
            [] => {
                let lines: Vec<String> = self
                    .commands
                    .values()
                    .map(|r| format!("`{p}{}` - {}", r.spec.name, r.spec.description))
                    .collect();
                Ok(Help {
                    title: "Commands".to_string(),
                    body: format!(
                        "{}\nUse `{p}help <command>` for details.",
                        lines.join("\n")
                    ),
                })
            }
            [root] => {
                let spec = self.lookup(root.as_ref())?;
                let mut body = vec![spec.description.clone()];
                body.push(format!("Usage: `{}`", join_usage(p, &spec.name, &spec.usage)));
                if !spec.subcommands.is_empty() {
                    body.push("Subcommands:".to_string());
                    for sub in &spec.subcommands {
                        let path = format!("{} {}", spec.name, sub.name);
                        body.push(format!(
                            "`{}` - {}",
                            join_usage(p, &path, &sub.usage),
                            sub.description
                        ));
                    }
                }
                Ok(Help {
                    title: format!("{p}{}", spec.name),
                    body: body.join("\n"),
                })
            }
            [root, sub, ..] => {
                let spec = self.lookup(root.as_ref())?;
                let sub = spec.subcommand(sub.as_ref()).ok_or_else(|| {
                    SkirmishError::not_found(format!(
                        "`{p}{}` has no subcommand `{}`",
                        spec.name,
                        sub.as_ref()
                    ))
                })?;
                let path = format!("{} {}", spec.name, sub.name);
                let mut body = vec![
                    format!("Usage: `{}`", join_usage(p, &path, &sub.usage)),
                    sub.description.clone(),
                ];
                if !sub.aliases.is_empty() {
                    body.push(format!("Aliases: {}", sub.aliases.join(", ")));
                }
                Ok(Help {
                    title: format!("{p}{path}"),
                    body: body.join("\n"),
                })
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<&CommandSpec> {
        self.spec(name).ok_or_else(|| {
            SkirmishError::not_found(format!("unknown command `{}{name}`", self.prefix))
        })
    }

    /// Dispatch one command. Every failure is reported through `ctx`.
    pub async fn run(
        &self,
        name: &str,
        args: &[String],
        ctx: &dyn ReplyContext,
        mgr: &mut MatchManager,
    ) -> DispatchOutcome {
        let key = name.trim().to_lowercase();
        let Some(entry) = self.commands.get(&key) else {
            tracing::debug!(command = %name, "Unknown command");
            send(
                ctx,
                &format!("❓ Unknown command `{}{name}`. Try `{}help`.", self.prefix, self.prefix),
            )
            .await;
            return DispatchOutcome::UnknownCommand;
        };

        let span = tracing::debug_span!("command", command = %key, channel = %ctx.channel_key());
        let inv = Invocation {
            ctx,
            args,
            command: &entry.spec.name,
            registry: self,
        };
        let result = AssertUnwindSafe(entry.handler.call(inv, mgr))
            .catch_unwind()
            .instrument(span)
            .await;

        match result {
            Ok(Ok(())) => DispatchOutcome::Completed,
            Ok(Err(CommandError::Domain(e))) => {
                tracing::debug!(kind = e.kind().name(), error = %e, "Command rejected");
                send(ctx, &format!("❌ {e}")).await;
                DispatchOutcome::Rejected(e.kind())
            }
            Ok(Err(CommandError::Usage { root, sub })) => {
                let path: Vec<&str> = std::iter::once(root.as_str())
                    .chain(sub.as_deref())
                    .collect();
                let text = match self.help_for(&path) {
                    Ok(help) => help.to_string(),
                    Err(_) => format!("Try `{}help {root}`.", self.prefix),
                };
                send(ctx, &text).await;
                DispatchOutcome::Usage
            }
            Ok(Err(CommandError::Internal(e))) => {
                tracing::error!(error = ?e, "Command failed");
                send(ctx, &format!("💥 Unexpected error: {e}")).await;
                DispatchOutcome::Failed
            }
            Err(panic) => {
                tracing::error!(panic = %panic_message(&*panic), "Command handler panicked");
                send(ctx, "💥 Unexpected error while running that command.").await;
                DispatchOutcome::Failed
            }
        }
    }
}

fn join_usage(prefix: &str, path: &str, usage: &str) -> String {
    if usage.is_empty() {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}{path} {usage}")
    }
}

async fn send(ctx: &dyn ReplyContext, text: &str) {
    if let Err(e) = ctx.send(text).await {
        tracing::warn!(channel = %ctx.channel_key(), error = %e, "Failed to deliver reply");
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    #[async_trait]
    impl CommandHandler for Noop {
        async fn call(
            &self,
            _inv: Invocation<'_>,
            _mgr: &mut MatchManager,
        ) -> Result<(), CommandError> {
            Ok(())
        }
    }

    struct Quiet;

    #[async_trait]
    impl ReplyContext for Quiet {
        fn channel_key(&self) -> &str {
            "test"
        }

        async fn send(&self, _text: &str) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new("!");
        registry.register(
            CommandSpec::new("Ent")
                .usage("<subcommand> ...")
                .description("Manage entities")
                .sub("add", "<id> <name> <hp> <x> <y> [init]", "Spawn an entity")
                .sub("remove", "<id>", "Remove an entity")
                .aliases(&["del", "rm"]),
            Noop,
        );
        registry.register(CommandSpec::new("map").description("Show the grid"), Noop);
        registry
    }

    #[test]
    fn help_lists_every_command() {
        let help = registry().help_for::<&str>(&[]).unwrap();
        assert_eq!(help.title, "Commands");
        assert!(help.body.starts_with("`!ent` - Manage entities\n`!map` - Show the grid"));
    }

    #[test]
    fn help_for_a_command_lists_subcommands() {
        let help = registry().help_for(&["ENT"]).unwrap();
        assert_eq!(help.title, "!ent");
        assert!(help.body.contains("Usage: `!ent <subcommand> ...`"));
        assert!(help.body.contains("`!ent add <id> <name> <hp> <x> <y> [init]` - Spawn an entity"));

        let help = registry().help_for(&["map"]).unwrap();
        assert_eq!(help.body, "Show the grid\nUsage: `!map`");
    }

    #[test]
    fn help_for_a_subcommand_resolves_aliases() {
        let help = registry().help_for(&["ent", "rm"]).unwrap();
        assert_eq!(help.title, "!ent remove");
        assert_eq!(
            help.body,
            "Usage: `!ent remove <id>`\nRemove an entity\nAliases: del, rm"
        );
    }

    #[test]
    fn help_for_unknown_paths_is_not_found() {
        let registry = registry();
        assert_eq!(
            registry.help_for(&["nope"]).unwrap_err().kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            registry.help_for(&["ent", "fly"]).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn dispatch_matches_names_case_insensitively() {
        let registry = registry();
        let mut mgr = MatchManager::new();
        let outcome = tokio_test::block_on(registry.run("fly", &[], &Quiet, &mut mgr));
        assert_eq!(outcome, DispatchOutcome::UnknownCommand);
        let outcome = tokio_test::block_on(registry.run(" MAP ", &[], &Quiet, &mut mgr));
        assert_eq!(outcome, DispatchOutcome::Completed);
    }

    #[test]
    fn names_are_case_insensitive() {
        let registry = registry();
        assert!(registry.spec("ENT").is_some());
        assert_eq!(registry.names().collect::<Vec<_>>(), ["ent", "map"]);
    }
}
