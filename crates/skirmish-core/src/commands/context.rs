//! What a handler sees: the caller's reply capability, its arguments and the
//! registry it was dispatched from.

use async_trait::async_trait;
use thiserror::Error;

use super::CommandRegistry;
use crate::error::SkirmishError;
use crate::state::ChannelScope;

/// The only capability a front end hands to the engine.
#[async_trait]
pub trait ReplyContext: Send + Sync {
    /// Opaque identity of the conversation location (e.g. `guild:channel`).
    fn channel_key(&self) -> &str;

    /// Optional grouping above the channel, used for per-server defaults.
    fn server_key(&self) -> Option<&str> {
        None
    }

    /// Emit text back to the caller.
    async fn send(&self, text: &str) -> anyhow::Result<()>;
}

/// How a handler can fail. Translated into a reply exactly once, by
/// [`CommandRegistry::run`].
#[derive(Debug, Error)]
pub enum CommandError {
    /// Expected failure raised by the model; its message goes to the caller.
    #[error(transparent)]
    Domain(#[from] SkirmishError),

    /// Too few or unrecognized arguments; the caller gets help for this path.
    #[error("wrong arguments for `{root}`")]
    Usage { root: String, sub: Option<String> },

    /// Anything else.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// A single dispatched command.
pub struct Invocation<'a> {
    pub ctx: &'a dyn ReplyContext,
    pub args: &'a [String],
    pub(super) command: &'a str,
    pub(super) registry: &'a CommandRegistry,
}

impl<'a> Invocation<'a> {
    pub fn channel(&self) -> &'a str {
        self.ctx.channel_key()
    }

    pub fn scope(&self) -> ChannelScope<'a> {
        ChannelScope {
            channel: self.ctx.channel_key(),
            server: self.ctx.server_key(),
        }
    }

    /// Canonical name of the command being run.
    pub fn command(&self) -> &'a str {
        self.command
    }

    pub fn registry(&self) -> &'a CommandRegistry {
        self.registry
    }

    /// Command prefix for rendering hints like "`!match use <id>`".
    pub fn prefix(&self) -> &'a str {
        self.registry.prefix()
    }

    pub fn arg(&self, index: usize) -> Option<&'a str> {
        self.args.get(index).map(String::as_str)
    }

    /// First argument, lowercased.
    pub fn sub(&self) -> Option<String> {
        self.arg(0).map(str::to_lowercase)
    }

    /// Arguments after the subcommand.
    pub fn rest(&self) -> &'a [String] {
        self.args.get(1..).unwrap_or(&[])
    }

    /// A usage error for this command, optionally narrowed to `sub`.
    pub fn usage(&self, sub: Option<&str>) -> CommandError {
        CommandError::Usage {
            root: self.command.to_string(),
            sub: sub.map(str::to_string),
        }
    }

    /// Fail with usage help unless at least `count` arguments were given.
    pub fn require(&self, count: usize, sub: Option<&str>) -> Result<(), CommandError> {
        if self.args.len() < count {
            Err(self.usage(sub))
        } else {
            Ok(())
        }
    }

    pub async fn reply(&self, text: impl AsRef<str>) -> Result<(), CommandError> {
        self.ctx.send(text.as_ref()).await?;
        Ok(())
    }
}
