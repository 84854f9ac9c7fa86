//! Skirmish CLI - interactive front end for the encounter engine.
//!
//! Single binary that provides:
//! - `skirmish` / `skirmish repl` - read commands from the terminal
//! - `skirmish run <script>` - run a file of commands and exit
//! - `skirmish init` - write a starter config

mod tokenize;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, EnvFilter};

use skirmish_core::{builtin_registry, CommandRegistry, EngineConfig, MatchManager, ReplyContext};

#[derive(Parser)]
#[command(name = "skirmish")]
#[command(about = "Grid encounter tracker", version)]
struct Cli {
    /// Config file
    #[arg(short, long, global = true, default_value = "skirmish.yaml")]
    config: PathBuf,

    /// State file to load at start and save on exit
    #[arg(short, long, global = true)]
    state: Option<PathBuf>,

    /// Channel key to act as
    #[arg(long, global = true)]
    channel: Option<String>,

    /// Server key for per-server defaults
    #[arg(long, global = true)]
    server: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands interactively
    Repl,

    /// Run every line of a script, then exit
    Run {
        /// File with one command per line
        script: PathBuf,
    },

    /// Write a starter config file
    Init,
}

/// Replies go to stdout; logs go to stderr.
struct CliContext {
    channel: String,
    server: Option<String>,
}

#[async_trait]
impl ReplyContext for CliContext {
    fn channel_key(&self) -> &str {
        &self.channel
    }

    fn server_key(&self) -> Option<&str> {
        self.server.as_deref()
    }

    async fn send(&self, text: &str) -> Result<()> {
        println!("{text}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load_or_default(&cli.config)?;
    if let Some(state) = cli.state {
        config.state_path = Some(state);
    }
    if let Some(channel) = cli.channel {
        config.channel = channel;
    }
    if cli.server.is_some() {
        config.server = cli.server;
    }

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(&config.log_filter)
    };

    let logs = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    match cli.command {
        Some(Commands::Init) => init_config(&cli.config),
        Some(Commands::Run { script }) => {
            let file = tokio::fs::File::open(&script)
                .await
                .with_context(|| format!("Failed to open script {}", script.display()))?;
            run_session(&config, BufReader::new(file), false).await
        }
        Some(Commands::Repl) | None => {
            println!(
                "Skirmish. Try: {p}match new m1 Test 10 8 | {p}ent add rogue Rogue 12 5 5 17 | {p}turn next | {p}state | {p}help",
                p = config.prefix
            );
            run_session(&config, BufReader::new(tokio::io::stdin()), true).await
        }
    }
}

/// Feed lines from `input` through the registry until EOF or `quit`.
async fn run_session<R>(config: &EngineConfig, input: R, interactive: bool) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let registry = builtin_registry(&config.prefix);
    let mut mgr = MatchManager::new().with_limits(config.limits);
    if let Some(path) = &config.state_path {
        if path.exists() {
            mgr.load(path)
                .with_context(|| format!("Failed to load state from {}", path.display()))?;
        } else {
            tracing::info!(path = %path.display(), "No saved state yet, starting fresh");
        }
    }

    let ctx = CliContext {
        channel: config.channel.clone(),
        server: config.server.clone(),
    };
    tracing::debug!(channel = %ctx.channel, server = ?ctx.server, "Session started");

    let mut lines = input.lines();
    loop {
        if interactive {
            print!("> ");
            std::io::stdout().flush()?;
        }
        let Some(line) = lines.next_line().await? else {
            if interactive {
                println!();
            }
            break;
        };
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if matches!(line, "quit" | "exit") {
            break;
        }
        dispatch_line(&registry, &ctx, &mut mgr, line).await;
    }

    if let Some(path) = &config.state_path {
        mgr.save(path)
            .with_context(|| format!("Failed to save state to {}", path.display()))?;
    }
    println!("bye");
    Ok(())
}

async fn dispatch_line(
    registry: &CommandRegistry,
    ctx: &CliContext,
    mgr: &mut MatchManager,
    line: &str,
) {
    let prefix = registry.prefix();
    let Some(body) = line.strip_prefix(prefix) else {
        println!("Commands must start with '{prefix}'");
        return;
    };
    let tokens = match tokenize::split_line(body) {
        Ok(tokens) => tokens,
        Err(e) => {
            println!("❌ {e}");
            return;
        }
    };
    let Some((name, args)) = tokens.split_first() else {
        return;
    };
    let outcome = registry.run(name, args, ctx, mgr).await;
    tracing::debug!(command = %name, ?outcome, "Dispatched");
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        println!("{} already exists, leaving it alone", path.display());
        return Ok(());
    }
    let default_config = r#"# Skirmish configuration

# Prefix for commands and help text
prefix: "!"

# Channel and (optional) server this terminal speaks as
channel: local
# server: home

# Loaded at start if present, written on exit
state_path: skirmish-state.json

limits:
  max_width: 100
  max_height: 100

log_filter: info
"#;
    std::fs::write(path, default_config)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Created {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the channel / server keys if you share state files");
    println!("  2. Run: skirmish");
    Ok(())
}
