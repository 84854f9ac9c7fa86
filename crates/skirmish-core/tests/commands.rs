//! Integration tests for command dispatch.
//!
//! Drives the built-in registry the way a front end would: tokenized
//! arguments, a reply context that records what it was sent, and one
//! manager shared across calls.

use std::sync::Mutex;

use async_trait::async_trait;
use skirmish_core::{
    builtin_registry, CommandError, CommandHandler, CommandRegistry, CommandSpec,
    DispatchOutcome, ErrorKind, Facing, Invocation, MatchManager, ReplyContext,
};

struct RecordingContext {
    channel: String,
    server: Option<String>,
    sent: Mutex<Vec<String>>,
}

impl RecordingContext {
    fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            server: Some("guild-1".to_string()),
            sent: Mutex::new(Vec::new()),
        }
    }

    fn last(&self) -> String {
        self.sent.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplyContext for RecordingContext {
    fn channel_key(&self) -> &str {
        &self.channel
    }

    fn server_key(&self) -> Option<&str> {
        self.server.as_deref()
    }

    async fn send(&self, text: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

struct Harness {
    registry: CommandRegistry,
    mgr: MatchManager,
    ctx: RecordingContext,
}

impl Harness {
    fn new() -> Self {
        Self {
            registry: builtin_registry("!"),
            mgr: MatchManager::new(),
            ctx: RecordingContext::new("guild-1:chan-1"),
        }
    }

    /// Run a line like `ent add rogue Rogue 12 5 5 17`.
    async fn run(&mut self, line: &str) -> DispatchOutcome {
        let mut parts = line.split_whitespace().map(str::to_string);
        let name = parts.next().unwrap_or_default();
        let args: Vec<String> = parts.collect();
        self.registry.run(&name, &args, &self.ctx, &mut self.mgr).await
    }
}

/// Two combatants, two turns, one new round
#[tokio::test]
async fn full_encounter_flow() {
    let mut h = Harness::new();

    assert_eq!(h.run("match new m1 Test 10 8").await, DispatchOutcome::Completed);
    assert!(h.ctx.last().contains("This channel now uses it"));

    assert_eq!(h.run("ent add rogue Rogue 12 5 5 17").await, DispatchOutcome::Completed);
    assert!(h.ctx.last().contains("facing up"));
    assert_eq!(h.run("ent add goblin Goblin 7 1 1 12").await, DispatchOutcome::Completed);
    assert!(h.ctx.last().contains("facing right"));

    h.run("turn").await;
    assert!(h.ctx.last().starts_with("Round 1\n➡️ `rogue`"));

    h.run("turn next").await;
    assert!(h.ctx.last().contains("**Goblin**'s turn"));
    h.run("turn next").await;
    assert!(h.ctx.last().starts_with("Round 2: it is now **Rogue**'s turn"));

    h.run("ent move rogue r2 u1").await;
    assert!(h.ctx.last().contains("to (7,4), now facing up"));

    h.run("map").await;
    assert!(h.ctx.last().contains("> . . . . . . . . ."));

    let m = h.mgr.active_match("guild-1:chan-1").unwrap();
    assert_eq!(m.turn_number(), 2);
    assert_eq!(m.entity("rogue").unwrap().facing(), Facing::Up);
}

#[tokio::test]
async fn hp_changes_drive_turn_order() {
    let mut h = Harness::new();
    h.run("match new m1 Test 10 8").await;
    h.run("ent add rogue Rogue 12 5 5 17").await;
    h.run("ent add goblin Goblin 7 1 1 12").await;

    h.run("ent hp goblin -9").await;
    assert!(h.ctx.last().contains("HP -2/7. They are down."));
    assert_eq!(
        h.mgr.active_match("guild-1:chan-1").unwrap().turn_order(),
        ["rogue"]
    );

    h.run("ent hp goblin +20").await;
    assert!(h.ctx.last().contains("HP 7/7"));
    assert_eq!(
        h.mgr.active_match("guild-1:chan-1").unwrap().turn_order(),
        ["rogue", "goblin"]
    );
}

#[tokio::test]
async fn domain_errors_become_replies() {
    let mut h = Harness::new();
    h.run("match new m1 Test 10 8").await;
    h.run("ent add rogue Rogue 12 5 5 17").await;

    let outcome = h.run("ent add goblin Goblin 7 11 1").await;
    assert_eq!(outcome, DispatchOutcome::Rejected(ErrorKind::OutOfBounds));
    assert!(h.ctx.last().starts_with("❌ (11,1) is outside the 10x8 grid"));

    let outcome = h.run("ent tp rogue 5 5").await;
    assert_eq!(outcome, DispatchOutcome::Completed);

    let outcome = h.run("ent add goblin Goblin 7 5 5").await;
    assert_eq!(outcome, DispatchOutcome::Rejected(ErrorKind::Occupied));

    let outcome = h.run("match new m1 Again 4 4").await;
    assert_eq!(outcome, DispatchOutcome::Rejected(ErrorKind::DuplicateId));

    let outcome = h.run("ent hp rogue lots").await;
    assert_eq!(outcome, DispatchOutcome::Rejected(ErrorKind::Validation));
}

#[tokio::test]
async fn commands_need_an_active_match() {
    let mut h = Harness::new();
    let outcome = h.run("ent add rogue Rogue 12 5 5").await;
    assert_eq!(outcome, DispatchOutcome::Rejected(ErrorKind::NotFound));
    assert!(h.ctx.last().contains("no active match in this channel"));
}

#[tokio::test]
async fn missing_arguments_reply_with_help() {
    let mut h = Harness::new();
    h.run("match new m1 Test 10 8").await;

    assert_eq!(h.run("ent add rogue").await, DispatchOutcome::Usage);
    assert!(h
        .ctx
        .last()
        .starts_with("**!ent add**\nUsage: `!ent add <id> <name> <hp> <x> <y> [initiative]`"));

    assert_eq!(h.run("match frobnicate").await, DispatchOutcome::Usage);
    assert!(h.ctx.last().starts_with("**!match**"));
}

#[tokio::test]
async fn unknown_commands_and_case() {
    let mut h = Harness::new();
    assert_eq!(h.run("dance").await, DispatchOutcome::UnknownCommand);
    assert!(h.ctx.last().starts_with("❓ Unknown command `!dance`"));

    assert_eq!(h.run("MATCH").await, DispatchOutcome::Completed);
    assert!(h.ctx.last().starts_with("No matches yet"));

    h.run("help ent rm").await;
    assert!(h.ctx.last().starts_with("**!ent remove**"));
}

#[tokio::test]
async fn systems_shape_new_matches() {
    let mut h = Harness::new();
    h.run("system new grim").await;
    h.run("system set grim spawn_face_center off").await;
    assert_eq!(
        h.run("system set grim spawn_default_facing sideways").await,
        DispatchOutcome::Rejected(ErrorKind::Validation)
    );
    assert!(h.ctx.last().contains("allowed: up, down, left, right"));
    h.run("system set grim spawn_default_facing LEFT").await;
    h.run("system default channel grim").await;

    h.run("match new m1 Test 10 8").await;
    assert!(h.ctx.last().contains("system `grim`"));
    h.run("ent add rogue Rogue 12 5 5").await;
    assert!(h.ctx.last().contains("facing left"));

    assert_eq!(
        h.run("system delete default").await,
        DispatchOutcome::Rejected(ErrorKind::Validation)
    );

    h.run("system default").await;
    assert!(h.ctx.last().contains("Channel: `grim`"));
    assert!(h.ctx.last().ends_with("New matches here use `grim`."));
}

#[tokio::test]
async fn store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let path = path.to_str().unwrap();

    let mut h = Harness::new();
    h.run("match new m1 Test 10 8").await;
    h.run("ent add rogue Rogue 12 5 5 17").await;
    h.run("ent var rogue set inventory.daggers 2").await;
    assert_eq!(h.run(&format!("store save {path}")).await, DispatchOutcome::Completed);
    let saved = h.mgr.clone();

    h.run("match delete m1").await;
    assert_eq!(h.run("store load").await, DispatchOutcome::Usage);
    assert_eq!(h.run(&format!("store load {path}")).await, DispatchOutcome::Completed);
    assert_eq!(h.mgr, saved);

    h.run("ent var rogue get inventory.daggers").await;
    assert_eq!(h.ctx.last(), "`rogue` inventory.daggers = 2");

    let missing = dir.path().join("missing.json");
    let outcome = h.run(&format!("store load {}", missing.display())).await;
    assert_eq!(outcome, DispatchOutcome::Rejected(ErrorKind::NotFound));
    assert_eq!(h.mgr, saved);
}

struct Explodes;

#[async_trait]
impl CommandHandler for Explodes {
    async fn call(
        &self,
        _inv: Invocation<'_>,
        _mgr: &mut MatchManager,
    ) -> Result<(), CommandError> {
        panic!("handler blew up");
    }
}

struct Broken;

#[async_trait]
impl CommandHandler for Broken {
    async fn call(
        &self,
        _inv: Invocation<'_>,
        _mgr: &mut MatchManager,
    ) -> Result<(), CommandError> {
        Err(anyhow::anyhow!("disk on fire").into())
    }
}

#[tokio::test]
async fn handler_failures_never_escape_run() {
    let mut h = Harness::new();
    h.registry
        .register(CommandSpec::new("boom").description("Panics"), Explodes);
    h.registry
        .register(CommandSpec::new("broken").description("Fails"), Broken);

    assert_eq!(h.run("boom").await, DispatchOutcome::Failed);
    assert!(h.ctx.last().starts_with("💥 Unexpected error"));

    assert_eq!(h.run("broken").await, DispatchOutcome::Failed);
    assert_eq!(h.ctx.last(), "💥 Unexpected error: disk on fire");

    let before = h.ctx.count();
    assert_eq!(h.run("match").await, DispatchOutcome::Completed);
    assert_eq!(h.ctx.count(), before + 1);
}

struct Unreachable;

#[async_trait]
impl ReplyContext for Unreachable {
    fn channel_key(&self) -> &str {
        "void"
    }

    async fn send(&self, _text: &str) -> anyhow::Result<()> {
        anyhow::bail!("connection closed")
    }
}

#[tokio::test]
async fn undeliverable_replies_are_contained() {
    let registry = builtin_registry("!");
    let mut mgr = MatchManager::new();
    let args: Vec<String> = ["new", "m1", "Test", "4", "4"].iter().map(|s| s.to_string()).collect();

    let outcome = registry.run("match", &args, &Unreachable, &mut mgr).await;
    assert_eq!(outcome, DispatchOutcome::Failed);
    assert!(mgr.get("m1").is_ok());
}
