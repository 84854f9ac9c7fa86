//! The stock command set.

mod entity;
mod help;
mod matches;
mod store;
mod system;
mod turn;
mod view;

use super::CommandRegistry;
use crate::state::{Entity, Match};

/// A registry with every built-in command registered.
pub fn builtin_registry(prefix: &str) -> CommandRegistry {
    let mut registry = CommandRegistry::new(prefix);
    register_builtins(&mut registry);
    registry
}

pub fn register_builtins(registry: &mut CommandRegistry) {
    registry.register(matches::spec(), matches::MatchCommand);
    registry.register(entity::spec(), entity::EntityCommand);
    registry.register(turn::spec(), turn::TurnCommand);
    registry.register(view::map_spec(), view::MapCommand);
    registry.register(view::list_spec(), view::ListCommand);
    registry.register(view::state_spec(), view::StateCommand);
    registry.register(store::spec(), store::StoreCommand);
    registry.register(system::spec(), system::SystemCommand);
    registry.register(help::spec(), help::HelpCommand);
}

/// One-line entity summary used by listings.
fn entity_line(entity: &Entity, active: bool) -> String {
    let marker = if active { "➡️" } else { "  " };
    let mut line = format!(
        "{marker} `{}` **{}** HP {}/{} at ({},{}) facing {}",
        entity.id(),
        entity.name(),
        entity.hp(),
        entity.max_hp(),
        entity.x(),
        entity.y(),
        entity.facing()
    );
    if let Some(init) = entity.initiative() {
        line.push_str(&format!(" init {init}"));
    }
    if let Some(team) = entity.team() {
        line.push_str(&format!(" [{team}]"));
    }
    if !entity.status().is_empty() {
        let tags: Vec<&str> = entity.status().iter().map(String::as_str).collect();
        line.push_str(&format!(" {{{}}}", tags.join(", ")));
    }
    if !entity.is_alive() {
        line.push_str(" (down)");
    }
    line
}

/// Every entity, turn takers first, with the active one marked.
fn roster(m: &Match) -> String {
    let active = m.current_entity_id();
    let lines: Vec<String> = m
        .entities_in_turn_order()
        .into_iter()
        .map(|e| entity_line(e, Some(e.id()) == active))
        .collect();
    if lines.is_empty() {
        "(no entities)".to_string()
    } else {
        lines.join("\n")
    }
}

fn code_block(text: &str) -> String {
    format!("```\n{text}\n```")
}
