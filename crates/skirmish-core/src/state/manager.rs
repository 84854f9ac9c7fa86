//! Match manager - owns every match, game system and binding, and persists
//! them as one JSON snapshot.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::encounter::Match;
use crate::config::GridLimits;
use crate::error::{Result, SkirmishError};
use crate::rules::{GameSystem, RuleValue, DEFAULT_SYSTEM};

/// Where a command came from, for system resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelScope<'a> {
    pub channel: &'a str,
    pub server: Option<&'a str>,
}

/// One tier of the default-system bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultScope<'a> {
    Global,
    Server(&'a str),
    Channel(&'a str),
}

/// Process-wide state: matches, systems, channel bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchManager {
    #[serde(default)]
    matches: BTreeMap<String, Match>,

    /// channel key -> match id
    #[serde(default)]
    active_by_channel: BTreeMap<String, String>,

    #[serde(default)]
    systems: BTreeMap<String, GameSystem>,

    #[serde(default = "default_system_name")]
    default_system_name: String,

    #[serde(default)]
    default_system_per_server: BTreeMap<String, String>,

    #[serde(default)]
    default_system_per_channel: BTreeMap<String, String>,

    #[serde(skip)]
    limits: GridLimits,
}

fn default_system_name() -> String {
    DEFAULT_SYSTEM.to_string()
}

impl Default for MatchManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchManager {
    /// Empty state with only the `default` system.
    pub fn new() -> Self {
        let mut systems = BTreeMap::new();
        systems.insert(DEFAULT_SYSTEM.to_string(), GameSystem::new(DEFAULT_SYSTEM));
        Self {
            matches: BTreeMap::new(),
            active_by_channel: BTreeMap::new(),
            systems,
            default_system_name: default_system_name(),
            default_system_per_server: BTreeMap::new(),
            default_system_per_channel: BTreeMap::new(),
            limits: GridLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: GridLimits) -> Self {
        self.limits = limits;
        self
    }

    // ------------------------------------------------------------------
    // Matches
    // ------------------------------------------------------------------

    /// Create a match whose rules are resolved from `system` or, failing that,
    /// the defaults bound to `scope`.
    pub fn create_match(
        &mut self,
        id: &str,
        name: &str,
        width: u32,
        height: u32,
        scope: Option<ChannelScope<'_>>,
        system: Option<&str>,
    ) -> Result<&Match> {
        if self.matches.contains_key(id) {
            return Err(SkirmishError::DuplicateId {
                kind: "match",
                id: id.to_string(),
            });
        }
        self.limits.check(width, height)?;

        let system_name = self.resolve_system_name(system, scope)?;
        let rules = self.system(&system_name)?.resolved();
        let created = Match::new(id, name, width, height, system_name.as_str(), rules)?;

        tracing::info!(match_id = %id, system = %system_name, width, height, "Match created");
        self.matches.insert(id.to_string(), created);
        self.get(id)
    }

    /// Remove a match and every channel binding that pointed at it.
    pub fn delete_match(&mut self, id: &str) -> Result<Match> {
        let removed = self.matches.remove(id).ok_or_else(|| missing_match(id))?;
        self.active_by_channel.retain(|_, bound| bound != id);
        tracing::info!(match_id = %id, "Match deleted");
        Ok(removed)
    }

    /// Deep copy of `source` under a new id. Channel bindings are not copied.
    pub fn clone_match(
        &mut self,
        source: &str,
        new_id: &str,
        name: Option<&str>,
    ) -> Result<&Match> {
        if self.matches.contains_key(new_id) {
            return Err(SkirmishError::DuplicateId {
                kind: "match",
                id: new_id.to_string(),
            });
        }
        let mut copy = self.get(source)?.clone();
        let name = name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} (copy)", copy.name()));
        copy.set_id(new_id.to_string());
        copy.set_name(name);

        tracing::info!(match_id = %new_id, source = %source, "Match cloned");
        self.matches.insert(new_id.to_string(), copy);
        self.get(new_id)
    }

    pub fn rename_match(&mut self, id: &str, name: &str) -> Result<()> {
        self.get_mut(id)?.set_name(name.to_string());
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<&Match> {
        self.matches.get(id).ok_or_else(|| missing_match(id))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Match> {
        self.matches.get_mut(id).ok_or_else(|| missing_match(id))
    }

    /// All matches by id.
    pub fn list(&self) -> impl Iterator<Item = &Match> {
        self.matches.values()
    }

    // ------------------------------------------------------------------
    // Channel bindings
    // ------------------------------------------------------------------

    pub fn set_active_for_channel(&mut self, channel: &str, match_id: &str) -> Result<()> {
        self.get(match_id)?;
        self.active_by_channel
            .insert(channel.to_string(), match_id.to_string());
        tracing::debug!(channel = %channel, match_id = %match_id, "Channel bound");
        Ok(())
    }

    pub fn get_active_for_channel(&self, channel: &str) -> Option<&str> {
        self.active_by_channel.get(channel).map(String::as_str)
    }

    /// The match bound to `channel`.
    pub fn active_match(&self, channel: &str) -> Result<&Match> {
        let id = self
            .get_active_for_channel(channel)
            .ok_or_else(unbound_channel)?;
        self.get(id)
    }

    pub fn active_match_mut(&mut self, channel: &str) -> Result<&mut Match> {
        let id = self
            .active_by_channel
            .get(channel)
            .ok_or_else(unbound_channel)?;
        self.matches.get_mut(id).ok_or_else(|| missing_match(id))
    }

    // ------------------------------------------------------------------
    // Game systems
    // ------------------------------------------------------------------

    pub fn systems(&self) -> impl Iterator<Item = &GameSystem> {
        self.systems.values()
    }

    pub fn system(&self, name: &str) -> Result<&GameSystem> {
        self.systems.get(name).ok_or_else(|| missing_system(name))
    }

    pub fn create_system(&mut self, name: &str) -> Result<&GameSystem> {
        if name.trim().is_empty() {
            return Err(SkirmishError::validation("system name cannot be empty"));
        }
        if self.systems.contains_key(name) {
            return Err(SkirmishError::DuplicateId {
                kind: "system",
                id: name.to_string(),
            });
        }
        tracing::info!(system = %name, "Game system created");
        self.systems
            .insert(name.to_string(), GameSystem::new(name));
        self.system(name)
    }

    /// Delete a system and scrub default bindings that named it. Existing
    /// matches keep their rule snapshot.
    pub fn delete_system(&mut self, name: &str) -> Result<GameSystem> {
        if name == DEFAULT_SYSTEM {
            return Err(SkirmishError::validation(format!(
                "the `{DEFAULT_SYSTEM}` system cannot be deleted"
            )));
        }
        let removed = self.systems.remove(name).ok_or_else(|| missing_system(name))?;
        self.default_system_per_server.retain(|_, bound| bound != name);
        self.default_system_per_channel.retain(|_, bound| bound != name);
        if self.default_system_name == name {
            self.default_system_name = default_system_name();
        }
        tracing::info!(system = %name, "Game system deleted");
        Ok(removed)
    }

    pub fn set_system_rule(&mut self, system: &str, key: &str, raw: &str) -> Result<RuleValue> {
        let system = self
            .systems
            .get_mut(system)
            .ok_or_else(|| missing_system(system))?;
        system.set(key, raw).cloned()
    }

    /// Returns false when the rule had no override.
    pub fn unset_system_rule(&mut self, system: &str, key: &str) -> Result<bool> {
        self.systems
            .get_mut(system)
            .ok_or_else(|| missing_system(system))?
            .unset(key)
    }

    pub fn set_default_system(&mut self, scope: DefaultScope<'_>, name: &str) -> Result<()> {
        self.system(name)?;
        match scope {
            DefaultScope::Global => self.default_system_name = name.to_string(),
            DefaultScope::Server(server) => {
                self.default_system_per_server
                    .insert(server.to_string(), name.to_string());
            }
            DefaultScope::Channel(channel) => {
                self.default_system_per_channel
                    .insert(channel.to_string(), name.to_string());
            }
        }
        tracing::debug!(?scope, system = %name, "Default system bound");
        Ok(())
    }

    /// Drop one binding. The global tier resets to `default`. Returns whether
    /// anything changed.
    pub fn clear_default_system(&mut self, scope: DefaultScope<'_>) -> bool {
        match scope {
            DefaultScope::Global => {
                let changed = self.default_system_name != DEFAULT_SYSTEM;
                self.default_system_name = default_system_name();
                changed
            }
            DefaultScope::Server(server) => {
                self.default_system_per_server.remove(server).is_some()
            }
            DefaultScope::Channel(channel) => {
                self.default_system_per_channel.remove(channel).is_some()
            }
        }
    }

    /// The system bound at exactly this tier.
    pub fn default_system_for(&self, scope: DefaultScope<'_>) -> Option<&str> {
        match scope {
            DefaultScope::Global => Some(&self.default_system_name),
            DefaultScope::Server(server) => {
                self.default_system_per_server.get(server).map(String::as_str)
            }
            DefaultScope::Channel(channel) => {
                self.default_system_per_channel.get(channel).map(String::as_str)
            }
        }
    }

    /// Explicit name, else channel default, else server default, else global.
    pub fn resolve_system_name(
        &self,
        explicit: Option<&str>,
        scope: Option<ChannelScope<'_>>,
    ) -> Result<String> {
        if let Some(name) = explicit {
            return self.system(name).map(|s| s.name().to_string());
        }
        let scoped = scope.and_then(|scope| {
            self.default_system_per_channel
                .get(scope.channel)
                .or_else(|| {
                    scope
                        .server
                        .and_then(|server| self.default_system_per_server.get(server))
                })
        });
        Ok(scoped.unwrap_or(&self.default_system_name).clone())
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the whole state as one JSON document. The snapshot goes to a
    /// sibling `.tmp` file first and is renamed over `path`, so an earlier save
    /// survives a failed write.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| SkirmishError::storage(path, e))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SkirmishError::storage(path, e))?;
        }
        let staging = staging_path(path);
        std::fs::write(&staging, json).map_err(|e| SkirmishError::storage(&staging, e))?;
        if let Err(e) = std::fs::rename(&staging, path) {
            let _ = std::fs::remove_file(&staging);
            return Err(SkirmishError::storage(path, e));
        }
        tracing::info!(path = %path.display(), matches = self.matches.len(), "State saved");
        Ok(())
    }

    /// Replace the whole state with the snapshot at `path`. On any failure the
    /// current state is untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SkirmishError::not_found(format!(
                    "no saved state at {}",
                    path.display()
                )))
            }
            Err(e) => return Err(SkirmishError::storage(path, e)),
        };
        let mut loaded: MatchManager =
            serde_json::from_str(&text).map_err(|e| SkirmishError::storage(path, e))?;
        loaded.limits = self.limits;
        loaded
            .check_integrity()
            .map_err(|e| SkirmishError::storage(path, e))?;
        loaded.restore();

        *self = loaded;
        tracing::info!(path = %path.display(), matches = self.matches.len(), "State loaded");
        Ok(())
    }

    /// Reject snapshots whose structure no sequence of operations could produce.
    fn check_integrity(&self) -> Result<()> {
        for (key, m) in &self.matches {
            if key != m.id() {
                return Err(SkirmishError::validation(format!(
                    "match stored as `{key}` has id `{}`",
                    m.id()
                )));
            }
            m.check_integrity()
                .map_err(|e| SkirmishError::validation(format!("match `{key}`: {e}")))?;
        }
        Ok(())
    }

    /// Fix up whatever a snapshot does not carry or may carry stale.
    fn restore(&mut self) {
        self.systems
            .entry(DEFAULT_SYSTEM.to_string())
            .or_insert_with(|| GameSystem::new(DEFAULT_SYSTEM));
        for system in self.systems.values_mut() {
            system.sanitize();
        }

        let systems = &self.systems;
        if !systems.contains_key(&self.default_system_name) {
            tracing::warn!(system = %self.default_system_name, "Global default system missing, using default");
            self.default_system_name = default_system_name();
        }
        self.default_system_per_server
            .retain(|_, name| systems.contains_key(name));
        self.default_system_per_channel
            .retain(|_, name| systems.contains_key(name));

        for (id, m) in self.matches.iter_mut() {
            let system = match systems.get(m.system_name()) {
                Some(system) => system,
                None => {
                    tracing::warn!(match_id = %id, system = %m.system_name(), "Match system missing, using default");
                    &systems[DEFAULT_SYSTEM]
                }
            };
            m.apply_rules(system.name().to_string(), system.resolved());
            m.rebind_entities();
        }

        let matches = &self.matches;
        self.active_by_channel
            .retain(|_, id| matches.contains_key(id));
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn missing_match(id: &str) -> SkirmishError {
    SkirmishError::not_found(format!("match `{id}` not found"))
}

fn missing_system(name: &str) -> SkirmishError {
    SkirmishError::not_found(format!("game system `{name}` not found"))
}

fn unbound_channel() -> SkirmishError {
    SkirmishError::not_found(
        "no active match in this channel; use `match new` or `match use` first",
    )
}
