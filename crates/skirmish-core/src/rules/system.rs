//! Game systems - named, reusable bundles of rule overrides.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::schema::{self, RuleSet, RuleValue};
use crate::error::Result;

/// Name of the system that always exists and cannot be deleted.
pub const DEFAULT_SYSTEM: &str = "default";

/// A named set of overrides on top of the engine defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSystem {
    name: String,

    /// Overrides only; unset rules resolve to the schema default
    #[serde(default)]
    settings: BTreeMap<String, RuleValue>,
}

impl GameSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            settings: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &BTreeMap<String, RuleValue> {
        &self.settings
    }

    /// Effective value of a rule: the override if present, else the engine
    /// default. `None` only for names outside the schema.
    pub fn get(&self, key: &str) -> Option<RuleValue> {
        let spec = schema::spec(key)?;
        Some(
            self.settings
                .get(spec.name)
                .cloned()
                .unwrap_or_else(|| spec.default.to_value()),
        )
    }

    /// Validate `raw` against the schema and store it as an override.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<&RuleValue> {
        let (name, value) = schema::coerce(key, raw)?;
        tracing::debug!(system = %self.name, rule = name, value = %value, "Rule override set");
        self.settings.insert(name.to_string(), value);
        Ok(&self.settings[name])
    }

    /// Drop an override. Returns false when the rule had no override.
    pub fn unset(&mut self, key: &str) -> Result<bool> {
        let spec = schema::require(key)?;
        Ok(self.settings.remove(spec.name).is_some())
    }

    /// Engine defaults overlaid with this system's overrides.
    pub fn resolved(&self) -> RuleSet {
        let mut rules = RuleSet::engine_defaults();
        rules.overlay(&self.settings);
        rules
    }

    /// Re-check overrides read from disk; invalid ones are dropped.
    /// Returns the names that were removed.
    pub(crate) fn sanitize(&mut self) -> Vec<String> {
        let mut kept = BTreeMap::new();
        let mut dropped = Vec::new();
        for (key, value) in std::mem::take(&mut self.settings) {
            match schema::validate(&key, &value) {
                Ok((name, value)) => {
                    kept.insert(name.to_string(), value);
                }
                Err(err) => {
                    tracing::warn!(system = %self.name, rule = %key, error = %err, "Dropping invalid rule override");
                    dropped.push(key);
                }
            }
        }
        self.settings = kept;
        dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::schema::{MAX_MOVE_STEPS, SPAWN_DEFAULT_FACING};

    #[test]
    fn enum_values_are_validated_and_normalized() {
        let mut system = GameSystem::new("grim");
        let err = system.set(SPAWN_DEFAULT_FACING, "sideways").unwrap_err();
        assert!(err.to_string().contains("allowed: up, down, left, right"));
        assert!(system.settings().is_empty());

        system.set(SPAWN_DEFAULT_FACING, "LEFT").unwrap();
        assert_eq!(
            system.settings().get(SPAWN_DEFAULT_FACING),
            Some(&RuleValue::Text("left".into()))
        );
    }

    #[test]
    fn get_falls_back_to_engine_default() {
        let mut system = GameSystem::new("grim");
        assert_eq!(system.get(MAX_MOVE_STEPS), Some(RuleValue::Int(0)));
        system.set(MAX_MOVE_STEPS, "5").unwrap();
        assert_eq!(system.get(MAX_MOVE_STEPS), Some(RuleValue::Int(5)));
        assert_eq!(system.get("no_such_rule"), None);
    }

    #[test]
    fn unset_restores_default() {
        let mut system = GameSystem::new("grim");
        system.set(MAX_MOVE_STEPS, "5").unwrap();
        assert!(system.unset(MAX_MOVE_STEPS).unwrap());
        assert!(!system.unset(MAX_MOVE_STEPS).unwrap());
        assert!(system.unset("no_such_rule").is_err());
        assert_eq!(system.resolved(), RuleSet::engine_defaults());
    }

    #[test]
    fn sanitize_drops_bad_overrides() {
        let json = r#"{"name":"old","settings":{"max_move_steps":"many","spawn_default_facing":"Up","retired_rule":true}}"#;
        let mut system: GameSystem = serde_json::from_str(json).unwrap();
        let mut dropped = system.sanitize();
        dropped.sort();
        assert_eq!(dropped, vec!["max_move_steps", "retired_rule"]);
        assert_eq!(
            system.settings().get(SPAWN_DEFAULT_FACING),
            Some(&RuleValue::Text("up".into()))
        );
    }
}
