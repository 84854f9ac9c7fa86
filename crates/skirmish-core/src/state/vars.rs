//! Free-form per-entity values addressed by dotted paths.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, SkirmishError};

/// An open tree of named values (inventory, custom stats, notes).
///
/// Not validated against the rule schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vars(Map<String, Value>);

impl Vars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Write `value` at `path`, creating intermediate tables on demand.
    pub fn set_path(&mut self, path: &str, value: Value) -> Result<()> {
        let segments = split_path(path)?;
        let (last, parents) = segments
            .split_last()
            .ok_or_else(|| SkirmishError::validation("var path must not be empty"))?;

        let mut table = &mut self.0;
        for (depth, segment) in parents.iter().enumerate() {
            let slot = table
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            table = match slot {
                Value::Object(inner) => inner,
                _ => {
                    return Err(SkirmishError::validation(format!(
                        "`{}` holds a value, not a table",
                        segments[..=depth].join(".")
                    )))
                }
            };
        }
        table.insert(last.to_string(), value);
        Ok(())
    }

    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let segments = split_path(path).ok()?;
        let (first, rest) = segments.split_first()?;
        let mut current = self.0.get(*first)?;
        for segment in rest {
            current = current.as_object()?.get(*segment)?;
        }
        Some(current)
    }

    /// Remove the value at `path`. Empty parent tables are left in place.
    pub fn remove_path(&mut self, path: &str) -> Option<Value> {
        let segments = split_path(path).ok()?;
        let (last, parents) = segments.split_last()?;
        let mut table = &mut self.0;
        for segment in parents {
            table = table.get_mut(*segment)?.as_object_mut()?;
        }
        table.remove(*last)
    }
}

/// Interpret command text as a JSON scalar when it parses as one, otherwise as
/// a plain string (`12` -> number, `true` -> bool, `rope` -> "rope").
pub fn parse_var_value(raw: &str) -> Value {
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(_) => Value::String(raw.to_string()),
    }
}

fn split_path(path: &str) -> Result<Vec<&str>> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|s| s.trim().is_empty()) {
        return Err(SkirmishError::validation(format!(
            "invalid var path `{path}`"
        )));
    }
    Ok(segments)
}
