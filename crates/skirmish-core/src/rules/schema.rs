//! Fixed rule schema: every switch a game system may override.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SkirmishError};

pub const SPAWN_FACE_CENTER: &str = "spawn_face_center";
pub const SPAWN_DEFAULT_FACING: &str = "spawn_default_facing";
pub const MAX_MOVE_STEPS: &str = "max_move_steps";
pub const RENDER_COORDINATES: &str = "render_coordinates";

/// Value type accepted by a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Boolean,
    Integer { min: i64, max: i64 },
    Enum(&'static [&'static str]),
}

impl RuleKind {
    pub fn label(&self) -> String {
        match self {
            Self::Boolean => "boolean".to_string(),
            Self::Integer { min, max } => format!("integer {min}..={max}"),
            Self::Enum(allowed) => format!("one of {}", allowed.join("|")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDefault {
    Bool(bool),
    Int(i64),
    Text(&'static str),
}

impl RuleDefault {
    pub fn to_value(self) -> RuleValue {
        match self {
            Self::Bool(b) => RuleValue::Bool(b),
            Self::Int(n) => RuleValue::Int(n),
            Self::Text(s) => RuleValue::Text(s.to_string()),
        }
    }
}

/// One row of the schema table.
#[derive(Debug, Clone, Copy)]
pub struct RuleSpec {
    pub name: &'static str,
    pub kind: RuleKind,
    pub description: &'static str,
    pub default: RuleDefault,
}

pub const RULES: &[RuleSpec] = &[
    RuleSpec {
        name: SPAWN_FACE_CENTER,
        kind: RuleKind::Boolean,
        description: "Spawned entities face toward the centre of the grid.",
        default: RuleDefault::Bool(true),
    },
    RuleSpec {
        name: SPAWN_DEFAULT_FACING,
        kind: RuleKind::Enum(&["up", "down", "left", "right"]),
        description: "Facing for spawned entities when spawn_face_center is off.",
        default: RuleDefault::Text("down"),
    },
    RuleSpec {
        name: MAX_MOVE_STEPS,
        kind: RuleKind::Integer {
            min: 0,
            max: 10_000,
        },
        description: "Most steps a single stepwise move may take (0 = unlimited).",
        default: RuleDefault::Int(0),
    },
    RuleSpec {
        name: RENDER_COORDINATES,
        kind: RuleKind::Boolean,
        description: "Label columns and rows on the rendered map.",
        default: RuleDefault::Bool(false),
    },
];

/// A concrete rule value. Serialized as a bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Look up a rule by (case-insensitive) name.
pub fn spec(key: &str) -> Option<&'static RuleSpec> {
    let key = key.to_ascii_lowercase();
    RULES.iter().find(|r| r.name == key)
}

/// Like [`spec`], but an unknown name is a validation error listing the
/// known rules.
pub fn require(key: &str) -> Result<&'static RuleSpec> {
    spec(key).ok_or_else(|| {
        let known: Vec<&str> = RULES.iter().map(|r| r.name).collect();
        SkirmishError::validation(format!(
            "unknown rule `{key}`; known rules: {}",
            known.join(", ")
        ))
    })
}

/// Parse command text into a value for `key`, returning the canonical rule name.
pub fn coerce(key: &str, raw: &str) -> Result<(&'static str, RuleValue)> {
    let spec = require(key)?;
    let raw = raw.trim();
    let value = match spec.kind {
        RuleKind::Boolean => match raw.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "y" | "on" => RuleValue::Bool(true),
            "false" | "f" | "no" | "n" | "off" => RuleValue::Bool(false),
            _ => {
                return Err(SkirmishError::validation(format!(
                    "`{}` expects true or false, got `{raw}`",
                    spec.name
                )))
            }
        },
        RuleKind::Integer { .. } => {
            let n = raw.parse::<i64>().map_err(|_| {
                SkirmishError::validation(format!(
                    "`{}` expects a base-10 integer, got `{raw}`",
                    spec.name
                ))
            })?;
            check_range(spec, n)?
        }
        RuleKind::Enum(allowed) => enum_member(spec, allowed, raw)?,
    };
    Ok((spec.name, value))
}

/// Check an already-typed value (e.g. read from disk) against the schema,
/// normalizing enum spelling.
pub fn validate(key: &str, value: &RuleValue) -> Result<(&'static str, RuleValue)> {
    let spec = require(key)?;
    let value = match (spec.kind, value) {
        (RuleKind::Boolean, RuleValue::Bool(b)) => RuleValue::Bool(*b),
        (RuleKind::Integer { .. }, RuleValue::Int(n)) => check_range(spec, *n)?,
        (RuleKind::Enum(allowed), RuleValue::Text(s)) => enum_member(spec, allowed, s)?,
        (kind, other) => {
            return Err(SkirmishError::validation(format!(
                "`{}` expects {}, got `{other}`",
                spec.name,
                kind.label()
            )))
        }
    };
    Ok((spec.name, value))
}

fn check_range(spec: &RuleSpec, n: i64) -> Result<RuleValue> {
    match spec.kind {
        RuleKind::Integer { min, max } if n < min || n > max => Err(SkirmishError::validation(
            format!("`{}` must be between {min} and {max}, got {n}", spec.name),
        )),
        _ => Ok(RuleValue::Int(n)),
    }
}

fn enum_member(spec: &RuleSpec, allowed: &[&'static str], raw: &str) -> Result<RuleValue> {
    let lowered = raw.to_ascii_lowercase();
    allowed
        .iter()
        .find(|candidate| **candidate == lowered)
        .map(|canonical| RuleValue::Text(canonical.to_string()))
        .ok_or_else(|| {
            SkirmishError::validation(format!(
                "`{raw}` is not a valid value for `{}`; allowed: {}",
                spec.name,
                allowed.join(", ")
            ))
        })
}

/// A flattened rule mapping: engine defaults with overrides applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet(BTreeMap<String, RuleValue>);

impl RuleSet {
    /// Every schema rule at its default value.
    pub fn engine_defaults() -> Self {
        Self(
            RULES
                .iter()
                .map(|r| (r.name.to_string(), r.default.to_value()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&RuleValue> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub(crate) fn overlay<'a>(
        &mut self,
        overrides: impl IntoIterator<Item = (&'a String, &'a RuleValue)>,
    ) {
        for (key, value) in overrides {
            self.0.insert(key.clone(), value.clone());
        }
    }

    fn fallback(key: &str) -> Option<RuleValue> {
        spec(key).map(|r| r.default.to_value())
    }

    /// Boolean rule, falling back to the schema default when absent.
    pub fn flag(&self, key: &str) -> bool {
        match self.0.get(key).cloned().or_else(|| Self::fallback(key)) {
            Some(RuleValue::Bool(b)) => b,
            _ => false,
        }
    }

    pub fn int(&self, key: &str) -> i64 {
        match self.0.get(key).cloned().or_else(|| Self::fallback(key)) {
            Some(RuleValue::Int(n)) => n,
            _ => 0,
        }
    }

    pub fn text(&self, key: &str) -> String {
        match self.0.get(key).cloned().or_else(|| Self::fallback(key)) {
            Some(RuleValue::Text(s)) => s,
            _ => String::new(),
        }
    }
}
