//! Entity model - a positioned, health-bearing actor.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::facing::Facing;
use super::vars::Vars;
use crate::error::{Result, SkirmishError};

/// A combatant or object on a match grid.
///
/// Entities start unbound. [`Match::spawn`](super::Match::spawn) places one on
/// a grid and the match owns it from then on; grid-aware operations (moves,
/// removal, initiative) go through the owning match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// Caller-supplied identifier, unique within its match
    id: String,

    /// Display name (also the first turn-order tie-break)
    name: String,

    hp: i32,

    max_hp: i32,

    /// 1-based column
    x: i32,

    /// 1-based row
    y: i32,

    #[serde(default)]
    team: Option<String>,

    #[serde(default)]
    status: BTreeSet<String>,

    /// Absent means "not in the turn order"
    #[serde(default)]
    initiative: Option<i32>,

    #[serde(default)]
    facing: Facing,

    #[serde(default, alias = "extras")]
    vars: Vars,

    /// Id of the owning match. Relationship only; rebuilt on load.
    #[serde(skip)]
    bound_to: Option<String>,
}

impl Entity {
    /// Create an unbound entity at full health.
    pub fn new(id: impl Into<String>, name: impl Into<String>, hp: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hp,
            max_hp: hp,
            x: 0,
            y: 0,
            team: None,
            status: BTreeSet::new(),
            initiative: None,
            facing: Facing::default(),
            vars: Vars::new(),
            bound_to: None,
        }
    }

    pub fn with_team(mut self, team: impl Into<String>) -> Self {
        self.team = Some(team.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn max_hp(&self) -> i32 {
        self.max_hp
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn team(&self) -> Option<&str> {
        self.team.as_deref()
    }

    pub fn status(&self) -> &BTreeSet<String> {
        &self.status
    }

    pub fn initiative(&self) -> Option<i32> {
        self.initiative
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn vars(&self) -> &Vars {
        &self.vars
    }

    pub fn vars_mut(&mut self) -> &mut Vars {
        &mut self.vars
    }

    /// Only living entities occupy cells and take turns.
    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_bound(&self) -> bool {
        self.bound_to.is_some()
    }

    /// Id of the match this entity is placed in.
    pub fn match_id(&self) -> Result<&str> {
        self.bound_to.as_deref().ok_or_else(|| {
            SkirmishError::validation(format!("entity `{}` is not placed in any match", self.id))
        })
    }

    pub fn set_team(&mut self, team: Option<String>) {
        self.team = team;
    }

    /// Returns false if the tag was already present.
    pub fn add_status(&mut self, tag: impl Into<String>) -> bool {
        self.status.insert(tag.into())
    }

    pub fn remove_status(&mut self, tag: &str) -> bool {
        self.status.remove(tag)
    }

    pub fn face(&mut self, facing: Facing) {
        self.facing = facing;
    }

    // ------------------------------------------------------------------
    // Mutations the owning match sequences with turn-order upkeep
    // ------------------------------------------------------------------

    pub(crate) fn bind(&mut self, match_id: &str) {
        self.bound_to = Some(match_id.to_string());
    }

    pub(crate) fn unbind(&mut self) {
        self.bound_to = None;
    }

    pub(crate) fn place(&mut self, x: i32, y: i32) {
        self.x = x;
        self.y = y;
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_initiative(&mut self, initiative: Option<i32>) {
        self.initiative = initiative;
    }

    /// Subtract a non-negative amount. HP may go below zero (overkill).
    /// Returns true when the entity crossed from alive to dead.
    pub(crate) fn take_damage(&mut self, amount: i32) -> bool {
        let was_alive = self.is_alive();
        self.hp = self.hp.saturating_sub(amount.max(0));
        was_alive != self.is_alive()
    }

    /// Add a non-negative amount, capped at `max_hp`.
    /// Returns true when the entity crossed from dead to alive.
    pub(crate) fn heal(&mut self, amount: i32) -> bool {
        let was_alive = self.is_alive();
        self.hp = self.hp.saturating_add(amount.max(0)).min(self.max_hp);
        was_alive != self.is_alive()
    }
}

/// Equality ignores the match back-reference.
impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.hp == other.hp
            && self.max_hp == other.max_hp
            && self.x == other.x
            && self.y == other.y
            && self.team == other.team
            && self.status == other.status
            && self.initiative == other.initiative
            && self.facing == other.facing
            && self.vars == other.vars
    }
}
