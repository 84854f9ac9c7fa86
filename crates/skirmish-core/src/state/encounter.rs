//! Match model - a grid, the entities on it, and their turn order.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::entity::Entity;
use super::facing::Facing;
use crate::error::{Result, SkirmishError};
use crate::rules::schema::{
    RuleSet, MAX_MOVE_STEPS, RENDER_COORDINATES, SPAWN_DEFAULT_FACING, SPAWN_FACE_CENTER,
};
use crate::rules::DEFAULT_SYSTEM;

/// One leg of a stepwise move: a direction and how many cells to walk.
pub type Step = (Facing, u32);

/// A single encounter.
///
/// Invariants maintained by every mutating method:
/// - `turn_order` holds exactly the alive, initiative-bearing entities, sorted
///   by initiative (desc), case-folded name, then id
/// - `active_index` is a valid index into `turn_order`, or 0 when it is empty
/// - no two living entities share a cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    id: String,

    name: String,

    /// Columns are 1..=grid_width
    grid_width: u32,

    /// Rows are 1..=grid_height
    grid_height: u32,

    /// System the match was created under
    #[serde(default = "default_system_name")]
    system_name: String,

    /// Round counter, starts at 1
    #[serde(default = "first_round")]
    turn_number: u32,

    #[serde(default)]
    active_index: usize,

    #[serde(default)]
    turn_order: Vec<String>,

    /// Resolved rule snapshot
    #[serde(default)]
    rules: RuleSet,

    #[serde(default)]
    entities: BTreeMap<String, Entity>,
}

fn default_system_name() -> String {
    DEFAULT_SYSTEM.to_string()
}

fn first_round() -> u32 {
    1
}

fn missing_entity(match_id: &str, id: &str) -> SkirmishError {
    SkirmishError::not_found(format!("entity `{id}` not found in match `{match_id}`"))
}

fn check_grid(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(SkirmishError::validation(format!(
            "grid must be at least 1x1, got {width}x{height}"
        )));
    }
    Ok(())
}

impl Match {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        grid_width: u32,
        grid_height: u32,
        system_name: impl Into<String>,
        rules: RuleSet,
    ) -> Result<Self> {
        check_grid(grid_width, grid_height)?;
        Ok(Self {
            id: id.into(),
            name: name.into(),
            grid_width,
            grid_height,
            system_name: system_name.into(),
            turn_number: first_round(),
            active_index: 0,
            turn_order: Vec::new(),
            rules,
            entities: BTreeMap::new(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid_width(&self) -> u32 {
        self.grid_width
    }

    pub fn grid_height(&self) -> u32 {
        self.grid_height
    }

    pub fn system_name(&self) -> &str {
        &self.system_name
    }

    pub fn turn_number(&self) -> u32 {
        self.turn_number
    }

    pub fn active_index(&self) -> usize {
        self.active_index
    }

    pub fn turn_order(&self) -> &[String] {
        &self.turn_order
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Give a copy a new identity, re-binding its entities to it.
    pub(crate) fn set_id(&mut self, id: String) {
        self.id = id;
        self.rebind_entities();
    }

    pub(crate) fn apply_rules(&mut self, system_name: String, rules: RuleSet) {
        self.system_name = system_name;
        self.rules = rules;
    }

    /// Checks a deserialized match skips: a real grid, entities keyed by their
    /// own id, and every living entity on its own in-bounds cell.
    pub(crate) fn check_integrity(&self) -> Result<()> {
        check_grid(self.grid_width, self.grid_height)?;
        let mut taken: BTreeMap<(i32, i32), &str> = BTreeMap::new();
        for (key, entity) in &self.entities {
            if key != entity.id() {
                return Err(SkirmishError::validation(format!(
                    "entity stored as `{key}` has id `{}`",
                    entity.id()
                )));
            }
            if !entity.is_alive() {
                continue;
            }
            let (x, y) = entity.position();
            self.check_bounds(x, y)?;
            if let Some(other) = taken.insert((x, y), key.as_str()) {
                return Err(SkirmishError::validation(format!(
                    "entities `{other}` and `{key}` share ({x},{y})"
                )));
            }
        }
        Ok(())
    }

    /// Restore every entity's back-reference (after deserialization or cloning)
    /// and re-derive the turn order.
    pub(crate) fn rebind_entities(&mut self) {
        let id = self.id.clone();
        for entity in self.entities.values_mut() {
            entity.bind(&id);
        }
        self.rebuild_turn_order();
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    pub fn entity(&self, id: &str) -> Result<&Entity> {
        self.entities
            .get(id)
            .ok_or_else(|| missing_entity(&self.id, id))
    }

    /// Mutable access for annotations (team, status, vars, facing). Position,
    /// health and initiative only change through the match.
    pub fn entity_mut(&mut self, id: &str) -> Result<&mut Entity> {
        let match_id = &self.id;
        self.entities
            .get_mut(id)
            .ok_or_else(|| missing_entity(match_id, id))
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ------------------------------------------------------------------
    // Grid
    // ------------------------------------------------------------------

    /// 1-based bounds check.
    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 1 && y >= 1 && x as u32 <= self.grid_width && y as u32 <= self.grid_height
    }

    /// The living entity at `(x, y)`, skipping `ignore`.
    pub fn occupant(&self, x: i32, y: i32, ignore: Option<&str>) -> Option<&Entity> {
        self.entities.values().find(|e| {
            e.is_alive() && e.position() == (x, y) && Some(e.id()) != ignore
        })
    }

    pub fn is_occupied(&self, x: i32, y: i32, ignore: Option<&str>) -> bool {
        self.occupant(x, y, ignore).is_some()
    }

    fn check_bounds(&self, x: i32, y: i32) -> Result<()> {
        if self.in_bounds(x, y) {
            Ok(())
        } else {
            Err(SkirmishError::OutOfBounds {
                x,
                y,
                width: self.grid_width,
                height: self.grid_height,
            })
        }
    }

    fn check_free(&self, x: i32, y: i32, ignore: Option<&str>) -> Result<()> {
        match self.occupant(x, y, ignore) {
            Some(occupant) => Err(SkirmishError::Occupied {
                x,
                y,
                occupant: occupant.id().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Facing given to an entity spawned at `(x, y)` under this match's rules.
    pub fn spawn_facing(&self, x: i32, y: i32) -> Facing {
        if self.rules.flag(SPAWN_FACE_CENTER) {
            Facing::toward_center(x, y, self.grid_width, self.grid_height)
        } else {
            Facing::from_name(&self.rules.text(SPAWN_DEFAULT_FACING)).unwrap_or_default()
        }
    }

    // ------------------------------------------------------------------
    // Entity lifecycle
    // ------------------------------------------------------------------

    /// Place an unbound entity on the grid and take ownership of it.
    pub fn spawn(
        &mut self,
        mut entity: Entity,
        x: i32,
        y: i32,
        initiative: Option<i32>,
    ) -> Result<&Entity> {
        if let Ok(match_id) = entity.match_id() {
            return Err(SkirmishError::AlreadyBound {
                entity: entity.id().to_string(),
                match_id: match_id.to_string(),
            });
        }
        self.check_bounds(x, y)?;
        self.check_free(x, y, None)?;
        if self.entities.contains_key(entity.id()) {
            return Err(SkirmishError::DuplicateId {
                kind: "entity",
                id: entity.id().to_string(),
            });
        }

        entity.place(x, y);
        entity.face(self.spawn_facing(x, y));
        if initiative.is_some() {
            entity.set_initiative(initiative);
        }
        entity.bind(&self.id);

        let id = entity.id().to_string();
        tracing::debug!(match_id = %self.id, entity_id = %id, x, y, "Entity spawned");
        self.entities.insert(id.clone(), entity);
        self.rebuild_turn_order();
        Ok(&self.entities[&id])
    }

    /// Detach an entity, returning it unbound.
    pub fn remove_entity(&mut self, id: &str) -> Result<Entity> {
        let mut entity = self
            .entities
            .remove(id)
            .ok_or_else(|| missing_entity(&self.id, id))?;

        if let Some(pos) = self.turn_order.iter().position(|e| e == id) {
            self.turn_order.remove(pos);
            if pos < self.active_index {
                self.active_index -= 1;
            } else if pos == self.active_index {
                self.active_index = self
                    .active_index
                    .min(self.turn_order.len().saturating_sub(1));
            }
        }
        self.rebuild_turn_order();

        entity.unbind();
        tracing::debug!(match_id = %self.id, entity_id = %id, "Entity removed");
        Ok(entity)
    }

    /// Absolute move. Facing is left alone.
    pub fn teleport(&mut self, id: &str, x: i32, y: i32) -> Result<()> {
        self.entity(id)?;
        self.check_bounds(x, y)?;
        self.check_free(x, y, Some(id))?;
        self.entity_mut(id)?.place(x, y);
        Ok(())
    }

    /// Walk `steps` one cell at a time. Every cell walked must be on the grid;
    /// only the final cell must be free. Nothing changes on failure.
    ///
    /// Returns the final position.
    pub fn move_directions(&mut self, id: &str, steps: &[Step]) -> Result<(i32, i32)> {
        let limit = self.rules.int(MAX_MOVE_STEPS);
        let total: u64 = steps.iter().map(|(_, count)| u64::from(*count)).sum();
        if limit > 0 && total > limit as u64 {
            return Err(SkirmishError::validation(format!(
                "move of {total} steps exceeds the limit of {limit}"
            )));
        }

        let entity = self.entity(id)?;
        let (mut x, mut y) = entity.position();
        let mut facing = entity.facing();

        for (direction, count) in steps {
            let (dx, dy) = direction.delta();
            for _ in 0..*count {
                x += dx;
                y += dy;
                self.check_bounds(x, y)?;
                facing = *direction;
            }
        }
        self.check_free(x, y, Some(id))?;

        let entity = self.entity_mut(id)?;
        entity.place(x, y);
        entity.face(facing);
        Ok((x, y))
    }

    /// Returns the new hp.
    pub fn damage(&mut self, id: &str, amount: i32) -> Result<i32> {
        let entity = self.entity_mut(id)?;
        let crossed = entity.take_damage(amount);
        let hp = entity.hp();
        if crossed {
            tracing::debug!(match_id = %self.id, entity_id = %id, hp, "Entity went down");
            self.rebuild_turn_order();
        }
        Ok(hp)
    }

    /// Returns the new hp.
    pub fn heal(&mut self, id: &str, amount: i32) -> Result<i32> {
        let entity = self.entity_mut(id)?;
        let crossed = entity.heal(amount);
        let hp = entity.hp();
        if crossed {
            tracing::debug!(match_id = %self.id, entity_id = %id, hp, "Entity back up");
            self.rebuild_turn_order();
        }
        Ok(hp)
    }

    /// `None` takes the entity out of the turn order.
    pub fn set_initiative(&mut self, id: &str, initiative: Option<i32>) -> Result<()> {
        self.entity_mut(id)?.set_initiative(initiative);
        self.rebuild_turn_order();
        Ok(())
    }

    pub fn rename_entity(&mut self, id: &str, name: impl Into<String>) -> Result<()> {
        self.entity_mut(id)?.rename(name.into());
        self.rebuild_turn_order();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Turns
    // ------------------------------------------------------------------

    /// Re-derive the turn order from entity state, keeping the active entity
    /// active when it still qualifies.
    pub fn rebuild_turn_order(&mut self) {
        let previously_active = self.current_entity_id().map(str::to_owned);

        let mut ready: Vec<&Entity> = self
            .entities
            .values()
            .filter(|e| e.is_alive() && e.initiative().is_some())
            .collect();
        ready.sort_by(|a, b| {
            b.initiative()
                .cmp(&a.initiative())
                .then_with(|| a.name().to_lowercase().cmp(&b.name().to_lowercase()))
                .then_with(|| a.id().cmp(b.id()))
        });
        self.turn_order = ready.into_iter().map(|e| e.id().to_string()).collect();

        self.active_index = previously_active
            .and_then(|id| self.turn_order.iter().position(|e| *e == id))
            .unwrap_or(0);
    }

    pub fn current_entity_id(&self) -> Option<&str> {
        self.turn_order.get(self.active_index).map(String::as_str)
    }

    pub fn current_entity(&self) -> Option<&Entity> {
        self.current_entity_id()
            .and_then(|id| self.entities.get(id))
    }

    /// Advance to the next entity; wrapping to the top starts a new round.
    pub fn next_turn(&mut self) -> Option<&str> {
        if self.turn_order.is_empty() {
            return None;
        }
        self.active_index = (self.active_index + 1) % self.turn_order.len();
        if self.active_index == 0 {
            self.turn_number += 1;
        }
        self.current_entity_id()
    }

    /// Jump the active pointer to `id`.
    pub fn set_active(&mut self, id: &str) -> Result<()> {
        let pos = self
            .turn_order
            .iter()
            .position(|e| e == id)
            .ok_or_else(|| {
                SkirmishError::not_found(format!("entity `{id}` is not in the turn order"))
            })?;
        self.active_index = pos;
        Ok(())
    }

    /// Entities in turn order, followed by everything else by id.
    pub fn entities_in_turn_order(&self) -> Vec<&Entity> {
        let mut ordered: Vec<&Entity> = self
            .turn_order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .collect();
        ordered.extend(
            self.entities
                .values()
                .filter(|e| !self.turn_order.iter().any(|id| id == e.id())),
        );
        ordered
    }

    // ------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------

    /// Text grid, row 1 first. Living entities show their facing glyph; dead
    /// ones are not drawn.
    pub fn render_grid(&self) -> String {
        let width = self.grid_width as usize;
        let height = self.grid_height as usize;
        let mut cells = vec![vec!['.'; width]; height];
        for entity in self.entities.values().filter(|e| e.is_alive()) {
            let (x, y) = entity.position();
            if self.in_bounds(x, y) {
                cells[(y - 1) as usize][(x - 1) as usize] = entity.facing().glyph();
            }
        }

        let labelled = self.rules.flag(RENDER_COORDINATES);
        let gutter = if labelled { height.to_string().len() } else { 0 };
        let mut out = String::new();

        if labelled {
            out.push_str(&" ".repeat(gutter));
            for x in 1..=width {
                let _ = write!(out, " {}", x % 10);
            }
            out.push('\n');
        }
        for (row, line) in cells.iter().enumerate() {
            if labelled {
                let _ = write!(out, "{:>gutter$} ", row + 1);
            }
            let joined: Vec<String> = line.iter().map(char::to_string).collect();
            out.push_str(&joined.join(" "));
            if row + 1 < height {
                out.push('\n');
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::GameSystem;

    fn arena(width: u32, height: u32) -> Match {
        Match::new("m1", "Test", width, height, "default", RuleSet::engine_defaults()).unwrap()
    }

    fn arena_with(width: u32, height: u32, overrides: &[(&str, &str)]) -> Match {
        let mut system = GameSystem::new("custom");
        for (key, value) in overrides {
            system.set(key, value).unwrap();
        }
        Match::new("m1", "Test", width, height, "custom", system.resolved()).unwrap()
    }

    fn assert_no_shared_cells(m: &Match) {
        let alive: Vec<&Entity> = m.entities().filter(|e| e.is_alive()).collect();
        for (i, a) in alive.iter().enumerate() {
            for b in &alive[i + 1..] {
                assert_ne!(a.position(), b.position(), "{} and {} overlap", a.id(), b.id());
            }
        }
    }

    #[test]
    fn zero_sized_grid_is_rejected() {
        let err = Match::new("m", "M", 0, 4, "default", RuleSet::engine_defaults()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn initiative_order_and_round_counter() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 5, 5, Some(17)).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 1, 1, Some(12)).unwrap();

        assert_eq!(m.turn_order(), ["rogue", "goblin"]);
        assert_eq!(m.current_entity_id(), Some("rogue"));
        assert_eq!(m.next_turn(), Some("goblin"));
        assert_eq!(m.turn_number(), 1);
        assert_eq!(m.next_turn(), Some("rogue"));
        assert_eq!(m.turn_number(), 2);
    }

    #[test]
    fn full_cycle_returns_to_start_and_counts_one_round() {
        let mut m = arena(10, 10);
        for (i, init) in [5, 9, 1, 7].iter().enumerate() {
            let id = format!("e{i}");
            m.spawn(Entity::new(&id, &id, 5), i as i32 + 1, 1, Some(*init)).unwrap();
        }
        m.next_turn();
        let start = m.current_entity_id().unwrap().to_string();
        let round = m.turn_number();
        for _ in 0..m.turn_order().len() {
            m.next_turn();
        }
        assert_eq!(m.current_entity_id(), Some(start.as_str()));
        assert_eq!(m.turn_number(), round + 1);
    }

    #[test]
    fn next_turn_on_empty_order_is_a_no_op() {
        let mut m = arena(4, 4);
        m.spawn(Entity::new("crate", "Crate", 5), 1, 1, None).unwrap();
        assert_eq!(m.next_turn(), None);
        assert_eq!(m.turn_number(), 1);
        assert_eq!(m.active_index(), 0);
    }

    #[test]
    fn ties_break_on_name_then_id() {
        let mut m = arena(10, 10);
        m.spawn(Entity::new("z", "bob", 5), 1, 1, Some(10)).unwrap();
        m.spawn(Entity::new("b", "Alice", 5), 2, 1, Some(10)).unwrap();
        m.spawn(Entity::new("a", "alice", 5), 3, 1, Some(10)).unwrap();
        m.spawn(Entity::new("top", "Zed", 5), 4, 1, Some(20)).unwrap();
        assert_eq!(m.turn_order(), ["top", "a", "b", "z"]);

        let before = m.turn_order().to_vec();
        m.rebuild_turn_order();
        m.rebuild_turn_order();
        assert_eq!(m.turn_order(), before.as_slice());
    }

    #[test]
    fn spawn_faces_center_when_enabled() {
        let mut m = arena(10, 8);
        let e = m.spawn(Entity::new("rogue", "Rogue", 12), 5, 4, None).unwrap();
        assert_eq!(e.facing(), Facing::Down);
        let e = m.spawn(Entity::new("scout", "Scout", 4), 1, 4, None).unwrap();
        assert_eq!(e.facing(), Facing::Right);
    }

    #[test]
    fn spawn_uses_configured_facing_otherwise() {
        let mut m = arena_with(
            10,
            8,
            &[("spawn_face_center", "false"), ("spawn_default_facing", "left")],
        );
        let e = m.spawn(Entity::new("rogue", "Rogue", 12), 1, 4, None).unwrap();
        assert_eq!(e.facing(), Facing::Left);
    }

    #[test]
    fn spawn_failures() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 5, 5, Some(17)).unwrap();

        let bound = m.entity("rogue").unwrap().clone();
        assert!(matches!(
            m.spawn(bound, 2, 2, None),
            Err(SkirmishError::AlreadyBound { .. })
        ));
        assert!(matches!(
            m.spawn(Entity::new("a", "A", 1), 11, 1, None),
            Err(SkirmishError::OutOfBounds { .. })
        ));
        assert!(matches!(
            m.spawn(Entity::new("a", "A", 1), 0, 1, None),
            Err(SkirmishError::OutOfBounds { .. })
        ));
        assert!(matches!(
            m.spawn(Entity::new("a", "A", 1), 5, 5, None),
            Err(SkirmishError::Occupied { .. })
        ));
        assert!(matches!(
            m.spawn(Entity::new("rogue", "Other", 1), 1, 1, None),
            Err(SkirmishError::DuplicateId { .. })
        ));
        assert_eq!(m.entity_count(), 1);
    }

    #[test]
    fn stepwise_move_updates_position_and_facing() {
        let mut m = arena(8, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 3, 3, None).unwrap();
        let pos = m
            .move_directions("rogue", &[(Facing::Right, 2), (Facing::Up, 1)])
            .unwrap();
        assert_eq!(pos, (5, 2));
        let rogue = m.entity("rogue").unwrap();
        assert_eq!(rogue.position(), (5, 2));
        assert_eq!(rogue.facing(), Facing::Up);
    }

    #[test]
    fn blocked_destination_commits_nothing() {
        let mut m = arena(8, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 3, 3, None).unwrap();
        m.spawn(Entity::new("wall", "Wall", 50), 5, 2, None).unwrap();
        let facing_before = m.entity("rogue").unwrap().facing();

        let err = m
            .move_directions("rogue", &[(Facing::Right, 2), (Facing::Up, 1)])
            .unwrap_err();
        assert!(matches!(err, SkirmishError::Occupied { .. }));
        let rogue = m.entity("rogue").unwrap();
        assert_eq!(rogue.position(), (3, 3));
        assert_eq!(rogue.facing(), facing_before);
    }

    #[test]
    fn path_may_cross_occupied_cells_but_not_leave_the_grid() {
        let mut m = arena(8, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 1, 1, None).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 2, 1, None).unwrap();
        assert_eq!(m.move_directions("rogue", &[(Facing::Right, 2)]).unwrap(), (3, 1));

        let err = m
            .move_directions("rogue", &[(Facing::Up, 1), (Facing::Down, 3)])
            .unwrap_err();
        assert!(matches!(err, SkirmishError::OutOfBounds { x: 3, y: 0, .. }));
        assert_eq!(m.entity("rogue").unwrap().position(), (3, 1));
        assert_no_shared_cells(&m);
    }

    #[test]
    fn move_step_limit_comes_from_rules() {
        let mut m = arena_with(8, 8, &[("max_move_steps", "2")]);
        m.spawn(Entity::new("rogue", "Rogue", 12), 1, 1, None).unwrap();
        let err = m.move_directions("rogue", &[(Facing::Right, 3)]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert_eq!(m.move_directions("rogue", &[(Facing::Right, 2)]).unwrap(), (3, 1));
    }

    #[test]
    fn teleport_ignores_self_and_keeps_facing() {
        let mut m = arena(8, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 2, 2, None).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 6, 6, None).unwrap();
        let facing = m.entity("rogue").unwrap().facing();

        m.teleport("rogue", 2, 2).unwrap();
        m.teleport("rogue", 7, 1).unwrap();
        assert_eq!(m.entity("rogue").unwrap().position(), (7, 1));
        assert_eq!(m.entity("rogue").unwrap().facing(), facing);
        assert!(matches!(
            m.teleport("rogue", 6, 6),
            Err(SkirmishError::Occupied { .. })
        ));
        assert!(matches!(
            m.teleport("ghost", 1, 1),
            Err(SkirmishError::NotFound(_))
        ));
    }

    #[test]
    fn death_and_revival_drive_turn_order() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 5, 5, Some(17)).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 1, 1, Some(12)).unwrap();
        m.spawn(Entity::new("orc", "Orc", 15), 2, 2, Some(8)).unwrap();

        assert_eq!(m.damage("goblin", 7).unwrap(), 0);
        assert_eq!(m.turn_order(), ["rogue", "orc"]);

        // A dead body does not block its cell.
        m.spawn(Entity::new("rat", "Rat", 1), 1, 1, None).unwrap();
        assert_no_shared_cells(&m);
        m.remove_entity("rat").unwrap();

        assert_eq!(m.heal("goblin", 3).unwrap(), 3);
        assert_eq!(m.turn_order(), ["rogue", "goblin", "orc"]);
    }

    #[test]
    fn rebuild_keeps_the_active_entity() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 5, 5, Some(17)).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 1, 1, Some(12)).unwrap();
        m.next_turn();
        assert_eq!(m.current_entity_id(), Some("goblin"));

        m.spawn(Entity::new("bard", "Bard", 9), 3, 3, Some(20)).unwrap();
        assert_eq!(m.turn_order(), ["bard", "rogue", "goblin"]);
        assert_eq!(m.current_entity_id(), Some("goblin"));
    }

    #[test]
    fn losing_the_active_entity_resets_to_top() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 5, 5, Some(17)).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 1, 1, Some(12)).unwrap();
        m.next_turn();
        m.damage("goblin", 20).unwrap();
        assert_eq!(m.active_index(), 0);
        assert_eq!(m.current_entity_id(), Some("rogue"));
    }

    #[test]
    fn removing_before_active_keeps_same_entity_active() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("a", "A", 5), 1, 1, Some(30)).unwrap();
        m.spawn(Entity::new("b", "B", 5), 2, 1, Some(20)).unwrap();
        m.spawn(Entity::new("c", "C", 5), 3, 1, Some(10)).unwrap();
        m.set_active("c").unwrap();

        let removed = m.remove_entity("a").unwrap();
        assert!(!removed.is_bound());
        assert_eq!(m.turn_order(), ["b", "c"]);
        assert_eq!(m.current_entity_id(), Some("c"));
    }

    #[test]
    fn removing_the_active_entity_clamps_the_index() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("a", "A", 5), 1, 1, Some(30)).unwrap();
        m.spawn(Entity::new("b", "B", 5), 2, 1, Some(20)).unwrap();
        m.spawn(Entity::new("c", "C", 5), 3, 1, Some(10)).unwrap();

        m.set_active("b").unwrap();
        m.remove_entity("b").unwrap();
        assert_eq!(m.current_entity_id(), Some("c"));

        m.remove_entity("c").unwrap();
        assert_eq!(m.current_entity_id(), Some("a"));

        m.remove_entity("a").unwrap();
        assert_eq!(m.active_index(), 0);
        assert!(m.turn_order().is_empty());
        assert!(m.remove_entity("a").is_err());
    }

    #[test]
    fn clearing_initiative_leaves_the_order() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12), 5, 5, Some(17)).unwrap();
        m.set_initiative("rogue", None).unwrap();
        assert!(m.turn_order().is_empty());
        m.set_initiative("rogue", Some(3)).unwrap();
        assert_eq!(m.turn_order(), ["rogue"]);
    }

    #[test]
    fn rename_resorts_ties() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("x", "Bravo", 5), 1, 1, Some(10)).unwrap();
        m.spawn(Entity::new("y", "Charlie", 5), 2, 1, Some(10)).unwrap();
        assert_eq!(m.turn_order(), ["x", "y"]);
        m.rename_entity("y", "Alpha").unwrap();
        assert_eq!(m.turn_order(), ["y", "x"]);
    }

    #[test]
    fn list_order_puts_turn_takers_first() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("crate", "Crate", 5), 1, 1, None).unwrap();
        m.spawn(Entity::new("rogue", "Rogue", 12), 2, 1, Some(17)).unwrap();
        m.spawn(Entity::new("ghoul", "Ghoul", 5), 3, 1, Some(30)).unwrap();
        m.damage("ghoul", 9).unwrap();
        let ids: Vec<&str> = m.entities_in_turn_order().iter().map(|e| e.id()).collect();
        assert_eq!(ids, ["rogue", "crate", "ghoul"]);
    }

    #[test]
    fn render_hides_the_dead() {
        let mut m = arena_with(
            4,
            3,
            &[("spawn_face_center", "off"), ("spawn_default_facing", "right")],
        );
        m.spawn(Entity::new("body", "Body", 3), 2, 2, None).unwrap();
        m.damage("body", 5).unwrap();
        m.spawn(Entity::new("rogue", "Rogue", 12), 2, 2, None).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 4, 3, None).unwrap();
        m.move_directions("goblin", &[(Facing::Up, 1)]).unwrap();

        assert_eq!(m.render_grid(), ". . . .\n. > . ^\n. . . .");
    }

    #[test]
    fn render_with_coordinates() {
        let mut m = arena_with(
            3,
            2,
            &[("render_coordinates", "true"), ("spawn_face_center", "no")],
        );
        m.spawn(Entity::new("rogue", "Rogue", 12), 3, 1, None).unwrap();
        assert_eq!(m.render_grid(), "  1 2 3\n1 . . v\n2 . . .");
    }

    #[test]
    fn serde_round_trip_rebinds_entities() {
        let mut m = arena(10, 8);
        m.spawn(Entity::new("rogue", "Rogue", 12).with_team("party"), 5, 5, Some(17)).unwrap();
        m.spawn(Entity::new("goblin", "Goblin", 7), 1, 1, Some(12)).unwrap();
        m.spawn(Entity::new("crate", "Crate", 3), 9, 8, None).unwrap();
        m.entity_mut("rogue").unwrap().add_status("hidden");
        m.entity_mut("rogue")
            .unwrap()
            .vars_mut()
            .set_path("inventory.daggers", serde_json::json!(2))
            .unwrap();
        m.damage("crate", 10).unwrap();
        m.next_turn();

        let json = serde_json::to_string(&m).unwrap();
        let mut restored: Match = serde_json::from_str(&json).unwrap();
        assert!(restored.entities().all(|e| !e.is_bound()));
        restored.rebind_entities();

        assert_eq!(restored, m);
        assert_eq!(restored.render_grid(), m.render_grid());
        assert_eq!(restored.turn_order(), m.turn_order());
        assert_eq!(restored.current_entity_id(), Some("goblin"));
        assert!(restored.entities().all(|e| e.match_id().ok() == Some("m1")));
    }
}
