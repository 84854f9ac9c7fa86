//! Cardinal facing, shared by entity orientation and stepwise movement.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the four grid directions. Row 1 is the top of the grid, so `Down`
/// increases `y`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Parse a direction name, accepting the single-letter aliases.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "up" | "u" => Some(Self::Up),
            "down" | "d" => Some(Self::Down),
            "left" | "l" => Some(Self::Left),
            "right" | "r" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Unit step `(dx, dy)` for one move in this direction.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
            Self::Right => (1, 0),
        }
    }

    /// Glyph drawn on the rendered grid.
    pub fn glyph(&self) -> char {
        match self {
            Self::Up => '^',
            Self::Down => 'v',
            Self::Left => '<',
            Self::Right => '>',
        }
    }

    /// Direction from `(x, y)` toward the centre of a `width` x `height` grid.
    ///
    /// The dominant axis wins; equal magnitudes resolve to the vertical axis.
    pub fn toward_center(x: i32, y: i32, width: u32, height: u32) -> Self {
        // Doubled coordinates keep the half-cell centre exact in integers.
        let dx = i64::from(width) + 1 - 2 * i64::from(x);
        let dy = i64::from(height) + 1 - 2 * i64::from(y);

        if dx.abs() > dy.abs() {
            if dx > 0 {
                Self::Right
            } else {
                Self::Left
            }
        } else if dy >= 0 {
            Self::Down
        } else {
            Self::Up
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
