use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod map;
pub mod object;

pub use config::GameConfig;
pub use error::{GameError, MapError};
pub use game::{Game, Layout, LossReason, Outcome, Phase};

/// Unique identifier for entities (heroes, objects).
pub type EntityId = usize;

/// The four axis-aligned steps in the order heroes consider them: up, right, down, left.
pub const CARDINAL_STEPS: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if it would leave the
    /// non-negative quadrant.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }

    pub fn manhattan_distance(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn chebyshev_distance(self, other: Position) -> usize {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Signed displacement from `self` to `other`.
    pub fn delta_to(self, other: Position) -> (isize, isize) {
        (
            other.x as isize - self.x as isize,
            other.y as isize - self.y as isize,
        )
    }

    /// One greedy step toward `target`: the x axis is closed first, y only once
    /// x is aligned. Returns `self` when already on the target.
    pub fn step_toward(self, target: Position) -> Position {
        if self.x != target.x {
            let x = if target.x > self.x { self.x + 1 } else { self.x - 1 };
            Position { x, y: self.y }
        } else if self.y != target.y {
            let y = if target.y > self.y { self.y + 1 } else { self.y - 1 };
            Position { x: self.x, y }
        } else {
            self
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
