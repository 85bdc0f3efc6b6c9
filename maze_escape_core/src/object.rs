use serde::{Deserialize, Serialize};

use crate::{EntityId, Position};

/// Index of an object inside the game's object list.
pub type ObjectId = EntityId;

/// What an interactive object is. A `Trap` becomes a `Cage` once sprung.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Trap,
    Cage,
    Key,
    Exit,
}

impl ObjectKind {
    /// Display symbol for this kind.
    pub fn symbol(self) -> char {
        match self {
            ObjectKind::Trap => 'T',
            ObjectKind::Cage => 'C',
            ObjectKind::Key => 'K',
            ObjectKind::Exit => 'L',
        }
    }
}

/// A key, trap, cage or exit marker placed on the maze.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractiveObject {
    position: Position,
    symbol: char,
    kind: ObjectKind,
    visible: bool,
    active: bool,
}

impl InteractiveObject {
    /// Creates an active object. Traps start hidden from the heroes.
    pub fn new(position: Position, kind: ObjectKind) -> Self {
        Self {
            position,
            symbol: kind.symbol(),
            kind,
            visible: kind != ObjectKind::Trap,
            active: true,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn symbol(&self) -> char {
        self.symbol
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_at(&self, position: Position) -> bool {
        self.position == position
    }

    /// An armed trap that has not been sprung yet.
    pub fn is_armed_trap(&self) -> bool {
        self.kind == ObjectKind::Trap && self.active
    }

    /// A sprung trap that still holds a hero.
    pub fn is_closed_cage(&self) -> bool {
        self.kind == ObjectKind::Cage && self.active && self.visible
    }

    /// Springs an armed trap into a visible cage. Returns `false` (and changes
    /// nothing) for anything that is not an active trap.
    pub fn trigger_trap(&mut self) -> bool {
        if !self.is_armed_trap() {
            return false;
        }
        self.kind = ObjectKind::Cage;
        self.symbol = ObjectKind::Cage.symbol();
        self.visible = true;
        true
    }
}
