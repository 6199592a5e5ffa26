use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod explorer;
pub mod map;
pub mod scenario;
pub mod simulation;

/// Unique identifier for agents placed in a world.
pub type EntityId = usize;

/// Represents a 2D coordinate.
///
/// Coordinates are signed: agents reason about cells just outside the grid
/// before they learn where the boundary is. `x` grows to the right and `y`
/// grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// Returns the adjacent position one unit away in `direction`.
    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.offset();
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The four orthogonal neighbours, in [`Direction::PRECEDENCE`] order.
    pub fn neighbors(self) -> [(Direction, Position); 4] {
        Direction::PRECEDENCE.map(|direction| (direction, self.step(direction)))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One of the four movement directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Right,
    Left,
    Down,
    Up,
}

impl Direction {
    /// Fixed tie-break order used whenever several directions qualify.
    pub const PRECEDENCE: [Direction; 4] = [
        Direction::Right,
        Direction::Left,
        Direction::Down,
        Direction::Up,
    ];

    /// Returns the `(dx, dy)` unit offset of this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Down => (0, 1),
            Direction::Up => (0, -1),
        }
    }

    /// Direction of the single step from `src` to an adjacent `dst`.
    pub fn between(src: Position, dst: Position) -> Option<Direction> {
        Direction::PRECEDENCE
            .into_iter()
            .find(|direction| src.step(*direction) == dst)
    }
}

/// Represents actions an agent can decide to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Move(Direction),
    Suck,
    NoOp,
}

impl Action {
    pub const LEFT: Action = Action::Move(Direction::Left);
    pub const RIGHT: Action = Action::Move(Direction::Right);
    pub const UP: Action = Action::Move(Direction::Up);
    pub const DOWN: Action = Action::Move(Direction::Down);

    /// The four movement actions.
    pub const MOVES: [Action; 4] = [Action::LEFT, Action::RIGHT, Action::UP, Action::DOWN];

    pub fn is_move(self) -> bool {
        matches!(self, Action::Move(_))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Move(direction) => write!(f, "{:?}", direction),
            Action::Suck => f.write_str("Suck"),
            Action::NoOp => f.write_str("NoOp"),
        }
    }
}

/// Whether a cell currently holds dirt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellStatus {
    Clean,
    Dirty,
}

/// What an agent senses each step: where it is and whether that cell is dirty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Percept {
    pub location: Position,
    pub status: CellStatus,
}

impl Percept {
    pub fn is_dirty(&self) -> bool {
        self.status == CellStatus::Dirty
    }
}
