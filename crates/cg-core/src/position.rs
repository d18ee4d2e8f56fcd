use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GridError;

/// Integer grid coordinate. The stable identity of a charge node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 3]", into = "[i32; 3]")]
pub struct Position {
    /// East-west axis.
    pub x: i32,
    /// Vertical axis.
    pub y: i32,
    /// North-south axis.
    pub z: i32,
}

impl Position {
    /// Create a position from its three coordinates.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Return this position shifted by the given deltas, or `None` if any
    /// coordinate would leave the `i32` range.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Option<Self> {
        Some(Self::new(
            self.x.checked_add(dx)?,
            self.y.checked_add(dy)?,
            self.z.checked_add(dz)?,
        ))
    }

    /// Return the adjacent position across the given face, if it exists.
    pub fn step(self, dir: Direction) -> Option<Self> {
        let (dx, dy, dz) = dir.delta();
        self.offset(dx, dy, dz)
    }

    /// The position directly above.
    pub fn up(self) -> Option<Self> {
        self.step(Direction::Up)
    }

    /// The position directly below.
    pub fn down(self) -> Option<Self> {
        self.step(Direction::Down)
    }
}

impl From<[i32; 3]> for Position {
    fn from([x, y, z]: [i32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Position> for [i32; 3] {
    fn from(pos: Position) -> Self {
        [pos.x, pos.y, pos.z]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl FromStr for Position {
    type Err = GridError;

    /// Parse `"x,y,z"`. Whitespace around each coordinate is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GridError::InvalidPosition(s.to_string());
        let coords = s
            .split(',')
            .map(|part| part.trim().parse::<i32>().map_err(|_| invalid()))
            .collect::<Result<Vec<_>, _>>()?;
        match coords.as_slice() {
            [x, y, z] => Ok(Self::new(*x, *y, *z)),
            _ => Err(invalid()),
        }
    }
}

/// One of the six faces of a grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// +y
    Up,
    /// -y
    Down,
    /// -z
    North,
    /// +z
    South,
    /// +x
    East,
    /// -x
    West,
}

impl Direction {
    /// All six faces.
    pub const ALL: [Direction; 6] = [
        Direction::Up,
        Direction::Down,
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// The four faces that keep `y` unchanged.
    pub const HORIZONTAL: [Direction; 4] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
    ];

    /// Unit offset `(dx, dy, dz)` across this face.
    pub const fn delta(self) -> (i32, i32, i32) {
        match self {
            Self::Up => (0, 1, 0),
            Self::Down => (0, -1, 0),
            Self::North => (0, 0, -1),
            Self::South => (0, 0, 1),
            Self::East => (1, 0, 0),
            Self::West => (-1, 0, 0),
        }
    }

    /// The face pointing the other way.
    pub const fn opposite(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::North => Self::South,
            Self::South => Self::North,
            Self::East => Self::West,
            Self::West => Self::East,
        }
    }
}
