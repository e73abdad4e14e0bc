use strum::{EnumString, VariantArray};

use crate::location::Location;

/// One of the four orthogonal steps on a rectangular grid.
///
/// Parses from and prints as its lowercase name, as used by `wall` directives in puzzle definitions.
#[derive(Copy, Clone, VariantArray, EnumString, strum::Display, Eq, PartialEq, Hash, Debug, Ord, PartialOrd)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Direction {
    /// Towards row 0.
    Up,
    /// Away from row 0.
    Down,
    /// Towards column 0.
    Left,
    /// Away from column 0.
    Right,
}

/// The four `(vertical, horizontal)` pairs spanning each 2x2 block a cell belongs to.
pub(crate) const QUADRANTS: [(Direction, Direction); 4] = [
    (Direction::Up, Direction::Left),
    (Direction::Up, Direction::Right),
    (Direction::Down, Direction::Left),
    (Direction::Down, Direction::Right),
];

impl Direction {
    /// Attempt the step from `location` in this direction and return the resultant [`Location`].
    /// The result may lie outside any grid; see [`Location::offset_by`].
    pub fn attempt_from(&self, location: Location) -> Location {
        match self {
            Self::Up => location.offset_by((0, -1)),
            Self::Down => location.offset_by((0, 1)),
            Self::Left => location.offset_by((-1, 0)),
            Self::Right => location.offset_by((1, 0)),
        }
    }

    /// The opposite direction.
    pub fn invert(&self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// The two directions at right angles to this one.
    pub fn perpendicular(&self) -> [Self; 2] {
        match self {
            Self::Up | Self::Down => [Self::Left, Self::Right],
            Self::Left | Self::Right => [Self::Up, Self::Down],
        }
    }

    /// Determine the direction from `a` to `b`, or [`None`] if they are not orthogonally adjacent.
    pub fn direction_to(a: Location, b: Location) -> Option<Self> {
        Self::VARIANTS.iter().find(|dir| dir.attempt_from(a) == b).copied()
    }

    // slot of this direction in per-cell border and connection arrays
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}
