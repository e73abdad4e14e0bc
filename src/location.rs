use std::fmt::{Display, Formatter};
use std::num::NonZero;

use ndarray::Ix;

pub(crate) type Coord = usize;
/// A grid width or height.
pub type Dimension = NonZero<Coord>;

/// A location on a grid in `(x, y)` order, with `Location(0, 0)` at the top left.
#[derive(Clone, Eq, Hash, Copy, PartialEq, Ord, PartialOrd, Debug)]
pub struct Location(pub Coord, pub Coord);

impl Location {
    // ndarray indexes (row, column)
    pub(crate) fn as_index(&self) -> (Coord, Coord) {
        (self.1, self.0)
    }

    /// Offset this location by `(dx, dy)`.
    /// Stepping off the top or left edge wraps around to a huge coordinate, which every bounds check rejects.
    pub fn offset_by(self, rhs: (isize, isize)) -> Self {
        Self(self.0.wrapping_add_signed(rhs.0), self.1.wrapping_add_signed(rhs.1))
    }

    /// Whether `other` is exactly one orthogonal step away.
    pub fn is_adjacent(self, other: Location) -> bool {
        self.0.abs_diff(other.0) + self.1.abs_diff(other.1) == 1
    }
}

impl From<(Ix, Ix)> for Location {
    fn from(value: (Ix, Ix)) -> Self {
        Self(value.1, value.0)
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.0, self.1)
    }
}
