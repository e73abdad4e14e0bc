//! Per-cell state: geometry, connectors and the pipes a cell may still take.

use strum::VariantArray;

use crate::direction::Direction;
use crate::location::Location;
use crate::pipe::{PipeId, PipeSet};

/// The fixed geometry on one side of a cell.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Border {
    /// Nothing between this cell and its neighbor.
    #[default]
    Open,
    /// A wall, the edge of the grid, or the side of an unreachable cell.
    Wall,
}

/// The state of one side of a connector between two neighboring cells.
/// Both sides of a connector change together, except that committing a fixture only marks the fixture's own open sides as [`OpenFixed`](Connection::OpenFixed).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Connection {
    /// No connector: behind a wall, or retired by propagation.
    #[default]
    Closed,
    /// Could still be linked.
    Open,
    /// Linked for the duration of a speculative route injection.
    Temporary,
    /// Permanently linked.
    Fixed,
    /// Still open, on a cell which already holds a fixed link.
    OpenFixed,
}

impl Connection {
    /// Fixed or temporary.
    pub fn is_linked(self) -> bool {
        matches!(self, Self::Fixed | Self::Temporary)
    }

    /// Open or open-fixed.
    pub fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::OpenFixed)
    }

    pub(crate) fn is_connectable(self) -> bool {
        matches!(self, Self::Open | Self::OpenFixed | Self::Temporary)
    }
}

/// Which of its pipe's endpoints a terminus cell is.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Terminus {
    /// Routes are generated from here.
    Start,
    /// Where routes end.
    End,
}

/// A single grid cell.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Cell {
    pub(crate) location: Location,
    pub(crate) pipe: Option<PipeId>,
    pub(crate) terminus: Option<Terminus>,
    // indexed by Direction::index
    pub(crate) borders: [Border; 4],
    pub(crate) connections: [Connection; 4],
    pub(crate) possible: PipeSet,
    pub(crate) reachable: bool,
}

impl Cell {
    pub(crate) fn new(location: Location) -> Self {
        Self {
            location,
            pipe: None,
            terminus: None,
            borders: [Border::Open; 4],
            connections: [Connection::Open; 4],
            possible: PipeSet::empty(),
            reachable: true,
        }
    }

    /// Where this cell sits on its grid.
    pub fn location(&self) -> Location {
        self.location
    }

    /// The pipe occupying this cell, if any.
    pub fn pipe(&self) -> Option<PipeId> {
        self.pipe
    }

    /// Which endpoint this cell is, if it is one.
    pub fn terminus(&self) -> Option<Terminus> {
        self.terminus
    }

    /// Whether this cell is one of its pipe's two termini.
    pub fn is_endpoint(&self) -> bool {
        self.terminus.is_some()
    }

    /// `false` for holes.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    /// Reachable and not occupied by any pipe.
    pub fn is_empty(&self) -> bool {
        self.reachable && self.pipe.is_none()
    }

    /// The fixed geometry on the `direction` side.
    pub fn border(&self, direction: Direction) -> Border {
        self.borders[direction.index()]
    }

    /// The connector state on the `direction` side.
    pub fn connection(&self, direction: Direction) -> Connection {
        self.connections[direction.index()]
    }

    /// Pipes this cell may still belong to.
    pub fn possible(&self) -> PipeSet {
        self.possible
    }

    /// Sides with a [`Border::Wall`], grid edges included.
    pub fn wall_count(&self) -> usize {
        self.borders.iter().filter(|border| **border == Border::Wall).count()
    }

    /// Number of fixed or temporary connections.
    pub fn linked_count(&self) -> usize {
        self.connections.iter().filter(|connection| connection.is_linked()).count()
    }

    /// Number of [`Connection::Fixed`] sides.
    pub fn fixed_count(&self) -> usize {
        self.connections.iter().filter(|connection| **connection == Connection::Fixed).count()
    }

    /// Number of connectors in any state other than [`Connection::Closed`].
    pub fn connector_count(&self) -> usize {
        self.connections.iter().filter(|connection| **connection != Connection::Closed).count()
    }

    /// How many linked connections a finished route gives this cell: one for an endpoint, two otherwise.
    pub fn capacity(&self) -> usize {
        if self.is_endpoint() { 1 } else { 2 }
    }

    /// Whether this cell has all the linked connections it can take.
    pub fn is_saturated(&self) -> bool {
        self.linked_count() >= self.capacity()
    }

    /// Occupied but not yet saturated.
    pub fn is_head(&self) -> bool {
        self.pipe.is_some() && !self.is_saturated()
    }

    /// Whether walls restrict traversal of this cell to a single axis.
    pub fn is_channel(&self) -> bool {
        let open = |direction: Direction| self.border(direction) == Border::Open;
        let vertical = open(Direction::Up) && open(Direction::Down);
        let horizontal = open(Direction::Left) && open(Direction::Right);
        self.wall_count() == 2 && (vertical || horizontal)
    }

    /// Directions whose connection satisfies `predicate`, in [`Direction::VARIANTS`] order.
    pub fn directions_where<'a>(&'a self, predicate: impl Fn(Connection) -> bool + 'a) -> impl Iterator<Item=Direction> + 'a {
        Direction::VARIANTS.iter()
            .copied()
            .filter(move |direction| predicate(self.connection(*direction)))
    }
}
