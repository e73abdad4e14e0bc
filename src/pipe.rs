use std::fmt::{Debug, Formatter};

use crate::location::Location;

/// Identifies a pipe. Non-null pipe IDs start at 1, in the order pipes were added to a grid.
pub type PipeId = usize;

/// A labelled pair of endpoints which must be joined by a single route.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Pipe {
    pub(crate) id: PipeId,
    pub(crate) display: char,
    pub(crate) start: Location,
    pub(crate) end: Location,
}

impl Pipe {
    /// This pipe's ID.
    pub fn id(&self) -> PipeId {
        self.id
    }

    /// The character this pipe is labelled with.
    pub fn display(&self) -> char {
        self.display
    }

    /// The first endpoint given for this pipe. Routes are generated from here.
    pub fn start(&self) -> Location {
        self.start
    }

    /// The second endpoint given for this pipe.
    pub fn end(&self) -> Location {
        self.end
    }

    /// The endpoint opposite `location`, if `location` is one of this pipe's endpoints.
    pub fn partner_of(&self, location: Location) -> Option<Location> {
        if location == self.start {
            Some(self.end)
        } else if location == self.end {
            Some(self.start)
        } else {
            None
        }
    }
}

/// A set of [`PipeId`]s, stored as a bitset so cells stay [`Copy`].
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct PipeSet(u128);

impl PipeSet {
    /// The largest number of pipes a grid may hold.
    pub const CAPACITY: usize = 127;

    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Every ID from 1 to `count` inclusive.
    pub fn all(count: usize) -> Self {
        (1..=count.min(Self::CAPACITY)).collect()
    }

    /// A set containing only `id`.
    pub fn only(id: PipeId) -> Self {
        let mut set = Self::empty();
        set.insert(id);
        set
    }

    /// Whether `id` is in the set.
    pub fn contains(&self, id: PipeId) -> bool {
        Self::bit(id).is_some_and(|bit| self.0 & bit != 0)
    }

    /// Returns whether `id` was newly inserted.
    pub fn insert(&mut self, id: PipeId) -> bool {
        match Self::bit(id) {
            Some(bit) if self.0 & bit == 0 => {
                self.0 |= bit;
                true
            }
            _ => false,
        }
    }

    /// Returns whether `id` was present.
    pub fn remove(&mut self, id: PipeId) -> bool {
        match Self::bit(id) {
            Some(bit) if self.0 & bit != 0 => {
                self.0 &= !bit;
                true
            }
            _ => false,
        }
    }

    /// Number of IDs in the set.
    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Whether the set has no IDs.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// IDs in ascending order.
    pub fn iter(&self) -> impl Iterator<Item=PipeId> + '_ {
        (1..=Self::CAPACITY).filter(|id| self.contains(*id))
    }

    fn bit(id: PipeId) -> Option<u128> {
        (1..=Self::CAPACITY).contains(&id).then(|| 1u128 << id)
    }
}

impl FromIterator<PipeId> for PipeSet {
    fn from_iter<T: IntoIterator<Item=PipeId>>(iter: T) -> Self {
        let mut set = Self::empty();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl Debug for PipeSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
