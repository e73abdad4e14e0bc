//! Assembling and validating a [`Grid`](crate::Grid) from dimensions, termini, holes and walls.

use std::collections::HashSet;
use std::num::NonZero;

use ndarray::Array2;
use strum::VariantArray;
use unordered_pair::UnorderedPair;

use crate::cell::{Border, Cell, Connection, Terminus};
use crate::direction::Direction;
use crate::grid::Grid;
use crate::location::{Dimension, Location};
use crate::pipe::{Pipe, PipeSet};

/// Reasons a builder may become invalid while building.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BuilderInvalidReason {
    /// A feature like a terminus or wall was placed outside the bounds specified by `dims` on a builder.
    FeatureOutOfBounds,
    /// A terminus was placed on a location already holding a terminus, or on a hole.
    LocationOccupied,
    /// More than [`PipeSet::CAPACITY`] pipes were added.
    TooManyPipes,
}

/// A builder for rectangular [`Grid`]s.
///
/// Builders mutate themselves while building but can be [`Clone`]d to save their state at some point.
/// Once a builder is invalid every further call does nothing, and [`build`](Self::build) reports why.
#[derive(Clone, Debug)]
pub struct GridBuilder {
    // width, height
    dims: (Dimension, Dimension),
    // display and (start, end) per pipe, pipe IDs being index + 1
    termini: Vec<(char, (Location, Location))>,
    invalid_reasons: Vec<BuilderInvalidReason>,
    // walls
    edge_blacklist: HashSet<UnorderedPair<Location>>,
    // holes
    location_blacklist: HashSet<Location>,
}

impl Default for GridBuilder {
    fn default() -> Self {
        Self::with_dims((NonZero::<usize>::MIN.saturating_add(4), NonZero::<usize>::MIN.saturating_add(4)))
    }
}

impl GridBuilder {
    /// Construct a new builder with the specified dimensions, specified in `(x, y)` order.
    pub fn with_dims(dims: (Dimension, Dimension)) -> Self {
        Self {
            dims,
            termini: Default::default(),
            invalid_reasons: Default::default(),
            edge_blacklist: Default::default(),
            location_blacklist: Default::default(),
        }
    }

    fn in_bounds(&self, location: Location) -> bool {
        location.0 < self.dims.0.get() && location.1 < self.dims.1.get()
    }

    fn occupied(&self, location: Location) -> bool {
        self.location_blacklist.contains(&location)
            || self.termini.iter().any(|(_, (a, b))| *a == location || *b == location)
    }

    /// Add a pipe's two termini. The first location is the pipe's start, the second its end.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if either location is out of bounds,
    /// a [`LocationOccupied`](BuilderInvalidReason::LocationOccupied) state if either location is a hole or already a terminus (or both locations are equal),
    /// or a [`TooManyPipes`](BuilderInvalidReason::TooManyPipes) state.
    pub fn add_termini(&mut self, display: char, locations: (Location, Location)) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        for location in [locations.0, locations.1] {
            if !self.in_bounds(location) {
                self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
                return self;
            }
        }

        if locations.0 == locations.1 || self.occupied(locations.0) || self.occupied(locations.1) {
            self.invalid_reasons.push(BuilderInvalidReason::LocationOccupied);
            return self;
        }

        if self.termini.len() >= PipeSet::CAPACITY {
            self.invalid_reasons.push(BuilderInvalidReason::TooManyPipes);
            return self;
        }

        self.termini.push((display, locations));
        self
    }

    /// Remove the most recently added pair of termini.
    ///
    /// If the builder is in an invalid state or no termini are present, this function does nothing.
    pub fn pop_termini(&mut self) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        self.termini.pop();
        self
    }

    /// Drop a location from the grid, making it unreachable.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if `location` is out of bounds,
    /// or a [`LocationOccupied`](BuilderInvalidReason::LocationOccupied) state if a terminus is there.
    pub fn drop_location(&mut self, location: Location) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        if !self.in_bounds(location) {
            self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
            return self;
        }

        if self.termini.iter().any(|(_, (a, b))| *a == location || *b == location) {
            self.invalid_reasons.push(BuilderInvalidReason::LocationOccupied);
            return self;
        }

        self.location_blacklist.insert(location);
        self
    }

    /// Disconnect the two `locations`, i.e. place a wall between them.
    ///
    /// A wall prevents routes from crossing it.
    /// If the two locations are not adjacent, this function does nothing and does not invalidate the builder.
    ///
    /// May cause the builder to enter a [`FeatureOutOfBounds`](BuilderInvalidReason::FeatureOutOfBounds) invalid state if either location is out of bounds.
    pub fn disconnect(&mut self, locations: UnorderedPair<Location>) -> &mut Self {
        if !self.invalid_reasons.is_empty() {
            return self;
        }

        for location in [locations.0, locations.1] {
            if !self.in_bounds(location) {
                self.invalid_reasons.push(BuilderInvalidReason::FeatureOutOfBounds);
                return self;
            }
        }

        if Direction::direction_to(locations.0, locations.1).is_none() {
            return self;
        }

        self.edge_blacklist.insert(locations);
        self
    }

    /// Shorthand for multiple calls to [`Self::disconnect`], with the same conditions.
    ///
    /// Places walls on the given sides of `location`.
    pub fn disconnect_around(&mut self, location: Location, directions: Vec<Direction>) -> &mut Self {
        for direction in directions {
            self.disconnect(UnorderedPair::from((location, direction.attempt_from(location))));
        }

        self
    }

    /// Check the validity of this builder, ensuring no [`BuilderInvalidReason`] condition has arisen.
    ///
    /// Returns `None` if the builder is valid, `Some(&Vec<BuilderInvalidReason>)` otherwise.
    pub fn is_valid(&self) -> Option<&Vec<BuilderInvalidReason>> {
        if self.invalid_reasons.is_empty() {
            None
        } else {
            Some(&self.invalid_reasons)
        }
    }

    /// Convert the state of this builder into a [`Grid`].
    /// If the builder is invalid for any reason, a reference to a [`Vec`] of [`BuilderInvalidReason`] will indicate why.
    pub fn build(&self) -> Result<Grid, &Vec<BuilderInvalidReason>> {
        if !self.invalid_reasons.is_empty() {
            return Err(&self.invalid_reasons);
        }

        let (width, height) = (self.dims.0.get(), self.dims.1.get());
        let mut cells = Array2::from_shape_fn((height, width), |ind| Cell::new(Location::from(ind)));
        for location in &self.location_blacklist {
            if let Some(cell) = cells.get_mut(location.as_index()) {
                cell.reachable = false;
            }
        }

        let reachable = |location: Location| cells.get(location.as_index()).is_some_and(|cell| cell.reachable);
        let mut borders = Array2::from_elem((height, width), [Border::Open; 4]);
        for (ind, sides) in borders.indexed_iter_mut() {
            let location = Location::from(ind);
            for direction in Direction::VARIANTS {
                let neighbor = direction.attempt_from(location);
                let walled = !reachable(location)
                    || !reachable(neighbor)
                    || self.edge_blacklist.contains(&UnorderedPair::from((location, neighbor)));
                if walled {
                    sides[direction.index()] = Border::Wall;
                }
            }
        }

        let all_pipes = PipeSet::all(self.termini.len());
        for (cell, sides) in cells.iter_mut().zip(borders.iter()) {
            cell.borders = *sides;
            for direction in Direction::VARIANTS {
                cell.connections[direction.index()] = match sides[direction.index()] {
                    Border::Open => Connection::Open,
                    Border::Wall => Connection::Closed,
                };
            }
            if cell.reachable {
                cell.possible = all_pipes;
            }
        }

        let mut pipes = Vec::with_capacity(self.termini.len());
        for (index, (display, (start, end))) in self.termini.iter().enumerate() {
            // non-null pipe IDs start at 1
            let id = index + 1;
            for (location, terminus) in [(*start, Terminus::Start), (*end, Terminus::End)] {
                if let Some(cell) = cells.get_mut(location.as_index()) {
                    cell.pipe = Some(id);
                    cell.terminus = Some(terminus);
                    cell.possible = PipeSet::only(id);
                }
            }
            pipes.push(Pipe { id, display: *display, start: *start, end: *end });
        }

        Ok(Grid {
            cells,
            dims: self.dims,
            pipes,
        })
    }
}
