//! The puzzle grid and the queries every other module builds on.

use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

use ndarray::Array2;

use crate::cell::{Border, Cell};
use crate::direction::Direction;
use crate::error::SolveError;
use crate::location::{Dimension, Location};
use crate::pipe::{Pipe, PipeId};
use crate::route::{InjectedRoute, Route};
use crate::solver::{Solver, SolverConfig};

/// A rectangular puzzle grid: the cells, their connections and the pipes that must be routed through them.
///
/// [`Grid`]s are made with a [`GridBuilder`](crate::builder::GridBuilder) or parsed from a textual definition (see [`definition`](crate::definition)).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grid {
    pub(crate) cells: Array2<Cell>,
    pub(crate) dims: (Dimension, Dimension),
    pub(crate) pipes: Vec<Pipe>,
}

impl Grid {
    /// `(width, height)`.
    pub fn dims(&self) -> (Dimension, Dimension) {
        self.dims
    }

    /// Every pipe, in ID order.
    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    /// The pipe with ID `id`.
    pub fn pipe(&self, id: PipeId) -> Result<&Pipe, SolveError> {
        id.checked_sub(1)
            .and_then(|index| self.pipes.get(index))
            .ok_or(SolveError::UnknownPipe(id))
    }

    /// All pipe IDs in ascending order.
    pub fn pipe_ids(&self) -> impl Iterator<Item=PipeId> + '_ {
        self.pipes.iter().map(|pipe| pipe.id)
    }

    /// The cell at `location`, or [`None`] if it lies outside the grid.
    pub fn get(&self, location: Location) -> Option<&Cell> {
        self.cells.get(location.as_index())
    }

    /// Like [`get`](Self::get), treating a missing cell as an integrity error.
    pub fn cell(&self, location: Location) -> Result<&Cell, SolveError> {
        self.get(location).ok_or(SolveError::MissingCell(location))
    }

    pub(crate) fn cell_mut(&mut self, location: Location) -> Result<&mut Cell, SolveError> {
        self.cells.get_mut(location.as_index()).ok_or(SolveError::MissingCell(location))
    }

    /// Every cell in row-major order, unreachable ones included.
    pub fn cells(&self) -> impl Iterator<Item=&Cell> {
        self.cells.iter()
    }

    /// Locations of reachable cells in row-major order.
    pub fn reachable_locations(&self) -> Vec<Location> {
        self.cells().filter(|cell| cell.reachable).map(|cell| cell.location).collect()
    }

    /// The in-bounds neighbor of `location` in `direction`, ignoring walls.
    pub fn neighbor(&self, location: Location, direction: Direction) -> Option<Location> {
        let neighbor = direction.attempt_from(location);
        self.get(neighbor).map(|_| neighbor)
    }

    /// Like [`neighbor`](Self::neighbor), returning the cell.
    pub fn neighbor_cell(&self, location: Location, direction: Direction) -> Option<&Cell> {
        self.get(direction.attempt_from(location))
    }

    /// Whether `a` and `b` are adjacent with no wall between them.
    pub fn is_passage(&self, a: Location, b: Location) -> bool {
        match (Direction::direction_to(a, b), self.get(a)) {
            (Some(direction), Some(cell)) => cell.border(direction) == Border::Open,
            _ => false,
        }
    }

    /// Follow linked connections from `from` until they run out, returning every location visited in order, `from` included.
    pub fn chain(&self, from: Location) -> Result<Vec<Location>, SolveError> {
        let mut chain = vec![from];
        let mut previous = None;
        let mut current = from;

        loop {
            let cell = self.cell(current)?;
            let next = cell.directions_where(|connection| connection.is_linked())
                .filter_map(|direction| self.neighbor(current, direction))
                .find(|next| Some(*next) != previous && !chain.contains(next));

            match next {
                Some(next) => {
                    chain.push(next);
                    previous = Some(current);
                    current = next;
                }
                None => return Ok(chain),
            }
        }
    }

    /// The two heads of `pipe`, reached by following linked connections from its start and its end respectively.
    /// Returns [`None`] if the start already chains through to the end.
    pub fn heads(&self, pipe: PipeId) -> Result<Option<(Location, Location)>, SolveError> {
        let pipe = self.pipe(pipe)?;
        let from_start = self.chain(pipe.start)?;
        let near = *from_start.last().unwrap_or(&pipe.start);
        if near == pipe.end {
            return Ok(None);
        }

        let from_end = self.chain(pipe.end)?;
        Ok(Some((near, *from_end.last().unwrap_or(&pipe.end))))
    }

    /// Whether linked connections already join `pipe`'s start to its end.
    pub fn is_complete(&self, pipe: PipeId) -> Result<bool, SolveError> {
        Ok(self.heads(pipe)?.is_none())
    }

    /// The complete route of `pipe` from its start to its end, if it has one.
    pub fn trace(&self, pipe: PipeId) -> Result<Option<Route>, SolveError> {
        let end = self.pipe(pipe)?.end;
        let chain = self.chain(self.pipe(pipe)?.start)?;
        Ok((chain.last() == Some(&end)).then(|| Route::from(chain)))
    }

    /// The route of every pipe, if all of them are complete.
    pub fn routes(&self) -> Result<Option<BTreeMap<PipeId, Route>>, SolveError> {
        let mut routes = BTreeMap::new();
        for pipe in self.pipe_ids() {
            match self.trace(pipe)? {
                Some(route) => routes.insert(pipe, route),
                None => return Ok(None),
            };
        }

        Ok(Some(routes))
    }

    /// Check a candidate solution: one route per pipe joining its endpoints through unwalled steps,
    /// no location shared between routes, and every reachable cell covered.
    pub fn is_solution(&self, routes: &BTreeMap<PipeId, Route>) -> bool {
        if routes.len() != self.pipes.len() {
            return false;
        }

        let mut covered = HashSet::new();
        for pipe in &self.pipes {
            let Some(route) = routes.get(&pipe.id) else {
                return false;
            };
            let (Some(first), Some(last)) = (route.first(), route.last()) else {
                return false;
            };

            let joins_endpoints = (*first == pipe.start && *last == pipe.end)
                || (*first == pipe.end && *last == pipe.start);
            let steps_open = route.windows(2).all(|step| self.is_passage(step[0], step[1]));
            if !joins_endpoints || !steps_open {
                return false;
            }

            for location in route.iter() {
                if !self.get(*location).is_some_and(|cell| cell.reachable) || !covered.insert(*location) {
                    return false;
                }
            }
        }

        covered.len() == self.cells().filter(|cell| cell.reachable).count()
    }

    /// Temporarily lay `route` into the grid for `pipe`, linking consecutive steps that are not already fixed.
    ///
    /// Every touched cell is restored when the returned guard is dropped.
    pub fn inject(&mut self, pipe: PipeId, route: &[Location]) -> Result<InjectedRoute<'_>, SolveError> {
        InjectedRoute::new(self, pipe, route)
    }

    /// Solve this grid with the default [`SolverConfig`], filling it in place on success.
    ///
    /// Returns `Ok(false)` if no solution was found, leaving the grid untouched.
    pub fn solve(&mut self) -> Result<bool, SolveError> {
        self.solve_with(SolverConfig::default())
    }

    /// Like [`solve`](Self::solve), with an explicit configuration.
    pub fn solve_with(&mut self, config: SolverConfig) -> Result<bool, SolveError> {
        let mut solver = Solver::new(self.clone(), config);
        let solved = solver.solve()?;
        if solved {
            *self = solver.into_grid();
        }

        Ok(solved)
    }
}

impl Display for Grid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut out = String::with_capacity(self.cells.nrows() * (self.cells.ncols() + 1));

        for row in self.cells.rows() {
            for cell in row {
                let display = cell.pipe
                    .and_then(|id| self.pipe(id).ok())
                    .map(|pipe| pipe.display);
                out.push(match (cell.reachable, display) {
                    (false, _) => '#',
                    (true, None) => '.',
                    (true, Some(display)) if cell.is_endpoint() => display.to_ascii_uppercase(),
                    (true, Some(display)) => display.to_ascii_lowercase(),
                });
            }
            out.push('\n');
        }

        write!(f, "{}", out)
    }
}
