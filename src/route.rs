//! Candidate routes: generating them from a grid and trying them in place.

use std::collections::HashSet;
use std::fmt::{Display, Formatter};
use std::ops::Deref;

use itertools::Itertools;
use tracing::debug;

use crate::cell::{Cell, Connection};
use crate::connection::{connect, ConnectionKind};
use crate::direction::Direction;
use crate::error::{GraphError, SolveError, WithContext};
use crate::graph::{EdgeKind, Flow, PathGraph, PathVisitor};
use crate::grid::Grid;
use crate::location::Location;
use crate::pipe::PipeId;

/// An ordered sequence of locations from one endpoint of a pipe towards the other.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct Route(Vec<Location>);

impl Route {
    /// Wrap `locations` without checking them.
    pub fn new(locations: Vec<Location>) -> Self {
        Self(locations)
    }

    /// Unwrap into the underlying locations.
    pub fn into_inner(self) -> Vec<Location> {
        self.0
    }

    /// Whether consecutive locations are orthogonally adjacent and no location repeats.
    pub fn is_simple_path(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.0.len());
        self.0.windows(2).all(|step| step[0].is_adjacent(step[1]))
            && self.0.iter().all(|location| seen.insert(*location))
    }
}

impl Deref for Route {
    type Target = [Location];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Location>> for Route {
    fn from(value: Vec<Location>) -> Self {
        Self(value)
    }
}

impl FromIterator<Location> for Route {
    fn from_iter<T: IntoIterator<Item=Location>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for Route {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", describe(&self.0))
    }
}

pub(crate) fn describe(route: &[Location]) -> String {
    route.iter().join(" -> ")
}

/// A route laid into a [`Grid`] with temporary links. Dropping the guard restores every cell it touched.
///
/// Read the grid through [`Deref`] while the guard is alive.
#[derive(Debug)]
pub struct InjectedRoute<'g> {
    grid: &'g mut Grid,
    // cell states from before each link, restored newest first
    saved: Vec<Cell>,
}

impl<'g> InjectedRoute<'g> {
    pub(crate) fn new(grid: &'g mut Grid, pipe: PipeId, route: &[Location]) -> Result<Self, SolveError> {
        let mut injected = Self { grid, saved: Vec::with_capacity(route.len() * 2) };

        // an error drops `injected`, undoing the links made so far
        for step in route.windows(2) {
            let (from, to) = (step[0], step[1]);
            let direction = Direction::direction_to(from, to).ok_or(SolveError::NotAdjacent { from, to })?;
            let source = *injected.grid.cell(from)?;
            if source.connection(direction) == Connection::Fixed {
                continue;
            }

            injected.saved.push(source);
            injected.saved.push(*injected.grid.cell(to)?);
            connect(&mut *injected.grid, from, to, pipe, ConnectionKind::Temporary)
                .with_context(|| format!("injecting route of pipe {pipe} at {from}"))?;
        }

        Ok(injected)
    }
}

impl Deref for InjectedRoute<'_> {
    type Target = Grid;

    fn deref(&self) -> &Self::Target {
        self.grid
    }
}

impl Drop for InjectedRoute<'_> {
    fn drop(&mut self) {
        while let Some(cell) = self.saved.pop() {
            if let Some(slot) = self.grid.cells.get_mut(cell.location.as_index()) {
                *slot = cell;
            }
        }
    }
}

/// Receives the routes a [`RouteGenerator`] produces.
pub trait RouteSink {
    /// Decide whether a partial route, starting at the pipe's start, may be extended further.
    fn validate(&mut self, partial: &[Location]) -> Result<bool, SolveError>;

    /// Take a complete route from the pipe's start to its end.
    fn receive(&mut self, route: Route) -> Result<Flow, SolveError>;
}

/// Enumerates candidate routes for one pipe.
///
/// The search graph is built once, up front, from the grid as it stands; after that the generator no longer borrows the grid, so a [`RouteSink`] is free to inject routes into it while enumeration runs.
#[derive(Clone, Debug)]
pub struct RouteGenerator {
    pipe: PipeId,
    graph: PathGraph<Location>,
    // the pipe's start
    origin: Location,
    // the head reached from the pipe's end, where graph paths stop
    target: Location,
    // fixed cells between `target` and the pipe's end, in route order
    tail: Vec<Location>,
}

impl RouteGenerator {
    /// Build the search graph for `pipe` by a depth-first walk from its start.
    ///
    /// An edge leads into each neighbor which is not another pipe's and still admits this pipe.
    /// Saturated cells, including endpoints already holding their fixed link, only contribute their fixed edges,
    /// which makes committed fixtures forced continuations.
    pub fn new(grid: &Grid, pipe: PipeId) -> Result<Self, SolveError> {
        let (origin, end) = {
            let pipe = grid.pipe(pipe)?;
            (pipe.start, pipe.end)
        };

        let end_chain = grid.chain(end).with_context(|| format!("tracing pipe {pipe} from {end}"))?;
        let (&target, fixed) = end_chain.split_last().ok_or(SolveError::MissingCell(end))?;
        let tail = fixed.iter().rev().copied().collect_vec();

        let mut graph = PathGraph::new();
        graph.add_node(origin);
        let mut stack = vec![origin];
        let mut seen = HashSet::from([origin]);

        while let Some(location) = stack.pop() {
            let cell = grid.cell(location).with_context(|| format!("building route graph of pipe {pipe}"))?;
            for direction in Self::exits(cell) {
                let Some(neighbor) = grid.neighbor_cell(location, direction) else {
                    continue;
                };
                if !Self::admits(neighbor, pipe, direction, cell.connection(direction)) {
                    continue;
                }

                graph.add_edge(location, neighbor.location, EdgeKind::Directed);
                // paths end at the target, so nothing beyond it is needed
                if neighbor.location != target && seen.insert(neighbor.location) {
                    stack.push(neighbor.location);
                }
            }
        }

        debug!(pipe, nodes = graph.node_count(), edges = graph.edge_count(), "built route graph");
        Ok(Self { pipe, graph, origin, target, tail })
    }

    fn exits(cell: &Cell) -> Vec<Direction> {
        let fixed = |connection: Connection| connection == Connection::Fixed;
        if cell.is_saturated() {
            cell.directions_where(fixed).collect()
        } else {
            cell.directions_where(|connection| connection.is_open() || fixed(connection)).collect()
        }
    }

    fn admits(neighbor: &Cell, pipe: PipeId, direction: Direction, via: Connection) -> bool {
        let belongs = match neighbor.pipe {
            Some(other) => other == pipe,
            None => neighbor.possible.contains(pipe),
        };

        belongs
            && neighbor.reachable
            && neighbor.connection(direction.invert()) != Connection::Closed
            && (via == Connection::Fixed || !neighbor.is_saturated())
    }

    /// The pipe routes are generated for.
    pub fn pipe(&self) -> PipeId {
        self.pipe
    }

    /// Where every route starts.
    pub fn origin(&self) -> Location {
        self.origin
    }

    /// Where graph paths end before the fixed tail is appended.
    pub fn target(&self) -> Location {
        self.target
    }

    /// The search graph.
    pub fn graph(&self) -> &PathGraph<Location> {
        &self.graph
    }

    /// Enumerate routes into `sink` until it asks to stop or every route has been produced.
    pub fn generate<S: RouteSink>(&self, sink: &mut S) -> Result<Flow, SolveError> {
        match self.graph.bfs_find(|node| *node == self.target) {
            Ok(_) => {}
            Err(GraphError::NotFound) => {
                debug!(pipe = self.pipe, target = %self.target, "target unreachable, no routes");
                return Ok(Flow::Continue);
            }
            Err(error) => return Err(SolveError::from(error).context(format!("searching route graph of pipe {}", self.pipe))),
        }

        let mut emission = Emission { sink, tail: &self.tail };
        self.graph.enumerate_paths(self.origin, self.target, &mut emission)
            .with_context(|| format!("enumerating routes of pipe {} from {}", self.pipe, self.origin))
    }

    /// Every route, with no pruning beyond what the graph itself encodes.
    pub fn collect(&self) -> Result<Vec<Route>, SolveError> {
        let mut collector = Collector::default();
        self.generate(&mut collector)?;
        Ok(collector.0)
    }
}

struct Emission<'s, S> {
    sink: &'s mut S,
    tail: &'s [Location],
}

impl<S: RouteSink> PathVisitor<Location> for Emission<'_, S> {
    type Error = SolveError;

    fn accepts(&mut self, partial: &[Location]) -> Result<bool, SolveError> {
        self.sink.validate(partial)
    }

    fn complete(&mut self, path: &[Location]) -> Result<Flow, SolveError> {
        if path.is_empty() {
            return Ok(Flow::Continue);
        }

        let mut locations = Vec::with_capacity(path.len() + self.tail.len());
        locations.extend_from_slice(path);
        locations.extend_from_slice(self.tail);
        self.sink.receive(Route(locations))
    }
}

#[derive(Default)]
struct Collector(Vec<Route>);

impl RouteSink for Collector {
    fn validate(&mut self, _partial: &[Location]) -> Result<bool, SolveError> {
        Ok(true)
    }

    fn receive(&mut self, route: Route) -> Result<Flow, SolveError> {
        self.0.push(route);
        Ok(Flow::Continue)
    }
}
