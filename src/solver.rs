//! Propagation followed by most-constrained-first route search.

use std::collections::BTreeSet;

use tracing::{debug, info, trace};

use crate::connection::commit_route;
use crate::error::{SolveError, WithContext};
use crate::formation::{is_bad_extension, is_bad_formation};
use crate::graph::Flow;
use crate::grid::Grid;
use crate::location::Location;
use crate::pipe::PipeId;
use crate::propagation::{passable_moves, propagate, Propagation};
use crate::route::{Route, RouteGenerator, RouteSink};

/// Tuning for a [`Solver`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SolverConfig {
    /// Reject routes which pass alongside their own destination without entering it.
    /// Prunes harder, but can miss solutions whose routes double back next to their endpoint.
    pub check_deviation: bool,
    /// Check formations on every partial route during enumeration, not only on complete routes.
    pub inline_pruning: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            check_deviation: false,
            inline_pruning: true,
        }
    }
}

/// Counters collected over a whole solve, all branches included.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SolveStats {
    /// Passes over the propagation rules.
    pub propagation_passes: usize,
    /// Pipes whose routes were enumerated.
    pub route_searches: usize,
    /// Complete routes checked for bad formations.
    pub candidates: usize,
    /// Routes committed and recursed into.
    pub branches: usize,
}

/// Where a [`Solver`] is in its work.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SolverState {
    /// Not started.
    Initial,
    /// Running the propagation rules.
    Propagation,
    /// Enumerating routes for this pipe.
    RouteSearch(PipeId),
    /// Found a solution, now held in the grid.
    Solved,
    /// No solution exists below this solver, or none the rules and pruning can find.
    Exhausted,
}

/// Solves a [`Grid`] by propagating to a fixed point, then choosing the most constrained pipe, committing its candidate routes one at a time
/// and recursing into a copy of the grid for the remaining pipes.
#[derive(Clone, Debug)]
pub struct Solver {
    grid: Grid,
    remaining: BTreeSet<PipeId>,
    config: SolverConfig,
    state: SolverState,
    depth: usize,
    stats: SolveStats,
}

impl Solver {
    /// A solver for every pipe of `grid`.
    pub fn new(grid: Grid, config: SolverConfig) -> Self {
        let remaining = grid.pipe_ids().collect();
        Self {
            grid,
            remaining,
            config,
            state: SolverState::Initial,
            depth: 0,
            stats: SolveStats::default(),
        }
    }

    /// Where the solver stopped, or is.
    pub fn state(&self) -> SolverState {
        self.state
    }

    /// Counters from the last call to [`solve`](Self::solve).
    pub fn stats(&self) -> SolveStats {
        self.stats
    }

    /// The grid, filled in if the solver has reached [`SolverState::Solved`].
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Take the grid, solved or not.
    pub fn into_grid(self) -> Grid {
        self.grid
    }

    /// Search for a solution, returning whether one was found.
    ///
    /// An error means the grid was corrupted along the way and the search was abandoned.
    pub fn solve(&mut self) -> Result<bool, SolveError> {
        let mut stats = SolveStats::default();
        let outcome = self.search(&mut stats);
        self.stats = stats;

        let solved = outcome?;
        info!(solved, ?stats, "solve finished");
        Ok(solved)
    }

    fn search(&mut self, stats: &mut SolveStats) -> Result<bool, SolveError> {
        let depth = self.depth;
        self.state = SolverState::Propagation;
        if propagate(&mut self.grid, stats)? == Propagation::Contradiction {
            self.state = SolverState::Exhausted;
            return Ok(false);
        }

        let mut incomplete = Vec::new();
        for pipe in &self.remaining {
            if !self.grid.is_complete(*pipe)? {
                incomplete.push(*pipe);
            }
        }

        if incomplete.is_empty() {
            let solved = match self.grid.routes()? {
                Some(routes) => self.grid.is_solution(&routes),
                None => false,
            };
            debug!(depth, solved, "every pipe is routed");
            self.state = if solved { SolverState::Solved } else { SolverState::Exhausted };
            return Ok(solved);
        }

        let Some(pipe) = self.most_constrained(&incomplete)? else {
            self.state = SolverState::Exhausted;
            return Ok(false);
        };
        self.state = SolverState::RouteSearch(pipe);
        stats.route_searches += 1;
        debug!(depth, pipe, remaining = incomplete.len(), "searching routes");

        let generator = RouteGenerator::new(&self.grid, pipe)?;
        let mut remaining = self.remaining.clone();
        remaining.remove(&pipe);

        let mut branch = Branch {
            grid: &mut self.grid,
            pipe,
            remaining,
            config: &self.config,
            depth,
            stats,
            solved: None,
            failure: None,
        };
        generator.generate(&mut branch)
            .with_context(|| format!("searching routes of pipe {pipe} at depth {depth}"))?;

        let Branch { solved, failure, .. } = branch;
        if let Some(error) = failure {
            return Err(error.context(format!("trying a route of pipe {pipe} at depth {depth}")));
        }

        match solved {
            Some(grid) => {
                self.grid = grid;
                self.state = SolverState::Solved;
                Ok(true)
            }
            None => {
                debug!(depth, pipe, "no route of this pipe leads to a solution");
                self.state = SolverState::Exhausted;
                Ok(false)
            }
        }
    }

    // fewest ways forward across both heads, ties going to the lowest ID
    fn most_constrained(&self, incomplete: &[PipeId]) -> Result<Option<PipeId>, SolveError> {
        let mut best: Option<(usize, PipeId)> = None;

        for &pipe in incomplete {
            let Some((near, far)) = self.grid.heads(pipe)? else {
                continue;
            };
            let moves = passable_moves(&self.grid, near, pipe, true)?.len()
                + passable_moves(&self.grid, far, pipe, true)?.len();

            match best {
                Some((fewest, _)) if fewest <= moves => {}
                _ => best = Some((moves, pipe)),
            }
        }

        Ok(best.map(|(_, pipe)| pipe))
    }
}

// tries each candidate route of one pipe in a child solver
struct Branch<'a> {
    grid: &'a mut Grid,
    pipe: PipeId,
    remaining: BTreeSet<PipeId>,
    config: &'a SolverConfig,
    depth: usize,
    stats: &'a mut SolveStats,
    solved: Option<Grid>,
    // the route graph swallows errors from completed paths, so keep them here instead
    failure: Option<SolveError>,
}

impl Branch<'_> {
    fn try_route(&mut self, route: Route) -> Result<Flow, SolveError> {
        self.stats.candidates += 1;
        trace!(pipe = self.pipe, %route, "candidate route");

        let bad = {
            let injected = self.grid.inject(self.pipe, &route)?;
            is_bad_formation(&injected, &route, self.pipe, self.config)?
        };
        if bad {
            return Ok(Flow::Continue);
        }

        let mut grid = self.grid.clone();
        commit_route(&mut grid, self.pipe, &route)?;
        self.stats.branches += 1;

        let mut child = Solver {
            grid,
            remaining: self.remaining.clone(),
            config: *self.config,
            state: SolverState::Initial,
            depth: self.depth + 1,
            stats: SolveStats::default(),
        };
        if child.search(self.stats)? {
            self.solved = Some(child.grid);
            return Ok(Flow::Stop);
        }

        Ok(Flow::Continue)
    }
}

impl RouteSink for Branch<'_> {
    fn validate(&mut self, partial: &[Location]) -> Result<bool, SolveError> {
        if !self.config.inline_pruning {
            return Ok(true);
        }

        let injected = self.grid.inject(self.pipe, partial)?;
        Ok(!is_bad_extension(&injected, partial, self.pipe, self.config)?)
    }

    fn receive(&mut self, route: Route) -> Result<Flow, SolveError> {
        match self.try_route(route) {
            Ok(flow) => Ok(flow),
            Err(error) => {
                self.failure = Some(error);
                Ok(Flow::Stop)
            }
        }
    }
}
