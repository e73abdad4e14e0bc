#![warn(missing_docs)]

//! # `pipelink`
//!
//! A solver for [Numberlink](https://en.wikipedia.org/wiki/Numberlink) and the pipe puzzles of the mobile game Flow Free.
//! A puzzle is a rectangular grid, possibly with holes and walls, holding pairs of labelled termini.
//! Solving it means joining every pair with a route such that routes never cross and every reachable cell belongs to exactly one route.
//!
//! Begin by building a [`Grid`] with a [`GridBuilder`](builder::GridBuilder), or parse one from text (see [`definition`]).
//! Then call [`Grid::solve`], or drive a [`Solver`] directly to choose a [`SolverConfig`] and inspect [`SolveStats`] afterwards.
//!
//! ```
//! use pipelink::Grid;
//!
//! let mut grid: Grid = "RG...GR\n.......\n".parse().unwrap();
//! assert!(grid.solve().unwrap());
//! assert_eq!(grid.to_string(), "RGgggGR\nrrrrrrr\n");
//! ```
//!
//! # Internals
//! Solving alternates two phases.
//!
//! Propagation applies a fixed list of deduction [rules](propagation::Rule) until none makes progress:
//! connectors which can never be used are retired, forced moves of route heads are committed, and each empty cell's set of possible pipes is narrowed.
//! Many puzzles are solved by propagation alone.
//!
//! Otherwise the most constrained unfinished pipe is picked and its candidate routes are enumerated as simple paths over a [`PathGraph`](graph::PathGraph) built from the grid.
//! Partial routes are pruned as they grow by the checks in [`formation`], which recognise shapes no solution can contain:
//! dead-end cells, unwalled 2x2 blocks of a single pipe, and pipes cut off from their partner.
//! Each surviving route is committed into a copy of the grid and solving recurses on the remaining pipes, backtracking to the next route on failure.

pub use builder::{BuilderInvalidReason, GridBuilder};
pub use cell::{Border, Cell, Connection, Terminus};
pub use direction::Direction;
pub use error::{DefinitionError, Error, GraphError, SolveError};
pub use graph::{EdgeKind, Flow, PathGraph, PathVisitor};
pub use grid::Grid;
pub use location::{Dimension, Location};
pub use pipe::{Pipe, PipeId, PipeSet};
pub use route::{InjectedRoute, Route, RouteGenerator, RouteSink};
pub use solver::{SolveStats, Solver, SolverConfig, SolverState};

pub mod builder;
pub(crate) mod cell;
pub mod connection;
pub mod definition;
pub(crate) mod direction;
pub(crate) mod error;
pub mod formation;
pub mod graph;
pub(crate) mod grid;
pub(crate) mod location;
pub(crate) mod pipe;
pub mod propagation;
pub mod route;
pub(crate) mod solver;
mod tests;
#[cfg(feature = "wasm")]
mod wasm;
