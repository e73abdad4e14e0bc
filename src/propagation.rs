//! Deduction rules run to a fixed point before any route search.
//!
//! Every rule stops at its first change, and [`propagate`] then starts over from the first rule.

use std::collections::HashSet;

use strum::VariantArray;
use tracing::{debug, trace};

use crate::cell::Cell;
use crate::connection::{can_remove_connector, connect, remove_connector, ConnectionKind};
use crate::direction::{Direction, QUADRANTS};
use crate::error::{SolveError, WithContext};
use crate::formation::Quadrant;
use crate::grid::Grid;
use crate::location::Location;
use crate::pipe::PipeId;
use crate::solver::SolveStats;

/// The propagation rules, in the order they are tried.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, VariantArray)]
pub enum Rule {
    /// Retire connectors which can never be linked, then extend any head with exactly one way forward.
    OnlyOneWay,
    /// Fill an empty cell left with exactly two usable sides from a head on one of them.
    FillToObstruction,
    /// Rule out a pipe from a cell which would close a 2x2 block of it.
    CornerFormation,
    /// Narrow possible pipes to cells on some head-to-head path, then extend any head left with one way forward.
    OnlyOnePossibility,
}

/// The outcome of applying one [`Rule`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Deduction {
    /// The rule changed the grid.
    Changed,
    /// Nothing to do.
    Unchanged,
    /// The grid cannot be completed.
    Contradiction,
}

/// The outcome of [`propagate`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Propagation {
    /// No rule can make further progress.
    FixedPoint,
    /// Some rule found the grid cannot be completed.
    Contradiction,
}

/// Apply the rules until none makes progress or one finds a contradiction.
pub fn propagate(grid: &mut Grid, stats: &mut SolveStats) -> Result<Propagation, SolveError> {
    'pass: loop {
        stats.propagation_passes += 1;

        for rule in Rule::VARIANTS {
            match rule.apply(grid).with_context(|| format!("applying {rule:?}"))? {
                Deduction::Changed => {
                    trace!(?rule, "rule made progress");
                    continue 'pass;
                }
                Deduction::Unchanged => {}
                Deduction::Contradiction => {
                    debug!(?rule, passes = stats.propagation_passes, "propagation found a contradiction");
                    return Ok(Propagation::Contradiction);
                }
            }
        }

        debug!(passes = stats.propagation_passes, "propagation reached a fixed point");
        return Ok(Propagation::FixedPoint);
    }
}

impl Rule {
    /// Apply this rule once.
    pub fn apply(self, grid: &mut Grid) -> Result<Deduction, SolveError> {
        match self {
            Self::OnlyOneWay => only_one_way(grid),
            Self::FillToObstruction => fill_to_obstruction(grid),
            Self::CornerFormation => corner_formation(grid),
            Self::OnlyOnePossibility => only_one_possibility(grid),
        }
    }
}

/// Neighbors a head of `pipe` at `head` could extend into.
///
/// A neighbor qualifies through an open connector when it is not saturated and either carries `pipe` already,
/// or is empty and has some way onward other than straight back; a channel therefore only qualifies when its far side is usable.
/// With `respect_possibilities`, empty cells must also still admit `pipe`.
pub fn passable_moves(grid: &Grid, head: Location, pipe: PipeId, respect_possibilities: bool) -> Result<Vec<(Direction, Location)>, SolveError> {
    let cell = grid.cell(head)?;
    let admits = |cell: &Cell| !respect_possibilities || cell.possible.contains(pipe);
    let mut moves = Vec::with_capacity(4);

    for direction in cell.directions_where(|connection| connection.is_open()) {
        let Some(next) = grid.neighbor_cell(head, direction) else {
            continue;
        };
        if !next.connection(direction.invert()).is_open() || next.is_saturated() {
            continue;
        }

        match next.pipe {
            Some(other) if other != pipe => {}
            Some(_) => moves.push((direction, next.location)),
            None if !admits(next) => {}
            None => {
                // a channel is only left straight ahead
                let channel = next.is_channel();
                let onward = next.directions_where(|connection| connection.is_open())
                    .filter(|onward| *onward != direction.invert())
                    .filter(|onward| !channel || *onward == direction)
                    .filter_map(|onward| grid.neighbor_cell(next.location, onward))
                    .any(|beyond| {
                        !beyond.is_saturated() && match beyond.pipe {
                            Some(other) => other == pipe,
                            None => admits(beyond),
                        }
                    });
                if onward {
                    moves.push((direction, next.location));
                }
            }
        }
    }

    Ok(moves)
}

// commit the move of a head with exactly one, or report a head with none
fn force_heads(grid: &mut Grid, respect_possibilities: bool) -> Result<Deduction, SolveError> {
    for pipe in grid.pipe_ids().collect::<Vec<_>>() {
        let Some((near, far)) = grid.heads(pipe)? else {
            continue;
        };

        for head in [near, far] {
            match passable_moves(grid, head, pipe, respect_possibilities)?[..] {
                [] => return Ok(Deduction::Contradiction),
                [(_, next)] => {
                    connect(grid, head, next, pipe, ConnectionKind::Fixed)?;
                    return Ok(Deduction::Changed);
                }
                _ => {}
            }
        }
    }

    Ok(Deduction::Unchanged)
}

fn only_one_way(grid: &mut Grid) -> Result<Deduction, SolveError> {
    for location in grid.reachable_locations() {
        let cell = *grid.cell(location)?;
        for direction in cell.directions_where(|connection| connection.is_open()) {
            let Some(neighbor) = grid.neighbor_cell(location, direction) else {
                continue;
            };
            let conflicting = matches!((cell.pipe, neighbor.pipe), (Some(a), Some(b)) if a != b);
            if !cell.is_saturated() && !neighbor.is_saturated() && !conflicting {
                continue;
            }

            if !can_remove_connector(grid, location, direction)? {
                return Ok(Deduction::Contradiction);
            }
            remove_connector(grid, location, direction)?;
            return Ok(Deduction::Changed);
        }
    }

    force_heads(grid, false)
}

fn fill_to_obstruction(grid: &mut Grid) -> Result<Deduction, SolveError> {
    for location in grid.reachable_locations() {
        let cell = *grid.cell(location)?;
        if cell.pipe.is_some() {
            continue;
        }

        let options: Vec<Cell> = cell.directions_where(|connection| connection.is_open())
            .filter_map(|direction| grid.neighbor_cell(location, direction))
            .filter(|neighbor| !neighbor.is_saturated())
            .copied()
            .collect();

        match options[..] {
            [] | [_] => return Ok(Deduction::Contradiction),
            [a, b] => {
                if let (Some(first), Some(second)) = (a.pipe, b.pipe) {
                    if first != second {
                        return Ok(Deduction::Contradiction);
                    }
                }

                let head = [a, b].into_iter().find_map(|neighbor| neighbor.pipe.map(|pipe| (neighbor.location, pipe)));
                if let Some((head, pipe)) = head {
                    if !cell.possible.contains(pipe) {
                        return Ok(Deduction::Contradiction);
                    }
                    connect(grid, head, location, pipe, ConnectionKind::Fixed)?;
                    return Ok(Deduction::Changed);
                }
            }
            _ => {}
        }
    }

    Ok(Deduction::Unchanged)
}

fn corner_formation(grid: &mut Grid) -> Result<Deduction, SolveError> {
    for location in grid.reachable_locations() {
        let Some(pipe) = grid.cell(location)?.pipe else {
            continue;
        };

        for quadrant in QUADRANTS {
            let Some(quadrant) = Quadrant::around(grid, location, quadrant) else {
                continue;
            };
            let closes_block = quadrant.vertical.reachable
                && quadrant.horizontal.reachable
                && quadrant.diagonal.reachable
                && quadrant.vertical.pipe == Some(pipe)
                && quadrant.horizontal.pipe == Some(pipe)
                && quadrant.diagonal.pipe.is_none()
                && quadrant.diagonal.possible.contains(pipe)
                && !quadrant.walled;
            if !closes_block {
                continue;
            }

            let diagonal = grid.cell_mut(quadrant.diagonal.location)?;
            diagonal.possible.remove(pipe);
            return Ok(if diagonal.possible.is_empty() {
                Deduction::Contradiction
            } else {
                Deduction::Changed
            });
        }
    }

    Ok(Deduction::Unchanged)
}

// empty cells admitting `pipe` reachable from `from` through open connectors, and whether `other` borders them
fn flood_possibilities(grid: &Grid, from: Location, other: Location, pipe: PipeId) -> Result<(HashSet<Location>, bool), SolveError> {
    let mut seen = HashSet::new();
    let mut stack = vec![from];
    let mut reached = false;

    while let Some(location) = stack.pop() {
        let cell = grid.cell(location)?;
        for direction in cell.directions_where(|connection| connection.is_open()) {
            let Some(neighbor) = grid.neighbor_cell(location, direction) else {
                continue;
            };
            if neighbor.location == other {
                reached = true;
            } else if neighbor.pipe.is_none() && neighbor.possible.contains(pipe) && seen.insert(neighbor.location) {
                stack.push(neighbor.location);
            }
        }
    }

    Ok((seen, reached))
}

fn only_one_possibility(grid: &mut Grid) -> Result<Deduction, SolveError> {
    let mut narrowed = false;

    for pipe in grid.pipe_ids().collect::<Vec<_>>() {
        // cells on some path between the two heads; a complete pipe needs no more cells
        let keep = match grid.heads(pipe)? {
            None => HashSet::new(),
            Some((near, far)) => {
                let (from_near, reached) = flood_possibilities(grid, near, far, pipe)?;
                if !reached {
                    return Ok(Deduction::Contradiction);
                }
                let (from_far, _) = flood_possibilities(grid, far, near, pipe)?;
                from_near.intersection(&from_far).copied().collect()
            }
        };

        for location in grid.reachable_locations() {
            let cell = grid.cell_mut(location)?;
            if cell.pipe.is_some() || keep.contains(&location) || !cell.possible.remove(pipe) {
                continue;
            }

            narrowed = true;
            if cell.possible.is_empty() {
                return Ok(Deduction::Contradiction);
            }
        }
    }

    if narrowed {
        return Ok(Deduction::Changed);
    }

    force_heads(grid, true)
}
