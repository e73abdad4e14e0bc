//! Predicates which recognise cell arrangements no solution can contain.
//!
//! Each check reads a grid which already carries the candidate route, normally through an [`InjectedRoute`](crate::route::InjectedRoute).
//! A query failing means the grid is corrupt, so failures are logged and passed up rather than read as a verdict.

use std::collections::HashSet;

use strum::VariantArray;
use tracing::error;

use crate::cell::{Border, Cell};
use crate::direction::{Direction, QUADRANTS};
use crate::error::SolveError;
use crate::grid::Grid;
use crate::location::Location;
use crate::pipe::PipeId;
use crate::route::describe;
use crate::solver::SolverConfig;

/// The four cells of a 2x2 block, seen from one corner.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Quadrant {
    pub(crate) corner: Cell,
    // across from `corner` vertically and horizontally
    pub(crate) vertical: Cell,
    pub(crate) horizontal: Cell,
    pub(crate) diagonal: Cell,
    /// Whether a wall runs between any two of the cells.
    pub(crate) walled: bool,
}

impl Quadrant {
    pub(crate) fn around(grid: &Grid, location: Location, (vertical, horizontal): (Direction, Direction)) -> Option<Self> {
        let corner = *grid.get(location)?;
        let across_vertical = *grid.neighbor_cell(location, vertical)?;
        let across_horizontal = *grid.neighbor_cell(location, horizontal)?;
        let diagonal = *grid.neighbor_cell(across_vertical.location, horizontal)?;

        let walled = corner.border(vertical) == Border::Wall
            || corner.border(horizontal) == Border::Wall
            || across_vertical.border(horizontal) == Border::Wall
            || across_horizontal.border(vertical) == Border::Wall;

        Some(Self {
            corner,
            vertical: across_vertical,
            horizontal: across_horizontal,
            diagonal,
            walled,
        })
    }

    fn cells(&self) -> [Cell; 4] {
        [self.corner, self.vertical, self.horizontal, self.diagonal]
    }
}

fn logged<T>(result: Result<T, SolveError>, check: &'static str, route: &[Location], pipe: PipeId) -> Result<T, SolveError> {
    result.map_err(|source| {
        error!(check, pipe, route = %describe(route), error = %source, "formation query failed");
        source.context(format!("{check} check for pipe {pipe}"))
    })
}

/// Whether the cell at `location` can no longer take part in any solution.
///
/// An empty cell is a dead end with fewer than two usable neighbors, or with exactly two which are heads of different pipes.
/// An occupied cell is a dead end when fewer neighbors could continue its pipe than it still needs links.
/// A non-endpoint cell with three or more walls is always one.
pub fn is_dead_end(grid: &Grid, location: Location) -> Result<bool, SolveError> {
    let cell = grid.cell(location)?;
    if !cell.reachable {
        return Ok(false);
    }
    if cell.wall_count() > 2 && !cell.is_endpoint() {
        return Ok(true);
    }

    let Some(pipe) = cell.pipe else {
        let mut options = Vec::with_capacity(4);
        for direction in cell.directions_where(|connection| connection.is_open()) {
            let Some(neighbor) = grid.neighbor_cell(location, direction) else {
                continue;
            };
            if !neighbor.is_saturated() && neighbor.connection(direction.invert()).is_open() {
                options.push(neighbor.pipe);
            }
        }

        return Ok(match options[..] {
            [] | [_] => true,
            [Some(a), Some(b)] => a != b,
            _ => false,
        });
    };

    if cell.is_saturated() {
        return Ok(false);
    }

    let needed = cell.capacity() - cell.linked_count();
    let mut continuations = 0;
    for direction in cell.directions_where(|connection| connection.is_open()) {
        let Some(neighbor) = grid.neighbor_cell(location, direction) else {
            continue;
        };
        let compatible = match neighbor.pipe {
            Some(other) => other == pipe,
            None => neighbor.possible.contains(pipe),
        };
        if compatible && !neighbor.is_saturated() {
            continuations += 1;
        }
    }

    Ok(continuations < needed)
}

/// Whether any cell bordering one of `around`, outside `route` and not behind a wall, is a dead end.
pub fn has_dead_end(grid: &Grid, route: &[Location], around: &[Location]) -> Result<bool, SolveError> {
    let on_route: HashSet<Location> = route.iter().copied().collect();

    for &location in around {
        let cell = grid.cell(location)?;
        for direction in Direction::VARIANTS {
            if cell.border(*direction) == Border::Wall {
                continue;
            }
            let Some(neighbor) = grid.neighbor(location, *direction) else {
                continue;
            };
            if !on_route.contains(&neighbor) && is_dead_end(grid, neighbor)? {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

/// Whether some cell of `cells` sits in an unwalled 2x2 block of a single pipe.
pub fn breaks_adjacency_law(grid: &Grid, cells: &[Location]) -> Result<bool, SolveError> {
    for &location in cells {
        let Some(pipe) = grid.cell(location)?.pipe else {
            continue;
        };

        for quadrant in QUADRANTS {
            let Some(quadrant) = Quadrant::around(grid, location, quadrant) else {
                continue;
            };
            if !quadrant.walled && quadrant.cells().iter().all(|cell| cell.pipe == Some(pipe)) {
                return Ok(true);
            }
        }
    }

    Ok(false)
}

// flood through open connectors and empty cells from `from`, stopping once `to` borders the flood
fn flood_reaches(grid: &Grid, from: Location, to: Location) -> Result<bool, SolveError> {
    let mut seen = HashSet::from([from]);
    let mut stack = vec![from];

    while let Some(location) = stack.pop() {
        let cell = grid.cell(location)?;
        for direction in cell.directions_where(|connection| connection.is_open()) {
            let Some(neighbor) = grid.neighbor_cell(location, direction) else {
                continue;
            };
            if neighbor.location == to {
                return Ok(true);
            }
            if neighbor.pipe.is_none() && seen.insert(neighbor.location) {
                stack.push(neighbor.location);
            }
        }
    }

    Ok(false)
}

/// Whether the grid strands some pipe: an empty cell is a dead end, some pipe's heads can no longer reach each other through empty cells,
/// or a region of empty cells borders no head at all and so can never be filled.
pub fn is_entrapped(grid: &Grid) -> Result<bool, SolveError> {
    for cell in grid.cells() {
        if cell.is_empty() && is_dead_end(grid, cell.location)? {
            return Ok(true);
        }
    }

    let mut heads = HashSet::new();
    for pipe in grid.pipe_ids() {
        let Some((near, far)) = grid.heads(pipe)? else {
            continue;
        };
        heads.insert(near);
        heads.insert(far);
        if !flood_reaches(grid, near, far)? {
            return Ok(true);
        }
    }

    let mut visited = HashSet::new();
    for cell in grid.cells().filter(|cell| cell.is_empty()) {
        if visited.contains(&cell.location) {
            continue;
        }

        let mut borders_head = false;
        let mut stack = vec![cell.location];
        visited.insert(cell.location);
        while let Some(location) = stack.pop() {
            let current = grid.cell(location)?;
            for direction in current.directions_where(|connection| connection.is_open()) {
                let Some(neighbor) = grid.neighbor_cell(location, direction) else {
                    continue;
                };
                if heads.contains(&neighbor.location) {
                    borders_head = true;
                } else if neighbor.pipe.is_none() && visited.insert(neighbor.location) {
                    stack.push(neighbor.location);
                }
            }
        }

        if !borders_head {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Entrapment, checked on a grid carrying `route` for `pipe`.
pub fn traps_pipe(grid: &Grid, route: &[Location], pipe: PipeId) -> Result<bool, SolveError> {
    logged(is_entrapped(grid), "entrapment", route, pipe)
}

/// Whether `route` passes alongside its own destination endpoint, with no wall between, without stepping into it there.
///
/// Only sound while routes never touch themselves, so the solver consults it only when [`SolverConfig::check_deviation`] is set.
pub fn has_invalid_deviation(grid: &Grid, route: &[Location], pipe: PipeId) -> Result<bool, SolveError> {
    let Some(&first) = route.first() else {
        return Ok(false);
    };
    let destination = grid.pipe(pipe)?.partner_of(first).ok_or(SolveError::MissingCell(first))?;

    for (index, &location) in route.iter().enumerate() {
        if location == destination {
            break;
        }
        if grid.is_passage(location, destination) && route.get(index + 1) != Some(&destination) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// The full check for a complete candidate route carried by `grid`: dead ends around it, the adjacency law along it, and entrapment.
pub fn is_bad_formation(grid: &Grid, route: &[Location], pipe: PipeId, config: &SolverConfig) -> Result<bool, SolveError> {
    Ok(logged(has_dead_end(grid, route, route), "dead end", route, pipe)?
        || logged(breaks_adjacency_law(grid, route), "adjacency law", route, pipe)?
        || traps_pipe(grid, route, pipe)?
        || (config.check_deviation && logged(has_invalid_deviation(grid, route, pipe), "deviation", route, pipe)?))
}

/// The incremental check for a partial route which just grew by its last cell.
pub fn is_bad_extension(grid: &Grid, route: &[Location], pipe: PipeId, config: &SolverConfig) -> Result<bool, SolveError> {
    let recent = &route[route.len().saturating_sub(2)..];
    let last = &route[route.len().saturating_sub(1)..];

    Ok(logged(has_dead_end(grid, route, recent), "dead end", route, pipe)?
        || logged(breaks_adjacency_law(grid, last), "adjacency law", route, pipe)?
        || traps_pipe(grid, route, pipe)?
        || (config.check_deviation && logged(has_invalid_deviation(grid, route, pipe), "deviation", route, pipe)?))
}
