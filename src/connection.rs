//! The only code allowed to change a cell's connection state.
//!
//! Each operation validates its preconditions against both sides of the connector before touching either, and never chains into further connections; callers re-invoke as needed.

use crate::cell::{Cell, Connection};
use crate::direction::Direction;
use crate::error::{SolveError, WithContext};
use crate::grid::Grid;
use crate::location::Location;
use crate::pipe::PipeId;

/// The kind of link [`connect`] lays down.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConnectionKind {
    /// Undone by restoring the cells, as speculative route injection does.
    Temporary,
    /// Permanent for the grid it is made on.
    Fixed,
}

/// Link `from` and `to` for `pipe`.
///
/// Requires the two locations to be adjacent, at least one of them to carry `pipe` already and neither to carry another pipe.
/// Both sides of the connector must be connectable and neither cell may end up with more linked connections than its [`capacity`](Cell::capacity).
/// On success both cells carry `pipe`. A [`Fixed`](ConnectionKind::Fixed) link also turns every other open connector of either cell into [`OpenFixed`](Connection::OpenFixed).
pub fn connect(grid: &mut Grid, from: Location, to: Location, pipe: PipeId, kind: ConnectionKind) -> Result<(), SolveError> {
    let direction = Direction::direction_to(from, to).ok_or(SolveError::NotAdjacent { from, to })?;
    let source = *grid.cell(from)?;
    let destination = *grid.cell(to)?;
    let fault = |cell: &Cell, direction: Direction, reason: &'static str| SolveError::Connect {
        location: cell.location,
        direction,
        reason,
    };

    let sides = [(&source, direction), (&destination, direction.invert())];
    for (cell, side) in sides {
        if cell.pipe.is_some_and(|other| other != pipe) {
            return Err(fault(cell, side, "cell carries another pipe"));
        }
    }
    if source.pipe != Some(pipe) && destination.pipe != Some(pipe) {
        return Err(fault(&source, direction, "neither side carries the pipe"));
    }

    for (cell, side) in sides {
        let state = cell.connection(side);
        if !state.is_connectable() {
            return Err(fault(cell, side, "connector is not connectable"));
        }
        // re-linking a temporary link does not add one
        let added = usize::from(state != Connection::Temporary);
        if cell.linked_count() + added > cell.capacity() {
            return Err(fault(cell, side, "cell has no room for another link"));
        }
    }

    let state = match kind {
        ConnectionKind::Temporary => Connection::Temporary,
        ConnectionKind::Fixed => Connection::Fixed,
    };
    for (location, side) in [(from, direction), (to, direction.invert())] {
        let cell = grid.cell_mut(location)?;
        cell.pipe = Some(pipe);
        cell.connections[side.index()] = state;
        if kind == ConnectionKind::Fixed {
            for connection in cell.connections.iter_mut() {
                if *connection == Connection::Open {
                    *connection = Connection::OpenFixed;
                }
            }
        }
    }

    Ok(())
}

// a cell may lose a connector only while it keeps at least as many as a finished route needs
fn strands(cell: &Cell) -> bool {
    cell.connector_count() <= cell.capacity()
}

/// Whether the open connector on the `direction` side of `location` could be removed without stranding either of its cells.
pub fn can_remove_connector(grid: &Grid, location: Location, direction: Direction) -> Result<bool, SolveError> {
    let cell = grid.cell(location)?;
    if !cell.connection(direction).is_open() {
        return Ok(false);
    }

    let neighbor = grid.neighbor_cell(location, direction)
        .ok_or(SolveError::MissingCell(direction.attempt_from(location)))?;
    Ok(!strands(cell) && !strands(neighbor))
}

/// Close the open connector on the `direction` side of `location`, on both of its sides.
///
/// Fails on a connector which is closed or linked, and on one whose removal would leave an endpoint without a connector or any other cell with fewer than two.
pub fn remove_connector(grid: &mut Grid, location: Location, direction: Direction) -> Result<(), SolveError> {
    let fault = |location: Location, direction: Direction, reason: &'static str| SolveError::RemoveConnector {
        location,
        direction,
        reason,
    };

    let cell = *grid.cell(location)?;
    match cell.connection(direction) {
        Connection::Open | Connection::OpenFixed => {}
        Connection::Closed => return Err(fault(location, direction, "no connector")),
        Connection::Temporary | Connection::Fixed => return Err(fault(location, direction, "connector is linked")),
    }

    let neighbor = *grid.neighbor_cell(location, direction)
        .ok_or(SolveError::MissingCell(direction.attempt_from(location)))?;
    if strands(&cell) {
        return Err(fault(location, direction, "cell would run out of connectors"));
    }
    if strands(&neighbor) {
        return Err(fault(neighbor.location, direction.invert(), "cell would run out of connectors"));
    }

    grid.cell_mut(location)?.connections[direction.index()] = Connection::Closed;
    grid.cell_mut(neighbor.location)?.connections[direction.invert().index()] = Connection::Closed;
    Ok(())
}

/// Fix `route` into the grid for `pipe`, skipping steps already fixed.
pub fn commit_route(grid: &mut Grid, pipe: PipeId, route: &[Location]) -> Result<(), SolveError> {
    for step in route.windows(2) {
        let (from, to) = (step[0], step[1]);
        let direction = Direction::direction_to(from, to).ok_or(SolveError::NotAdjacent { from, to })?;
        if grid.cell(from)?.connection(direction) == Connection::Fixed {
            continue;
        }

        connect(grid, from, to, pipe, ConnectionKind::Fixed)
            .with_context(|| format!("committing route of pipe {pipe}"))?;
    }

    Ok(())
}
