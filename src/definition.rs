//! Textual puzzle definitions.
//!
//! A definition starts with the grid, one line per row and one character per cell:
//! `.` is an empty cell, `#` an unreachable one, and any other ASCII letter or digit a terminus.
//! Each terminus label must appear exactly twice; its first appearance in reading order is the pipe's start.
//! Labels which differ only by case, like `a` and `A`, may not both appear since they render alike.
//! Pipes are numbered in order of first appearance.
//!
//! After the grid come directives, one per line. `wall X Y DIRECTION` places a wall on the given side of cell `(X, Y)`,
//! with `DIRECTION` one of `up`, `down`, `left` or `right`.
//! Blank lines and lines starting with `//` are ignored anywhere.
//!
//! ```
//! use pipelink::Grid;
//!
//! let grid: Grid = "\
//! // two pipes
//! A.B
//! ...
//! A.B
//! wall 1 0 down
//! ".parse().unwrap();
//! assert_eq!(grid.pipes().len(), 2);
//! ```

use std::num::NonZero;
use std::str::FromStr;

use unordered_pair::UnorderedPair;

use crate::builder::GridBuilder;
use crate::direction::Direction;
use crate::error::DefinitionError;
use crate::grid::Grid;
use crate::location::Location;

/// Parse a puzzle definition into a [`Grid`].
pub fn parse(text: &str) -> Result<Grid, DefinitionError> {
    let mut rows: Vec<(usize, &str)> = Vec::new();
    let mut directives: Vec<(usize, &str)> = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }

        // grid rows never contain whitespace
        if line.contains(char::is_whitespace) {
            directives.push((index + 1, line));
        } else if directives.is_empty() {
            rows.push((index + 1, line));
        } else {
            return Err(DefinitionError::MalformedDirective { line: index + 1, text: line.to_string() });
        }
    }

    let width = rows.first().map(|(_, row)| row.chars().count()).ok_or(DefinitionError::Empty)?;
    let dims = (
        NonZero::new(width).ok_or(DefinitionError::Empty)?,
        NonZero::new(rows.len()).ok_or(DefinitionError::Empty)?,
    );

    let mut builder = GridBuilder::with_dims(dims);
    // label and every location it appears at, in order of first appearance
    let mut termini: Vec<(char, Vec<Location>)> = Vec::new();

    for (y, (line, row)) in rows.iter().enumerate() {
        let found = row.chars().count();
        if found != width {
            return Err(DefinitionError::RaggedRow { line: *line, expected: width, found });
        }

        for (x, character) in row.chars().enumerate() {
            let location = Location(x, y);
            match character {
                '.' => {}
                '#' => {
                    builder.drop_location(location);
                }
                label if label.is_ascii_alphanumeric() => {
                    match termini.iter_mut().find(|(existing, _)| existing.eq_ignore_ascii_case(&label)) {
                        Some((existing, _)) if *existing != label => {
                            return Err(DefinitionError::AmbiguousLabel { line: *line, label, existing: *existing });
                        }
                        Some((_, locations)) => locations.push(location),
                        None => termini.push((label, vec![location])),
                    }
                }
                found => return Err(DefinitionError::UnexpectedCharacter { line: *line, found }),
            }
        }
    }

    for (label, locations) in &termini {
        match locations[..] {
            [start, end] => {
                builder.add_termini(*label, (start, end));
            }
            _ => return Err(DefinitionError::UnpairedTerminus { label: *label, count: locations.len() }),
        }
    }

    for (line, text) in directives {
        let (location, direction) = parse_wall(line, text)?;
        builder.disconnect(UnorderedPair::from((location, direction.attempt_from(location))));
    }

    let grid = builder.build().map_err(|reasons| DefinitionError::Build(reasons.clone()))?;
    Ok(grid)
}

fn parse_wall(line: usize, text: &str) -> Result<(Location, Direction), DefinitionError> {
    let malformed = || DefinitionError::MalformedDirective { line, text: text.to_string() };

    let parts: Vec<&str> = text.split_whitespace().collect();
    let ["wall", x, y, direction] = parts[..] else {
        return Err(malformed());
    };

    let x = x.parse().map_err(|_| malformed())?;
    let y = y.parse().map_err(|_| malformed())?;
    let direction = Direction::from_str(direction)
        .map_err(|_| DefinitionError::UnknownDirection { line, text: direction.to_string() })?;

    Ok((Location(x, y), direction))
}

impl FromStr for Grid {
    type Err = DefinitionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}
