//! Error types for building, parsing and solving.

use std::fmt::Display;

use thiserror::Error;

use crate::builder::BuilderInvalidReason;
use crate::direction::Direction;
use crate::location::Location;
use crate::pipe::PipeId;

/// Errors from [`PathGraph`](crate::graph::PathGraph) queries.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The node has no adjacency entry.
    #[error("node {0} is not in the graph")]
    UnknownNode(String),
    /// A search started on a graph without nodes.
    #[error("graph has no nodes")]
    Empty,
    /// No node satisfied a search predicate.
    #[error("no node satisfies the predicate")]
    NotFound,
}

/// Grid integrity errors raised while solving.
///
/// These mean the grid is in a state the solver never produces on its own; they abort the solve instead of being treated as a dead branch.
#[derive(Debug, Error)]
pub enum SolveError {
    /// A location outside the grid was looked up.
    #[error("no cell at {0}")]
    MissingCell(Location),
    /// Not an ID of any pipe on the grid.
    #[error("no pipe with id {0}")]
    UnknownPipe(PipeId),
    /// A step between two cells which do not share a side.
    #[error("{from} and {to} are not orthogonally adjacent")]
    NotAdjacent {
        /// Where the step starts.
        from: Location,
        /// Where it was meant to end.
        to: Location,
    },
    /// A [`connect`](crate::connection::connect) precondition does not hold.
    #[error("cannot connect {location} {direction}: {reason}")]
    Connect {
        /// The cell whose side was changed.
        location: Location,
        /// The side.
        direction: Direction,
        /// Which precondition failed.
        reason: &'static str,
    },
    /// A [`remove_connector`](crate::connection::remove_connector) precondition does not hold.
    #[error("cannot remove connector {location} {direction}: {reason}")]
    RemoveConnector {
        /// The cell whose side was changed.
        location: Location,
        /// The side.
        direction: Direction,
        /// Which precondition failed.
        reason: &'static str,
    },
    /// The route graph was queried incorrectly.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// Another error, annotated with where it passed through.
    #[error("{context}: {source}")]
    Context {
        /// The interrupted operation.
        context: String,
        /// What went wrong inside it.
        #[source]
        source: Box<SolveError>,
    },
}

impl SolveError {
    /// Wrap this error with a description of the operation it interrupted.
    pub fn context(self, context: impl Display) -> Self {
        Self::Context {
            context: context.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all context stripped.
    pub fn root(&self) -> &SolveError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

pub(crate) trait WithContext<T> {
    fn with_context<C: Display>(self, context: impl FnOnce() -> C) -> Result<T, SolveError>;
}

impl<T, E: Into<SolveError>> WithContext<T> for Result<T, E> {
    fn with_context<C: Display>(self, context: impl FnOnce() -> C) -> Result<T, SolveError> {
        self.map_err(|error| error.into().context(context()))
    }
}

/// Errors from parsing a textual puzzle definition. Line numbers are 1-based.
#[derive(Debug, Error)]
pub enum DefinitionError {
    /// Only comments and blank lines.
    #[error("definition has no grid rows")]
    Empty,
    /// A row with a different width from the first.
    #[error("line {line}: expected {expected} cells, found {found}")]
    RaggedRow {
        /// One-based line number.
        line: usize,
        /// Width of the first row.
        expected: usize,
        /// Width of this row.
        found: usize,
    },
    /// A grid character which is not `.`, `#` or a letter or digit.
    #[error("line {line}: unexpected character '{found}'")]
    UnexpectedCharacter {
        /// One-based line number.
        line: usize,
        /// The offending character.
        found: char,
    },
    /// A label appearing other than exactly twice.
    #[error("terminus '{label}' appears {count} times, expected 2")]
    UnpairedTerminus {
        /// The label as written.
        label: char,
        /// How many times it appears.
        count: usize,
    },
    /// Termini render upper-case and paths lower-case, so labels must differ by more than case.
    #[error("line {line}: terminus '{label}' differs from '{existing}' only by case")]
    AmbiguousLabel {
        /// One-based line number of the second spelling.
        line: usize,
        /// The label found on that line.
        label: char,
        /// The spelling seen first.
        existing: char,
    },
    /// A directive which is not `wall X Y DIRECTION`, or a grid row after the first directive.
    #[error("line {line}: malformed directive '{text}'")]
    MalformedDirective {
        /// One-based line number.
        line: usize,
        /// The text that could not be parsed.
        text: String,
    },
    /// Not one of `up`, `down`, `left` or `right`.
    #[error("line {line}: unknown direction '{text}'")]
    UnknownDirection {
        /// One-based line number.
        line: usize,
        /// The text that could not be parsed.
        text: String,
    },
    /// The grid parsed, but describes an invalid puzzle.
    #[error("grid rejected by builder: {0:?}")]
    Build(Vec<BuilderInvalidReason>),
}

/// Any error this crate produces.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`DefinitionError`].
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// See [`SolveError`].
    #[error(transparent)]
    Solve(#[from] SolveError),
}
