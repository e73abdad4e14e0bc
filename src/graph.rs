//! A small graph over opaque nodes, searched for nodes and enumerated for simple paths.

use std::collections::HashSet;
use std::fmt::{Debug, Display};

use petgraph::graphmap::{DiGraphMap, NodeTrait};
use petgraph::visit::{Bfs, Dfs, VisitMap};
use tracing::warn;

use crate::error::GraphError;

/// Whether an enumeration should keep going.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Flow {
    /// Produce more.
    Continue,
    /// Unwind without producing anything further.
    Stop,
}

impl Flow {
    /// Whether this is [`Flow::Stop`].
    pub fn is_stop(self) -> bool {
        self == Self::Stop
    }
}

/// How [`PathGraph::add_edge`] connects its nodes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdgeKind {
    /// Traversable from the first node to the second only.
    Directed,
    /// Traversable both ways.
    Undirected,
}

/// Receives the partial and complete paths of [`PathGraph::enumerate_paths`].
pub trait PathVisitor<N> {
    /// Error type of both callbacks. Graph errors convert into it.
    type Error: From<GraphError> + Display;

    /// Decide whether `partial`, whose last node was just appended, may be extended further.
    /// An error aborts the enumeration and is returned from it.
    fn accepts(&mut self, partial: &[N]) -> Result<bool, Self::Error>;

    /// Take a path which reached the destination.
    /// An error here is logged and treated as [`Flow::Continue`].
    fn complete(&mut self, path: &[N]) -> Result<Flow, Self::Error>;
}

impl<N, V, C, E> PathVisitor<N> for (V, C)
where
    V: FnMut(&[N]) -> Result<bool, E>,
    C: FnMut(&[N]) -> Result<Flow, E>,
    E: From<GraphError> + Display,
{
    type Error = E;

    fn accepts(&mut self, partial: &[N]) -> Result<bool, E> {
        (self.0)(partial)
    }

    fn complete(&mut self, path: &[N]) -> Result<Flow, E> {
        (self.1)(path)
    }
}

/// An adjacency relation over opaque nodes, used to enumerate simple paths.
#[derive(Clone, Debug)]
pub struct PathGraph<N: NodeTrait> {
    graph: DiGraphMap<N, ()>,
}

impl<N: NodeTrait> Default for PathGraph<N> {
    fn default() -> Self {
        Self { graph: DiGraphMap::new() }
    }
}

// path being extended, with the bookkeeping of which nodes may not be appended to it
struct Walk<N> {
    path: Vec<N>,
    on_path: HashSet<N>,
    // rejected as a continuation by some enclosing frame, which removes them again once it unwinds
    invalidated: HashSet<N>,
}

impl<N: NodeTrait + Debug> PathGraph<N> {
    /// An empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty graph with room for `nodes` and `edges`.
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self { graph: DiGraphMap::with_capacity(nodes, edges) }
    }

    /// Add a node without edges. Adding a node twice does nothing.
    pub fn add_node(&mut self, node: N) {
        self.graph.add_node(node);
    }

    /// Add an edge, adding either node if it is not present yet.
    pub fn add_edge(&mut self, from: N, to: N, kind: EdgeKind) {
        self.graph.add_edge(from, to, ());
        if kind == EdgeKind::Undirected {
            self.graph.add_edge(to, from, ());
        }
    }

    /// Whether `node` was ever added, alone or by an edge.
    pub fn contains_node(&self, node: N) -> bool {
        self.graph.contains_node(node)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of directed edges; an undirected edge counts twice.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Nodes reachable from `node` along one edge, in insertion order.
    pub fn neighbors(&self, node: N) -> Result<Vec<N>, GraphError> {
        if !self.graph.contains_node(node) {
            return Err(GraphError::UnknownNode(format!("{:?}", node)));
        }

        Ok(self.graph.neighbors(node).collect())
    }

    fn first_node(&self) -> Result<N, GraphError> {
        self.graph.nodes().next().ok_or(GraphError::Empty)
    }

    /// Breadth-first search for a node satisfying `predicate`, restarting from every component not yet covered.
    pub fn bfs_find(&self, mut predicate: impl FnMut(&N) -> bool) -> Result<N, GraphError> {
        let mut bfs = Bfs::new(&self.graph, self.first_node()?);

        loop {
            while let Some(node) = bfs.next(&self.graph) {
                if predicate(&node) {
                    return Ok(node);
                }
            }

            match self.graph.nodes().find(|node| !bfs.discovered.is_visited(node)) {
                Some(root) => {
                    bfs.discovered.visit(root);
                    bfs.stack.push_back(root);
                }
                None => return Err(GraphError::NotFound),
            }
        }
    }

    /// Depth-first counterpart of [`bfs_find`](Self::bfs_find).
    pub fn dfs_find(&self, mut predicate: impl FnMut(&N) -> bool) -> Result<N, GraphError> {
        let mut found = None;
        self.traverse(|node| {
            if found.is_none() && predicate(&node) {
                found = Some(node);
            }
        })?;

        found.ok_or(GraphError::NotFound)
    }

    /// Visit every node once in depth-first order, covering disconnected components too.
    pub fn traverse(&self, mut visitor: impl FnMut(N)) -> Result<(), GraphError> {
        let mut dfs = Dfs::new(&self.graph, self.first_node()?);

        loop {
            while let Some(node) = dfs.next(&self.graph) {
                visitor(node);
            }

            match self.graph.nodes().find(|node| !dfs.discovered.is_visited(node)) {
                Some(root) => dfs.move_to(root),
                None => return Ok(()),
            }
        }
    }

    /// Enumerate every simple path from `from` to `to`, handing each to `visitor`.
    ///
    /// Before a node is appended for good, the extended path is offered to [`PathVisitor::accepts`].
    /// A node rejected there is also skipped by the sibling branches of the same frame, until that frame unwinds.
    /// Enumeration runs until every branch is exhausted or the visitor returns [`Flow::Stop`], which is then returned.
    pub fn enumerate_paths<V: PathVisitor<N>>(&self, from: N, to: N, visitor: &mut V) -> Result<Flow, V::Error> {
        for node in [from, to] {
            if !self.graph.contains_node(node) {
                return Err(GraphError::UnknownNode(format!("{:?}", node)).into());
            }
        }

        let mut walk = Walk {
            path: vec![from],
            on_path: HashSet::from([from]),
            invalidated: HashSet::new(),
        };
        self.extend(&mut walk, to, visitor)
    }

    fn extend<V: PathVisitor<N>>(&self, walk: &mut Walk<N>, to: N, visitor: &mut V) -> Result<Flow, V::Error> {
        let Some(&current) = walk.path.last() else {
            return Ok(Flow::Continue);
        };

        if current == to {
            return Ok(match visitor.complete(&walk.path) {
                Ok(flow) => flow,
                Err(error) => {
                    warn!(%error, length = walk.path.len(), "discarding error from completed path");
                    Flow::Continue
                }
            });
        }

        let mut rejected = Vec::new();
        let mut flow = Flow::Continue;
        for next in self.neighbors(current)? {
            if walk.on_path.contains(&next) || walk.invalidated.contains(&next) {
                continue;
            }

            walk.path.push(next);
            let accepted = visitor.accepts(&walk.path);
            if !matches!(accepted, Ok(true)) {
                walk.path.pop();
                accepted?;
                if walk.invalidated.insert(next) {
                    rejected.push(next);
                }
                continue;
            }

            walk.on_path.insert(next);
            let result = self.extend(walk, to, visitor);
            walk.on_path.remove(&next);
            walk.path.pop();

            if result?.is_stop() {
                flow = Flow::Stop;
                break;
            }
        }

        for node in rejected {
            walk.invalidated.remove(&node);
        }

        Ok(flow)
    }
}
