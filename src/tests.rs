#[cfg(test)]
mod tests {
    use std::num::NonZero;

    use unordered_pair::UnorderedPair;

    use crate::builder::{BuilderInvalidReason, GridBuilder};
    use crate::cell::{Border, Connection};
    use crate::connection::{can_remove_connector, commit_route, connect, remove_connector, ConnectionKind};
    use crate::direction::Direction;
    use crate::error::{DefinitionError, GraphError, SolveError};
    use crate::formation::{breaks_adjacency_law, has_dead_end, has_invalid_deviation, is_bad_formation, is_dead_end, traps_pipe};
    use crate::graph::{EdgeKind, Flow, PathGraph};
    use crate::grid::Grid;
    use crate::location::{Dimension, Location};
    use crate::pipe::PipeSet;
    use crate::propagation::{propagate, Deduction, Propagation, Rule};
    use crate::route::RouteGenerator;
    use crate::solver::{SolveStats, Solver, SolverConfig, SolverState};

    fn dims(width: usize, height: usize) -> (Dimension, Dimension) {
        (NonZero::new(width).unwrap(), NonZero::new(height).unwrap())
    }

    fn puzzle(definition: &str) -> Grid {
        definition.parse().unwrap()
    }

    #[test]
    fn remove_termini() {
        let grid = GridBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(0, 0), Location(1, 4)))
            .pop_termini()
            .build()
            .unwrap();

        assert_eq!(format!("{}", grid), ".....
.....
.....
.....
.....
");
        assert!(grid.pipes().is_empty());
    }

    #[test]
    fn builder_invalid_states() {
        let mut builder = GridBuilder::with_dims(dims(3, 3));
        builder.add_termini('A', (Location(0, 0), Location(3, 0)));
        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::FeatureOutOfBounds]));
        // invalid builders ignore everything after
        builder.add_termini('B', (Location(0, 1), Location(1, 1)));
        assert_eq!(builder.build().unwrap_err(), &vec![BuilderInvalidReason::FeatureOutOfBounds]);

        let overlapping = GridBuilder::with_dims(dims(3, 3))
            .add_termini('A', (Location(0, 0), Location(2, 2)))
            .add_termini('B', (Location(2, 2), Location(1, 1)))
            .build()
            .unwrap_err()
            .clone();
        assert_eq!(overlapping, vec![BuilderInvalidReason::LocationOccupied]);

        let on_hole = GridBuilder::with_dims(dims(3, 3))
            .drop_location(Location(1, 1))
            .add_termini('A', (Location(0, 0), Location(1, 1)))
            .build()
            .unwrap_err()
            .clone();
        assert_eq!(on_hole, vec![BuilderInvalidReason::LocationOccupied]);
    }

    #[test]
    fn builder_too_many_pipes() {
        let mut builder = GridBuilder::with_dims(dims(16, 16));
        for pipe in 0..PipeSet::CAPACITY {
            let (a, b) = (2 * pipe, 2 * pipe + 1);
            builder.add_termini('a', (Location(a % 16, a / 16), Location(b % 16, b / 16)));
        }
        assert!(builder.is_valid().is_none());

        builder.add_termini('a', (Location(14, 15), Location(15, 15)));
        assert_eq!(builder.is_valid(), Some(&vec![BuilderInvalidReason::TooManyPipes]));
    }

    #[test]
    fn builder_walls_and_holes() {
        let grid = GridBuilder::with_dims(dims(3, 2))
            .add_termini('A', (Location(0, 0), Location(2, 0)))
            .drop_location(Location(1, 1))
            .disconnect(UnorderedPair::from((Location(0, 0), Location(1, 0))))
            // not adjacent, ignored
            .disconnect(UnorderedPair::from((Location(0, 0), Location(2, 1))))
            .disconnect_around(Location(2, 0), vec![Direction::Down])
            .build()
            .unwrap();

        assert_eq!(format!("{}", grid), "A.A
.#.
");

        let corner = grid.cell(Location(0, 0)).unwrap();
        assert_eq!(corner.border(Direction::Right), Border::Wall);
        assert_eq!(corner.connection(Direction::Right), Connection::Closed);
        assert_eq!(corner.border(Direction::Down), Border::Open);
        assert_eq!(corner.border(Direction::Up), Border::Wall);
        assert_eq!(grid.cell(Location(1, 0)).unwrap().border(Direction::Left), Border::Wall);
        assert_eq!(grid.cell(Location(2, 1)).unwrap().border(Direction::Up), Border::Wall);
        // cells next to a hole are walled off from it
        assert_eq!(grid.cell(Location(1, 0)).unwrap().border(Direction::Down), Border::Wall);
        assert_eq!(grid.cell(Location(0, 1)).unwrap().border(Direction::Right), Border::Wall);

        let hole = grid.cell(Location(1, 1)).unwrap();
        assert!(!hole.is_reachable());
        assert!(hole.possible().is_empty());
        assert_eq!(hole.wall_count(), 4);

        assert_eq!(grid.cell(Location(0, 0)).unwrap().possible(), PipeSet::only(1));
        assert_eq!(grid.cell(Location(1, 0)).unwrap().possible(), PipeSet::all(1));
        assert_eq!(grid.cell(Location(1, 0)).unwrap().wall_count(), 3);
    }

    #[test]
    fn parse_definition() {
        let grid = puzzle("
// a small one
A.B#
...#
B.A.

wall 1 1 up
wall 3 2 LEFT
");

        assert_eq!(format!("{}", grid), "A.B#
...#
B.A.
");
        assert_eq!(grid.pipes().len(), 2);
        let a = grid.pipe(1).unwrap();
        assert_eq!((a.display(), a.start(), a.end()), ('A', Location(0, 0), Location(2, 2)));
        let b = grid.pipe(2).unwrap();
        assert_eq!((b.display(), b.start(), b.end()), ('B', Location(2, 0), Location(0, 2)));

        assert_eq!(grid.cell(Location(1, 0)).unwrap().border(Direction::Down), Border::Wall);
        assert_eq!(grid.cell(Location(2, 2)).unwrap().border(Direction::Right), Border::Wall);
    }

    #[test]
    fn parse_definition_errors() {
        assert!(matches!("// nothing\n".parse::<Grid>(), Err(DefinitionError::Empty)));
        assert!(matches!(
            "A.A\n..\n".parse::<Grid>(),
            Err(DefinitionError::RaggedRow { line: 2, expected: 3, found: 2 })
        ));
        assert!(matches!(
            "A.A\n.?.\n".parse::<Grid>(),
            Err(DefinitionError::UnexpectedCharacter { line: 2, found: '?' })
        ));
        assert!(matches!(
            "A.A\nB..\n".parse::<Grid>(),
            Err(DefinitionError::UnpairedTerminus { label: 'B', count: 1 })
        ));
        assert!(matches!(
            "AAA\n".parse::<Grid>(),
            Err(DefinitionError::UnpairedTerminus { label: 'A', count: 3 })
        ));
        assert!(matches!(
            "A.A\nwall 0 0 sideways\n".parse::<Grid>(),
            Err(DefinitionError::UnknownDirection { line: 2, .. })
        ));
        assert!(matches!(
            "A.A\nwall 0 down\n".parse::<Grid>(),
            Err(DefinitionError::MalformedDirective { line: 2, .. })
        ));
        assert!(matches!(
            "A.A\nwall 0 0 down\n...\n".parse::<Grid>(),
            Err(DefinitionError::MalformedDirective { line: 3, .. })
        ));
        assert!(matches!(
            "A.a\nA.a\n".parse::<Grid>(),
            Err(DefinitionError::AmbiguousLabel { line: 1, label: 'a', existing: 'A' })
        ));
        assert!(matches!(
            "A.A\nwall 0 0 up\n".parse::<Grid>(),
            Err(DefinitionError::Build(_))
        ));
    }

    #[test]
    fn directions() {
        assert_eq!(Direction::Up.invert(), Direction::Down);
        assert_eq!(Direction::Left.perpendicular(), [Direction::Up, Direction::Down]);
        assert_eq!(Direction::direction_to(Location(1, 1), Location(1, 0)), Some(Direction::Up));
        assert_eq!(Direction::direction_to(Location(1, 1), Location(2, 2)), None);
        assert_eq!(Direction::direction_to(Location(0, 0), Location(0, 0)), None);
        assert_eq!("Right".parse::<Direction>().unwrap(), Direction::Right);
        assert_eq!(Direction::Left.to_string(), "left");
    }

    #[test]
    fn pipe_sets() {
        let mut set = PipeSet::all(3);
        assert_eq!(set.len(), 3);
        assert!(!set.contains(0));
        assert!(set.remove(2));
        assert!(!set.remove(2));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert!(!set.insert(PipeSet::CAPACITY + 1));

        let full = PipeSet::all(PipeSet::CAPACITY);
        assert_eq!(full.len(), PipeSet::CAPACITY);
        assert!(full.contains(PipeSet::CAPACITY));
        assert!(PipeSet::empty().is_empty());
    }

    #[test]
    fn connect_fixes_both_sides() {
        let mut grid = puzzle("A..\n...\n..A\n");
        connect(&mut grid, Location(0, 0), Location(1, 0), 1, ConnectionKind::Fixed).unwrap();

        let start = grid.cell(Location(0, 0)).unwrap();
        assert_eq!(start.connection(Direction::Right), Connection::Fixed);
        assert_eq!(start.connection(Direction::Down), Connection::OpenFixed);
        assert!(start.is_saturated());

        let next = grid.cell(Location(1, 0)).unwrap();
        assert_eq!(next.pipe(), Some(1));
        assert_eq!(next.connection(Direction::Left), Connection::Fixed);
        assert_eq!(next.connection(Direction::Right), Connection::OpenFixed);
        assert_eq!(next.connection(Direction::Down), Connection::OpenFixed);
        assert_eq!(next.connection(Direction::Up), Connection::Closed);
        assert!(next.is_head());

        // the far side of an open-fixed connector keeps its own state
        assert_eq!(grid.cell(Location(0, 1)).unwrap().connection(Direction::Up), Connection::Open);
        assert_eq!(grid.chain(Location(0, 0)).unwrap(), vec![Location(0, 0), Location(1, 0)]);
        assert_eq!(grid.heads(1).unwrap(), Some((Location(1, 0), Location(2, 2))));
    }

    #[test]
    fn connect_preconditions() {
        let mut grid = puzzle("A.B\n...\nA.B\n");

        let far = connect(&mut grid, Location(0, 0), Location(2, 0), 1, ConnectionKind::Fixed);
        assert!(matches!(far, Err(SolveError::NotAdjacent { .. })));

        let unowned = connect(&mut grid, Location(1, 1), Location(1, 0), 1, ConnectionKind::Fixed);
        assert!(matches!(unowned, Err(SolveError::Connect { location: Location(1, 1), .. })));

        let foreign = connect(&mut grid, Location(1, 0), Location(2, 0), 1, ConnectionKind::Fixed);
        assert!(matches!(foreign, Err(SolveError::Connect { location: Location(2, 0), direction: Direction::Left, .. })));

        connect(&mut grid, Location(0, 0), Location(0, 1), 1, ConnectionKind::Fixed).unwrap();
        // an endpoint takes one link only
        let full = connect(&mut grid, Location(0, 0), Location(1, 0), 1, ConnectionKind::Fixed);
        assert!(matches!(full, Err(SolveError::Connect { location: Location(0, 0), direction: Direction::Right, .. })));

        // nothing was changed by the failures
        assert_eq!(grid.cell(Location(1, 0)).unwrap().pipe(), None);
        assert_eq!(grid.cell(Location(1, 1)).unwrap().pipe(), None);
    }

    #[test]
    fn remove_connectors() {
        let mut grid = puzzle("A..\n...\n..A\n");

        // a corner endpoint may lose one of its two connectors
        assert!(can_remove_connector(&grid, Location(0, 0), Direction::Right).unwrap());
        remove_connector(&mut grid, Location(0, 0), Direction::Right).unwrap();
        assert_eq!(grid.cell(Location(0, 0)).unwrap().connection(Direction::Right), Connection::Closed);
        assert_eq!(grid.cell(Location(1, 0)).unwrap().connection(Direction::Left), Connection::Closed);

        // but not its last
        assert!(!can_remove_connector(&grid, Location(0, 0), Direction::Down).unwrap());
        let last = remove_connector(&mut grid, Location(0, 0), Direction::Down);
        assert!(matches!(last, Err(SolveError::RemoveConnector { location: Location(0, 0), .. })));

        // (1, 0) is down to two connectors now, so it is the side that refuses
        let stranded = remove_connector(&mut grid, Location(1, 1), Direction::Up);
        assert!(matches!(stranded, Err(SolveError::RemoveConnector { location: Location(1, 0), direction: Direction::Down, .. })));

        let closed = remove_connector(&mut grid, Location(0, 0), Direction::Up);
        assert!(matches!(closed, Err(SolveError::RemoveConnector { .. })));

        connect(&mut grid, Location(2, 2), Location(2, 1), 1, ConnectionKind::Fixed).unwrap();
        let linked = remove_connector(&mut grid, Location(2, 1), Direction::Down);
        assert!(matches!(linked, Err(SolveError::RemoveConnector { location: Location(2, 1), direction: Direction::Down, .. })));
    }

    #[test]
    fn commit_route_adds_context() {
        let mut grid = puzzle("A.B\n...\nA.B\n");
        let route = [Location(0, 0), Location(1, 0), Location(2, 0)];

        let error = commit_route(&mut grid, 1, &route).unwrap_err();
        assert!(matches!(error, SolveError::Context { .. }));
        assert!(matches!(error.root(), SolveError::Connect { location: Location(2, 0), .. }));
        assert!(error.to_string().starts_with("committing route of pipe 1"));

        let mut grid = puzzle("A.A\n");
        commit_route(&mut grid, 1, &route).unwrap();
        assert!(grid.is_complete(1).unwrap());
        assert_eq!(&*grid.trace(1).unwrap().unwrap(), &route[..]);
        assert_eq!(format!("{}", grid), "AaA\n");
    }

    #[test]
    fn injection_is_undone_on_drop() {
        let mut grid = puzzle("A..\n...\n..A\n");
        let before = grid.clone();
        let route = [Location(0, 0), Location(0, 1), Location(1, 1), Location(2, 1), Location(2, 2)];

        {
            let injected = grid.inject(1, &route).unwrap();
            for location in route {
                assert_eq!(injected.cell(location).unwrap().pipe(), Some(1));
            }
            assert_eq!(injected.cell(Location(1, 1)).unwrap().connection(Direction::Left), Connection::Temporary);
            assert!(injected.is_complete(1).unwrap());
            assert_eq!(injected.trace(1).unwrap().unwrap().len(), 5);
        }

        assert_eq!(grid, before);

        // a failing injection undoes the links it made before failing
        let broken = [Location(0, 0), Location(0, 1), Location(2, 1)];
        assert!(grid.inject(1, &broken).is_err());
        assert_eq!(grid, before);
    }

    #[test]
    fn solution_check() {
        let mut grid = puzzle("RG...GR\n.......\n");
        assert!(grid.routes().unwrap().is_none());
        assert!(grid.solve().unwrap());

        let routes = grid.routes().unwrap().unwrap();
        assert!(grid.is_solution(&routes));
        assert_eq!(routes[&2].len(), 5);

        let mut missing = routes.clone();
        missing.remove(&2);
        assert!(!grid.is_solution(&missing));

        let mut overlapping = routes.clone();
        overlapping.insert(2, routes[&1].clone());
        assert!(!grid.is_solution(&overlapping));
    }

    #[test]
    fn graph_search_covers_components() {
        let mut graph = PathGraph::new();
        graph.add_edge(1u32, 2, EdgeKind::Directed);
        graph.add_edge(3, 4, EdgeKind::Undirected);

        assert_eq!(graph.bfs_find(|node| *node == 4).unwrap(), 4);
        assert_eq!(graph.dfs_find(|node| *node > 2).unwrap(), 3);
        assert!(matches!(graph.bfs_find(|node| *node == 9), Err(GraphError::NotFound)));
        assert!(matches!(graph.dfs_find(|node| *node == 9), Err(GraphError::NotFound)));

        let mut visited = Vec::new();
        graph.traverse(|node| visited.push(node)).unwrap();
        visited.sort();
        assert_eq!(visited, vec![1, 2, 3, 4]);

        assert_eq!(graph.neighbors(4).unwrap(), vec![3]);
        assert!(graph.neighbors(2).unwrap().is_empty());
        assert!(matches!(graph.neighbors(7), Err(GraphError::UnknownNode(_))));

        let empty: PathGraph<u32> = PathGraph::new();
        assert!(matches!(empty.bfs_find(|_| true), Err(GraphError::Empty)));
        assert!(matches!(empty.traverse(|_| {}), Err(GraphError::Empty)));
    }

    fn diamond() -> PathGraph<char> {
        let mut graph = PathGraph::new();
        for (from, to) in [('a', 'b'), ('a', 'c'), ('b', 'd'), ('c', 'd'), ('b', 'c'), ('d', 'e')] {
            graph.add_edge(from, to, EdgeKind::Directed);
        }
        graph
    }

    #[test]
    fn enumerate_all_simple_paths() {
        let graph = diamond();
        let mut paths = Vec::new();
        let mut visitor = (
            |_: &[char]| Ok::<bool, GraphError>(true),
            |path: &[char]| {
                paths.push(path.iter().collect::<String>());
                Ok(Flow::Continue)
            },
        );

        assert_eq!(graph.enumerate_paths('a', 'e', &mut visitor).unwrap(), Flow::Continue);
        paths.sort();
        assert_eq!(paths, vec!["abcde", "abde", "acde"]);
    }

    #[test]
    fn enumerate_stops_early() {
        let graph = diamond();
        let mut count = 0;
        let mut visitor = (
            |_: &[char]| Ok::<bool, GraphError>(true),
            |_: &[char]| {
                count += 1;
                Ok(Flow::Stop)
            },
        );

        assert_eq!(graph.enumerate_paths('a', 'e', &mut visitor).unwrap(), Flow::Stop);
        assert_eq!(count, 1);
    }

    #[test]
    fn rejected_nodes_are_skipped_by_siblings_until_unwound() {
        let mut graph = PathGraph::new();
        for (from, to) in [('a', 'x'), ('a', 'y'), ('y', 'x'), ('x', 'z'), ('y', 'z')] {
            graph.add_edge(from, to, EdgeKind::Directed);
        }

        // x straight after a is rejected, which also hides x from the branch through y
        let mut paths = Vec::new();
        let mut visitor = (
            |partial: &[char]| Ok::<bool, GraphError>(partial != ['a', 'x']),
            |path: &[char]| {
                paths.push(path.iter().collect::<String>());
                Ok(Flow::Continue)
            },
        );
        graph.enumerate_paths('a', 'z', &mut visitor).unwrap();
        assert_eq!(paths, vec!["ayz"]);

        // rejected one level down, d comes back once that frame unwinds
        let graph = diamond();
        let mut paths = Vec::new();
        let mut visitor = (
            |partial: &[char]| Ok::<bool, GraphError>(partial != ['a', 'b', 'd']),
            |path: &[char]| {
                paths.push(path.iter().collect::<String>());
                Ok(Flow::Continue)
            },
        );
        graph.enumerate_paths('a', 'e', &mut visitor).unwrap();
        assert_eq!(paths, vec!["acde"]);
    }

    #[test]
    fn enumeration_errors() {
        let graph = diamond();

        let mut failing_validator = (
            |partial: &[char]| if partial.len() > 2 { Err(GraphError::NotFound) } else { Ok(true) },
            |_: &[char]| Ok(Flow::Continue),
        );
        assert!(graph.enumerate_paths('a', 'e', &mut failing_validator).is_err());

        // errors from completed paths are logged and skipped
        let mut completions = 0;
        let mut failing_completion = (
            |_: &[char]| Ok::<bool, GraphError>(true),
            |_: &[char]| {
                completions += 1;
                Err(GraphError::NotFound)
            },
        );
        assert_eq!(graph.enumerate_paths('a', 'e', &mut failing_completion).unwrap(), Flow::Continue);
        assert_eq!(completions, 3);

        let mut visitor = (|_: &[char]| Ok::<bool, GraphError>(true), |_: &[char]| Ok(Flow::Continue));
        assert!(matches!(graph.enumerate_paths('a', 'q', &mut visitor), Err(GraphError::UnknownNode(_))));
    }

    #[test]
    fn generate_routes() {
        let grid = puzzle("A.\n.A\n");
        let routes = RouteGenerator::new(&grid, 1).unwrap().collect().unwrap();
        let mut routes = routes.iter().map(|route| route.to_vec()).collect::<Vec<_>>();
        routes.sort();
        assert_eq!(routes, vec![
            vec![Location(0, 0), Location(0, 1), Location(1, 1)],
            vec![Location(0, 0), Location(1, 0), Location(1, 1)],
        ]);
    }

    #[test]
    fn generated_routes_follow_fixtures() {
        let mut grid = puzzle("A..\n...\n..A\n");
        connect(&mut grid, Location(2, 2), Location(2, 1), 1, ConnectionKind::Fixed).unwrap();
        connect(&mut grid, Location(2, 1), Location(2, 0), 1, ConnectionKind::Fixed).unwrap();

        let generator = RouteGenerator::new(&grid, 1).unwrap();
        assert_eq!(generator.origin(), Location(0, 0));
        assert_eq!(generator.target(), Location(2, 0));

        let routes = generator.collect().unwrap();
        assert!(!routes.is_empty());
        for route in &routes {
            assert!(route.is_simple_path());
            assert_eq!(route.first(), Some(&Location(0, 0)));
            assert_eq!(&route[route.len() - 3..], &[Location(2, 0), Location(2, 1), Location(2, 2)]);
        }
        assert!(routes.iter().any(|route| route.len() == 5));
    }

    #[test]
    fn unreachable_target_yields_no_routes() {
        let grid = puzzle("A#A\n");
        assert!(RouteGenerator::new(&grid, 1).unwrap().collect().unwrap().is_empty());
    }

    #[test]
    fn walled_in_cell_is_a_dead_end() {
        let grid = puzzle("
A.B
...
A.B
wall 1 1 up
wall 1 1 down
wall 1 1 left
wall 1 1 right
");
        assert_eq!(grid.cell(Location(1, 1)).unwrap().wall_count(), 4);
        assert!(is_dead_end(&grid, Location(1, 1)).unwrap());
        assert!(is_dead_end(&grid, Location(1, 0)).unwrap());
        assert!(!is_dead_end(&grid, Location(0, 1)).unwrap());

        let mut solver = Solver::new(grid, SolverConfig::default());
        assert!(!solver.solve().unwrap());
        assert_eq!(solver.state(), SolverState::Exhausted);
        assert_eq!(solver.stats().route_searches, 0);
    }

    #[test]
    fn dead_end_between_different_heads() {
        let grid = puzzle("
#A#
B.B
#A#
wall 1 1 left
wall 1 1 down
");
        assert!(is_dead_end(&grid, Location(1, 1)).unwrap());

        let grid = puzzle("
#A#
B.B
#A#
wall 1 1 up
wall 1 1 down
");
        assert!(!is_dead_end(&grid, Location(1, 1)).unwrap());

        // an endpoint boxed in by another pipe
        let grid = puzzle("AB\nBA\n");
        assert!(is_dead_end(&grid, Location(0, 0)).unwrap());
        assert!(has_dead_end(&grid, &[Location(1, 0)], &[Location(1, 0)]).unwrap());
        assert!(!has_dead_end(&grid, &[Location(0, 0), Location(1, 0), Location(1, 1)], &[Location(1, 0)]).unwrap());
    }

    #[test]
    fn adjacency_law() {
        let route = [Location(0, 0), Location(1, 0), Location(1, 1), Location(0, 1), Location(0, 2)];

        let mut open = puzzle("A.\n..\nA.\n");
        let injected = open.inject(1, &route).unwrap();
        assert!(breaks_adjacency_law(&injected, &route).unwrap());
        assert!(is_bad_formation(&injected, &route, 1, &SolverConfig::default()).unwrap());
        drop(injected);

        let mut walled = puzzle("A.\n..\nA.\nwall 0 0 down\n");
        let injected = walled.inject(1, &route).unwrap();
        assert!(!breaks_adjacency_law(&injected, &route).unwrap());
    }

    #[test]
    fn partial_route_traps_another_pipe() {
        let mut grid = puzzle("A.B\n...\nB.A\n");
        let partial = [Location(0, 0), Location(1, 0), Location(1, 1), Location(1, 2)];
        {
            let injected = grid.inject(1, &partial).unwrap();
            assert!(!injected.is_complete(1).unwrap());
            assert!(traps_pipe(&injected, &partial, 1).unwrap());
        }

        let harmless = [Location(0, 0), Location(1, 0)];
        let injected = grid.inject(1, &harmless).unwrap();
        assert!(!traps_pipe(&injected, &harmless, 1).unwrap());
    }

    #[test]
    fn deviation_past_destination() {
        let grid = puzzle("A.A\n...\n");
        let hugging = [Location(0, 0), Location(1, 0), Location(1, 1), Location(2, 1), Location(2, 0)];
        assert!(has_invalid_deviation(&grid, &hugging, 1).unwrap());

        let direct = [Location(0, 0), Location(1, 0), Location(2, 0)];
        assert!(!has_invalid_deviation(&grid, &direct, 1).unwrap());

        let walled = puzzle("A.A\n...\nwall 1 0 right\n");
        assert!(!has_invalid_deviation(&walled, &hugging, 1).unwrap());
    }

    #[test]
    fn fill_to_obstruction_extends_a_head() {
        let mut grid = puzzle("A.A\n");
        assert_eq!(Rule::FillToObstruction.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(0, 0)).unwrap().connection(Direction::Right), Connection::Fixed);
        assert_eq!(grid.cell(Location(1, 0)).unwrap().pipe(), Some(1));
    }

    #[test]
    fn only_one_way_retires_conflicting_connectors() {
        let mut grid = puzzle("AB\nAB\n");
        assert_eq!(Rule::OnlyOneWay.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(0, 0)).unwrap().connection(Direction::Right), Connection::Closed);
        assert_eq!(grid.cell(Location(1, 0)).unwrap().connection(Direction::Left), Connection::Closed);

        let mut boxed = puzzle("AB\nBA\n");
        let mut stats = SolveStats::default();
        assert_eq!(propagate(&mut boxed, &mut stats).unwrap(), Propagation::Contradiction);
    }

    #[test]
    fn corner_formation_rules_out_blocks() {
        let mut grid = puzzle(".A.\nA..\nB.B\n");
        connect(&mut grid, Location(1, 0), Location(0, 0), 1, ConnectionKind::Fixed).unwrap();
        assert!(grid.cell(Location(1, 1)).unwrap().possible().contains(1));

        assert_eq!(Rule::CornerFormation.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(1, 1)).unwrap().possible(), PipeSet::only(2));
    }

    #[test]
    fn corner_formation_from_an_axis_neighbor() {
        // the empty cell sits beside both arms of the L rather than across from the cell scanned first
        let mut grid = puzzle(".A.\nA..\nB.B\n");
        connect(&mut grid, Location(1, 0), Location(1, 1), 1, ConnectionKind::Fixed).unwrap();
        assert!(grid.cell(Location(0, 0)).unwrap().possible().contains(1));

        assert_eq!(Rule::CornerFormation.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(0, 0)).unwrap().possible(), PipeSet::only(2));

        // a wall inside the block allows it
        let mut walled = puzzle(".A.\nA..\nB.B\nwall 0 0 right\n");
        connect(&mut walled, Location(1, 0), Location(1, 1), 1, ConnectionKind::Fixed).unwrap();
        assert_eq!(Rule::CornerFormation.apply(&mut walled).unwrap(), Deduction::Unchanged);
    }

    #[test]
    fn only_one_way_skips_a_blocked_channel() {
        let mut grid = puzzle("A.B\n...\nB.A\nwall 1 0 down\n");
        assert!(grid.cell(Location(1, 0)).unwrap().is_channel());

        // the channel to the right only leads into B, so A has to go down
        assert_eq!(Rule::OnlyOneWay.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(0, 0)).unwrap().connection(Direction::Down), Connection::Fixed);
        assert_eq!(grid.cell(Location(0, 1)).unwrap().pipe(), Some(1));
        assert_eq!(grid.cell(Location(1, 0)).unwrap().pipe(), None);
    }

    #[test]
    fn only_one_possibility_narrows_then_commits() {
        let mut grid = puzzle("A.A\n###\nB.B\n");

        assert_eq!(Rule::OnlyOnePossibility.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(1, 0)).unwrap().possible(), PipeSet::only(1));
        assert_eq!(grid.cell(Location(1, 2)).unwrap().possible(), PipeSet::only(2));

        assert_eq!(Rule::OnlyOnePossibility.apply(&mut grid).unwrap(), Deduction::Changed);
        assert_eq!(grid.cell(Location(0, 0)).unwrap().connection(Direction::Right), Connection::Fixed);
        assert_eq!(grid.cell(Location(1, 0)).unwrap().pipe(), Some(1));
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut grid = puzzle("Y....\n..R..\n.....\n.Y..B\nB...R\n");
        let mut stats = SolveStats::default();
        assert_eq!(propagate(&mut grid, &mut stats).unwrap(), Propagation::FixedPoint);

        let settled = grid.clone();
        let mut again = SolveStats::default();
        assert_eq!(propagate(&mut grid, &mut again).unwrap(), Propagation::FixedPoint);
        assert_eq!(again.propagation_passes, 1);
        assert_eq!(grid, settled);
    }

    #[test]
    fn solve_by_propagation_alone() {
        let grid = puzzle("RG...GR\n.......\n");
        let mut solver = Solver::new(grid, SolverConfig::default());

        assert!(solver.solve().unwrap());
        assert_eq!(solver.state(), SolverState::Solved);
        assert_eq!(solver.stats().route_searches, 0);
        assert_eq!(solver.stats().candidates, 0);
        assert_eq!(format!("{}", solver.grid()), "RGgggGR
rrrrrrr
");
    }

    #[test]
    fn solve_most_basic() {
        // flow free classic pack level 1
        let mut grid = GridBuilder::with_dims(dims(5, 5))
            .add_termini('A', (Location(0, 0), Location(1, 4)))
            .add_termini('B', (Location(2, 0), Location(1, 3)))
            .add_termini('C', (Location(2, 1), Location(2, 4)))
            .add_termini('D', (Location(4, 0), Location(3, 3)))
            .add_termini('E', (Location(4, 1), Location(3, 4)))
            .build()
            .unwrap();

        assert_eq!(format!("{}", grid), "A.B.D
..C.E
.....
.B.D.
.ACE.
");

        assert!(grid.solve().unwrap());
        assert_eq!(format!("{}", grid), "AbBdD
abCdE
abcde
aBcDe
aACEe
")
    }

    #[test]
    fn solve_with_backtracking() {
        let grid = puzzle("
Y....G
..R...
.....G
.Y..BP
B...R.
O...OP
");
        let mut solver = Solver::new(grid, SolverConfig::default());

        assert!(solver.solve().unwrap());
        assert!(solver.stats().route_searches > 0);
        assert!(solver.stats().branches > 0);
        assert_eq!(format!("{}", solver.grid()), "YbbbbG
ybRrbg
ybbrbG
yYbrBP
BbbrRp
OoooOP
");

        let routes = solver.grid().routes().unwrap().unwrap();
        assert_eq!(routes.len(), 6);
        assert!(solver.grid().is_solution(&routes));
    }

    #[test]
    fn solve_without_inline_pruning() {
        let definition = "Y....\n..R..\n.....\n.Y..B\nB...R\n";
        let expected = "Ybbbb
ybRrb
ybbrb
yYbrB
BbbrR
";

        let mut pruned = Solver::new(puzzle(definition), SolverConfig::default());
        assert!(pruned.solve().unwrap());
        assert!(pruned.stats().route_searches > 0);
        assert_eq!(format!("{}", pruned.grid()), expected);

        let config = SolverConfig { inline_pruning: false, ..Default::default() };
        let mut unpruned = Solver::new(puzzle(definition), config);
        assert!(unpruned.solve().unwrap());
        assert_eq!(format!("{}", unpruned.grid()), expected);
    }

    #[test]
    fn unsolvable_grid_is_left_alone() {
        let mut grid = puzzle("A.B\n...\nB.A\n");
        let before = grid.clone();

        assert!(!grid.solve().unwrap());
        assert_eq!(grid, before);
    }
}
