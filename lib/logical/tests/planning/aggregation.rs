use crate::test_utils::{fragment, set_of, triple, CountingStrategy};
use rdf_federation_common::DFResult;
use rdf_federation_logical::join_order::GreedyJoinOrder;
use rdf_federation_logical::{aggregate_paths, FragmentId, JoinGraph, JoinPath, PathAggregator};
use std::sync::Arc;

fn path(graph: &JoinGraph, ids: &[FragmentId]) -> Arc<JoinPath> {
    Arc::new(JoinPath::new(set_of(graph, ids)))
}

/// a - b - c - d and c - e
fn fork_graph() -> (JoinGraph, Vec<FragmentId>) {
    let graph = JoinGraph::new([
        fragment("a", &[triple("v0", "a", "v1")]),
        fragment("b", &[triple("v1", "b", "v2")]),
        fragment("c", &[triple("v2", "c", "v3")]),
        fragment("d", &[triple("v3", "d", "v4")]),
        fragment("e", &[triple("v3", "e", "v5")]),
        fragment("f", &[triple("w0", "f", "w1")]),
        fragment("g", &[triple("w1", "g", "w2")]),
    ]);
    let ids = graph.universe().ids().collect();
    (graph, ids)
}

#[test]
fn test_shared_prefix_is_planned_once() -> DFResult<()> {
    let (mut graph, ids) = fork_graph();
    let (a, b, c, d, e) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
    let paths = [path(&graph, &[a, b, c, d]), path(&graph, &[a, b, c, e])];
    let strategy = CountingStrategy::default();

    let aggregation = aggregate_paths(&mut graph, &paths, &strategy)?;
    assert_eq!(strategy.calls(), 1);

    let shared = aggregation.shared_nodes();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].members(), &set_of(&graph, &[a, b, c]));
    assert_eq!(shared[0].plan().matched_triples().len(), 3);

    let x = shared[0].id();
    assert_eq!(aggregation.nodes(), &set_of(&graph, &[d, e, x]));
    assert_eq!(aggregation.paths().len(), 2);
    assert_eq!(aggregation.paths()[0].members(), &set_of(&graph, &[d, x]));
    assert_eq!(aggregation.paths()[1].members(), &set_of(&graph, &[e, x]));

    let reduced_graph = aggregation.reduced_graph(&graph);
    assert_eq!(reduced_graph.len(), 3);
    assert!(reduced_graph.is_connected(&reduced_graph.universe().full_set()));
    assert_eq!(aggregation.fragments(&graph).count(), 3);
    Ok(())
}

#[test]
fn test_star_shares_prefixes() -> DFResult<()> {
    // Two prefixes (a1 - b1, a2 - b2) lead to the middle m that continues to s1 or s2.
    let mut graph = JoinGraph::new([
        fragment("a1", &[triple("s1", "a1", "u1")]),
        fragment("b1", &[triple("u1", "b1", "m")]),
        fragment("a2", &[triple("s2", "a2", "u2")]),
        fragment("b2", &[triple("u2", "b2", "m")]),
        fragment("m", &[triple("m", "m", "n")]),
        fragment("s1", &[triple("n", "s1", "t1")]),
        fragment("s2", &[triple("n", "s2", "t2")]),
    ]);
    let ids = graph.universe().ids().collect::<Vec<_>>();
    let (a1, b1, a2, b2, m, s1, s2) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5], ids[6]);
    let paths = [
        path(&graph, &[a1, b1, m, s1]),
        path(&graph, &[a1, b1, m, s2]),
        path(&graph, &[a2, b2, m, s1]),
        path(&graph, &[a2, b2, m, s2]),
    ];
    let strategy = CountingStrategy::default();

    let aggregation = aggregate_paths(&mut graph, &paths, &strategy)?;
    assert_eq!(strategy.calls(), 2);

    let shared = aggregation.shared_nodes();
    assert_eq!(shared.len(), 2);
    assert_eq!(shared[0].members(), &set_of(&graph, &[a1, b1]));
    assert_eq!(shared[1].members(), &set_of(&graph, &[a2, b2]));

    let (x1, x2) = (shared[0].id(), shared[1].id());
    let reduced = aggregation
        .paths()
        .iter()
        .map(|path| path.members().clone())
        .collect::<Vec<_>>();
    assert_eq!(
        reduced,
        vec![
            set_of(&graph, &[x1, m, s1]),
            set_of(&graph, &[x1, m, s2]),
            set_of(&graph, &[x2, m, s1]),
            set_of(&graph, &[x2, m, s2]),
        ]
    );
    assert_eq!(aggregation.nodes(), &set_of(&graph, &[x1, x2, m, s1, s2]));
    Ok(())
}

#[test]
fn test_no_residual_overlap() -> DFResult<()> {
    let (mut graph, ids) = fork_graph();
    let (a, b, c, d, e) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
    let paths = [
        path(&graph, &[a, b, c, d]),
        path(&graph, &[a, b, c, e]),
        path(&graph, &[b, c, d]),
    ];

    let aggregation = aggregate_paths(&mut graph, &paths, &GreedyJoinOrder::default())?;
    for (i, lhs) in aggregation.shared_nodes().iter().enumerate() {
        assert!(lhs.members().is_disjoint(aggregation.nodes()));
        for rhs in &aggregation.shared_nodes()[i + 1..] {
            assert!(lhs.members().is_disjoint(rhs.members()));
        }
    }
    for path in aggregation.paths() {
        assert!(graph.is_connected(path.members()));
    }
    Ok(())
}

#[test]
fn test_partially_contained_shared_subset_is_split() -> DFResult<()> {
    // a - b - c - d and c - e. f joins a and b on ?v1.
    let mut graph = JoinGraph::new([
        fragment("a", &[triple("v0", "a", "v1")]),
        fragment("b", &[triple("v1", "b", "v2")]),
        fragment("c", &[triple("v2", "c", "v3")]),
        fragment("d", &[triple("v3", "d", "v4")]),
        fragment("e", &[triple("v3", "e", "v5")]),
        fragment("f", &[triple("v1", "f", "v6")]),
    ]);
    let ids = graph.universe().ids().collect::<Vec<_>>();
    let (a, b, c, d, e, f) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);
    let paths = [
        path(&graph, &[a, b, c, d]),
        path(&graph, &[a, b, c, e]),
        path(&graph, &[a, b, f]),
    ];
    let strategy = CountingStrategy::default();

    // The last path only contains {a, b} of {a, b, c}.
    let aggregation = aggregate_paths(&mut graph, &paths, &strategy)?;
    assert_eq!(strategy.calls(), 1);

    let shared = aggregation.shared_nodes();
    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].members(), &set_of(&graph, &[a, b]));

    let x = shared[0].id();
    let reduced = aggregation
        .paths()
        .iter()
        .map(|path| path.members().clone())
        .collect::<Vec<_>>();
    assert_eq!(
        reduced,
        vec![
            set_of(&graph, &[x, c, d]),
            set_of(&graph, &[x, c, e]),
            set_of(&graph, &[x, f]),
        ]
    );
    assert_eq!(aggregation.nodes(), &set_of(&graph, &[x, c, d, e, f]));
    assert!(shared[0].members().is_disjoint(aggregation.nodes()));
    Ok(())
}

#[test]
fn test_competing_shared_subsets_leave_no_residue() -> DFResult<()> {
    let (mut graph, ids) = fork_graph();
    let (a, b, c, d, e) = (ids[0], ids[1], ids[2], ids[3], ids[4]);
    let paths = [
        path(&graph, &[a, b, c]),
        path(&graph, &[a, b, c, d, e]),
        path(&graph, &[c, d, e]),
    ];
    let strategy = CountingStrategy::default();

    // {a, b, c} and {d, e} are shared, but c is also part of the last path.
    let aggregation = aggregate_paths(&mut graph, &paths, &strategy)?;
    assert_eq!(strategy.calls(), 2);

    let shared = aggregation.shared_nodes();
    assert_eq!(shared.len(), 2);
    assert_eq!(shared[0].members(), &set_of(&graph, &[a, b]));
    assert_eq!(shared[1].members(), &set_of(&graph, &[d, e]));

    let (x, y) = (shared[0].id(), shared[1].id());
    assert_eq!(aggregation.paths()[0].members(), &set_of(&graph, &[x, c]));
    assert_eq!(aggregation.paths()[1].members(), &set_of(&graph, &[x, c, y]));
    assert_eq!(aggregation.paths()[2].members(), &set_of(&graph, &[c, y]));
    assert_eq!(aggregation.nodes(), &set_of(&graph, &[x, c, y]));
    Ok(())
}

#[test]
fn test_unrelated_path_is_returned_unchanged() -> DFResult<()> {
    let (mut graph, ids) = fork_graph();
    let (a, b, c, d, e, f, g) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5], ids[6]);
    let paths = [
        path(&graph, &[a, b, c, d]),
        path(&graph, &[a, b, c, e]),
        path(&graph, &[f, g]),
    ];

    let aggregation = PathAggregator::default().aggregate(&mut graph, &paths)?;
    let reduced = aggregation.into_paths();
    assert!(!Arc::ptr_eq(&reduced[0], &paths[0]));
    assert!(!Arc::ptr_eq(&reduced[1], &paths[1]));
    assert!(Arc::ptr_eq(&reduced[2], &paths[2]));
    Ok(())
}

#[test]
fn test_empty_input() -> DFResult<()> {
    let (mut graph, _) = fork_graph();

    let aggregation = aggregate_paths(&mut graph, &[], &GreedyJoinOrder::default())?;
    assert!(aggregation.paths().is_empty());
    assert!(aggregation.shared_nodes().is_empty());
    assert!(aggregation.nodes().is_empty());
    assert!(aggregation.reduced_graph(&graph).is_empty());
    assert_eq!(graph.len(), 7);
    Ok(())
}

#[test]
fn test_single_input() -> DFResult<()> {
    let (mut graph, ids) = fork_graph();
    let paths = [path(&graph, &[ids[0], ids[1], ids[2]])];
    let strategy = CountingStrategy::default();

    let aggregation = aggregate_paths(&mut graph, &paths, &strategy)?;
    assert_eq!(strategy.calls(), 0);
    assert!(Arc::ptr_eq(&aggregation.paths()[0], &paths[0]));
    assert_eq!(aggregation.nodes(), paths[0].members());
    assert_eq!(graph.len(), 7);
    Ok(())
}
