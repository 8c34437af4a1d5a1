use crate::test_utils::{fragment, lookup, triple, CountingStrategy};
use rdf_federation_common::{DFResult, PlannerOptions};
use rdf_federation_logical::join_order::{plan_subset, GreedyJoinOrder};
use rdf_federation_logical::plan::PlanNode;
use rdf_federation_logical::{find_components, plan_conjunctive, ConjunctivePlanner, JoinGraph};
use rdf_federation_model::ConjunctiveQuery;
use std::collections::HashSet;
use std::sync::Arc;

fn books_query() -> ConjunctiveQuery {
    ConjunctiveQuery::new([
        triple("book", "isbn", "isbn"),
        triple("isbn", "title", "title"),
        triple("book", "author", "author"),
    ])
}

fn books_graph() -> JoinGraph {
    JoinGraph::new([
        fragment(
            "library",
            &[triple("book", "isbn", "isbn"), triple("book", "author", "author")],
        ),
        fragment("catalog", &[triple("book", "isbn", "isbn")]),
        fragment("authors", &[triple("book", "author", "author")]),
        lookup("api", triple("isbn", "title", "title"), "isbn"),
        fragment("dump", &[triple("isbn", "title", "title")]),
    ])
}

#[test]
fn test_plan_bind_join() -> DFResult<()> {
    let mut graph = JoinGraph::new([
        fragment(
            "library",
            &[triple("book", "isbn", "isbn"), triple("book", "author", "author")],
        ),
        lookup("api", triple("isbn", "title", "title"), "isbn"),
    ]);

    let plans = ConjunctivePlanner::default().plan(&mut graph, &books_query())?;
    assert_eq!(plans.len(), 1);
    insta::assert_snapshot!(plans[0], @r"
    Join: Bind on ?isbn
      Source[library]: ?book <http://example.com/isbn> ?isbn . ?book <http://example.com/author> ?author
      Source[api]: ?isbn <http://example.com/title> ?title requires ?isbn
    ");
    Ok(())
}

#[test]
fn test_shared_subplans_are_planned_once() -> DFResult<()> {
    let mut graph = books_graph();
    let strategy = CountingStrategy::default();

    let plans = plan_conjunctive(&mut graph, &books_query(), &strategy)?;
    assert_eq!(plans.len(), 4);
    // {catalog, authors} is shared by two components.
    assert_eq!(graph.len(), 6);
    let shared = Arc::clone(&graph.universe().fragments()[5]);

    let using_shared = plans
        .iter()
        .filter(|plan| match plan.as_ref() {
            PlanNode::Join(join) => {
                Arc::ptr_eq(join.lhs(), &shared) || Arc::ptr_eq(join.rhs(), &shared)
            }
            PlanNode::Source(_) => false,
        })
        .count();
    assert_eq!(using_shared, 2);
    // One call for the shared subset and one per component.
    assert_eq!(strategy.calls(), 5);
    Ok(())
}

#[test]
fn test_sharing_can_be_disabled() -> DFResult<()> {
    let mut graph = books_graph();
    let planner = ConjunctivePlanner::new(
        Arc::new(GreedyJoinOrder::default()),
        PlannerOptions::default().with_share_subplans(false),
    );

    let plans = planner.plan(&mut graph, &books_query())?;
    assert_eq!(plans.len(), 4);
    assert_eq!(graph.len(), 5);
    Ok(())
}

#[test]
fn test_planning_is_idempotent() -> DFResult<()> {
    let graph = books_graph();
    let strategy = GreedyJoinOrder::default();

    for component in find_components(&graph, &books_query()) {
        let first = plan_subset(&strategy, &graph, &component)?.unwrap();
        let second = plan_subset(&strategy, &graph, &component)?.unwrap();

        assert_eq!(
            first.matched_triples().iter().collect::<HashSet<_>>(),
            second.matched_triples().iter().collect::<HashSet<_>>()
        );
        assert_eq!(first.result_variables(), second.result_variables());
        assert_eq!(first.matched_triples().len(), 3);
    }
    Ok(())
}

#[test]
fn test_cyclic_inputs_are_dropped() -> DFResult<()> {
    // Both sources need the result of the other one.
    let mut graph = JoinGraph::new([
        lookup("a", triple("x", "p", "y"), "x"),
        lookup("b", triple("y", "q", "x"), "y"),
    ]);
    let query = ConjunctiveQuery::new([triple("x", "p", "y"), triple("y", "q", "x")]);

    assert_eq!(find_components(&graph, &query).len(), 1);
    let plans = plan_conjunctive(&mut graph, &query, &GreedyJoinOrder::default())?;
    assert!(plans.is_empty());
    Ok(())
}

#[test]
fn test_shared_subset_must_not_depend_on_its_own_results() -> DFResult<()> {
    // {a, c} is shared by both components. Its plan needs ?y from b while b needs ?x from it.
    let query = ConjunctiveQuery::new([
        triple("x", "pa", "z"),
        triple("x", "pb", "y"),
        triple("y", "pc", "z"),
    ]);
    let mut graph = JoinGraph::new([
        fragment("a", &[triple("x", "pa", "z")]),
        lookup("b", triple("x", "pb", "y"), "x"),
        lookup("b2", triple("x", "pb", "y"), "x"),
        lookup("c", triple("y", "pc", "z"), "y"),
    ]);
    let strategy = Arc::new(CountingStrategy::default());
    let planner = ConjunctivePlanner::new(
        Arc::<CountingStrategy>::clone(&strategy),
        PlannerOptions::default().with_verify_invariants(true),
    );

    assert_eq!(find_components(&graph, &query).len(), 2);
    let plans = planner.plan(&mut graph, &query)?;
    assert_eq!(plans.len(), 2);
    assert_eq!(graph.len(), 4);
    // One call for the dropped shared subset and one per component.
    assert_eq!(strategy.calls(), 3);
    for plan in &plans {
        assert!(plan.required_inputs().is_empty());
        assert_eq!(plan.matched_triples().len(), 3);
    }
    Ok(())
}

#[test]
fn test_empty_query() -> DFResult<()> {
    let mut graph = books_graph();

    let plans = ConjunctivePlanner::default().plan(&mut graph, &ConjunctiveQuery::default())?;
    assert!(plans.is_empty());
    Ok(())
}
