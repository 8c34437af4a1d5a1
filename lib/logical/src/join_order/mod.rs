mod estimator;
mod greedy;

pub use estimator::*;
pub use greedy::*;

use crate::join_graph::JoinGraph;
use crate::plan::{collect_sources, OpRef, SourceFragment};
use crate::universe::FragmentSet;
use datafusion::common::internal_err;
use rdf_federation_common::DFResult;
use rustc_hash::FxHashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Turns a connected, input-satisfied set of fragments into a join tree.
///
/// Implementations must be a pure function of the graph and the subset. The returned plan must
/// join exactly the fragments of the subset, each of them once.
pub trait JoinOrderStrategy: Debug + Send + Sync {
    /// Returns the name of the strategy.
    fn name(&self) -> &str;

    /// Plans the join of the fragments in `subset`.
    ///
    /// Returns `None` if the fragments cannot be ordered such that every required input is bound
    /// before it is needed. Errors are reserved for unexpected failures.
    fn plan(&self, graph: &JoinGraph, subset: &FragmentSet) -> DFResult<Option<OpRef>>;
}

/// Plans `subset` with `strategy`. A singleton subset is returned as-is without consulting the
/// strategy.
///
/// Panics if `subset` is empty or does not belong to the universe of `graph`.
pub fn plan_subset(
    strategy: &dyn JoinOrderStrategy,
    graph: &JoinGraph,
    subset: &FragmentSet,
) -> DFResult<Option<OpRef>> {
    graph.universe().assert_member(subset);
    assert!(!subset.is_empty(), "Cannot plan an empty set of fragments");
    match subset.len() {
        1 => Ok(subset.first().map(|id| Arc::clone(graph.fragment(id)))),
        _ => strategy.plan(graph, subset),
    }
}

/// Checks that `plan` joins exactly the source fragments of the members of `subset`.
pub fn verify_plan(graph: &JoinGraph, subset: &FragmentSet, plan: &OpRef) -> DFResult<()> {
    let mut expected: FxHashMap<&SourceFragment, isize> = FxHashMap::default();
    for fragment in graph.universe().fragments_of(subset) {
        for source in collect_sources(fragment)? {
            *expected.entry(source).or_default() += 1;
        }
    }
    for source in collect_sources(plan)? {
        *expected.entry(source).or_default() -= 1;
    }

    if let Some((source, _)) = expected.iter().find(|(_, count)| **count != 0) {
        return internal_err!(
            "The plan for {subset} does not join each fragment exactly once, e.g., {source}"
        );
    }
    Ok(())
}
