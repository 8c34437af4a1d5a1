use crate::components::{find_components, is_input_satisfied};
use crate::join_graph::JoinGraph;
use crate::join_order::{plan_subset, verify_plan, GreedyJoinOrder, JoinOrderStrategy};
use crate::plan::OpRef;
use crate::sharing::{assert_pairwise_disjoint, reduce_shared_subsets};
use crate::universe::FragmentSet;
use rdf_federation_common::{DFResult, PlannerOptions};
use rdf_federation_model::ConjunctiveQuery;
use std::sync::Arc;
use tracing::debug;

/// Plans a [ConjunctiveQuery] over the fragments of a [JoinGraph].
///
/// Planning is done in three steps:
/// - Finding the components of the join graph that answer the query.
/// - Planning the sub-plans that are shared between the components once (if enabled).
/// - Ordering the joins of every component with the [JoinOrderStrategy].
///
/// Each resulting plan answers the whole query. Callers combine the plans, e.g., with a union.
#[derive(Clone, Debug)]
pub struct ConjunctivePlanner {
    strategy: Arc<dyn JoinOrderStrategy>,
    options: PlannerOptions,
}

impl ConjunctivePlanner {
    /// Creates a new [ConjunctivePlanner].
    pub fn new(strategy: Arc<dyn JoinOrderStrategy>, options: PlannerOptions) -> Self {
        Self { strategy, options }
    }

    /// Returns the join-order strategy.
    pub fn strategy(&self) -> &dyn JoinOrderStrategy {
        self.strategy.as_ref()
    }

    /// Returns the options.
    pub fn options(&self) -> &PlannerOptions {
        &self.options
    }

    /// Plans `query`. Shared sub-plans are added to `graph`.
    ///
    /// Components that cannot be planned are dropped. If no component can be planned, the
    /// result is empty.
    pub fn plan(&self, graph: &mut JoinGraph, query: &ConjunctiveQuery) -> DFResult<Vec<OpRef>> {
        plan_with_options(graph, query, self.strategy.as_ref(), &self.options)
    }
}

impl Default for ConjunctivePlanner {
    fn default() -> Self {
        Self::new(Arc::new(GreedyJoinOrder::default()), PlannerOptions::default())
    }
}

/// Plans `query` with `strategy` and the default [PlannerOptions].
///
/// See [ConjunctivePlanner::plan].
pub fn plan_conjunctive(
    graph: &mut JoinGraph,
    query: &ConjunctiveQuery,
    strategy: &dyn JoinOrderStrategy,
) -> DFResult<Vec<OpRef>> {
    plan_with_options(graph, query, strategy, &PlannerOptions::default())
}

fn plan_with_options(
    graph: &mut JoinGraph,
    query: &ConjunctiveQuery,
    strategy: &dyn JoinOrderStrategy,
    options: &PlannerOptions,
) -> DFResult<Vec<OpRef>> {
    let mut components = find_components(graph, query);
    if options.verify_invariants {
        assert_valid_components(graph, &components);
    }

    if options.share_subplans && components.len() > 1 {
        let reduction = reduce_shared_subsets(graph, &components, strategy)?;
        if options.verify_invariants {
            assert_pairwise_disjoint(reduction.shared.iter().map(|node| node.members()));
            assert_valid_components(graph, &reduction.reduced);
        }
        components = reduction.reduced;
    }

    let mut plans = Vec::with_capacity(components.len());
    for component in &components {
        let Some(plan) = plan_subset(strategy, graph, component)? else {
            debug!("Dropping component {component}, it cannot be planned");
            continue;
        };
        if options.verify_invariants {
            verify_plan(graph, component, &plan)?;
        }
        plans.push(plan);
    }

    debug!(
        "Planned {} of {} components with strategy '{}'",
        plans.len(),
        components.len(),
        strategy.name()
    );
    Ok(plans)
}

fn assert_valid_components(graph: &JoinGraph, components: &[FragmentSet]) {
    for component in components {
        assert!(
            graph.is_connected(component),
            "Component {component} is not connected"
        );
        assert!(
            is_input_satisfied(graph, component),
            "Component {component} is not input-satisfied"
        );
    }
}
