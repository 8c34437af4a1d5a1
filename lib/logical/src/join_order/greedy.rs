use crate::join_graph::{can_join, JoinGraph};
use crate::join_order::{CardinalityEstimator, JoinOrderStrategy, PatternHeuristicEstimator};
use crate::plan::{JoinNode, OpRef, PlanNode};
use crate::universe::FragmentSet;
use rdf_federation_common::DFResult;
use rdf_federation_model::Variable;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace};

/// Joins "cheap" fragments first and pushes "expensive" fragments to the right side.
///
/// The first fragment is the cheapest fragment that can be evaluated without inputs from the
/// other fragments. Afterward, the cheapest fragment that is ready and shares a variable with the
/// current plan is joined. A fragment is ready once all of its required inputs that are produced
/// within the subset are bound by the current plan. Required inputs that no fragment of the
/// subset produces remain inputs of the resulting plan.
///
/// If the subset is connected but no fragment sharing a variable is ready, the cheapest ready
/// fragment is joined without a shared variable. If no fragment is ready at all, the subset
/// cannot be planned (e.g., two fragments that require each other's results).
#[derive(Clone, Debug)]
pub struct GreedyJoinOrder {
    estimator: Arc<dyn CardinalityEstimator>,
}

impl GreedyJoinOrder {
    /// Creates a new [GreedyJoinOrder] that uses `estimator` to compare fragments.
    pub fn new(estimator: Arc<dyn CardinalityEstimator>) -> Self {
        Self { estimator }
    }

    /// Finds the next fragment with the least cost.
    fn pop_next_greedy(
        &self,
        to_order: &mut Vec<OpRef>,
        current: &PlanNode,
        produced: &BTreeSet<Variable>,
    ) -> Option<OpRef> {
        let mut best: Option<(usize, bool, usize)> = None;
        for (i, fragment) in to_order.iter().enumerate() {
            if !is_ready(fragment, produced, current.result_variables()) {
                continue;
            }

            let connected = can_join(current, fragment);
            let cost = self.estimator.estimate(fragment);
            // Prefer fragments that share a variable with the plan, then the cheaper one.
            let is_better = best.map_or(true, |(_, best_connected, best_cost)| {
                (connected, best_cost) > (best_connected, cost)
            });
            if is_better {
                best = Some((i, connected, cost));
            }
        }

        let (idx, _, _) = best?;
        Some(to_order.remove(idx))
    }
}

impl Default for GreedyJoinOrder {
    fn default() -> Self {
        Self::new(Arc::new(PatternHeuristicEstimator::new()))
    }
}

impl JoinOrderStrategy for GreedyJoinOrder {
    fn name(&self) -> &str {
        "greedy"
    }

    fn plan(&self, graph: &JoinGraph, subset: &FragmentSet) -> DFResult<Option<OpRef>> {
        let mut to_order = graph
            .universe()
            .fragments_of(subset)
            .cloned()
            .collect::<Vec<_>>();
        let produced = to_order
            .iter()
            .flat_map(|fragment| fragment.result_variables())
            .cloned()
            .collect::<BTreeSet<_>>();

        let no_bindings = BTreeSet::new();
        let first = to_order
            .iter()
            .enumerate()
            .filter(|(_, fragment)| is_ready(fragment, &produced, &no_bindings))
            .map(|(i, fragment)| (i, self.estimator.estimate(fragment)))
            .min_by_key(|&(_, cost)| cost);
        let Some((first_idx, _)) = first else {
            debug!("No fragment of {subset} can be evaluated first");
            return Ok(None);
        };

        let mut current_plan = to_order.remove(first_idx);
        while !to_order.is_empty() {
            let Some(next) = self.pop_next_greedy(&mut to_order, &current_plan, &produced) else {
                debug!(
                    "The inputs of {} fragments of {subset} can never be bound",
                    to_order.len()
                );
                return Ok(None);
            };
            trace!("Joining {next} into the plan of {subset}");
            current_plan = Arc::new(JoinNode::try_new(current_plan, next)?.into());
        }

        Ok(Some(current_plan))
    }
}

/// Returns true if every required input of `fragment` that is produced within the subset is
/// already bound.
fn is_ready(
    fragment: &PlanNode,
    produced: &BTreeSet<Variable>,
    bound: &BTreeSet<Variable>,
) -> bool {
    fragment
        .required_inputs()
        .iter()
        .all(|v| !produced.contains(v) || bound.contains(v))
}
