use crate::plan::{JoinNode, PlanNode, SourceFragment};
use rdf_federation_model::{
    triple_pattern_variables, NamedNodePattern, TermPattern, TriplePattern, Variable,
};
use std::collections::BTreeSet;
use std::fmt::Debug;

/// Estimates the number of results of a [PlanNode].
///
/// The estimate is only used to compare alternatives. It is an abstract cost metric, not an
/// accurate cardinality.
pub trait CardinalityEstimator: Debug + Send + Sync {
    /// Returns the estimated number of results of `node`.
    fn estimate(&self, node: &PlanNode) -> usize;
}

/// Estimates cardinalities based on which positions of the matched triple patterns are bound.
///
/// This uses the heuristics from Oxigraph's join reordering. A variable that must be bound before
/// evaluating a fragment counts as a bound position, as the source only returns results for the
/// given bindings. Cardinality hints of the sources take precedence over the heuristics.
#[derive(Clone, Copy, Debug, Default)]
pub struct PatternHeuristicEstimator;

impl PatternHeuristicEstimator {
    /// Creates a new [PatternHeuristicEstimator].
    pub fn new() -> Self {
        Self
    }

    fn estimate_source(source: &SourceFragment) -> usize {
        if let Some(hint) = source.cardinality_hint() {
            return hint;
        }

        let properties = source.properties();
        let mut triples = properties.matched_triples.iter();
        let Some(first) = triples.next() else {
            return usize::MAX;
        };

        // Triples answered by the same source are treated like a join of the individual patterns.
        let mut cardinality = estimate_triple(first, &properties.required_inputs);
        let mut seen = triple_pattern_variables(first).collect::<BTreeSet<_>>();
        for triple in triples {
            let variables = triple_pattern_variables(triple).collect::<BTreeSet<_>>();
            let common_vars = seen.intersection(&variables).count();
            cardinality = join_cost(
                cardinality,
                estimate_triple(triple, &properties.required_inputs),
                common_vars,
            );
            seen.extend(variables);
        }
        cardinality
    }

    fn estimate_join(&self, join: &JoinNode) -> usize {
        join_cost(
            self.estimate(join.lhs()),
            self.estimate(join.rhs()),
            join.join_variables().len(),
        )
    }
}

impl CardinalityEstimator for PatternHeuristicEstimator {
    fn estimate(&self, node: &PlanNode) -> usize {
        match node {
            PlanNode::Source(source) => Self::estimate_source(source),
            PlanNode::Join(join) => self.estimate_join(join),
        }
    }
}

/// Estimates the cost of joining two inputs with `common_vars` shared variables.
#[allow(clippy::expect_used, reason = "Very unrealistic / impossible")]
fn join_cost(lhs: usize, rhs: usize, common_vars: usize) -> usize {
    let common_vars = common_vars
        .try_into()
        .expect("Unrealistically high variable count (> u32)");
    lhs.saturating_mul(rhs)
        .saturating_div(1_000_usize.saturating_pow(common_vars))
}

/// Estimates the cardinality of a single triple pattern.
fn estimate_triple(triple: &TriplePattern, bound_variables: &BTreeSet<Variable>) -> usize {
    let is_bound = |term: &TermPattern| match term {
        TermPattern::Variable(variable) => bound_variables.contains(variable),
        TermPattern::NamedNode(_) | TermPattern::Literal(_) => true,
        _ => false,
    };
    let subject_bound = is_bound(&triple.subject);
    let predicate_bound = match &triple.predicate {
        NamedNodePattern::NamedNode(_) => true,
        NamedNodePattern::Variable(variable) => bound_variables.contains(variable),
    };
    let object_bound = is_bound(&triple.object);

    match (subject_bound, predicate_bound, object_bound) {
        (true, true, true) => 1,
        (true, true, false) => 10,
        (true, false, true) => 2,
        (false, true, true) => 10_000,
        (true, false, false) => 100,
        (false, false, false) => 1_000_000_000,
        (false, true, false) => 1_000_000,
        (false, false, true) => 100_000,
    }
}
