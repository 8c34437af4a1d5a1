use crate::join_graph::JoinGraph;
use crate::join_order::{GreedyJoinOrder, JoinOrderStrategy};
use crate::plan::OpRef;
use crate::sharing::{assert_pairwise_disjoint, reduce_shared_subsets, SharedNode};
use crate::universe::FragmentSet;
use rdf_federation_common::{DFResult, PlannerOptions};
use std::sync::Arc;
use tracing::debug;

/// A complete candidate plan, i.e., a connected set of fragments that answers the whole query.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JoinPath {
    members: FragmentSet,
}

impl JoinPath {
    /// Creates a new [JoinPath].
    pub fn new(members: FragmentSet) -> Self {
        Self { members }
    }

    /// Returns the fragments of the path.
    pub fn members(&self) -> &FragmentSet {
        &self.members
    }

    /// Returns the number of fragments.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns true if the path has no fragments.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// The result of aggregating multiple [JoinPath]s.
#[derive(Debug)]
pub struct PathAggregation {
    nodes: FragmentSet,
    shared: Vec<SharedNode>,
    paths: Vec<Arc<JoinPath>>,
}

impl PathAggregation {
    /// Returns the nodes of the reduced join graph, i.e., the nodes of all reduced paths.
    pub fn nodes(&self) -> &FragmentSet {
        &self.nodes
    }

    /// Iterates over the nodes of the reduced join graph.
    pub fn fragments<'a>(&'a self, graph: &'a JoinGraph) -> impl Iterator<Item = &'a OpRef> {
        graph.universe().fragments_of(&self.nodes)
    }

    /// Returns the planned shared nodes.
    pub fn shared_nodes(&self) -> &[SharedNode] {
        &self.shared
    }

    /// Returns the reduced paths in the order of the input paths.
    pub fn paths(&self) -> &[Arc<JoinPath>] {
        &self.paths
    }

    /// Consumes the aggregation and returns the reduced paths.
    pub fn into_paths(self) -> Vec<Arc<JoinPath>> {
        self.paths
    }

    /// Creates a new, independent join graph that only contains the reduced nodes.
    pub fn reduced_graph(&self, graph: &JoinGraph) -> JoinGraph {
        graph.restrict(&self.nodes)
    }
}

/// Aggregates alternative [JoinPath]s such that sub-plans shared between them are planned once.
#[derive(Clone, Debug)]
pub struct PathAggregator {
    strategy: Arc<dyn JoinOrderStrategy>,
    options: PlannerOptions,
}

impl PathAggregator {
    /// Creates a new [PathAggregator].
    pub fn new(strategy: Arc<dyn JoinOrderStrategy>, options: PlannerOptions) -> Self {
        Self { strategy, options }
    }

    /// Aggregates `paths`. The shared nodes are added to `graph`.
    ///
    /// A path that shares no sub-plan with another path is returned unchanged (i.e., the same
    /// [Arc]).
    pub fn aggregate(
        &self,
        graph: &mut JoinGraph,
        paths: &[Arc<JoinPath>],
    ) -> DFResult<PathAggregation> {
        aggregate_with_options(graph, paths, self.strategy.as_ref(), &self.options)
    }
}

impl Default for PathAggregator {
    fn default() -> Self {
        Self::new(Arc::new(GreedyJoinOrder::default()), PlannerOptions::default())
    }
}

/// Aggregates `paths` with `strategy` and the default [PlannerOptions].
///
/// See [PathAggregator::aggregate].
pub fn aggregate_paths(
    graph: &mut JoinGraph,
    paths: &[Arc<JoinPath>],
    strategy: &dyn JoinOrderStrategy,
) -> DFResult<PathAggregation> {
    aggregate_with_options(graph, paths, strategy, &PlannerOptions::default())
}

fn aggregate_with_options(
    graph: &mut JoinGraph,
    paths: &[Arc<JoinPath>],
    strategy: &dyn JoinOrderStrategy,
    options: &PlannerOptions,
) -> DFResult<PathAggregation> {
    for path in paths {
        graph.universe().assert_member(path.members());
        if options.verify_invariants {
            assert!(
                graph.is_connected(path.members()),
                "Path {} is not connected",
                path.members()
            );
        }
    }

    let sets = paths
        .iter()
        .map(|path| path.members().clone())
        .collect::<Vec<_>>();
    let reduction = reduce_shared_subsets(graph, &sets, strategy)?;

    let mut nodes = graph.universe().empty_set();
    let reduced_paths = paths
        .iter()
        .zip(reduction.reduced)
        .map(|(path, reduced)| {
            nodes = nodes.union(&reduced);
            if *path.members() == reduced {
                Arc::clone(path)
            } else {
                Arc::new(JoinPath::new(reduced))
            }
        })
        .collect::<Vec<_>>();

    if options.verify_invariants {
        let shared_members = reduction
            .shared
            .iter()
            .map(SharedNode::members)
            .collect::<Vec<_>>();
        assert_pairwise_disjoint(shared_members.iter().copied());
        for members in shared_members {
            assert!(
                members.is_disjoint(&nodes),
                "The shared fragments {members} remain in the reduced graph"
            );
        }
        for path in &reduced_paths {
            assert!(
                graph.is_connected(path.members()),
                "Reduced path {} is not connected",
                path.members()
            );
        }
    }

    debug!(
        "Aggregated {} paths into {} nodes with {} shared nodes",
        reduced_paths.len(),
        nodes.len(),
        reduction.shared.len()
    );
    Ok(PathAggregation {
        nodes,
        shared: reduction.shared,
        paths: reduced_paths,
    })
}
