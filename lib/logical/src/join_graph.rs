use crate::plan::{OpRef, PlanNode};
use crate::universe::{FragmentId, FragmentSet, Universe};
use std::collections::VecDeque;
use tracing::trace;

/// Returns true if `lhs` and `rhs` can be joined directly.
///
/// This is the case if one of them binds a variable that the other one binds or accepts as an
/// input. Whether all inputs can eventually be satisfied is not considered here, as this is a
/// property of a set of fragments and not of a single pair.
pub fn can_join(lhs: &PlanNode, rhs: &PlanNode) -> bool {
    let lhs_props = lhs.properties();
    let rhs_props = rhs.properties();
    lhs_props
        .result_variables
        .iter()
        .any(|v| rhs_props.mentions(v))
        || rhs_props
            .result_variables
            .iter()
            .any(|v| lhs_props.mentions(v))
}

/// The join graph over a [Universe] of plan nodes.
///
/// Two nodes are adjacent iff they can be joined directly (see [can_join]). The adjacency is
/// computed eagerly. Adding nodes recomputes the adjacency of all nodes instead of patching it.
///
/// The graph is read-only during planning, except for drivers that add the nodes of shared
/// sub-plans. Callers that share a graph between threads must not plan against it concurrently.
#[derive(Debug)]
pub struct JoinGraph {
    universe: Universe,
    adjacency: Vec<FragmentSet>,
}

impl JoinGraph {
    /// Creates a new [JoinGraph] over the given fragments.
    pub fn new(fragments: impl IntoIterator<Item = OpRef>) -> Self {
        let mut result = Self {
            universe: Universe::new(fragments),
            adjacency: Vec::new(),
        };
        result.recompute_adjacency();
        result
    }

    /// Returns the universe of this graph.
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.universe.len()
    }

    /// Returns true if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.universe.is_empty()
    }

    /// Returns the node at `id`.
    pub fn fragment(&self, id: FragmentId) -> &OpRef {
        self.universe.fragment(id)
    }

    /// Returns the nodes adjacent to `id`.
    pub fn neighbors(&self, id: FragmentId) -> &FragmentSet {
        assert!(
            id.index() < self.adjacency.len(),
            "Fragment {id} is not part of the join graph"
        );
        &self.adjacency[id.index()]
    }

    /// Returns the nodes that are adjacent to a member of `set` but not part of `set`.
    pub fn neighborhood(&self, set: &FragmentSet) -> FragmentSet {
        let mut result = self.universe.empty_set();
        for id in set.iter() {
            result = result.union(self.neighbors(id));
        }
        result.difference(set)
    }

    /// Returns the nodes of `allowed` that can be reached from `start` without leaving `allowed`.
    pub fn reachable(&self, start: FragmentId, allowed: &FragmentSet) -> FragmentSet {
        let mut visited = self.universe.set_of([start]).intersection(allowed);
        let mut queue = visited.iter().collect::<VecDeque<_>>();

        while let Some(node) = queue.pop_front() {
            let next = self
                .neighbors(node)
                .intersection(allowed)
                .difference(&visited);
            for id in next.iter() {
                visited.insert(id);
                queue.push_back(id);
            }
        }
        visited
    }

    /// Returns true if `set` is connected. Empty sets and singletons are connected.
    pub fn is_connected(&self, set: &FragmentSet) -> bool {
        match set.first() {
            None => true,
            Some(start) => self.reachable(start, set) == *set,
        }
    }

    /// Adds the given nodes and recomputes the adjacency of the graph.
    ///
    /// Returns the position of each node. Nodes that are already part of the graph keep their
    /// position. Existing [FragmentSet]s of this graph remain valid.
    pub fn add_fragments(&mut self, fragments: impl IntoIterator<Item = OpRef>) -> Vec<FragmentId> {
        let ids = fragments
            .into_iter()
            .map(|fragment| self.universe.push(fragment))
            .collect::<Vec<_>>();
        if self.adjacency.len() != self.universe.len() {
            self.recompute_adjacency();
        }
        ids
    }

    /// Adds a single node and recomputes the adjacency of the graph.
    ///
    /// See [JoinGraph::add_fragments].
    pub fn add_fragment(&mut self, fragment: OpRef) -> FragmentId {
        let id = self.universe.push(fragment);
        if self.adjacency.len() != self.universe.len() {
            self.recompute_adjacency();
        }
        id
    }

    /// Creates a new, independent graph that only contains the members of `set`.
    pub fn restrict(&self, set: &FragmentSet) -> JoinGraph {
        JoinGraph::new(self.universe.fragments_of(set).cloned())
    }

    /// Recomputes the adjacency of all nodes.
    fn recompute_adjacency(&mut self) {
        let fragments = self.universe.fragments();
        let ids = self.universe.ids().collect::<Vec<_>>();
        let mut adjacency = vec![self.universe.empty_set(); fragments.len()];
        for (i, lhs) in fragments.iter().enumerate() {
            for (j, rhs) in fragments.iter().enumerate().skip(i + 1) {
                if can_join(lhs, rhs) {
                    adjacency[i].insert(ids[j]);
                    adjacency[j].insert(ids[i]);
                }
            }
        }
        trace!("Recomputed the adjacency of {} join graph nodes", fragments.len());
        self.adjacency = adjacency;
    }
}
