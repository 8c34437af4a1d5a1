use crate::bitset::BitSet;
use crate::join_graph::JoinGraph;
use crate::plan::PlanNode;
use crate::universe::{FragmentId, FragmentSet};
use rdf_federation_model::{ConjunctiveQuery, Variable};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Finds all components of `graph` that answer `query`.
///
/// A component is a set of fragments that
/// - matches every triple pattern of the query exactly once (no two members match the same
///   triple pattern),
/// - is connected in the join graph, and
/// - is input-satisfied, i.e., the required inputs of every member are bound by the other members.
///
/// Fragments that match a triple pattern that is not part of the query never participate in a
/// component. The components are returned in the order they are discovered and contain no
/// duplicates. Each component is an alternative plan for the whole query.
pub fn find_components(graph: &JoinGraph, query: &ConjunctiveQuery) -> Vec<FragmentSet> {
    if query.is_empty() {
        return Vec::new();
    }
    let components = ComponentSearch::new(graph, query).run();
    debug!(
        "Found {} components for {} fragments and {} triple patterns",
        components.len(),
        graph.len(),
        query.len()
    );
    components
}

/// Returns the required inputs of the members of `set` that are not bound by another member.
pub fn unmet_inputs(graph: &JoinGraph, set: &FragmentSet) -> BTreeSet<Variable> {
    let mut unmet = BTreeSet::new();
    for id in set.iter() {
        for variable in graph.fragment(id).required_inputs() {
            let is_bound = set.iter().any(|other| {
                other != id && graph.fragment(other).result_variables().contains(variable)
            });
            if !is_bound {
                unmet.insert(variable.clone());
            }
        }
    }
    unmet
}

/// Returns true if the required inputs of every member of `set` are bound by another member.
pub fn is_input_satisfied(graph: &JoinGraph, set: &FragmentSet) -> bool {
    unmet_inputs(graph, set).is_empty()
}

/// Returns true if `fragments` can be joined in an order in which every required input that is
/// bound by one of them is bound before it is needed.
///
/// Input satisfaction alone does not imply this. For example, two fragments that require each
/// other's results are input-satisfied but cannot be ordered. Required inputs that no fragment
/// binds are ignored, as they remain inputs of the joined plan.
pub fn has_input_order<'a>(fragments: impl IntoIterator<Item = &'a PlanNode>) -> bool {
    let mut pending = fragments.into_iter().collect::<Vec<_>>();
    let produced = pending
        .iter()
        .flat_map(|fragment| fragment.result_variables())
        .cloned()
        .collect::<BTreeSet<_>>();

    let mut bound = BTreeSet::new();
    while !pending.is_empty() {
        let ready = pending.iter().position(|fragment| {
            fragment
                .required_inputs()
                .iter()
                .all(|v| !produced.contains(v) || bound.contains(v))
        });
        let Some(ready) = ready else {
            return false;
        };
        let fragment = pending.swap_remove(ready);
        bound.extend(fragment.result_variables().iter().cloned());
    }
    true
}

/// A state of the component search.
struct SearchState {
    members: FragmentSet,
    /// The positions of the query triple patterns matched by the members.
    covered: BitSet,
    unmet: BTreeSet<Variable>,
}

/// Depth-first enumeration of the fragment sets that can grow into components.
///
/// Every fragment set is visited at most once, regardless of the start fragment and the order in
/// which its members were added.
struct ComponentSearch<'graph> {
    graph: &'graph JoinGraph,
    /// The positions of all triple patterns of the query.
    target: BitSet,
    /// The triple patterns of the query matched by each fragment. `None` if the fragment cannot
    /// participate in a component.
    coverage: Vec<Option<BitSet>>,
    /// The fragments that bind a variable.
    producers: FxHashMap<Variable, FragmentSet>,
}

impl<'graph> ComponentSearch<'graph> {
    fn new(graph: &'graph JoinGraph, query: &ConjunctiveQuery) -> Self {
        let universe = graph.universe();
        let coverage = universe
            .fragments()
            .iter()
            .map(|fragment| {
                fragment
                    .matched_triples()
                    .iter()
                    .map(|triple| query.position(triple))
                    .collect::<Option<BitSet>>()
                    .filter(|covered| !covered.is_empty())
            })
            .collect::<Vec<_>>();

        let mut producers: FxHashMap<Variable, FragmentSet> = FxHashMap::default();
        for id in universe.ids() {
            if coverage[id.index()].is_none() {
                continue;
            }
            for variable in universe.fragment(id).result_variables() {
                producers
                    .entry(variable.clone())
                    .or_insert_with(|| universe.empty_set())
                    .insert(id);
            }
        }

        Self {
            graph,
            target: BitSet::with_range(query.len()),
            coverage,
            producers,
        }
    }

    fn run(&self) -> Vec<FragmentSet> {
        let mut visited = FxHashSet::default();
        let mut components = Vec::new();

        for start in self.graph.universe().ids() {
            let Some(state) = self.start_state(start) else {
                continue;
            };
            if !visited.insert(state.members.clone()) {
                continue;
            }

            let mut stack = vec![state];
            while let Some(state) = stack.pop() {
                if state.covered == self.target && state.unmet.is_empty() {
                    trace!("Found component {}", state.members);
                    components.push(state.members);
                    continue;
                }

                if !self.can_become_final(&state) {
                    trace!(
                        "Discarding {}, the inputs {:?} can never be bound",
                        state.members,
                        state.unmet
                    );
                    continue;
                }

                for candidate in self.graph.neighborhood(&state.members).iter() {
                    let Some(covered) = self.successor_coverage(&state, candidate) else {
                        continue;
                    };
                    let members = state.members.with(candidate);
                    if !visited.insert(members.clone()) {
                        continue;
                    }
                    let unmet = unmet_inputs(self.graph, &members);
                    stack.push(SearchState {
                        members,
                        covered,
                        unmet,
                    });
                }
            }
        }

        components
    }

    fn start_state(&self, start: FragmentId) -> Option<SearchState> {
        let covered = self.coverage[start.index()].clone()?;
        let members = self.graph.universe().set_of([start]);
        let unmet = unmet_inputs(self.graph, &members);
        Some(SearchState {
            members,
            covered,
            unmet,
        })
    }

    /// Returns the coverage of `state` after adding `candidate`, or `None` if `candidate` cannot be
    /// added.
    fn successor_coverage(&self, state: &SearchState, candidate: FragmentId) -> Option<BitSet> {
        let coverage = self.coverage[candidate.index()].as_ref()?;
        coverage
            .is_disjoint(&state.covered)
            .then(|| state.covered.union(coverage))
    }

    /// Returns false if an unmet input of `state` can not be bound by any fragment that could
    /// still be added.
    fn can_become_final(&self, state: &SearchState) -> bool {
        state.unmet.iter().all(|variable| {
            self.producers.get(variable).is_some_and(|producers| {
                producers.difference(&state.members).iter().any(|producer| {
                    self.coverage[producer.index()]
                        .as_ref()
                        .is_some_and(|coverage| coverage.is_disjoint(&state.covered))
                })
            })
        })
    }
}
