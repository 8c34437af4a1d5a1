use crate::components::has_input_order;
use crate::join_graph::JoinGraph;
use crate::join_order::{plan_subset, JoinOrderStrategy};
use crate::plan::OpRef;
use crate::universe::{FragmentId, FragmentSet};
use itertools::Itertools;
use rdf_federation_common::DFResult;
use std::iter;
use std::sync::Arc;
use tracing::debug;

/// A subset shared by multiple fragment sets that has been planned once.
#[derive(Clone, Debug)]
pub struct SharedNode {
    members: FragmentSet,
    id: FragmentId,
    plan: OpRef,
}

impl SharedNode {
    /// Returns the fragments that are replaced by this node.
    pub fn members(&self) -> &FragmentSet {
        &self.members
    }

    /// Returns the position of the planned node in the join graph.
    pub fn id(&self) -> FragmentId {
        self.id
    }

    /// Returns the plan of the shared fragments.
    pub fn plan(&self) -> &OpRef {
        &self.plan
    }
}

/// The result of [reduce_shared_subsets].
#[derive(Debug)]
pub struct SubsetReduction {
    /// The planned shared subsets. Their members are pairwise disjoint.
    pub shared: Vec<SharedNode>,
    /// The input sets, with every contained shared subset replaced by its node.
    pub reduced: Vec<FragmentSet>,
}

/// Finds the subsets that are shared between the given fragment sets.
///
/// Every shared subset is the (possibly shrunk) intersection of two sets, has at least two members,
/// and is connected. The returned subsets are pairwise disjoint. Overlapping candidates are
/// resolved by keeping the larger one if the fragments that only it contains are connected. The
/// smaller one then loses the overlapping fragments. Otherwise, the smaller one is kept and the
/// larger one is dropped.
pub fn find_shared_subsets(graph: &JoinGraph, sets: &[FragmentSet]) -> Vec<FragmentSet> {
    let mut shared = Vec::new();
    for (lhs, rhs) in sets.iter().tuple_combinations() {
        let overlap = lhs.intersection(rhs);
        if overlap.len() < 2 || !graph.is_connected(&overlap) {
            continue;
        }
        record_shared_subset(graph, &mut shared, overlap);
    }
    shared
}

/// Plans every subset shared between `sets` once and substitutes the planned nodes.
///
/// The planned nodes are added to `graph`. A shared subset is only substituted into sets that
/// contain all of its members, so the shared subsets of [find_shared_subsets] are first split
/// until no set contains only a part of them. A shared subset is dropped, and the sets keep the
/// original fragments, if
/// - it cannot be planned, or
/// - its plan needs an input that is bound by the rest of a set while also binding an input of
///   that rest, i.e., the set could no longer be ordered.
pub fn reduce_shared_subsets(
    graph: &mut JoinGraph,
    sets: &[FragmentSet],
    strategy: &dyn JoinOrderStrategy,
) -> DFResult<SubsetReduction> {
    let mut candidates = Vec::new();
    for members in find_shared_subsets(graph, sets) {
        candidates.extend(split_by_sets(graph, &members, sets));
    }

    let mut shared = Vec::new();
    let mut reduced = sets.to_vec();
    for members in candidates {
        let Some(plan) = plan_subset(strategy, graph, &members)? else {
            debug!("Dropping shared subset {members}, it cannot be planned");
            continue;
        };
        if !preserves_input_order(graph, &reduced, &members, &plan) {
            debug!("Dropping shared subset {members}, its inputs would depend on its own results");
            continue;
        }

        let id = graph.add_fragment(Arc::clone(&plan));
        for set in &mut reduced {
            if members.is_subset(set) {
                *set = set.difference(&members).with(id);
            }
        }
        shared.push(SharedNode { members, id, plan });
    }

    debug!(
        "Planned {} shared subsets for {} fragment sets",
        shared.len(),
        sets.len()
    );
    Ok(SubsetReduction { shared, reduced })
}

/// Panics if two of the given sets share a fragment.
pub fn assert_pairwise_disjoint<'set>(sets: impl IntoIterator<Item = &'set FragmentSet>) {
    let sets = sets.into_iter().collect::<Vec<_>>();
    for (lhs, rhs) in sets.iter().tuple_combinations() {
        assert!(
            lhs.is_disjoint(rhs),
            "The fragment sets {lhs} and {rhs} overlap"
        );
    }
}

/// Splits `members` into groups of fragments that are contained in the same sets.
///
/// Every set contains either all members of a group or none of them. Groups with less than two
/// members or that are not connected are dropped.
fn split_by_sets(
    graph: &JoinGraph,
    members: &FragmentSet,
    sets: &[FragmentSet],
) -> Vec<FragmentSet> {
    let mut groups: Vec<(Vec<bool>, FragmentSet)> = Vec::new();
    for id in members.iter() {
        let containing = sets.iter().map(|set| set.contains(id)).collect::<Vec<_>>();
        match groups.iter_mut().find(|(other, _)| *other == containing) {
            Some((_, group)) => {
                group.insert(id);
            }
            None => groups.push((containing, graph.universe().set_of([id]))),
        }
    }

    if groups.len() > 1 {
        debug!(
            "Splitting shared subset {members} into {} groups, some sets contain only a part of it",
            groups.len()
        );
    }
    groups
        .into_iter()
        .map(|(_, group)| group)
        .filter(|group| group.len() >= 2 && graph.is_connected(group))
        .collect()
}

/// Returns true if every set that contains `members` and could be ordered before can still be
/// ordered after replacing `members` with `plan`.
fn preserves_input_order(
    graph: &JoinGraph,
    sets: &[FragmentSet],
    members: &FragmentSet,
    plan: &OpRef,
) -> bool {
    let universe = graph.universe();
    sets.iter()
        .filter(|set| members.is_subset(set))
        .all(|set| {
            let rest = set.difference(members);
            let substituted = universe
                .fragments_of(&rest)
                .map(|fragment| fragment.as_ref())
                .chain(iter::once(plan.as_ref()));
            has_input_order(substituted)
                || !has_input_order(universe.fragments_of(set).map(|fragment| fragment.as_ref()))
        })
}

/// Adds `candidate` to `shared` while keeping the shared subsets pairwise disjoint.
fn record_shared_subset(graph: &JoinGraph, shared: &mut Vec<FragmentSet>, candidate: FragmentSet) {
    let mut candidate = candidate;
    let mut i = 0;
    while i < shared.len() {
        if shared[i].is_disjoint(&candidate) {
            i += 1;
            continue;
        }
        if shared[i] == candidate {
            return;
        }

        let (existing, remaining) = resolve_overlap(graph, &shared[i], &candidate);
        match existing {
            Some(existing) => {
                shared[i] = existing;
                i += 1;
            }
            None => {
                shared.remove(i);
            }
        }
        match remaining {
            Some(remaining) => candidate = remaining,
            None => {
                debug!("Discarding shared subset candidate {candidate}");
                return;
            }
        }
    }
    shared.push(candidate);
}

/// Resolves the overlap of two shared subset candidates and returns what remains of them.
///
/// If both have the same size, `existing` is considered to be the larger one.
fn resolve_overlap(
    graph: &JoinGraph,
    existing: &FragmentSet,
    candidate: &FragmentSet,
) -> (Option<FragmentSet>, Option<FragmentSet>) {
    let existing_is_larger = existing.len() >= candidate.len();
    let (larger, smaller) = if existing_is_larger {
        (existing, candidate)
    } else {
        (candidate, existing)
    };
    let overlap = larger.intersection(smaller);

    // A contained candidate has no remainder and is absorbed by the larger one.
    let (larger, smaller) = if graph.is_connected(&larger.difference(&overlap)) {
        let rest = smaller.difference(&overlap);
        let smaller = (rest.len() >= 2 && graph.is_connected(&rest)).then_some(rest);
        (Some(larger.clone()), smaller)
    } else {
        (None, Some(smaller.clone()))
    };

    if existing_is_larger {
        (larger, smaller)
    } else {
        (smaller, larger)
    }
}
