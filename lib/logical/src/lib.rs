mod aggregation;
mod bitset;
mod components;
mod conjunctive;
mod join_graph;
pub mod join_order;
pub mod plan;
mod sharing;
mod universe;

pub use aggregation::{aggregate_paths, JoinPath, PathAggregation, PathAggregator};
pub use bitset::{BitSet, Ones};
pub use components::{find_components, has_input_order, is_input_satisfied, unmet_inputs};
pub use conjunctive::{plan_conjunctive, ConjunctivePlanner};
pub use join_graph::{can_join, JoinGraph};
pub use sharing::{
    assert_pairwise_disjoint, find_shared_subsets, reduce_shared_subsets, SharedNode,
    SubsetReduction,
};
pub use universe::{FragmentId, FragmentSet, Universe, UniverseId};
