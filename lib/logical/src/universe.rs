use crate::bitset::BitSet;
use crate::plan::{OpRef, PlanNode};
use rustc_hash::FxHashMap;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_UNIVERSE_ID: AtomicU64 = AtomicU64::new(0);

/// Identifies a [Universe].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UniverseId(u64);

/// The position of a fragment within its [Universe].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FragmentId(usize);

impl FragmentId {
    /// Returns the position as an index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for FragmentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An order-stable, deduplicated sequence of plan nodes.
///
/// Every node is assigned a small integer at the time it is added, which is what [FragmentSet]s
/// are built upon. Nodes are compared by value, so adding an equal node twice returns the position
/// of the first one. A universe can only grow: positions never change, and sets created before a
/// growth remain valid afterward.
pub struct Universe {
    id: UniverseId,
    fragments: Vec<OpRef>,
    positions: FxHashMap<OpRef, FragmentId>,
}

impl Universe {
    /// Creates a new [Universe] with a fresh identity.
    pub fn new(fragments: impl IntoIterator<Item = OpRef>) -> Self {
        let mut result = Self {
            id: UniverseId(NEXT_UNIVERSE_ID.fetch_add(1, Ordering::Relaxed)),
            fragments: Vec::new(),
            positions: FxHashMap::default(),
        };
        for fragment in fragments {
            result.push(fragment);
        }
        result
    }

    /// Returns the identity of this universe.
    pub fn id(&self) -> UniverseId {
        self.id
    }

    /// Returns the number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns true if the universe has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Returns all fragments ordered by their position.
    pub fn fragments(&self) -> &[OpRef] {
        &self.fragments
    }

    /// Returns the fragment at `id`.
    ///
    /// Panics if `id` does not belong to this universe.
    pub fn fragment(&self, id: FragmentId) -> &OpRef {
        assert!(
            id.0 < self.fragments.len(),
            "Fragment {id} is not part of a universe with {} fragments",
            self.fragments.len()
        );
        &self.fragments[id.0]
    }

    /// Returns the position of a fragment equal to `fragment`.
    pub fn position(&self, fragment: &PlanNode) -> Option<FragmentId> {
        self.positions.get(fragment).copied()
    }

    /// Iterates over all positions.
    pub fn ids(&self) -> impl Iterator<Item = FragmentId> {
        (0..self.fragments.len()).map(FragmentId)
    }

    /// Returns an empty set of this universe.
    pub fn empty_set(&self) -> FragmentSet {
        FragmentSet {
            universe: self.id,
            bits: BitSet::new(),
        }
    }

    /// Returns the set of all fragments.
    pub fn full_set(&self) -> FragmentSet {
        FragmentSet {
            universe: self.id,
            bits: BitSet::with_range(self.fragments.len()),
        }
    }

    /// Returns the set of the given positions.
    pub fn set_of(&self, ids: impl IntoIterator<Item = FragmentId>) -> FragmentSet {
        let mut result = self.empty_set();
        for id in ids {
            result.insert(id);
        }
        result
    }

    /// Iterates over the fragments of `set`.
    pub fn fragments_of<'a>(&'a self, set: &'a FragmentSet) -> impl Iterator<Item = &'a OpRef> {
        self.assert_member(set);
        set.iter().map(|id| &self.fragments[id.0])
    }

    /// Adds `fragment` and returns its position. Equal fragments are only added once.
    pub(crate) fn push(&mut self, fragment: OpRef) -> FragmentId {
        if let Some(id) = self.positions.get(&fragment) {
            return *id;
        }
        let id = FragmentId(self.fragments.len());
        self.positions.insert(Arc::clone(&fragment), id);
        self.fragments.push(fragment);
        id
    }

    /// Panics if `set` was not created from this universe.
    pub fn assert_member(&self, set: &FragmentSet) {
        assert_eq!(
            set.universe, self.id,
            "The fragment set belongs to another universe"
        );
        assert!(
            set.bits.iter().all(|index| index < self.fragments.len()),
            "The fragment set {set} exceeds the universe"
        );
    }
}

impl Debug for Universe {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Universe")
            .field("id", &self.id)
            .field("len", &self.fragments.len())
            .finish_non_exhaustive()
    }
}

/// A subset of the fragments of a [Universe].
///
/// Sets of different universes can never be combined; doing so panics. All operations are linear
/// in the number of words of the universe and do not allocate for universes of up to 128
/// fragments.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct FragmentSet {
    universe: UniverseId,
    bits: BitSet,
}

impl FragmentSet {
    /// Returns the universe of this set.
    pub fn universe(&self) -> UniverseId {
        self.universe
    }

    /// Returns the underlying bits.
    pub fn bits(&self) -> &BitSet {
        &self.bits
    }

    /// Returns true if `id` is part of the set.
    pub fn contains(&self, id: FragmentId) -> bool {
        self.bits.contains(id.0)
    }

    /// Inserts `id`. Returns true if it was not part of the set.
    pub fn insert(&mut self, id: FragmentId) -> bool {
        self.bits.insert(id.0)
    }

    /// Removes `id`. Returns true if it was part of the set.
    pub fn remove(&mut self, id: FragmentId) -> bool {
        self.bits.remove(id.0)
    }

    /// Returns a copy of this set that additionally contains `id`.
    #[must_use]
    pub fn with(&self, id: FragmentId) -> Self {
        let mut result = self.clone();
        result.insert(id);
        result
    }

    /// Returns true if the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns the element with the smallest position.
    pub fn first(&self) -> Option<FragmentId> {
        self.bits.first().map(FragmentId)
    }

    /// Iterates over the elements in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = FragmentId> + '_ {
        self.bits.iter().map(FragmentId)
    }

    /// Returns `self ∪ other`.
    #[must_use]
    pub fn union(&self, other: &FragmentSet) -> FragmentSet {
        self.assert_same_universe(other);
        Self {
            universe: self.universe,
            bits: self.bits.union(&other.bits),
        }
    }

    /// Returns `self ∩ other`.
    #[must_use]
    pub fn intersection(&self, other: &FragmentSet) -> FragmentSet {
        self.assert_same_universe(other);
        Self {
            universe: self.universe,
            bits: self.bits.intersection(&other.bits),
        }
    }

    /// Returns `self \ other`.
    #[must_use]
    pub fn difference(&self, other: &FragmentSet) -> FragmentSet {
        self.assert_same_universe(other);
        Self {
            universe: self.universe,
            bits: self.bits.difference(&other.bits),
        }
    }

    /// Returns true if every element of `self` is part of `other`.
    pub fn is_subset(&self, other: &FragmentSet) -> bool {
        self.assert_same_universe(other);
        self.bits.is_subset(&other.bits)
    }

    /// Returns true if `self` and `other` have no element in common.
    pub fn is_disjoint(&self, other: &FragmentSet) -> bool {
        self.assert_same_universe(other);
        self.bits.is_disjoint(&other.bits)
    }

    fn assert_same_universe(&self, other: &FragmentSet) {
        assert_eq!(
            self.universe, other.universe,
            "Fragment sets of different universes cannot be combined"
        );
    }
}

impl Display for FragmentSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.bits, f)
    }
}

impl Debug for FragmentSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.bits, f)
    }
}
