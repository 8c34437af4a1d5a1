use smallvec::SmallVec;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};

const WORD_BITS: usize = u64::BITS as usize;

/// A set of small integers backed by 64-bit words.
///
/// Sets up to 128 elements live inline. Trailing zero words are never stored, so two sets with
/// the same elements are equal (and hash equally) regardless of how they were computed.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct BitSet {
    words: SmallVec<[u64; 2]>,
}

impl BitSet {
    /// Creates an empty [BitSet].
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the set `{0, ..., len - 1}`.
    pub fn with_range(len: usize) -> Self {
        let mut words = SmallVec::from_elem(u64::MAX, len / WORD_BITS);
        let rest = len % WORD_BITS;
        if rest > 0 {
            words.push((1_u64 << rest) - 1);
        }
        Self { words }
    }

    /// Creates the set `{element}`.
    pub fn singleton(element: usize) -> Self {
        let mut result = Self::new();
        result.insert(element);
        result
    }

    /// Returns true if `element` is part of the set.
    pub fn contains(&self, element: usize) -> bool {
        self.words
            .get(element / WORD_BITS)
            .is_some_and(|word| word & (1 << (element % WORD_BITS)) != 0)
    }

    /// Inserts `element`. Returns true if it was not part of the set.
    pub fn insert(&mut self, element: usize) -> bool {
        let index = element / WORD_BITS;
        if index >= self.words.len() {
            self.words.resize(index + 1, 0);
        }
        let mask = 1 << (element % WORD_BITS);
        let inserted = self.words[index] & mask == 0;
        self.words[index] |= mask;
        inserted
    }

    /// Removes `element`. Returns true if it was part of the set.
    pub fn remove(&mut self, element: usize) -> bool {
        let index = element / WORD_BITS;
        let Some(word) = self.words.get_mut(index) else {
            return false;
        };
        let mask = 1 << (element % WORD_BITS);
        let removed = *word & mask != 0;
        *word &= !mask;
        self.trim();
        removed
    }

    /// Returns true if the set has no elements.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns the smallest element.
    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    /// Iterates over the elements in ascending order.
    pub fn iter(&self) -> Ones<'_> {
        Ones {
            words: &self.words,
            index: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }

    /// Returns `self ∪ other`.
    #[must_use]
    pub fn union(&self, other: &BitSet) -> BitSet {
        let (longer, shorter) = if self.words.len() >= other.words.len() {
            (self, other)
        } else {
            (other, self)
        };
        let mut result = longer.clone();
        for (word, other) in result.words.iter_mut().zip(&shorter.words) {
            *word |= other;
        }
        result
    }

    /// Returns `self ∩ other`.
    #[must_use]
    pub fn intersection(&self, other: &BitSet) -> BitSet {
        let mut result = BitSet {
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(lhs, rhs)| lhs & rhs)
                .collect(),
        };
        result.trim();
        result
    }

    /// Returns `self \ other`.
    #[must_use]
    pub fn difference(&self, other: &BitSet) -> BitSet {
        let mut result = self.clone();
        for (word, other) in result.words.iter_mut().zip(&other.words) {
            *word &= !other;
        }
        result.trim();
        result
    }

    /// Returns true if every element of `self` is part of `other`.
    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.words.len() <= other.words.len()
            && self
                .words
                .iter()
                .zip(&other.words)
                .all(|(lhs, rhs)| lhs & !rhs == 0)
    }

    /// Returns true if `self` and `other` have no element in common.
    pub fn is_disjoint(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .all(|(lhs, rhs)| lhs & rhs == 0)
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl FromIterator<usize> for BitSet {
    fn from_iter<T: IntoIterator<Item = usize>>(iter: T) -> Self {
        let mut result = BitSet::new();
        result.extend(iter);
        result
    }
}

impl Extend<usize> for BitSet {
    fn extend<T: IntoIterator<Item = usize>>(&mut self, iter: T) {
        for element in iter {
            self.insert(element);
        }
    }
}

impl<'set> IntoIterator for &'set BitSet {
    type Item = usize;
    type IntoIter = Ones<'set>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Display for BitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Debug for BitSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

/// Iterates over the elements of a [BitSet] in ascending order.
#[derive(Clone, Debug)]
pub struct Ones<'set> {
    words: &'set [u64],
    index: usize,
    current: u64,
}

impl Iterator for Ones<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        while self.current == 0 {
            self.index += 1;
            self.current = *self.words.get(self.index)?;
        }
        let bit = self.current.trailing_zeros() as usize;
        // Clear the lowest set bit.
        self.current &= self.current - 1;
        Some(self.index * WORD_BITS + bit)
    }
}
