use crate::{triple_pattern_variables, DisplayTriplePattern, TriplePattern, Variable};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// A conjunctive query, i.e., a basic graph pattern that must be answered by joining the
/// fragments of one or more sources.
///
/// The triple patterns are deduplicated and keep their order of first appearance. The position
/// of a triple pattern is stable and is used to index the coverage of a plan.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConjunctiveQuery {
    triples: Vec<TriplePattern>,
}

impl ConjunctiveQuery {
    /// Creates a new [ConjunctiveQuery] from the given triple patterns.
    pub fn new(triples: impl IntoIterator<Item = TriplePattern>) -> Self {
        Self {
            triples: triples.into_iter().unique().collect(),
        }
    }

    /// Returns the triple patterns of the query.
    pub fn triples(&self) -> &[TriplePattern] {
        &self.triples
    }

    /// Returns the number of triple patterns.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    /// Returns true if the query has no triple pattern.
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Returns the position of `triple` in this query.
    pub fn position(&self, triple: &TriplePattern) -> Option<usize> {
        self.triples.iter().position(|t| t == triple)
    }

    /// Returns all variables mentioned by the query.
    pub fn variables(&self) -> BTreeSet<Variable> {
        self.triples
            .iter()
            .flat_map(triple_pattern_variables)
            .cloned()
            .collect()
    }
}

impl FromIterator<TriplePattern> for ConjunctiveQuery {
    fn from_iter<T: IntoIterator<Item = TriplePattern>>(iter: T) -> Self {
        Self::new(iter)
    }
}

impl Display for ConjunctiveQuery {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ {} }}",
            self.triples.iter().map(DisplayTriplePattern).join(" . ")
        )
    }
}
