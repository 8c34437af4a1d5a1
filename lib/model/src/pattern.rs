use crate::{NamedNodePattern, TermPattern, TriplePattern, Variable};
use std::fmt::{Display, Formatter};

/// Returns the variables of `pattern` in subject, predicate, object order.
///
/// A variable that appears in multiple positions is returned multiple times. Blank nodes are not
/// returned. Fragments therefore never join on a blank node, even though a blank node acts like a
/// variable within a single basic graph pattern. Callers that want to join on blank nodes must
/// replace them with variables first.
pub fn triple_pattern_variables(pattern: &TriplePattern) -> impl Iterator<Item = &Variable> {
    let subject = match &pattern.subject {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    };
    let predicate = match &pattern.predicate {
        NamedNodePattern::Variable(variable) => Some(variable),
        NamedNodePattern::NamedNode(_) => None,
    };
    let object = match &pattern.object {
        TermPattern::Variable(variable) => Some(variable),
        _ => None,
    };
    subject.into_iter().chain(predicate).chain(object)
}

/// Renders a [TriplePattern] as `subject predicate object`.
///
/// Used by the explain output of plans and queries.
#[derive(Clone, Copy, Debug)]
pub struct DisplayTriplePattern<'pattern>(pub &'pattern TriplePattern);

impl Display for DisplayTriplePattern<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.0.subject, self.0.predicate, self.0.object
        )
    }
}
