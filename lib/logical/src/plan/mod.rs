mod join;
mod source;
mod tree_node;

pub use join::*;
pub use source::*;
pub use tree_node::*;

use itertools::Itertools;
use rdf_federation_model::{TriplePattern, Variable};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A shared reference to an immutable [PlanNode].
///
/// Plans are never mutated. Re-planning builds new nodes that share the unchanged sub-trees.
pub type OpRef = Arc<PlanNode>;

/// A unit of a federated query plan.
///
/// A node is either a fragment that is answered by a single source or the join of two nodes. Both
/// kinds can be placed in a join graph: a previously planned join simply acts as a larger
/// fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PlanNode {
    /// A fragment answered by a single source.
    Source(SourceFragment),
    /// The join of two plan nodes.
    Join(JoinNode),
}

impl PlanNode {
    /// Returns the derived properties of this node.
    pub fn properties(&self) -> &PlanProperties {
        match self {
            PlanNode::Source(source) => source.properties(),
            PlanNode::Join(join) => join.properties(),
        }
    }

    /// Returns the triple patterns matched by this node.
    pub fn matched_triples(&self) -> &[TriplePattern] {
        &self.properties().matched_triples
    }

    /// Returns the variables bound by this node.
    pub fn result_variables(&self) -> &BTreeSet<Variable> {
        &self.properties().result_variables
    }

    /// Returns the variables that must be bound before this node can be evaluated.
    pub fn required_inputs(&self) -> &BTreeSet<Variable> {
        &self.properties().required_inputs
    }

    /// Returns the variables that may be bound before evaluating this node to narrow its results.
    pub fn optional_inputs(&self) -> &BTreeSet<Variable> {
        &self.properties().optional_inputs
    }

    /// Returns true if this node is a join produced by a planner.
    pub fn is_join(&self) -> bool {
        matches!(self, PlanNode::Join(_))
    }

    fn fmt_indent(&self, f: &mut Formatter<'_>, indent: usize) -> std::fmt::Result {
        write!(f, "{:indent$}", "")?;
        match self {
            PlanNode::Source(source) => write!(f, "{source}"),
            PlanNode::Join(join) => {
                write!(f, "{join}")?;
                for child in [join.lhs(), join.rhs()] {
                    writeln!(f)?;
                    child.fmt_indent(f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for PlanNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.fmt_indent(f, 0)
    }
}

impl From<SourceFragment> for PlanNode {
    fn from(value: SourceFragment) -> Self {
        PlanNode::Source(value)
    }
}

impl From<JoinNode> for PlanNode {
    fn from(value: JoinNode) -> Self {
        PlanNode::Join(value)
    }
}

/// Properties of a [PlanNode] that are derived once when the node is created.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlanProperties {
    /// The matched triple patterns, without duplicates.
    pub matched_triples: Vec<TriplePattern>,
    /// The variables bound by the node.
    pub result_variables: BTreeSet<Variable>,
    /// The variables that must be bound before evaluating the node.
    pub required_inputs: BTreeSet<Variable>,
    /// The variables that can be bound before evaluating the node.
    pub optional_inputs: BTreeSet<Variable>,
}

impl PlanProperties {
    /// Returns true if `variable` is bound by the node or accepted as one of its inputs.
    pub fn mentions(&self, variable: &Variable) -> bool {
        self.result_variables.contains(variable)
            || self.required_inputs.contains(variable)
            || self.optional_inputs.contains(variable)
    }
}

/// Formats a list of variables as `?a ?b`.
fn fmt_variables<'var>(variables: impl IntoIterator<Item = &'var Variable>) -> String {
    variables.into_iter().join(" ")
}
