use crate::plan::{JoinNode, OpRef, PlanNode, SourceFragment};
use datafusion::common::internal_err;
use datafusion::common::tree_node::{DynTreeNode, TreeNode, TreeNodeRecursion};
use rdf_federation_common::DFResult;
use std::sync::Arc;

impl DynTreeNode for PlanNode {
    fn arc_children(&self) -> Vec<&Arc<Self>> {
        match self {
            PlanNode::Source(_) => vec![],
            PlanNode::Join(join) => vec![join.lhs(), join.rhs()],
        }
    }

    fn with_new_arc_children(
        &self,
        arc_self: Arc<Self>,
        new_children: Vec<Arc<Self>>,
    ) -> DFResult<Arc<Self>> {
        match self {
            PlanNode::Source(_) => {
                if !new_children.is_empty() {
                    return internal_err!("A source fragment cannot have inputs.");
                }
                Ok(arc_self)
            }
            PlanNode::Join(_) => {
                let input_len = new_children.len();
                let Ok([lhs, rhs]) = TryInto::<[OpRef; 2]>::try_into(new_children) else {
                    return internal_err!(
                        "A join must have exactly two inputs, actual: {input_len}"
                    );
                };
                Ok(Arc::new(PlanNode::Join(JoinNode::try_new(lhs, rhs)?)))
            }
        }
    }
}

/// Collects the source fragments of `plan` from left to right.
///
/// A fragment that occurs multiple times in the plan is returned multiple times.
pub fn collect_sources(plan: &OpRef) -> DFResult<Vec<&SourceFragment>> {
    let mut sources = Vec::new();
    plan.apply(|node| {
        if let PlanNode::Source(source) = node.as_ref() {
            sources.push(source);
        }
        Ok(TreeNodeRecursion::Continue)
    })?;
    Ok(sources)
}
