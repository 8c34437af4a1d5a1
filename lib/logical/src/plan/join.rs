use crate::plan::{fmt_variables, OpRef, PlanProperties};
use datafusion::common::plan_err;
use itertools::Itertools;
use rdf_federation_common::DFResult;
use rdf_federation_model::Variable;
use std::collections::BTreeSet;
use std::fmt;
use std::fmt::{Display, Formatter};

/// How the two inputs of a [JoinNode] are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// Both inputs are evaluated independently and joined on their shared variables.
    Hash,
    /// The bindings of the left input are passed into the evaluation of the right input.
    Bind,
}

impl Display for JoinKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            JoinKind::Hash => write!(f, "Hash"),
            JoinKind::Bind => write!(f, "Bind"),
        }
    }
}

/// Joins two plan nodes.
///
/// The left input is always evaluated first. If the left input binds inputs of the right input,
/// the join becomes a bind join. The derived properties of the join are computed once from its
/// inputs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct JoinNode {
    lhs: OpRef,
    rhs: OpRef,
    kind: JoinKind,
    join_variables: BTreeSet<Variable>,
    properties: PlanProperties,
}

impl JoinNode {
    /// Creates a new [JoinNode].
    ///
    /// Returns an error if the left input requires a variable that is bound by the right input,
    /// as the left input cannot be evaluated before the right one.
    pub fn try_new(lhs: OpRef, rhs: OpRef) -> DFResult<Self> {
        let lhs_props = lhs.properties();
        let rhs_props = rhs.properties();

        if let Some(variable) = lhs_props
            .required_inputs
            .intersection(&rhs_props.result_variables)
            .next()
        {
            return plan_err!(
                "The left input of a join requires {variable}, which is only bound by the right input."
            );
        }

        let kind = if rhs_props
            .required_inputs
            .iter()
            .chain(&rhs_props.optional_inputs)
            .any(|v| lhs_props.result_variables.contains(v))
        {
            JoinKind::Bind
        } else {
            JoinKind::Hash
        };

        let join_variables = lhs_props
            .result_variables
            .iter()
            .filter(|v| rhs_props.mentions(v))
            .cloned()
            .collect();
        let properties = compute_properties(lhs_props, rhs_props);

        Ok(Self {
            lhs,
            rhs,
            kind,
            join_variables,
            properties,
        })
    }

    /// Returns the left input.
    pub fn lhs(&self) -> &OpRef {
        &self.lhs
    }

    /// Returns the right input.
    pub fn rhs(&self) -> &OpRef {
        &self.rhs
    }

    /// Returns how the inputs are combined.
    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Returns the variables bound by the left input that the right input binds or accepts.
    pub fn join_variables(&self) -> &BTreeSet<Variable> {
        &self.join_variables
    }

    /// Returns the derived properties.
    pub fn properties(&self) -> &PlanProperties {
        &self.properties
    }
}

impl Display for JoinNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Join: {}", self.kind)?;
        if !self.join_variables.is_empty() {
            write!(f, " on {}", fmt_variables(&self.join_variables))?;
        }
        Ok(())
    }
}

/// Computes the properties of the join of `lhs` and `rhs`.
///
/// Inputs of the right side that are bound by the left side are no longer inputs of the join.
fn compute_properties(lhs: &PlanProperties, rhs: &PlanProperties) -> PlanProperties {
    let matched_triples = lhs
        .matched_triples
        .iter()
        .chain(&rhs.matched_triples)
        .unique()
        .cloned()
        .collect();
    let result_variables = lhs
        .result_variables
        .union(&rhs.result_variables)
        .cloned()
        .collect::<BTreeSet<_>>();
    let required_inputs = lhs
        .required_inputs
        .iter()
        .chain(rhs.required_inputs.difference(&lhs.result_variables))
        .cloned()
        .collect::<BTreeSet<_>>();
    let optional_inputs = lhs
        .optional_inputs
        .iter()
        .chain(rhs.optional_inputs.difference(&lhs.result_variables))
        .filter(|v| !required_inputs.contains(*v))
        .cloned()
        .collect();

    PlanProperties {
        matched_triples,
        result_variables,
        required_inputs,
        optional_inputs,
    }
}
