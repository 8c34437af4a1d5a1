use crate::plan::{fmt_variables, PlanProperties};
use itertools::Itertools;
use rdf_federation_common::error::FragmentError;
use rdf_federation_model::{triple_pattern_variables, DisplayTriplePattern, TriplePattern, Variable};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A fragment of the query that a single source can answer.
///
/// Fragments are produced by source selection. Besides the matched triple patterns, a fragment
/// declares the variables it binds and the variables it needs as input. Sources like web APIs
/// can only be queried once their required inputs are bound, while other sources optionally
/// accept bindings (e.g., via a bind join) to narrow their results.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceFragment {
    source: Arc<str>,
    properties: PlanProperties,
    cardinality_hint: Option<usize>,
}

impl SourceFragment {
    /// Creates a [SourceFragmentBuilder] for a fragment of `source`.
    pub fn builder(source: impl Into<Arc<str>>) -> SourceFragmentBuilder {
        SourceFragmentBuilder {
            source: source.into(),
            triples: Vec::new(),
            result_variables: None,
            required_inputs: BTreeSet::new(),
            optional_inputs: BTreeSet::new(),
            cardinality_hint: None,
        }
    }

    /// Returns the name of the source that answers this fragment.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns the derived properties.
    pub fn properties(&self) -> &PlanProperties {
        &self.properties
    }

    /// Returns the number of results announced by the source, if known.
    pub fn cardinality_hint(&self) -> Option<usize> {
        self.cardinality_hint
    }
}

impl Display for SourceFragment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Source[{}]: {}",
            self.source,
            self.properties
                .matched_triples
                .iter()
                .map(DisplayTriplePattern)
                .join(" . ")
        )?;
        if !self.properties.required_inputs.is_empty() {
            write!(
                f,
                " requires {}",
                fmt_variables(&self.properties.required_inputs)
            )?;
        }
        if !self.properties.optional_inputs.is_empty() {
            write!(
                f,
                " accepts {}",
                fmt_variables(&self.properties.optional_inputs)
            )?;
        }
        Ok(())
    }
}

/// Builds a validated [SourceFragment].
#[derive(Debug)]
pub struct SourceFragmentBuilder {
    source: Arc<str>,
    triples: Vec<TriplePattern>,
    result_variables: Option<BTreeSet<Variable>>,
    required_inputs: BTreeSet<Variable>,
    optional_inputs: BTreeSet<Variable>,
    cardinality_hint: Option<usize>,
}

impl SourceFragmentBuilder {
    /// Adds a matched triple pattern.
    #[must_use]
    pub fn triple(mut self, triple: TriplePattern) -> Self {
        self.triples.push(triple);
        self
    }

    /// Adds multiple matched triple patterns.
    #[must_use]
    pub fn triples(mut self, triples: impl IntoIterator<Item = TriplePattern>) -> Self {
        self.triples.extend(triples);
        self
    }

    /// Sets the variables bound by the fragment.
    ///
    /// If not set, the fragment binds all variables of its triple patterns except for its
    /// required inputs.
    #[must_use]
    pub fn result_variables(mut self, variables: impl IntoIterator<Item = Variable>) -> Self {
        self.result_variables = Some(variables.into_iter().collect());
        self
    }

    /// Adds a variable that must be bound before the fragment can be evaluated.
    #[must_use]
    pub fn required_input(mut self, variable: Variable) -> Self {
        self.required_inputs.insert(variable);
        self
    }

    /// Adds a variable whose bindings can be used to narrow the results of the fragment.
    #[must_use]
    pub fn optional_input(mut self, variable: Variable) -> Self {
        self.optional_inputs.insert(variable);
        self
    }

    /// Sets the number of results announced by the source.
    #[must_use]
    pub fn cardinality_hint(mut self, cardinality: usize) -> Self {
        self.cardinality_hint = Some(cardinality);
        self
    }

    /// Validates the description and creates the [SourceFragment].
    pub fn build(self) -> Result<SourceFragment, FragmentError> {
        if self.triples.is_empty() {
            return Err(FragmentError::EmptyPattern {
                source_name: self.source.to_string(),
            });
        }

        let matched_triples = self.triples.into_iter().unique().collect::<Vec<_>>();
        let result_variables = self.result_variables.unwrap_or_else(|| {
            matched_triples
                .iter()
                .flat_map(triple_pattern_variables)
                .filter(|v| !self.required_inputs.contains(*v))
                .cloned()
                .collect()
        });

        if let Some(variable) = self
            .required_inputs
            .iter()
            .find(|v| self.optional_inputs.contains(*v) || result_variables.contains(*v))
        {
            return Err(FragmentError::ConflictingInput {
                source_name: self.source.to_string(),
                variable: variable.clone(),
            });
        }

        Ok(SourceFragment {
            source: self.source,
            properties: PlanProperties {
                matched_triples,
                result_variables,
                required_inputs: self.required_inputs,
                optional_inputs: self.optional_inputs,
            },
            cardinality_hint: self.cardinality_hint,
        })
    }
}
