use datafusion::error::DataFusionError;
use rdf_federation_model::Variable;

/// An error raised while describing a source fragment.
///
/// Fragments are produced by source selection. A fragment that violates one of these rules cannot
/// be placed in a join graph.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FragmentError {
    /// The fragment does not match any triple pattern.
    #[error("Fragment of source '{source_name}' does not match any triple pattern")]
    EmptyPattern {
        /// The name of the source.
        source_name: String,
    },
    /// A required input is also declared as an optional input or as a result variable.
    #[error("Required input {variable} of source '{source_name}' is also an optional input or a result")]
    ConflictingInput {
        /// The name of the source.
        source_name: String,
        /// The variable declared twice.
        variable: Variable,
    },
}

impl From<FragmentError> for DataFusionError {
    #[inline]
    fn from(error: FragmentError) -> Self {
        Self::External(Box::new(error))
    }
}
