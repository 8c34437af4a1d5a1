mod pattern;
mod query;

pub use pattern::*;
pub use query::*;

// Re-export the oxrdf / spargebra types the planner works with. Other crates should only
// refer to them through this crate.
pub use oxrdf::{NamedNode, Variable};
pub use spargebra::term::{NamedNodePattern, TermPattern, TriplePattern};
