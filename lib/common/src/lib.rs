pub mod error;
mod options;

pub use options::PlannerOptions;

pub type DFResult<T> = datafusion::error::Result<T>;
