pub mod csp;
pub mod error;
mod frame;
pub mod iris;
pub mod normalize;
pub mod outputs;
pub mod pipeline;
pub mod quality;
pub mod report;
pub mod unify;

pub use error::{Result, TransformError};
pub use iris::IrisTargets;
pub use pipeline::{run_pipeline, PipelineOutput, SourceTables};
pub use report::{CspReport, IrisReport, JoinReport};
pub use unify::City;

/// Daily figures are annualized over a 365-day year.
pub const DAYS_PER_YEAR: f64 = 365.0;
