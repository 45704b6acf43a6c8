//! Pipeline module.
//!
//! This module provides the cleaning pipeline, the stage abstraction it is
//! built from, and the row-wise stages (admission and deduplication).

mod admission;
mod builder;
pub mod progress;
mod stage;

pub use admission::{Deduplicator, RowAdmissionFilter};
pub use builder::{Pipeline, PipelineBuilder};
pub use progress::{ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate};
pub use stage::Stage;
pub(crate) use stage::replace_column;
