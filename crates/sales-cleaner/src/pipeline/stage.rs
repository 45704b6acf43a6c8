//! The stage abstraction the pipeline composes.

use crate::error::Result;
use crate::pipeline::CleaningStage;
use crate::types::PipelineDiagnostics;
use polars::prelude::*;

/// One step of the cleaning pipeline.
///
/// A stage takes the table produced by the previous stage and returns a new
/// one. Column-level problems are recorded in `diagnostics` and the affected
/// column is skipped; an `Err` aborts the whole run.
pub trait Stage: Send + Sync {
    /// Which pipeline stage this is, for progress and error attribution.
    fn stage(&self) -> CleaningStage;

    /// Short human-readable summary of what this stage will do.
    fn describe(&self) -> String;

    /// Columns this stage works on, in the order it visits them.
    ///
    /// Row-wise stages return an empty list.
    fn columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn apply(&self, df: &DataFrame, diagnostics: &mut PipelineDiagnostics) -> Result<DataFrame>;
}

/// Replace a column in a table, keeping its position.
pub(crate) fn replace_column(df: &mut DataFrame, name: &str, series: Series) -> Result<()> {
    df.replace(name, series)?;
    Ok(())
}
