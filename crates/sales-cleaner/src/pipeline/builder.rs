//! Main cleaning pipeline module.
//!
//! This module provides the core `Pipeline` struct and builder that run the
//! cleaning stages in their fixed order.

use crate::cleaner::{Canonicalizer, ColumnCoercer, UnitNormalizer};
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::Result;
use crate::imputers::MissingValueResolver;
use crate::pipeline::admission::{Deduplicator, RowAdmissionFilter};
use crate::pipeline::progress::{
    ClosureProgressReporter, CleaningStage, ProgressReporter, ProgressUpdate,
};
use crate::pipeline::stage::Stage;
use crate::types::{PipelineDiagnostics, PipelineResult};
use crate::utils::column_names;
use polars::prelude::*;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Share of removed rows above which the run is flagged as lossy.
const HIGH_ROW_LOSS_PERCENT: f32 = 30.0;

/// The cleaning pipeline.
///
/// Stages always run in this order: coercion, unit normalization,
/// canonicalization, missing-value resolution, row admission, and
/// (when enabled) duplicate removal. Each stage sees the output of the
/// previous one.
///
/// # Example
///
/// ```rust,ignore
/// use sales_cleaner::{Pipeline, PipelineConfig};
///
/// let result = Pipeline::builder()
///     .config(PipelineConfig::default())
///     .on_progress(|update| {
///         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
///     })
///     .build()?
///     .process(&raw)?;
///
/// println!("{} rows admitted", result.cleaned.height());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    stages: Vec<Box<dyn Stage>>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(Pipeline: Send, Sync);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The stages this pipeline will run, in order.
    pub fn stages(&self) -> Vec<CleaningStage> {
        self.stages.iter().map(|s| s.stage()).collect()
    }

    /// Run every stage over a raw table.
    ///
    /// The input is not modified. Bad cell values and absent columns are
    /// reported in the diagnostics; only table-wide failures return `Err`.
    pub fn process(&self, df: &DataFrame) -> Result<PipelineResult> {
        match self.process_internal(df) {
            Ok(result) => {
                self.report_progress(ProgressUpdate::complete(format!(
                    "Cleaning complete: {} of {} rows admitted",
                    result.diagnostics.rows_after, result.diagnostics.rows_before
                )));
                Ok(result)
            }
            Err(e) => {
                self.report_progress(ProgressUpdate::failed(e.to_string()));
                error!("Pipeline error: {}", e);
                Err(e)
            }
        }
    }

    /// Report progress if a reporter is configured.
    fn report_progress(&self, update: ProgressUpdate) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }

    fn process_internal(&self, df: &DataFrame) -> Result<PipelineResult> {
        let start_time = Instant::now();

        info!("Starting cleaning pipeline...");
        self.report_progress(ProgressUpdate::new(
            CleaningStage::Initializing,
            0.0,
            "Starting cleaning pipeline...",
        ));

        let mut diagnostics = PipelineDiagnostics::new();
        diagnostics.rows_before = df.height();
        self.log_schema_coverage(df);

        let mut table = df.clone();
        let total = self.stages.len();

        for (idx, stage) in self.stages.iter().enumerate() {
            let description = stage.describe();
            info!("Step {}/{}: {}", idx + 1, total, description);
            self.report_progress(ProgressUpdate::new(stage.stage(), 0.0, description));

            let rows_in = table.height();
            table = stage.apply(&table, &mut diagnostics)?;
            debug!(
                "{} finished: {} -> {} rows",
                stage.stage().display_name(),
                rows_in,
                table.height()
            );

            self.report_progress(ProgressUpdate::new(
                stage.stage(),
                1.0,
                format!("{} complete", stage.stage().display_name()),
            ));
        }

        diagnostics.rows_after = table.height();
        diagnostics.duration_ms = start_time.elapsed().as_millis() as u64;

        if diagnostics.rows_removed_percentage() > HIGH_ROW_LOSS_PERCENT {
            warn!(
                "High data loss: {:.1}% of rows were removed",
                diagnostics.rows_removed_percentage()
            );
            diagnostics.add_warning(format!(
                "High data loss: {:.1}% of rows were removed",
                diagnostics.rows_removed_percentage()
            ));
        }

        info!(
            "Pipeline finished in {} ms: {} rows in, {} rows out",
            diagnostics.duration_ms, diagnostics.rows_before, diagnostics.rows_after
        );

        Ok(PipelineResult {
            cleaned: table,
            diagnostics,
        })
    }

    fn log_schema_coverage(&self, df: &DataFrame) {
        for spec in &self.config.columns {
            if df.column(&spec.name).is_err() {
                warn!("Configured column '{}' is absent from the input", spec.name);
            }
        }
        for name in column_names(df) {
            if self.config.column_spec(&name).is_none() {
                debug!("Column '{}' is not in the schema and passes through unchanged", name);
            }
        }
    }
}

/// Builder for creating a [`Pipeline`] instance.
///
/// Use [`Pipeline::builder()`] to get started.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set a progress reporter for receiving updates during processing.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    ///
    /// For more complex scenarios, use [`progress_reporter`](Self::progress_reporter).
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(ColumnCoercer::from_config(&config)),
            Box::new(UnitNormalizer::from_config(&config)),
            Box::new(Canonicalizer::from_config(&config)?),
            Box::new(MissingValueResolver::from_config(&config)),
            Box::new(RowAdmissionFilter::from_config(&config)),
        ];
        if config.remove_duplicates {
            stages.push(Box::new(Deduplicator));
        }

        Ok(Pipeline {
            config,
            stages,
            progress_reporter: self.progress_reporter,
        })
    }
}
