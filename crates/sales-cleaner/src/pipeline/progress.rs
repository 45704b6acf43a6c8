//! Progress reporting for the cleaning pipeline.
//!
//! The pipeline emits a [`ProgressUpdate`] when each stage starts (stage
//! progress 0) and when it finishes (stage progress 1), then a final
//! `Complete` or `Failed` update. Reporters are `Send + Sync` so a pipeline
//! can run on a worker thread while updates go elsewhere.
//!
//! # Example
//!
//! ```rust,ignore
//! use sales_cleaner::Pipeline;
//!
//! let result = Pipeline::builder()
//!     .on_progress(|update| {
//!         println!("[{:.0}%] {}", update.progress * 100.0, update.message);
//!     })
//!     .build()?
//!     .process(&raw)?;
//! ```

use serde::{Deserialize, Serialize};

/// Stages of the cleaning pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStage {
    /// Validating configuration and inspecting the raw table
    Initializing,
    /// Coercing identifier, category, date and count columns
    Coercion,
    /// Stripping currency and percentage markers
    Normalization,
    /// Normalizing and remapping category labels
    Canonicalization,
    /// Resolving missing values by per-column policy
    Imputation,
    /// Dropping rows that lack a required field
    Admission,
    /// Removing exact duplicate rows
    Deduplication,
    /// Pipeline completed successfully
    Complete,
    /// Pipeline failed with an error
    Failed,
}

impl CleaningStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Initializing => "Initializing",
            Self::Coercion => "Coercing Types",
            Self::Normalization => "Normalizing Units",
            Self::Canonicalization => "Canonicalizing Labels",
            Self::Imputation => "Resolving Missing Values",
            Self::Admission => "Admitting Rows",
            Self::Deduplication => "Removing Duplicates",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
        }
    }

    /// Typical share of the overall run spent in this stage (0.0 - 1.0).
    pub fn weight(&self) -> f32 {
        match self {
            Self::Initializing => 0.05,
            Self::Coercion => 0.30,
            Self::Normalization => 0.15,
            Self::Canonicalization => 0.15,
            Self::Imputation => 0.15,
            Self::Admission => 0.10,
            Self::Deduplication => 0.10,
            Self::Complete | Self::Failed => 0.0,
        }
    }

    /// Cumulative progress at the start of this stage.
    pub fn base_progress(&self) -> f32 {
        match self {
            Self::Initializing => 0.0,
            Self::Coercion => 0.05,
            Self::Normalization => 0.35,
            Self::Canonicalization => 0.50,
            Self::Imputation => 0.65,
            Self::Admission => 0.80,
            Self::Deduplication => 0.90,
            Self::Complete => 1.0,
            Self::Failed => 0.0,
        }
    }
}

impl std::fmt::Display for CleaningStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A progress update with optional per-column detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// Current pipeline stage
    pub stage: CleaningStage,

    /// Optional sub-stage description (e.g., "Column: Region")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_stage: Option<String>,

    /// Overall progress (0.0 - 1.0)
    pub progress: f32,

    /// Progress within current stage (0.0 - 1.0)
    pub stage_progress: f32,

    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_processed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_total: Option<usize>,
}

impl ProgressUpdate {
    /// Creates a new progress update for a stage without sub-stage info.
    pub fn new(stage: CleaningStage, stage_progress: f32, message: impl Into<String>) -> Self {
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: None,
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a new progress update with item counts.
    pub fn with_items(
        stage: CleaningStage,
        sub_stage: impl Into<String>,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) -> Self {
        let stage_progress = if total > 0 {
            current as f32 / total as f32
        } else {
            0.0
        };
        let progress = stage.base_progress() + (stage.weight() * stage_progress);
        Self {
            stage,
            sub_stage: Some(sub_stage.into()),
            progress: progress.clamp(0.0, 1.0),
            stage_progress: stage_progress.clamp(0.0, 1.0),
            message: message.into(),
            items_processed: Some(current),
            items_total: Some(total),
        }
    }

    /// Creates a completion progress update.
    pub fn complete(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Complete,
            sub_stage: None,
            progress: 1.0,
            stage_progress: 1.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }

    /// Creates a failed progress update.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            stage: CleaningStage::Failed,
            sub_stage: None,
            progress: 0.0,
            stage_progress: 0.0,
            message: message.into(),
            items_processed: None,
            items_total: None,
        }
    }
}

/// Receives progress updates while the pipeline runs.
///
/// Called twice per stage and once at the end of a run. Implementations
/// should not block.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, update: ProgressUpdate);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(ProgressUpdate) + Send + Sync,
{
    fn report(&self, update: ProgressUpdate) {
        (self.callback)(update);
    }
}

static_assertions::assert_impl_all!(ProgressUpdate: Send, Sync);
static_assertions::assert_impl_all!(CleaningStage: Send, Sync, Copy);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_progress_update_new() {
        let update = ProgressUpdate::new(CleaningStage::Coercion, 0.5, "Coercing...");
        assert_eq!(update.stage, CleaningStage::Coercion);
        assert!(update.sub_stage.is_none());
        assert_eq!(update.stage_progress, 0.5);
        assert!((update.progress - 0.20).abs() < 1e-6);
    }

    #[test]
    fn test_progress_update_with_items() {
        let update = ProgressUpdate::with_items(
            CleaningStage::Imputation,
            "Column: Quantity",
            1,
            4,
            "Imputing Quantity",
        );
        assert_eq!(update.sub_stage, Some("Column: Quantity".to_string()));
        assert_eq!(update.stage_progress, 0.25);
        assert_eq!(update.items_processed, Some(1));
        assert_eq!(update.items_total, Some(4));
    }

    #[test]
    fn test_progress_update_complete() {
        let update = ProgressUpdate::complete("Done");
        assert_eq!(update.stage, CleaningStage::Complete);
        assert_eq!(update.progress, 1.0);
    }

    #[test]
    fn test_stage_weights_sum() {
        let stages = [
            CleaningStage::Initializing,
            CleaningStage::Coercion,
            CleaningStage::Normalization,
            CleaningStage::Canonicalization,
            CleaningStage::Imputation,
            CleaningStage::Admission,
            CleaningStage::Deduplication,
        ];

        let total_weight: f32 = stages.iter().map(|s| s.weight()).sum();
        assert!((total_weight - 1.0).abs() < 0.01, "Weights should sum to ~1.0");

        for pair in stages.windows(2) {
            let expected = pair[0].base_progress() + pair[0].weight();
            assert!((pair[1].base_progress() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_stage_json_values() {
        let expectations = [
            (CleaningStage::Coercion, "\"coercion\""),
            (CleaningStage::Normalization, "\"normalization\""),
            (CleaningStage::Canonicalization, "\"canonicalization\""),
            (CleaningStage::Imputation, "\"imputation\""),
            (CleaningStage::Admission, "\"admission\""),
            (CleaningStage::Deduplication, "\"deduplication\""),
        ];

        for (stage, expected) in expectations {
            let json = serde_json::to_string(&stage).expect("Should serialize");
            assert_eq!(json, expected);
        }
    }

    #[test]
    fn test_progress_reporter_across_threads() {
        let call_count = Arc::new(AtomicUsize::new(0));
        let call_count_clone = call_count.clone();

        let reporter = Arc::new(ClosureProgressReporter::new(move |_update| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let reporter_clone = reporter.clone();
        let handle = std::thread::spawn(move || {
            reporter_clone.report(ProgressUpdate::new(CleaningStage::Admission, 0.5, "bg"));
        });

        handle.join().expect("Thread should not panic");
        reporter.report(ProgressUpdate::complete("Done"));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }
}
