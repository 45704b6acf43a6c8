//! Retail Sales Cleaning Library
//!
//! Turns a messy retail/sales export into a typed, analysis-ready table,
//! built with Rust and Polars.
//!
//! # Overview
//!
//! The cleaning pipeline runs a fixed sequence of column-level repairs:
//!
//! - **Coercion**: identifiers and categories to trimmed text, dates through
//!   configured formats, counts to numbers
//! - **Unit Normalization**: currency symbols and codes stripped, percentages
//!   brought onto one whole-percent scale
//! - **Canonicalization**: category labels normalized and remapped to
//!   canonical names
//! - **Missing-Value Resolution**: mean, median or drop, per column
//! - **Row Admission**: rows lacking a required field are removed
//! - **Deduplication** (optional): exact duplicate rows removed
//!
//! Bad cells never fail a run. They become missing values and are counted in
//! the [`PipelineDiagnostics`] returned alongside the cleaned table.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sales_cleaner::{Pipeline, PipelineConfig, loader, reporting::Aggregator};
//!
//! let config = PipelineConfig::default();
//! let raw = loader::load_raw_table("sales.csv", &config.csv)?;
//!
//! let result = Pipeline::builder()
//!     .config(config.clone())
//!     .build()?
//!     .process(&raw)?;
//!
//! println!("{} rows admitted", result.cleaned.height());
//! println!("{} rows dropped", result.diagnostics.rows_dropped_by_admission);
//!
//! let aggregates = Aggregator::new(config.report).summarize(&result.cleaned)?;
//! ```
//!
//! # Configuration
//!
//! ```rust,ignore
//! use sales_cleaner::config::{ImputationPolicy, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .imputation("Quantity", ImputationPolicy::Drop)
//!     .canonical("Appl", "Appliances")
//!     .date_formats(["%Y-%m-%d", "%d.%m.%Y"])
//!     .remove_duplicates(true)
//!     .build()?;
//! ```

pub mod cleaner;
pub mod config;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod pipeline;
pub mod reporting;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use cleaner::{CanonicalMap, Canonicalizer, ColumnCoercer, UnitNormalizer};
pub use config::{
    ColumnSpec, ConfigValidationError, CsvOptions, ImputationPolicy, InputEncoding,
    PipelineConfig, PipelineConfigBuilder, ReportColumns,
};
pub use error::{CleaningError, Result as CleaningResult, ResultExt};
pub use imputers::{MissingValueResolver, StatisticalImputer};
pub use pipeline::{
    CleaningStage, ClosureProgressReporter, Deduplicator, Pipeline, PipelineBuilder,
    ProgressReporter, ProgressUpdate, RowAdmissionFilter, Stage,
};
pub use reporting::{AggregateReport, Aggregator, CleaningReport, ReportGenerator};
pub use types::{
    ActionType, CleaningAction, ColumnDiagnostics, ColumnError, ColumnKind, PipelineDiagnostics,
    PipelineResult, RawCell, TargetType,
};
