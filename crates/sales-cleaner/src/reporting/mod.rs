//! Reporting module.
//!
//! This module consumes the cleaned table: it computes grouped revenue
//! aggregates and writes the cleaned CSV plus a JSON report.
//!
//! # Example
//!
//! ```rust,ignore
//! use sales_cleaner::reporting::{Aggregator, ReportGenerator};
//!
//! let aggregates = Aggregator::new(config.report.clone()).summarize(&result.cleaned)?;
//! let generator = ReportGenerator::new(PathBuf::from("outputs"), None);
//! let csv_path = generator.write_cleaned_csv(&mut result.cleaned)?;
//! let report = ReportGenerator::build_report(&input, Some(&csv_path), &result, aggregates);
//! generator.write_report(&report)?;
//! ```

mod aggregator;
mod generator;

pub use aggregator::{AggregateReport, Aggregator, GroupTotal};
pub use generator::{
    CleaningReport, ColumnReport, DEFAULT_OUTPUT_NAME, ReportGenerator, RunSummary,
};
