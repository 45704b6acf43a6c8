use super::aggregator::AggregateReport;
use crate::error::{CleaningError, Result};
use crate::types::{PipelineDiagnostics, PipelineResult};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default base name of the cleaned table when none is configured.
pub const DEFAULT_OUTPUT_NAME: &str = "cleaned_sales";

// ============================================================================
// Report Types
// ============================================================================

/// Everything a run produced, in one serializable document.
///
/// Used both for `--json` output and for the file written by
/// `--emit-report`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningReport {
    /// Timestamp when the report was generated
    pub generated_at: String,
    pub input_file: String,
    /// Path of the cleaned CSV, if one was written
    pub output_file: Option<String>,
    pub summary: RunSummary,
    pub columns: Vec<ColumnReport>,
    pub diagnostics: PipelineDiagnostics,
    pub aggregates: AggregateReport,
}

/// Row-level summary of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    pub rows_removed_percent: f32,
    pub rows_dropped_by_admission: usize,
    pub rows_dropped_by_policy: usize,
    pub duplicates_removed: usize,
    pub cells_coerced_to_missing: usize,
    pub cells_imputed: usize,
    pub column_errors: usize,
    pub warnings: usize,
}

/// Final state of one column of the cleaned table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnReport {
    pub name: String,
    pub dtype: String,
    pub missing: usize,
    pub coerced_to_missing: usize,
    pub imputed: usize,
}

// ============================================================================
// Report Generator
// ============================================================================

/// Writes the cleaned table and JSON reports to the output directory.
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    /// Base name of output files, without extension.
    pub fn output_name(&self) -> &str {
        self.output_name.as_deref().unwrap_or(DEFAULT_OUTPUT_NAME)
    }

    /// Save the cleaned table as CSV. Dates are written as `YYYY-MM-DD`.
    pub fn write_cleaned_csv(&self, df: &mut DataFrame) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let output_path = self.output_dir.join(format!("{}.csv", self.output_name()));
        let mut file = File::create(&output_path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .with_quote_char(b'"')
            .finish(df)
            .map_err(|e| {
                CleaningError::OutputFailed(format!("{}: {}", output_path.display(), e))
            })?;

        info!("Dataset saved: {}", output_path.display());
        Ok(output_path)
    }

    /// Build a report from a finished run.
    pub fn build_report(
        input_file: &Path,
        output_file: Option<&Path>,
        result: &PipelineResult,
        aggregates: AggregateReport,
    ) -> CleaningReport {
        let diag = &result.diagnostics;

        let columns = result
            .cleaned
            .get_columns()
            .iter()
            .map(|col| {
                let name = col.name().to_string();
                ColumnReport {
                    dtype: col.dtype().to_string(),
                    missing: col.null_count(),
                    coerced_to_missing: diag.coerced_to_missing(&name),
                    imputed: diag.imputed(&name),
                    name,
                }
            })
            .collect();

        CleaningReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            input_file: input_file.display().to_string(),
            output_file: output_file.map(|p| p.display().to_string()),
            summary: RunSummary {
                duration_ms: diag.duration_ms,
                rows_before: diag.rows_before,
                rows_after: diag.rows_after,
                rows_removed_percent: diag.rows_removed_percentage(),
                rows_dropped_by_admission: diag.rows_dropped_by_admission,
                rows_dropped_by_policy: diag.rows_dropped_by_policy,
                duplicates_removed: diag.duplicates_removed,
                cells_coerced_to_missing: diag.total_coerced_to_missing(),
                cells_imputed: diag.total_imputed(),
                column_errors: diag.column_errors.len(),
                warnings: diag.warnings.len(),
            },
            columns,
            diagnostics: diag.clone(),
            aggregates,
        }
    }

    /// Write a report as `<name>_report.json` in the output directory.
    pub fn write_report(&self, report: &CleaningReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let report_path = self
            .output_dir
            .join(format!("{}_report.json", self.output_name()));
        let mut file = File::create(&report_path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;

        info!("Report saved: {}", report_path.display());
        Ok(report_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::Pipeline;
    use pretty_assertions::assert_eq;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sales_cleaner_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn run() -> PipelineResult {
        let raw = df! {
            "Order Date" => &["2024-01-05", "05/01/2024"],
            "Region" => &["north", "usa"],
            "Total Sales" => &["$10", "$20"],
        }
        .unwrap();
        Pipeline::builder().build().unwrap().process(&raw).unwrap()
    }

    #[test]
    fn test_write_cleaned_csv() {
        let dir = temp_dir("csv");
        let generator = ReportGenerator::new(dir.clone(), Some("march".to_string()));
        let mut result = run();

        let path = generator.write_cleaned_csv(&mut result.cleaned).unwrap();
        let content = fs::read_to_string(&path).unwrap();

        assert_eq!(path, dir.join("march.csv"));
        assert!(content.starts_with("Order Date,Region,Total Sales"));
        assert!(content.contains("2024-01-05,North,10"));
        assert!(content.contains("United States"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_build_and_write_report() {
        let dir = temp_dir("report");
        let generator = ReportGenerator::new(dir.clone(), None);
        let result = run();

        let report = ReportGenerator::build_report(
            Path::new("sales.csv"),
            None,
            &result,
            AggregateReport::default(),
        );
        assert_eq!(report.summary.rows_after, 2);
        assert_eq!(report.columns.len(), 3);

        let path = generator.write_report(&report).unwrap();
        assert_eq!(path, dir.join("cleaned_sales_report.json"));

        let parsed: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["summary"]["rows_before"], 2);
        assert_eq!(parsed["input_file"], "sales.csv");

        fs::remove_dir_all(&dir).unwrap();
    }
}
