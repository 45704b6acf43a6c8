//! Row admission and duplicate removal.

use crate::config::PipelineConfig;
use crate::error::{CleaningError, Result};
use crate::pipeline::{CleaningStage, Stage};
use crate::types::{ActionType, CleaningAction, PipelineDiagnostics};
use polars::prelude::*;
use tracing::{debug, warn};

/// Keeps only rows where every required field holds a value.
///
/// A required column that is absent from the table can never be satisfied,
/// so every row is rejected and the column is recorded as an error.
#[derive(Debug, Clone)]
pub struct RowAdmissionFilter {
    required: Vec<String>,
}

impl RowAdmissionFilter {
    pub fn new(required: Vec<String>) -> Self {
        Self { required }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.required_fields.clone())
    }

    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Mask of rows that satisfy every required field, plus the required
    /// columns that are absent from `df`.
    pub fn admission_mask(&self, df: &DataFrame) -> (BooleanChunked, Vec<String>) {
        let mut mask = BooleanChunked::full("admit".into(), true, df.height());
        let mut absent = Vec::new();

        for field in &self.required {
            match df.column(field) {
                Ok(col) => mask = &mask & &col.as_materialized_series().is_not_null(),
                Err(_) => {
                    absent.push(field.clone());
                    mask = BooleanChunked::full("admit".into(), false, df.height());
                }
            }
        }

        (mask, absent)
    }
}

impl Stage for RowAdmissionFilter {
    fn stage(&self) -> CleaningStage {
        CleaningStage::Admission
    }

    fn describe(&self) -> String {
        format!("Admit rows with all of: {}", self.required.join(", "))
    }

    fn apply(&self, df: &DataFrame, diagnostics: &mut PipelineDiagnostics) -> Result<DataFrame> {
        let (mask, absent) = self.admission_mask(df);

        for field in &absent {
            warn!("Required field '{}' is absent; no row can be admitted", field);
            // Already reported by the stage that first failed on this column.
            if diagnostics.is_halted(field) {
                continue;
            }
            let err = CleaningError::ColumnNotFound(field.clone());
            diagnostics.record_column_error(self.stage(), field, &err);
        }

        let before = df.height();
        let admitted = df.filter(&mask)?;
        let dropped = before - admitted.height();
        diagnostics.rows_dropped_by_admission += dropped;
        debug!("Admission kept {} of {} rows", admitted.height(), before);

        if dropped > 0 {
            diagnostics.add_action(CleaningAction::new(
                ActionType::RowsRemoved,
                "dataset",
                format!("Dropped {} rows missing a required field", dropped),
            ));
        }

        if admitted.height() == 0 {
            warn!("Admission exhaustion: no rows satisfy the required fields");
            diagnostics.add_warning(format!(
                "Admission exhaustion: all {} rows were missing at least one of {}",
                before,
                self.required.join(", ")
            ));
        }

        Ok(admitted)
    }
}

/// Removes exact duplicate rows, keeping the first occurrence in order.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator;

impl Stage for Deduplicator {
    fn stage(&self) -> CleaningStage {
        CleaningStage::Deduplication
    }

    fn describe(&self) -> String {
        "Remove exact duplicate rows".to_string()
    }

    fn apply(&self, df: &DataFrame, diagnostics: &mut PipelineDiagnostics) -> Result<DataFrame> {
        let before = df.height();
        let unique = df
            .clone()
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        let removed = before - unique.height();
        diagnostics.duplicates_removed += removed;

        if removed > 0 {
            let pct = (removed as f64 / before as f64) * 100.0;
            debug!("Removed {} duplicate rows", removed);
            diagnostics.add_action(CleaningAction::new(
                ActionType::DuplicatesRemoved,
                "dataset",
                format!("Removed {} duplicate rows ({:.1}%)", removed, pct),
            ));
        }

        Ok(unique)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn filter() -> RowAdmissionFilter {
        RowAdmissionFilter::new(vec!["Order Date".to_string(), "Region".to_string()])
    }

    #[test]
    fn test_rows_missing_required_fields_are_dropped() {
        let df = df! {
            "Order Date" => &[Some("2024-01-05"), None, Some("2024-01-07")],
            "Region" => &[Some("North"), Some("South"), None],
            "Quantity" => &[Some(1.0), Some(2.0), None],
        }
        .unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = filter().apply(&df, &mut diag).unwrap();

        assert_eq!(out.height(), 1);
        assert_eq!(diag.rows_dropped_by_admission, 2);
        assert!(diag.warnings.is_empty());
    }

    #[test]
    fn test_admitted_rows_have_no_missing_required_values() {
        let df = df! {
            "Order Date" => &[Some("a"), None, Some("c"), Some("d")],
            "Region" => &[None, Some("x"), Some("y"), Some("z")],
        }
        .unwrap();

        let out = filter().apply(&df, &mut PipelineDiagnostics::new()).unwrap();

        for field in filter().required() {
            assert_eq!(out.column(field).unwrap().null_count(), 0);
        }
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_absent_required_column_drops_everything() {
        let df = df! { "Order Date" => &["2024-01-05", "2024-01-06"] }.unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = filter().apply(&df, &mut diag).unwrap();

        assert_eq!(out.height(), 0);
        assert_eq!(diag.rows_dropped_by_admission, 2);
        assert!(diag.is_halted("Region"));
        assert!(diag.warnings[0].starts_with("Admission exhaustion"));
    }

    #[test]
    fn test_column_already_halted_is_not_reported_again() {
        let df = df! { "Order Date" => &["2024-01-05"] }.unwrap();
        let mut diag = PipelineDiagnostics::new();
        diag.record_column_error(
            CleaningStage::Coercion,
            "Region",
            &CleaningError::ColumnNotFound("Region".to_string()),
        );

        let out = filter().apply(&df, &mut diag).unwrap();

        assert_eq!(out.height(), 0);
        assert_eq!(diag.column_errors.len(), 1);
        assert_eq!(diag.column_errors[0].stage, CleaningStage::Coercion);
    }

    #[test]
    fn test_no_required_fields_admits_all() {
        let df = df! { "Region" => &[None::<&str>, Some("North")] }.unwrap();

        let out = RowAdmissionFilter::new(vec![])
            .apply(&df, &mut PipelineDiagnostics::new())
            .unwrap();

        assert_eq!(out.height(), 2);
    }

    #[test]
    fn test_deduplicator_keeps_first_occurrence() {
        let df = df! {
            "Order ID" => &["A1", "A2", "A1", "A3"],
            "Region" => &["North", "South", "North", "East"],
        }
        .unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = Deduplicator.apply(&df, &mut diag).unwrap();
        let ids: Vec<Option<&str>> = out
            .column("Order ID")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();

        assert_eq!(ids, vec![Some("A1"), Some("A2"), Some("A3")]);
        assert_eq!(diag.duplicates_removed, 1);
    }
}
