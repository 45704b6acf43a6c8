//! Per-column missing-value resolution.

use super::statistical::StatisticalImputer;
use crate::config::{ImputationPolicy, PipelineConfig};
use crate::error::{CleaningError, Result};
use crate::pipeline::{CleaningStage, Stage, replace_column};
use crate::types::{ActionType, CleaningAction, PipelineDiagnostics};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Resolves missing values column by column according to policy.
///
/// Every fill statistic is computed from the table as it enters this stage,
/// before any column is filled or any row is dropped, so the outcome for one
/// column never depends on another column's policy. `drop` policies are
/// applied last.
#[derive(Debug, Clone)]
pub struct MissingValueResolver {
    policies: BTreeMap<String, ImputationPolicy>,
}

impl MissingValueResolver {
    pub fn new(policies: BTreeMap<String, ImputationPolicy>) -> Self {
        Self { policies }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.imputation.clone())
    }

    pub fn policies(&self) -> &BTreeMap<String, ImputationPolicy> {
        &self.policies
    }
}

impl Stage for MissingValueResolver {
    fn stage(&self) -> CleaningStage {
        CleaningStage::Imputation
    }

    fn describe(&self) -> String {
        format!("Resolve missing values in {} columns", self.policies.len())
    }

    fn columns(&self) -> Vec<String> {
        self.policies.keys().cloned().collect()
    }

    fn apply(&self, df: &DataFrame, diagnostics: &mut PipelineDiagnostics) -> Result<DataFrame> {
        let mut fills: Vec<(&str, f64)> = Vec::new();
        let mut drop_columns: Vec<&str> = Vec::new();

        for (column, policy) in &self.policies {
            if diagnostics.is_halted(column) {
                continue;
            }
            let Ok(col) = df.column(column) else {
                let err = CleaningError::ColumnNotFound(column.clone());
                warn!("Skipping column '{}': {}", column, err);
                diagnostics.record_column_error(self.stage(), column, &err);
                continue;
            };
            let series = col.as_materialized_series();

            if *policy == ImputationPolicy::Drop {
                drop_columns.push(column.as_str());
                continue;
            }
            if series.null_count() == 0 {
                continue;
            }

            match StatisticalImputer::statistic(series, *policy)? {
                Some(value) => fills.push((column.as_str(), value)),
                None => {
                    warn!(
                        "Column '{}' has no known values; {} imputation impossible",
                        column,
                        policy.as_str()
                    );
                    diagnostics.add_warning(format!(
                        "Column '{}': imputation impossible, every value is missing",
                        column
                    ));
                }
            }
        }

        let mut out = df.clone();

        for (column, value) in fills {
            let series = out.column(column)?.as_materialized_series().clone();
            let (filled, count) = StatisticalImputer::fill(&series, value)?;
            replace_column(&mut out, column, filled)?;
            diagnostics.record_imputed(column, count, value);
            debug!("Filled {} values in '{}' with {}", count, column, value);

            let policy = self.policies.get(column).map_or("", |p| p.as_str());
            diagnostics.add_action(CleaningAction::new(
                ActionType::ValueImputed,
                column,
                format!("Filled {} missing values with {} ({:.4})", count, policy, value),
            ));
        }

        if drop_columns.is_empty() {
            return Ok(out);
        }

        let mut mask = BooleanChunked::full("keep".into(), true, out.height());
        for column in &drop_columns {
            mask = &mask & &out.column(column)?.as_materialized_series().is_not_null();
        }

        let before = out.height();
        let out = out.filter(&mask)?;
        let dropped = before - out.height();
        diagnostics.rows_dropped_by_policy += dropped;

        if dropped > 0 {
            diagnostics.add_action(CleaningAction::new(
                ActionType::RowsRemoved,
                "dataset",
                format!(
                    "Dropped {} rows missing a value in: {}",
                    dropped,
                    drop_columns.join(", ")
                ),
            ));
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn resolver(entries: &[(&str, ImputationPolicy)]) -> MissingValueResolver {
        MissingValueResolver::new(
            entries
                .iter()
                .map(|(c, p)| (c.to_string(), *p))
                .collect(),
        )
    }

    fn floats(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
        df.column(column)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_median_fill() {
        let df = df! { "Quantity" => &[Some(1.0), None, Some(3.0), Some(10.0)] }.unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = resolver(&[("Quantity", ImputationPolicy::Median)])
            .apply(&df, &mut diag)
            .unwrap();

        assert_eq!(
            floats(&out, "Quantity"),
            vec![Some(1.0), Some(3.0), Some(3.0), Some(10.0)]
        );
        assert_eq!(diag.imputed("Quantity"), 1);
        assert_eq!(diag.column("Quantity").unwrap().imputation_value, Some(3.0));
    }

    #[test]
    fn test_statistics_use_input_table() {
        let df = df! {
            "Unit Price" => &[Some(10.0), None, Some(20.0)],
            "Quantity" => &[Some(1.0), Some(2.0), None],
        }
        .unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = resolver(&[
            ("Unit Price", ImputationPolicy::Mean),
            ("Quantity", ImputationPolicy::Drop),
        ])
        .apply(&df, &mut diag)
        .unwrap();

        // the mean includes the row that the drop policy later removes
        assert_eq!(floats(&out, "Unit Price"), vec![Some(10.0), Some(15.0)]);
        assert_eq!(diag.rows_dropped_by_policy, 1);
    }

    #[test]
    fn test_all_missing_column_warns() {
        let df = df! { "Profit Margin" => &[None::<f64>, None] }.unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = resolver(&[("Profit Margin", ImputationPolicy::Mean)])
            .apply(&df, &mut diag)
            .unwrap();

        assert_eq!(out.column("Profit Margin").unwrap().null_count(), 2);
        assert_eq!(diag.warnings.len(), 1);
        assert!(diag.warnings[0].contains("imputation impossible"));
        assert_eq!(diag.imputed("Profit Margin"), 0);
    }

    #[test]
    fn test_absent_column_is_recorded() {
        let df = df! { "Quantity" => &[Some(1.0)] }.unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = resolver(&[("Unit Price", ImputationPolicy::Median)])
            .apply(&df, &mut diag)
            .unwrap();

        assert_eq!(out.height(), 1);
        assert!(diag.is_halted("Unit Price"));
    }

    #[test]
    fn test_imputed_count_equals_prior_missing() {
        let df = df! { "Quantity" => &[None, Some(2.0), None, None] }.unwrap();
        let missing_before = df.column("Quantity").unwrap().null_count();
        let mut diag = PipelineDiagnostics::new();

        let out = resolver(&[("Quantity", ImputationPolicy::Mean)])
            .apply(&df, &mut diag)
            .unwrap();

        assert_eq!(diag.imputed("Quantity"), missing_before);
        assert_eq!(out.column("Quantity").unwrap().null_count(), 0);
    }
}
