//! Type coercion for identifier, category, date and count columns.

use super::converters::{
    cell_to_date, cell_to_number, cell_to_text, date_series, numeric_series, raw_cells,
    text_series,
};
use super::sanitizers::sanitize_cells;
use crate::config::{ColumnSpec, PipelineConfig};
use crate::error::{CleaningError, Result};
use crate::pipeline::{CleaningStage, Stage, replace_column};
use crate::types::{ActionType, CleaningAction, PipelineDiagnostics, TargetType};
use polars::prelude::*;
use tracing::{debug, warn};

/// A converted column and how many present values were lost on the way.
#[derive(Debug, Clone)]
pub struct CoercedColumn {
    pub series: Series,
    /// Cells that held a value but could not be interpreted as the target
    /// type. Blanks and missing markers are not counted.
    pub coerced_to_missing: usize,
}

/// Converts raw columns into their declared target types.
#[derive(Debug, Clone)]
pub struct ColumnCoercer {
    columns: Vec<ColumnSpec>,
    date_formats: Vec<String>,
    missing_markers: Vec<String>,
}

impl ColumnCoercer {
    pub fn new(
        columns: Vec<ColumnSpec>,
        date_formats: Vec<String>,
        missing_markers: Vec<String>,
    ) -> Self {
        Self {
            columns,
            date_formats,
            missing_markers,
        }
    }

    /// Coercer for every non unit-bearing column of the configured schema.
    pub fn from_config(config: &PipelineConfig) -> Self {
        let columns = config
            .columns
            .iter()
            .filter(|c| !c.kind.is_unit_bearing())
            .cloned()
            .collect();
        Self::new(
            columns,
            config.date_formats.clone(),
            config.missing_markers.clone(),
        )
    }

    /// Coerce one column of `df` to `target`.
    ///
    /// Fails only when the column is absent; uninterpretable cells become
    /// missing and are counted.
    pub fn coerce(&self, df: &DataFrame, column: &str, target: TargetType) -> Result<CoercedColumn> {
        let series = df
            .column(column)
            .map_err(|_| CleaningError::ColumnNotFound(column.to_string()))?
            .as_materialized_series();

        match target {
            TargetType::Date => self.coerce_date(series),
            TargetType::Numeric => self.coerce_numeric(series),
            TargetType::Text => self.coerce_text(series),
        }
    }

    fn coerce_numeric(&self, series: &Series) -> Result<CoercedColumn> {
        let cells = sanitize_cells(raw_cells(series)?, &self.missing_markers);
        let mut lost = 0;
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| {
                let value = cell_to_number(cell);
                if value.is_none() && !cell.is_missing() {
                    lost += 1;
                }
                value
            })
            .collect();

        Ok(CoercedColumn {
            series: numeric_series(series.name().clone(), values),
            coerced_to_missing: lost,
        })
    }

    fn coerce_date(&self, series: &Series) -> Result<CoercedColumn> {
        match series.dtype() {
            DataType::Date => {
                return Ok(CoercedColumn {
                    series: series.clone(),
                    coerced_to_missing: 0,
                });
            }
            DataType::Datetime(_, _) => {
                let dates = series.cast(&DataType::Date).map_err(|e| {
                    CleaningError::TypeConversionFailed {
                        column: series.name().to_string(),
                        target_type: TargetType::Date.as_str().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                return Ok(CoercedColumn {
                    series: dates,
                    coerced_to_missing: 0,
                });
            }
            _ => {}
        }

        let cells = sanitize_cells(raw_cells(series)?, &self.missing_markers);
        let mut lost = 0;
        let dates: Vec<_> = cells
            .iter()
            .map(|cell| {
                let date = cell_to_date(cell, &self.date_formats);
                if date.is_none() && !cell.is_missing() {
                    lost += 1;
                }
                date
            })
            .collect();

        let series = date_series(series.name().clone(), &dates).map_err(|e| {
            CleaningError::TypeConversionFailed {
                column: series.name().to_string(),
                target_type: TargetType::Date.as_str().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(CoercedColumn {
            series,
            coerced_to_missing: lost,
        })
    }

    fn coerce_text(&self, series: &Series) -> Result<CoercedColumn> {
        let cells = sanitize_cells(raw_cells(series)?, &self.missing_markers);
        let values: Vec<Option<String>> = cells.iter().map(cell_to_text).collect();

        Ok(CoercedColumn {
            series: text_series(series.name().clone(), values),
            coerced_to_missing: 0,
        })
    }
}

impl Stage for ColumnCoercer {
    fn stage(&self) -> CleaningStage {
        CleaningStage::Coercion
    }

    fn describe(&self) -> String {
        format!("Coerce {} columns to their declared types", self.columns.len())
    }

    fn columns(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    fn apply(&self, df: &DataFrame, diagnostics: &mut PipelineDiagnostics) -> Result<DataFrame> {
        let mut out = df.clone();

        for spec in &self.columns {
            if diagnostics.is_halted(&spec.name) {
                continue;
            }

            let target = spec.kind.target_type();
            match self.coerce(&out, &spec.name, target) {
                Ok(coerced) => {
                    replace_column(&mut out, &spec.name, coerced.series)?;
                    diagnostics.record_coerced_to_missing(&spec.name, coerced.coerced_to_missing);
                    if coerced.coerced_to_missing > 0 {
                        debug!(
                            "Column '{}': {} values could not be read as {}",
                            spec.name,
                            coerced.coerced_to_missing,
                            target.as_str()
                        );
                    }
                    diagnostics.add_action(CleaningAction::new(
                        ActionType::TypeCoerced,
                        &spec.name,
                        format!(
                            "Coerced to {} ({} values set to missing)",
                            target.as_str(),
                            coerced.coerced_to_missing
                        ),
                    ));
                }
                Err(e) if e.is_column_level() => {
                    warn!("Skipping column '{}': {}", spec.name, e);
                    diagnostics.record_column_error(self.stage(), &spec.name, &e);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ColumnKind;
    use pretty_assertions::assert_eq;

    fn coercer() -> ColumnCoercer {
        ColumnCoercer::new(
            vec![
                ColumnSpec::new("Order Date", ColumnKind::Date),
                ColumnSpec::new("Quantity", ColumnKind::Count),
                ColumnSpec::new("Region", ColumnKind::Category),
            ],
            vec!["%Y-%m-%d".to_string(), "%d/%m/%Y".to_string()],
            vec!["n/a".to_string(), "null".to_string()],
        )
    }

    #[test]
    fn test_coerce_dates_with_unparseable_values() {
        let df = df! {
            "Order Date" => &[Some("2024-01-05"), Some("bad-date"), Some("05/02/2024"), None],
        }
        .unwrap();

        let coerced = coercer().coerce(&df, "Order Date", TargetType::Date).unwrap();

        assert_eq!(coerced.series.dtype(), &DataType::Date);
        assert_eq!(coerced.series.null_count(), 2);
        assert_eq!(coerced.coerced_to_missing, 1);
        // 2024-02-05 is 19758 days after the epoch
        assert_eq!(coerced.series.get(2).unwrap(), AnyValue::Date(19758));
    }

    #[test]
    fn test_coerce_numeric_counts_only_present_values() {
        let df = df! {
            "Quantity" => &[Some("3"), Some("N/A"), Some("three"), Some(""), None, Some("1,200")],
        }
        .unwrap();

        let coerced = coercer().coerce(&df, "Quantity", TargetType::Numeric).unwrap();

        assert_eq!(coerced.coerced_to_missing, 1);
        assert_eq!(coerced.series.null_count(), 4);
        assert_eq!(coerced.series.get(5).unwrap().try_extract::<f64>().unwrap(), 1200.0);
    }

    #[test]
    fn test_coerce_text_trims() {
        let df = df! { "Region" => &[Some(" north "), Some("null")] }.unwrap();

        let coerced = coercer().coerce(&df, "Region", TargetType::Text).unwrap();
        let values: Vec<Option<&str>> = coerced.series.str().unwrap().into_iter().collect();

        assert_eq!(values, vec![Some("north"), None]);
    }

    #[test]
    fn test_coerce_missing_column() {
        let df = df! { "Region" => &["North"] }.unwrap();
        let err = coercer()
            .coerce(&df, "Order Date", TargetType::Date)
            .unwrap_err();
        assert!(matches!(err, CleaningError::ColumnNotFound(_)));
    }

    #[test]
    fn test_coercion_is_idempotent() {
        let df = df! {
            "Order Date" => &[Some("2024-01-05"), Some("bad")],
            "Quantity" => &[Some("2"), Some("x")],
            "Region" => &[Some(" North"), None],
        }
        .unwrap();

        let mut diag = PipelineDiagnostics::new();
        let once = coercer().apply(&df, &mut diag).unwrap();
        let mut diag_again = PipelineDiagnostics::new();
        let twice = coercer().apply(&once, &mut diag_again).unwrap();

        assert!(once.equals_missing(&twice));
        assert_eq!(diag_again.total_coerced_to_missing(), 0);
    }

    #[test]
    fn test_stage_records_absent_column_and_continues() {
        let df = df! { "Quantity" => &["4"] }.unwrap();
        let mut diag = PipelineDiagnostics::new();

        let out = coercer().apply(&df, &mut diag).unwrap();

        assert_eq!(out.column("Quantity").unwrap().dtype(), &DataType::Float64);
        assert!(diag.is_halted("Order Date"));
        assert!(diag.is_halted("Region"));
        assert_eq!(diag.column_errors.len(), 2);
    }
}
