//! Unit normalization for currency and percentage columns.
//!
//! Currency values arrive as `"$1,234.50"`, `"USD 99"` or plain numbers.
//! Percentages mix fractions (`0.15`) with whole percents (`"15%"`, `15`);
//! both end up on the whole-percent scale.

use super::coercer::CoercedColumn;
use super::converters::{numeric_series, raw_cells};
use super::sanitizers::sanitize_cells;
use crate::config::{ColumnSpec, PipelineConfig};
use crate::error::{CleaningError, Result};
use crate::pipeline::{CleaningStage, Stage, replace_column};
use crate::types::{ActionType, CleaningAction, ColumnKind, PipelineDiagnostics, RawCell};
use crate::utils::parse_decimal;
use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use tracing::warn;

static PERCENT_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(%|percent)\s*$").expect("Invalid regex"));

/// Parse a monetary amount by keeping only digits, the decimal point and a
/// leading minus sign.
///
/// ```rust,ignore
/// assert_eq!(parse_currency("$1,234.50"), Some(1234.5));
/// assert_eq!(parse_currency("USD -9.99"), Some(-9.99));
/// assert_eq!(parse_currency("free"), None);
/// ```
pub fn parse_currency(value: &str) -> Option<f64> {
    let mut digits = String::with_capacity(value.len());
    let mut negative = false;

    for c in value.chars() {
        if c.is_ascii_digit() || c == '.' {
            digits.push(c);
        } else if c == '-' && digits.is_empty() {
            negative = true;
        }
    }

    if digits.is_empty() {
        return None;
    }
    let amount = digits.parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(if negative { -amount } else { amount })
}

/// Parse a percentage, stripping a trailing `%` or `percent`. The result is
/// not rescaled.
pub fn parse_percentage(value: &str) -> Option<f64> {
    let stripped = PERCENT_SUFFIX.replace(value.trim(), "");
    parse_decimal(&stripped)
}

/// Bring a percentage onto the whole-percent scale.
///
/// Magnitudes below 1 are read as fractions and multiplied by 100; anything
/// else is already a whole percent.
pub fn rescale_percentage(value: f64) -> f64 {
    if value.abs() < 1.0 { value * 100.0 } else { value }
}

/// Normalizes currency and percentage columns to plain numbers.
#[derive(Debug, Clone)]
pub struct UnitNormalizer {
    columns: Vec<ColumnSpec>,
    missing_markers: Vec<String>,
}

impl UnitNormalizer {
    pub fn new(columns: Vec<ColumnSpec>, missing_markers: Vec<String>) -> Self {
        Self {
            columns: columns
                .into_iter()
                .filter(|c| c.kind.is_unit_bearing())
                .collect(),
            missing_markers,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.columns.clone(), config.missing_markers.clone())
    }

    /// Normalize one currency column.
    pub fn normalize_currency(&self, df: &DataFrame, column: &str) -> Result<CoercedColumn> {
        self.normalize_with(df, column, |cell| match cell {
            RawCell::Number(n) => Some(*n),
            RawCell::Text(s) => parse_currency(s),
            RawCell::Missing => None,
        })
    }

    /// Normalize one percentage column to the whole-percent scale.
    pub fn normalize_percentage(&self, df: &DataFrame, column: &str) -> Result<CoercedColumn> {
        self.normalize_with(df, column, |cell| {
            let value = match cell {
                RawCell::Number(n) => Some(*n),
                RawCell::Text(s) => parse_percentage(s),
                RawCell::Missing => None,
            };
            value.map(rescale_percentage)
        })
    }

    fn normalize_with<F>(&self, df: &DataFrame, column: &str, parse: F) -> Result<CoercedColumn>
    where
        F: Fn(&RawCell) -> Option<f64>,
    {
        let series = df
            .column(column)
            .map_err(|_| CleaningError::ColumnNotFound(column.to_string()))?
            .as_materialized_series();

        let cells = sanitize_cells(raw_cells(series)?, &self.missing_markers);
        let mut lost = 0;
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|cell| {
                let value = parse(cell);
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
}

impl Stage for UnitNormalizer {
    fn stage(&self) -> CleaningStage {
        CleaningStage::Normalization
    }

    fn describe(&self) -> String {
        format!("Normalize units in {} columns", self.columns.len())
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

            let result = match spec.kind {
                ColumnKind::Percentage => self.normalize_percentage(&out, &spec.name),
                _ => self.normalize_currency(&out, &spec.name),
            };

            match result {
                Ok(normalized) => {
                    replace_column(&mut out, &spec.name, normalized.series)?;
                    diagnostics
                        .record_coerced_to_missing(&spec.name, normalized.coerced_to_missing);
                    diagnostics.add_action(CleaningAction::new(
                        ActionType::UnitsNormalized,
                        &spec.name,
                        format!(
                            "Stripped {} markers ({} values set to missing)",
                            if spec.kind == ColumnKind::Percentage {
                                "percent"
                            } else {
                                "currency"
                            },
                            normalized.coerced_to_missing
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
