//! Core value types shared across the cleaning stages.

use crate::error::CleaningError;
use crate::pipeline::CleaningStage;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

// ============================================================================
// Raw cells and column roles
// ============================================================================

/// A single untyped cell from the raw table.
///
/// Raw tables mix text, numbers, and nulls within one column, so every
/// coercion starts from this tagged union instead of the column dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum RawCell {
    Text(String),
    Number(f64),
    Missing,
}

impl RawCell {
    pub fn is_missing(&self) -> bool {
        matches!(self, RawCell::Missing)
    }

    /// String form of the cell, `None` when missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawCell::Text(s) => Some(s.clone()),
            RawCell::Number(n) => Some(format_number(*n)),
            RawCell::Missing => None,
        }
    }
}

impl From<AnyValue<'_>> for RawCell {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => RawCell::Missing,
            AnyValue::String(s) => RawCell::Text(s.to_string()),
            AnyValue::StringOwned(s) => RawCell::Text(s.to_string()),
            AnyValue::Int8(v) => RawCell::Number(v as f64),
            AnyValue::Int16(v) => RawCell::Number(v as f64),
            AnyValue::Int32(v) => RawCell::Number(v as f64),
            AnyValue::Int64(v) => RawCell::Number(v as f64),
            AnyValue::UInt8(v) => RawCell::Number(v as f64),
            AnyValue::UInt16(v) => RawCell::Number(v as f64),
            AnyValue::UInt32(v) => RawCell::Number(v as f64),
            AnyValue::UInt64(v) => RawCell::Number(v as f64),
            AnyValue::Float32(v) => RawCell::Number(v as f64),
            AnyValue::Float64(v) => RawCell::Number(v),
            other => RawCell::Text(other.to_string()),
        }
    }
}

/// Render a number without a trailing `.0` for integral values.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Typed representation a column is coerced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Numeric,
    Date,
    Text,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Date => "date",
            Self::Text => "text",
        }
    }
}

/// Role of a column in the fixed retail schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Invoice/order id, customer name: trimmed text.
    Identifier,
    /// Product category, region/country: canonicalized text.
    Category,
    /// Order or shipping date.
    Date,
    /// Monetary amount possibly tagged with symbols or codes.
    Currency,
    /// Units sold.
    Count,
    /// Profit margin in mixed fraction/percent scales.
    Percentage,
}

impl ColumnKind {
    /// Type the column ends up as in the cleaned table.
    pub fn target_type(&self) -> TargetType {
        match self {
            Self::Identifier | Self::Category => TargetType::Text,
            Self::Date => TargetType::Date,
            Self::Currency | Self::Count | Self::Percentage => TargetType::Numeric,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.target_type() == TargetType::Numeric
    }

    /// Currency and percentage columns carry unit markers and are parsed by
    /// the normalizer rather than the coercer.
    pub fn is_unit_bearing(&self) -> bool {
        matches!(self, Self::Currency | Self::Percentage)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Per-column counters collected while the pipeline runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnDiagnostics {
    pub name: String,
    /// Cells that held a value in the raw table but could not be interpreted.
    pub coerced_to_missing: usize,
    /// Cells filled by the missing-value resolver.
    pub imputed: usize,
    /// Statistic used for imputation, if one was computed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imputation_value: Option<f64>,
    /// Set once a column-level error stopped this column's stages.
    pub halted: bool,
}

impl ColumnDiagnostics {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A column-level failure recorded instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnError {
    pub column: String,
    pub stage: CleaningStage,
    pub code: String,
    pub message: String,
}

/// Types of actions taken during cleaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A column was coerced to its declared type.
    TypeCoerced,
    /// Unit markers were stripped and values rescaled.
    UnitsNormalized,
    /// Category labels were normalized and remapped.
    Canonicalized,
    /// Missing values were imputed.
    ValueImputed,
    /// Rows were removed from the table.
    RowsRemoved,
    /// Duplicate rows were removed.
    DuplicatesRemoved,
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name or "dataset".
    pub target: String,
    pub description: String,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
        }
    }
}

/// Everything the pipeline observed while producing the cleaned table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineDiagnostics {
    /// Total execution time in milliseconds.
    pub duration_ms: u64,
    pub rows_before: usize,
    pub rows_after: usize,
    /// Rows removed because a required field was still missing.
    pub rows_dropped_by_admission: usize,
    /// Rows removed by a column's `drop` imputation policy.
    pub rows_dropped_by_policy: usize,
    pub duplicates_removed: usize,
    pub columns: Vec<ColumnDiagnostics>,
    pub column_errors: Vec<ColumnError>,
    pub actions: Vec<CleaningAction>,
    pub warnings: Vec<String>,
}

impl PipelineDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the counters for a column, creating them on first use.
    pub fn column_mut(&mut self, name: &str) -> &mut ColumnDiagnostics {
        let idx = match self.columns.iter().position(|c| c.name == name) {
            Some(idx) => idx,
            None => {
                self.columns.push(ColumnDiagnostics::new(name));
                self.columns.len() - 1
            }
        };
        &mut self.columns[idx]
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDiagnostics> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn record_coerced_to_missing(&mut self, name: &str, count: usize) {
        self.column_mut(name).coerced_to_missing += count;
    }

    pub fn record_imputed(&mut self, name: &str, count: usize, value: f64) {
        let col = self.column_mut(name);
        col.imputed += count;
        col.imputation_value = Some(value);
    }

    /// Record a column-level error and halt the column's remaining stages.
    pub fn record_column_error(&mut self, stage: CleaningStage, column: &str, error: &CleaningError) {
        self.column_mut(column).halted = true;
        self.column_errors.push(ColumnError {
            column: column.to_string(),
            stage,
            code: error.error_code().to_string(),
            message: error.to_string(),
        });
    }

    pub fn is_halted(&self, name: &str) -> bool {
        self.column(name).is_some_and(|c| c.halted)
    }

    pub fn coerced_to_missing(&self, name: &str) -> usize {
        self.column(name).map_or(0, |c| c.coerced_to_missing)
    }

    pub fn imputed(&self, name: &str) -> usize {
        self.column(name).map_or(0, |c| c.imputed)
    }

    pub fn total_imputed(&self) -> usize {
        self.columns.iter().map(|c| c.imputed).sum()
    }

    pub fn total_coerced_to_missing(&self) -> usize {
        self.columns.iter().map(|c| c.coerced_to_missing).sum()
    }

    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Percentage of input rows that did not reach the cleaned table.
    pub fn rows_removed_percentage(&self) -> f32 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_before.saturating_sub(self.rows_after) as f32 / self.rows_before as f32)
                * 100.0
        }
    }
}

/// Output of a pipeline run: the cleaned table plus diagnostics.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub cleaned: DataFrame,
    pub diagnostics: PipelineDiagnostics,
}

impl PipelineResult {
    pub fn is_empty(&self) -> bool {
        self.cleaned.height() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_cell_from_any_value() {
        assert_eq!(RawCell::from(AnyValue::Null), RawCell::Missing);
        assert_eq!(
            RawCell::from(AnyValue::String("$9.99")),
            RawCell::Text("$9.99".to_string())
        );
        assert_eq!(RawCell::from(AnyValue::Int64(3)), RawCell::Number(3.0));
        assert_eq!(RawCell::from(AnyValue::Float64(0.15)), RawCell::Number(0.15));
    }

    #[test]
    fn test_raw_cell_as_text() {
        assert_eq!(RawCell::Number(42.0).as_text(), Some("42".to_string()));
        assert_eq!(RawCell::Number(0.5).as_text(), Some("0.5".to_string()));
        assert_eq!(RawCell::Missing.as_text(), None);
    }

    #[test]
    fn test_column_kind_target_type() {
        assert_eq!(ColumnKind::Category.target_type(), TargetType::Text);
        assert_eq!(ColumnKind::Date.target_type(), TargetType::Date);
        assert!(ColumnKind::Percentage.is_numeric());
        assert!(ColumnKind::Currency.is_unit_bearing());
        assert!(!ColumnKind::Count.is_unit_bearing());
    }

    #[test]
    fn test_diagnostics_column_counters() {
        let mut diag = PipelineDiagnostics::new();
        diag.record_coerced_to_missing("Quantity", 2);
        diag.record_coerced_to_missing("Quantity", 1);
        diag.record_imputed("Quantity", 3, 4.5);

        assert_eq!(diag.coerced_to_missing("Quantity"), 3);
        assert_eq!(diag.imputed("Quantity"), 3);
        assert_eq!(diag.columns.len(), 1);
        assert_eq!(diag.imputed("Region"), 0);
    }

    #[test]
    fn test_record_column_error_halts_column() {
        let mut diag = PipelineDiagnostics::new();
        let err = CleaningError::ColumnNotFound("Ship Date".to_string());
        diag.record_column_error(CleaningStage::Coercion, "Ship Date", &err);

        assert!(diag.is_halted("Ship Date"));
        assert_eq!(diag.column_errors.len(), 1);
        assert_eq!(diag.column_errors[0].code, "COLUMN_NOT_FOUND");
    }
}
