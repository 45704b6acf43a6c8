//! Configuration types for the cleaning pipeline.
//!
//! Everything that steers a run is declarative: the fixed column schema,
//! per-column imputation policies, the canonicalization map, accepted date
//! formats, required fields, and CSV options. Configuration can be built in
//! code with [`PipelineConfig::builder()`] or loaded from a JSON file.

use crate::cleaner::CanonicalMap;
use crate::error::{CleaningError, Result};
use crate::types::ColumnKind;
use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Date formats tried in order when no formats are configured.
pub const DEFAULT_DATE_FORMATS: [&str; 8] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y-%m-%d %H:%M:%S",
];

/// Values treated as missing before any coercion (compared lower-cased).
pub const DEFAULT_MISSING_MARKERS: [&str; 7] = ["n/a", "na", "null", "none", "nan", "#n/a", "missing"];

/// Policy for resolving missing values in a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputationPolicy {
    /// Fill with the mean of the known values
    Mean,
    /// Fill with the median of the known values
    Median,
    /// Remove rows where this column is missing
    Drop,
}

impl ImputationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Drop => "drop",
        }
    }
}

/// One column of the fixed schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Text encoding of the input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InputEncoding {
    /// Strict UTF-8
    #[default]
    Utf8,
    /// UTF-8 with invalid sequences replaced
    LossyUtf8,
}

/// Options for reading the delimited input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvOptions {
    pub delimiter: char,
    pub has_header: bool,
    pub encoding: InputEncoding,
}

impl CsvOptions {
    /// The delimiter as a byte. Only meaningful after validation.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
            encoding: InputEncoding::Utf8,
        }
    }
}

/// Columns the aggregator groups and sums over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportColumns {
    pub date: Option<String>,
    pub region: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub margin: Option<String>,
}

impl Default for ReportColumns {
    fn default() -> Self {
        Self {
            date: Some("Order Date".to_string()),
            region: Some("Region".to_string()),
            category: Some("Product Category".to_string()),
            amount: Some("Total Sales".to_string()),
            margin: Some("Profit Margin".to_string()),
        }
    }
}

/// Configuration for the cleaning pipeline.
///
/// # Example
///
/// ```rust,ignore
/// use sales_cleaner::config::{ImputationPolicy, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .imputation("Quantity", ImputationPolicy::Median)
///     .canonical("Elec", "Electronics")
///     .required_fields(["Order Date", "Region", "Total Sales"])
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The fixed column schema, in table order.
    pub columns: Vec<ColumnSpec>,

    /// Imputation policy per numeric column. Columns without an entry keep
    /// their missing values.
    pub imputation: BTreeMap<String, ImputationPolicy>,

    /// Non-canonical category spelling -> canonical label.
    pub canonical_map: BTreeMap<String, String>,

    /// chrono format strings, tried in order; the first match wins.
    pub date_formats: Vec<String>,

    /// Fields that must be present for a row to be admitted.
    pub required_fields: Vec<String>,

    /// Raw values treated as missing (case-insensitive).
    pub missing_markers: Vec<String>,

    /// Remove exact duplicate rows after admission.
    /// Default: false
    pub remove_duplicates: bool,

    /// Input file options.
    pub csv: CsvOptions,

    /// Columns used by the aggregate report.
    pub report: ReportColumns,

    /// Output directory for the cleaned table and reports.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, uses "cleaned_sales".
    pub output_name: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: default_columns(),
            imputation: default_imputation(),
            canonical_map: default_canonical_map(),
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|s| s.to_string()).collect(),
            required_fields: vec![
                "Order Date".to_string(),
                "Region".to_string(),
                "Total Sales".to_string(),
            ],
            missing_markers: DEFAULT_MISSING_MARKERS.iter().map(|s| s.to_string()).collect(),
            remove_duplicates: false,
            csv: CsvOptions::default(),
            report: ReportColumns::default(),
            output_dir: PathBuf::from("outputs"),
            output_name: None,
        }
    }
}

fn default_columns() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("Order ID", ColumnKind::Identifier),
        ColumnSpec::new("Customer Name", ColumnKind::Identifier),
        ColumnSpec::new("Product Category", ColumnKind::Category),
        ColumnSpec::new("Region", ColumnKind::Category),
        ColumnSpec::new("Order Date", ColumnKind::Date),
        ColumnSpec::new("Ship Date", ColumnKind::Date),
        ColumnSpec::new("Unit Price", ColumnKind::Currency),
        ColumnSpec::new("Total Sales", ColumnKind::Currency),
        ColumnSpec::new("Quantity", ColumnKind::Count),
        ColumnSpec::new("Profit Margin", ColumnKind::Percentage),
    ]
}

fn default_imputation() -> BTreeMap<String, ImputationPolicy> {
    BTreeMap::from([
        ("Unit Price".to_string(), ImputationPolicy::Median),
        ("Quantity".to_string(), ImputationPolicy::Median),
        ("Profit Margin".to_string(), ImputationPolicy::Mean),
    ])
}

fn default_canonical_map() -> BTreeMap<String, String> {
    [
        ("Elec", "Electronics"),
        ("Electronic", "Electronics"),
        ("Furn", "Furniture"),
        ("Office", "Office Supplies"),
        ("Usa", "United States"),
        ("Us", "United States"),
        ("Uk", "United Kingdom"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Load and validate a configuration from a JSON file.
    ///
    /// Fields missing from the file keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| CleaningError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Look up the schema entry for a column.
    pub fn column_spec(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Build the canonicalization map from the configured entries.
    pub fn canonical_map(&self) -> std::result::Result<CanonicalMap, ConfigValidationError> {
        CanonicalMap::new(self.canonical_map.clone())
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        let mut seen = HashSet::new();
        for spec in &self.columns {
            if spec.name.trim().is_empty() {
                return Err(ConfigValidationError::EmptyColumnName);
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(ConfigValidationError::DuplicateColumn(spec.name.clone()));
            }
        }

        for (column, policy) in &self.imputation {
            let spec = self
                .column_spec(column)
                .ok_or_else(|| ConfigValidationError::UnknownColumn(column.clone()))?;
            if !spec.kind.is_numeric() {
                return Err(ConfigValidationError::NonNumericImputation {
                    column: column.clone(),
                    policy: policy.as_str().to_string(),
                });
            }
        }

        if self.date_formats.is_empty() {
            return Err(ConfigValidationError::NoDateFormats);
        }
        for format in &self.date_formats {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(ConfigValidationError::InvalidDateFormat(format.clone()));
            }
        }

        let mut required = HashSet::new();
        for field in &self.required_fields {
            if !required.insert(field.as_str()) {
                return Err(ConfigValidationError::DuplicateRequiredField(field.clone()));
            }
        }

        if !self.csv.delimiter.is_ascii() || self.csv.delimiter == '"' {
            return Err(ConfigValidationError::InvalidDelimiter(self.csv.delimiter));
        }

        self.canonical_map()?;
        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Column names must not be empty")]
    EmptyColumnName,

    #[error("Column '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("Column '{0}' is not part of the configured schema")]
    UnknownColumn(String),

    #[error("Imputation policy '{policy}' set on non-numeric column '{column}'")]
    NonNumericImputation { column: String, policy: String },

    #[error("At least one date format is required")]
    NoDateFormats,

    #[error("Invalid date format: '{0}'")]
    InvalidDateFormat(String),

    #[error("Required field '{0}' is listed more than once")]
    DuplicateRequiredField(String),

    #[error("Invalid CSV delimiter: {0:?} (must be a single ASCII character other than '\"')")]
    InvalidDelimiter(char),

    #[error("Canonicalization map has an empty key or label")]
    EmptyCanonicalEntry,

    #[error("Canonicalization key '{0}' maps to more than one label")]
    ConflictingCanonicalKey(String),

    #[error("Canonical label '{label}' for '{key}' is itself remapped to '{target}'")]
    CanonicalChain {
        key: String,
        label: String,
        target: String,
    },
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    columns: Option<Vec<ColumnSpec>>,
    imputation: Option<BTreeMap<String, ImputationPolicy>>,
    canonical_map: Option<BTreeMap<String, String>>,
    date_formats: Option<Vec<String>>,
    required_fields: Option<Vec<String>>,
    missing_markers: Option<Vec<String>>,
    remove_duplicates: Option<bool>,
    csv: Option<CsvOptions>,
    report: Option<ReportColumns>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
}

impl PipelineConfigBuilder {
    /// Replace the column schema.
    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        self.columns = Some(columns.into_iter().collect());
        self
    }

    /// Add or replace one column of the schema.
    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        let name = name.into();
        let columns = self.columns.get_or_insert_with(default_columns);
        match columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.kind = kind,
            None => columns.push(ColumnSpec::new(name, kind)),
        }
        self
    }

    /// Replace all imputation policies.
    pub fn imputation_policies(
        mut self,
        policies: impl IntoIterator<Item = (String, ImputationPolicy)>,
    ) -> Self {
        self.imputation = Some(policies.into_iter().collect());
        self
    }

    /// Set the imputation policy of one column, keeping the others.
    pub fn imputation(mut self, column: impl Into<String>, policy: ImputationPolicy) -> Self {
        self.imputation
            .get_or_insert_with(default_imputation)
            .insert(column.into(), policy);
        self
    }

    /// Replace the canonicalization map.
    pub fn canonical_map(mut self, map: impl IntoIterator<Item = (String, String)>) -> Self {
        self.canonical_map = Some(map.into_iter().collect());
        self
    }

    /// Add one canonicalization entry, keeping the others.
    pub fn canonical(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.canonical_map
            .get_or_insert_with(default_canonical_map)
            .insert(from.into(), to.into());
        self
    }

    /// Replace the accepted date formats (chrono syntax, tried in order).
    pub fn date_formats<S: Into<String>>(mut self, formats: impl IntoIterator<Item = S>) -> Self {
        self.date_formats = Some(formats.into_iter().map(Into::into).collect());
        self
    }

    /// Set the fields a row needs to be admitted.
    pub fn required_fields<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.required_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the raw values treated as missing.
    pub fn missing_markers<S: Into<String>>(mut self, markers: impl IntoIterator<Item = S>) -> Self {
        self.missing_markers = Some(markers.into_iter().map(Into::into).collect());
        self
    }

    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.remove_duplicates = Some(remove);
        self
    }

    /// Set the CSV delimiter.
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.csv.get_or_insert_with(CsvOptions::default).delimiter = delimiter;
        self
    }

    /// Set whether the input has a header row.
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.csv.get_or_insert_with(CsvOptions::default).has_header = has_header;
        self
    }

    /// Set the input encoding.
    pub fn encoding(mut self, encoding: InputEncoding) -> Self {
        self.csv.get_or_insert_with(CsvOptions::default).encoding = encoding;
        self
    }

    /// Set the columns used by the aggregate report.
    pub fn report_columns(mut self, report: ReportColumns) -> Self {
        self.report = Some(report);
        self
    }

    /// Set the output directory for the cleaned table and reports.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            columns: self.columns.unwrap_or(defaults.columns),
            imputation: self.imputation.unwrap_or(defaults.imputation),
            canonical_map: self.canonical_map.unwrap_or(defaults.canonical_map),
            date_formats: self.date_formats.unwrap_or(defaults.date_formats),
            required_fields: self.required_fields.unwrap_or(defaults.required_fields),
            missing_markers: self.missing_markers.unwrap_or(defaults.missing_markers),
            remove_duplicates: self.remove_duplicates.unwrap_or(defaults.remove_duplicates),
            csv: self.csv.unwrap_or(defaults.csv),
            report: self.report.unwrap_or(defaults.report),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            output_name: self.output_name,
        };

        config.validate()?;
        Ok(config)
    }
}
