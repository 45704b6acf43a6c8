//! Category label normalization and remapping.
//!
//! Labels are trimmed, internal whitespace collapsed, title-cased and then
//! looked up in the [`CanonicalMap`]. The map is validated so that applying
//! the canonicalizer twice gives the same result as applying it once.

use super::converters::text_series;
use crate::config::{ConfigValidationError, PipelineConfig};
use crate::error::{CleaningError, Result};
use crate::pipeline::{CleaningStage, Stage, replace_column};
use crate::types::{ActionType, CleaningAction, ColumnKind, PipelineDiagnostics};
use crate::utils::{collapse_whitespace, title_case};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Normalize a label's spelling: trim, collapse whitespace, title-case.
pub fn normalize_label(value: &str) -> String {
    title_case(&collapse_whitespace(value))
}

/// Validated lookup from normalized spellings to canonical labels.
#[derive(Debug, Clone, Default)]
pub struct CanonicalMap {
    entries: HashMap<String, String>,
}

impl CanonicalMap {
    /// Build a map from raw `spelling -> label` entries.
    ///
    /// Keys are normalized with [`normalize_label`]. Every label is also
    /// registered under its own normalized form so canonical values stay
    /// put. Fails when an entry is empty, when two spellings collide on
    /// different labels, or when a label is itself remapped elsewhere.
    pub fn new(raw: BTreeMap<String, String>) -> std::result::Result<Self, ConfigValidationError> {
        let mut entries: HashMap<String, String> = HashMap::with_capacity(raw.len() * 2);

        for (key, label) in raw {
            let key = normalize_label(&key);
            let label = collapse_whitespace(&label);
            if key.is_empty() || label.is_empty() {
                return Err(ConfigValidationError::EmptyCanonicalEntry);
            }
            if let Some(previous) = entries.get(&key)
                && *previous != label
            {
                return Err(ConfigValidationError::ConflictingCanonicalKey(key));
            }
            entries.insert(key, label);
        }

        for (key, label) in &entries {
            if let Some(target) = entries.get(&normalize_label(label))
                && target != label
            {
                return Err(ConfigValidationError::CanonicalChain {
                    key: key.clone(),
                    label: label.clone(),
                    target: target.clone(),
                });
            }
        }

        let labels: Vec<String> = entries.values().cloned().collect();
        for label in labels {
            entries.entry(normalize_label(&label)).or_insert(label);
        }

        Ok(Self { entries })
    }

    /// Canonical label for an already-normalized spelling.
    pub fn get(&self, normalized: &str) -> Option<&str> {
        self.entries.get(normalized).map(String::as_str)
    }

    /// Normalize a raw value and map it to its canonical label.
    ///
    /// Values without an entry come back normalized but otherwise unchanged.
    pub fn canonicalize(&self, value: &str) -> String {
        let normalized = normalize_label(value);
        match self.get(&normalized) {
            Some(label) => label.to_string(),
            None => normalized,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Canonicalized column plus change counts.
#[derive(Debug, Clone)]
pub struct CanonicalizedColumn {
    pub series: Series,
    /// Values whose text changed in any way.
    pub changed: usize,
    /// Values replaced through a map entry rather than normalization alone.
    pub remapped: usize,
}

/// Applies label normalization and the canonical map to category columns.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    columns: Vec<String>,
    map: CanonicalMap,
}

impl Canonicalizer {
    pub fn new(columns: Vec<String>, map: CanonicalMap) -> Self {
        Self { columns, map }
    }

    pub fn from_config(config: &PipelineConfig) -> std::result::Result<Self, ConfigValidationError> {
        let columns = config
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Category)
            .map(|c| c.name.clone())
            .collect();
        Ok(Self::new(columns, config.canonical_map()?))
    }

    pub fn map(&self) -> &CanonicalMap {
        &self.map
    }

    /// Canonicalize one column of `df`. Missing values stay missing.
    pub fn canonicalize_column(&self, df: &DataFrame, column: &str) -> Result<CanonicalizedColumn> {
        let series = df
            .column(column)
            .map_err(|_| CleaningError::ColumnNotFound(column.to_string()))?
            .as_materialized_series();
        let text = series.cast(&DataType::String)?;

        let mut changed = 0;
        let mut remapped = 0;
        let values: Vec<Option<String>> = text
            .str()?
            .into_iter()
            .map(|value| {
                let value = value?;
                let normalized = normalize_label(value);
                if normalized.is_empty() {
                    changed += 1;
                    return None;
                }
                let canonical = match self.map.get(&normalized) {
                    Some(label) => {
                        if label != normalized {
                            remapped += 1;
                        }
                        label.to_string()
                    }
                    None => normalized,
                };
                if canonical != value {
                    changed += 1;
                }
                Some(canonical)
            })
            .collect();

        Ok(CanonicalizedColumn {
            series: text_series(series.name().clone(), values),
            changed,
            remapped,
        })
    }
}

impl Stage for Canonicalizer {
    fn stage(&self) -> CleaningStage {
        CleaningStage::Canonicalization
    }

    fn describe(&self) -> String {
        format!(
            "Canonicalize {} category columns ({} map entries)",
            self.columns.len(),
            self.map.len()
        )
    }

    fn columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn apply(&self, df: &DataFrame, diagnostics: &mut PipelineDiagnostics) -> Result<DataFrame> {
        let mut out = df.clone();

        for column in &self.columns {
            if diagnostics.is_halted(column) {
                continue;
            }

            match self.canonicalize_column(&out, column) {
                Ok(canonical) => {
                    replace_column(&mut out, column, canonical.series)?;
                    if canonical.changed > 0 {
                        diagnostics.add_action(CleaningAction::new(
                            ActionType::Canonicalized,
                            column,
                            format!(
                                "Normalized {} labels ({} remapped to canonical names)",
                                canonical.changed, canonical.remapped
                            ),
                        ));
                    }
                }
                Err(e) if e.is_column_level() => {
                    warn!("Skipping column '{}': {}", column, e);
                    diagnostics.record_column_error(self.stage(), column, &e);
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
    use pretty_assertions::assert_eq;

    fn map(entries: &[(&str, &str)]) -> std::result::Result<CanonicalMap, ConfigValidationError> {
        CanonicalMap::new(
            entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn strings(series: &Series) -> Vec<Option<String>> {
        series
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect()
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  office   supplies "), "Office Supplies");
        assert_eq!(normalize_label("ELEC"), "Elec");
    }

    #[test]
    fn test_spelling_variants_collapse() {
        let map = map(&[("elec", "Electronics"), ("Electronic", "Electronics")]).unwrap();

        for raw in ["ELEC", " elec", "Electronics", "electronic", "Elec "] {
            assert_eq!(map.canonicalize(raw), "Electronics", "raw value {raw:?}");
        }
    }

    #[test]
    fn test_unmapped_values_are_normalized() {
        let map = map(&[("Furn", "Furniture")]).unwrap();
        assert_eq!(map.canonicalize("  south   east "), "South East");
    }

    #[test]
    fn test_label_keeps_its_own_spelling() {
        let map = map(&[("usa", "USA")]).unwrap();
        assert_eq!(map.canonicalize("usa"), "USA");
        assert_eq!(map.canonicalize("USA"), "USA");
    }

    #[test]
    fn test_chain_rejected() {
        let err = map(&[("Elec", "Electronics"), ("Electronics", "Gadgets")]).unwrap_err();
        assert!(matches!(err, ConfigValidationError::CanonicalChain { .. }));
    }

    #[test]
    fn test_conflicting_keys_rejected() {
        let err = map(&[("elec", "Electronics"), ("ELEC", "Appliances")]).unwrap_err();
        assert!(matches!(err, ConfigValidationError::ConflictingCanonicalKey(_)));
    }

    #[test]
    fn test_empty_entry_rejected() {
        let err = map(&[("  ", "Electronics")]).unwrap_err();
        assert!(matches!(err, ConfigValidationError::EmptyCanonicalEntry));
    }

    #[test]
    fn test_canonicalize_column() {
        let canonicalizer = Canonicalizer::new(
            vec!["Product Category".to_string()],
            map(&[("Elec", "Electronics")]).unwrap(),
        );
        let df = df! {
            "Product Category" => &[Some("ELEC"), Some("Electronics"), None, Some("furniture")],
        }
        .unwrap();

        let out = canonicalizer
            .canonicalize_column(&df, "Product Category")
            .unwrap();

        assert_eq!(
            strings(&out.series),
            vec![
                Some("Electronics".to_string()),
                Some("Electronics".to_string()),
                None,
                Some("Furniture".to_string())
            ]
        );
        assert_eq!(out.changed, 2);
        assert_eq!(out.remapped, 1);
    }

    #[test]
    fn test_canonicalization_is_idempotent() {
        let canonicalizer = Canonicalizer::new(
            vec!["Region".to_string()],
            map(&[("Us", "United States"), ("Usa", "United States")]).unwrap(),
        );
        let df = df! { "Region" => &[" us ", "USA", "north  west", "United states"] }.unwrap();

        let once = canonicalizer.apply(&df, &mut PipelineDiagnostics::new()).unwrap();
        let twice = canonicalizer.apply(&once, &mut PipelineDiagnostics::new()).unwrap();

        assert!(once.equals_missing(&twice));
        assert_eq!(
            strings(once.column("Region").unwrap().as_materialized_series()),
            vec![
                Some("United States".to_string()),
                Some("United States".to_string()),
                Some("North West".to_string()),
                Some("United States".to_string())
            ]
        );
    }
}
