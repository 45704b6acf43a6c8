//! Shared utilities for the cleaning pipeline.
//!
//! This module contains the string and series helpers used by more than one
//! stage.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// String Utilities
// =============================================================================

/// Check if a raw value is one of the configured missing markers.
///
/// Empty and whitespace-only values always count as missing.
pub fn is_missing_marker(value: &str, markers: &[String]) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || markers.iter().any(|m| m.eq_ignore_ascii_case(trimmed))
}

/// Collapse runs of whitespace to one space and trim both ends.
pub fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title-case a string.
///
/// A letter is upper-cased when it starts a word (it is not preceded by
/// another letter); every other letter is lower-cased.
///
/// ```rust,ignore
/// assert_eq!(title_case("north-EAST"), "North-East");
/// assert_eq!(title_case("office supplies"), "Office Supplies");
/// ```
pub fn title_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut prev_is_letter = false;

    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                result.extend(c.to_lowercase());
            } else {
                result.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            result.push(c);
            prev_is_letter = false;
        }
    }

    result
}

/// Parse a plain decimal number, tolerating surrounding whitespace and
/// thousands separators. Non-finite results are rejected.
pub fn parse_decimal(value: &str) -> Option<f64> {
    let cleaned: String = value.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let floats = series.cast(&DataType::Float64)?;
    let values: Vec<Option<f64>> = floats
        .f64()?
        .into_iter()
        .map(|v| Some(v.unwrap_or(fill_value)))
        .collect();

    Ok(Series::new(series.name().clone(), values))
}

/// Names of all columns in a DataFrame as owned strings.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
