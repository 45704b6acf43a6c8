//! Column-wise cleaning stages.
//!
//! This module provides:
//! - Type coercion for identifier, category, date and count columns
//! - Unit normalization for currency and percentage columns
//! - Category canonicalization through a validated [`CanonicalMap`]
//! - Raw value sanitization shared by the stages above

mod canonicalizer;
mod coercer;
mod converters;
mod normalizer;
mod sanitizers;

pub use canonicalizer::{CanonicalMap, CanonicalizedColumn, Canonicalizer, normalize_label};
pub use coercer::{CoercedColumn, ColumnCoercer};
pub use converters::{epoch_days_to_date, parse_date};
pub use normalizer::{UnitNormalizer, parse_currency, parse_percentage, rescale_percentage};
