//! Custom error types for the sales cleaning pipeline.
//!
//! This module provides the error hierarchy using `thiserror`. Bad cell
//! values never show up here: they are recovered as missing values. These
//! errors cover the failures that stop a column (absent columns) or the
//! whole run (unreadable input, invalid configuration, polars failures).
//!
//! Errors are serializable so they can be embedded in JSON reports.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the cleaning pipeline.
#[derive(Error, Debug)]
pub enum CleaningError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A column could not be converted as a whole (cell failures are not errors).
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// Report or output generation failed.
    #[error("Failed to write output: {0}")]
    OutputFailed(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<CleaningError>,
    },
}

impl CleaningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        CleaningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code used in JSON reports.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::OutputFailed(_) => "OUTPUT_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Column-level errors halt one column's stages but never the pipeline.
    pub fn is_column_level(&self) -> bool {
        match self {
            Self::ColumnNotFound(_) | Self::TypeConversionFailed { .. } => true,
            Self::WithContext { source, .. } => source.is_column_level(),
            _ => false,
        }
    }
}

impl Serialize for CleaningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("CleaningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| CleaningError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            CleaningError::ColumnNotFound("Region".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            CleaningError::InvalidConfig("bad".to_string()).error_code(),
            "INVALID_CONFIG"
        );
    }

    #[test]
    fn test_is_column_level() {
        assert!(CleaningError::ColumnNotFound("Region".to_string()).is_column_level());
        assert!(
            CleaningError::ColumnNotFound("Region".to_string())
                .with_context("During coercion")
                .is_column_level()
        );
        assert!(!CleaningError::Internal("boom".to_string()).is_column_level());
    }

    #[test]
    fn test_error_serialization() {
        let error = CleaningError::ColumnNotFound("Total Sales".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("Total Sales"));
    }

    #[test]
    fn test_with_context() {
        let error =
            CleaningError::ColumnNotFound("Region".to_string()).with_context("During admission");
        assert!(error.to_string().contains("During admission"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }
}
