//! Imputation module for handling missing values.
//!
//! This module provides:
//! - Statistical fill values (mean, median)
//! - The per-column missing-value resolver stage

mod resolver;
mod statistical;

pub use resolver::MissingValueResolver;
pub use statistical::StatisticalImputer;
