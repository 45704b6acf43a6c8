//! Statistical fill values for numeric columns.

use crate::config::ImputationPolicy;
use crate::utils::fill_numeric_nulls;
use polars::prelude::*;

/// Mean and median imputation over numeric series.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Mean of the non-missing values, `None` when there are none.
    pub fn mean(series: &Series) -> PolarsResult<Option<f64>> {
        Ok(series.cast(&DataType::Float64)?.mean())
    }

    /// Median of the non-missing values, `None` when there are none.
    pub fn median(series: &Series) -> PolarsResult<Option<f64>> {
        Ok(series.cast(&DataType::Float64)?.median())
    }

    /// Fill value a policy would use for this series.
    ///
    /// `Drop` has no fill value.
    pub fn statistic(series: &Series, policy: ImputationPolicy) -> PolarsResult<Option<f64>> {
        match policy {
            ImputationPolicy::Mean => Self::mean(series),
            ImputationPolicy::Median => Self::median(series),
            ImputationPolicy::Drop => Ok(None),
        }
    }

    /// Fill every missing value with `value`, returning the filled series
    /// and the number of cells filled.
    pub fn fill(series: &Series, value: f64) -> PolarsResult<(Series, usize)> {
        let filled_count = series.null_count();
        if filled_count == 0 {
            return Ok((series.clone(), 0));
        }
        Ok((fill_numeric_nulls(series, value)?, filled_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mean_and_median_skip_missing() {
        let series = Series::new("q".into(), &[Some(1.0), None, Some(2.0), Some(9.0)]);

        assert_eq!(StatisticalImputer::mean(&series).unwrap(), Some(4.0));
        assert_eq!(StatisticalImputer::median(&series).unwrap(), Some(2.0));
    }

    #[test]
    fn test_statistic_of_all_missing_is_none() {
        let series = Series::new("q".into(), &[None::<f64>, None]);

        assert_eq!(
            StatisticalImputer::statistic(&series, ImputationPolicy::Mean).unwrap(),
            None
        );
        assert_eq!(
            StatisticalImputer::statistic(&series, ImputationPolicy::Median).unwrap(),
            None
        );
    }

    #[test]
    fn test_fill_counts_cells() {
        let series = Series::new("q".into(), &[Some(1.0), None, None]);
        let (filled, count) = StatisticalImputer::fill(&series, 1.0).unwrap();

        assert_eq!(count, 2);
        assert_eq!(filled.null_count(), 0);
    }

    #[test]
    fn test_fill_without_missing_is_noop() {
        let series = Series::new("q".into(), &[1.0, 2.0]);
        let (filled, count) = StatisticalImputer::fill(&series, 0.0).unwrap();

        assert_eq!(count, 0);
        assert!(filled.equals(&series));
    }
}
