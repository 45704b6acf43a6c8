//! Grouped revenue summaries over the cleaned table.

use crate::cleaner::epoch_days_to_date;
use crate::config::ReportColumns;
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MONTH_KEY: &str = "__month";
const REVENUE: &str = "revenue";
const ORDERS: &str = "orders";

/// Revenue total for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTotal {
    pub key: String,
    pub revenue: f64,
    pub orders: u64,
}

/// Aggregates computed from a cleaned table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub order_count: usize,
    pub total_revenue: f64,
    pub average_order_value: Option<f64>,
    /// Mean profit margin in whole percent.
    pub average_margin: Option<f64>,
    /// Sorted by revenue, highest first.
    pub revenue_by_region: Vec<GroupTotal>,
    /// Sorted by revenue, highest first.
    pub revenue_by_category: Vec<GroupTotal>,
    /// Keyed `YYYY-MM`, oldest first.
    pub monthly_revenue: Vec<GroupTotal>,
}

/// Computes [`AggregateReport`]s. The table is only read.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    columns: ReportColumns,
}

impl Aggregator {
    pub fn new(columns: ReportColumns) -> Self {
        Self { columns }
    }

    pub fn summarize(&self, df: &DataFrame) -> Result<AggregateReport> {
        let mut report = AggregateReport {
            order_count: df.height(),
            ..AggregateReport::default()
        };

        let Some(amount) = self.present(df, &self.columns.amount) else {
            debug!("No amount column; aggregate report left empty");
            report.average_margin = self.column_mean(df, &self.columns.margin)?;
            return Ok(report);
        };

        let amounts = df.column(amount)?.as_materialized_series().cast(&DataType::Float64)?;
        report.total_revenue = amounts.f64()?.sum().unwrap_or(0.0);
        report.average_order_value = amounts.mean();
        report.average_margin = self.column_mean(df, &self.columns.margin)?;

        if let Some(region) = self.present(df, &self.columns.region) {
            report.revenue_by_region = ranked(group_totals(df, region, amount)?);
        }
        if let Some(category) = self.present(df, &self.columns.category) {
            report.revenue_by_category = ranked(group_totals(df, category, amount)?);
        }
        if let Some(date) = self.present(df, &self.columns.date) {
            report.monthly_revenue = self.monthly_trend(df, date, amount)?;
        }

        Ok(report)
    }

    fn present<'a>(&self, df: &DataFrame, column: &'a Option<String>) -> Option<&'a str> {
        column
            .as_deref()
            .filter(|name| df.column(name).is_ok())
    }

    fn column_mean(&self, df: &DataFrame, column: &Option<String>) -> Result<Option<f64>> {
        match self.present(df, column) {
            Some(name) => Ok(df
                .column(name)?
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .mean()),
            None => Ok(None),
        }
    }

    fn monthly_trend(&self, df: &DataFrame, date: &str, amount: &str) -> Result<Vec<GroupTotal>> {
        let dates = df.column(date)?.as_materialized_series();
        let months: Vec<Option<String>> = (0..dates.len())
            .map(|i| match dates.get(i) {
                Ok(AnyValue::Date(days)) => {
                    epoch_days_to_date(days).map(|d| d.format("%Y-%m").to_string())
                }
                _ => None,
            })
            .collect();

        let mut with_month = df.clone();
        with_month.with_column(Series::new(MONTH_KEY.into(), months))?;

        let mut monthly = group_totals(&with_month, MONTH_KEY, amount)?;
        monthly.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(monthly)
    }
}

/// Sum and count `amount` per non-missing value of `key`.
fn group_totals(df: &DataFrame, key: &str, amount: &str) -> Result<Vec<GroupTotal>> {
    let grouped = df
        .clone()
        .lazy()
        .filter(col(key).is_not_null())
        .group_by([col(key)])
        .agg([
            col(amount).cast(DataType::Float64).sum().alias(REVENUE),
            col(amount).count().alias(ORDERS),
        ])
        .collect()?;

    let keys = grouped
        .column(key)?
        .as_materialized_series()
        .cast(&DataType::String)?;
    let revenue = grouped
        .column(REVENUE)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let orders = grouped
        .column(ORDERS)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;

    Ok(keys
        .str()?
        .into_iter()
        .zip(revenue.f64()?)
        .zip(orders.u64()?)
        .filter_map(|((key, revenue), orders)| {
            Some(GroupTotal {
                key: key?.to_string(),
                revenue: revenue.unwrap_or(0.0),
                orders: orders.unwrap_or(0),
            })
        })
        .collect())
}

/// Highest revenue first, ties broken by key.
fn ranked(mut totals: Vec<GroupTotal>) -> Vec<GroupTotal> {
    totals.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.key.cmp(&b.key))
    });
    totals
}
