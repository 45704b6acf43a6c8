//! Cell-level conversion functions and the series plumbing around them.
//!
//! Every conversion here is total: a value that cannot be interpreted comes
//! back as `None`, never as an error.

use crate::types::RawCell;
use crate::utils::{is_numeric_dtype, parse_decimal};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Years a sales date can plausibly fall in. chrono's `%Y` accepts any
/// number of digits, so `05/02/24` would otherwise parse as year 24.
const PLAUSIBLE_YEARS: std::ops::RangeInclusive<i32> = 1900..=2199;

/// Read a series into raw cells, whatever its dtype.
pub(crate) fn raw_cells(series: &Series) -> PolarsResult<Vec<RawCell>> {
    match series.dtype() {
        DataType::String => Ok(series
            .str()?
            .into_iter()
            .map(|v| v.map_or(RawCell::Missing, |s| RawCell::Text(s.to_string())))
            .collect()),
        dtype if is_numeric_dtype(dtype) => {
            let floats = series.cast(&DataType::Float64)?;
            Ok(floats
                .f64()?
                .into_iter()
                .map(|v| v.map_or(RawCell::Missing, RawCell::Number))
                .collect())
        }
        DataType::Null => Ok(vec![RawCell::Missing; series.len()]),
        _ => (0..series.len())
            .map(|i| series.get(i).map(RawCell::from))
            .collect(),
    }
}

/// Interpret a cell as a plain number.
pub(crate) fn cell_to_number(cell: &RawCell) -> Option<f64> {
    match cell {
        RawCell::Number(n) => Some(*n).filter(|v| v.is_finite()),
        RawCell::Text(s) => parse_decimal(s),
        RawCell::Missing => None,
    }
}

/// Interpret a cell as text; the value is trimmed.
pub(crate) fn cell_to_text(cell: &RawCell) -> Option<String> {
    cell.as_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Interpret a cell as a calendar date using the formats in order.
///
/// A format that parses a full timestamp contributes its date part.
pub(crate) fn cell_to_date(cell: &RawCell, formats: &[String]) -> Option<NaiveDate> {
    let RawCell::Text(text) = cell else {
        return None;
    };
    parse_date(text, formats)
}

/// Parse text with the first matching format.
///
/// A match whose year falls outside 1900 to 2199 does not count and
/// the next format is tried.
pub fn parse_date(text: &str, formats: &[String]) -> Option<NaiveDate> {
    use chrono::Datelike;

    let text = text.trim();
    formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(text, format)
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(text, format)
                    .ok()
                    .map(|dt| dt.date())
            })
            .filter(|date| PLAUSIBLE_YEARS.contains(&date.year()))
    })
}

/// Days since the Unix epoch, the physical representation of polars `Date`.
pub(crate) fn date_to_epoch_days(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`date_to_epoch_days`].
pub fn epoch_days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Build a polars `Date` series from optional calendar dates.
pub(crate) fn date_series(name: PlSmallStr, dates: &[Option<NaiveDate>]) -> PolarsResult<Series> {
    let days: Vec<Option<i32>> = dates.iter().map(|d| d.map(date_to_epoch_days)).collect();
    Series::new(name, days).cast(&DataType::Date)
}

/// Build a `Float64` series from optional numbers.
pub(crate) fn numeric_series(name: PlSmallStr, values: Vec<Option<f64>>) -> Series {
    Series::new(name, values)
}

/// Build a `String` series from optional text.
pub(crate) fn text_series(name: PlSmallStr, values: Vec<Option<String>>) -> Series {
    Series::new(name, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn formats() -> Vec<String> {
        ["%Y-%m-%d", "%d/%m/%Y", "%Y-%m-%d %H:%M:%S"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_raw_cells_from_string_series() {
        let series = Series::new("a".into(), &[Some("x"), None, Some("3")]);
        let cells = raw_cells(&series).unwrap();
        assert_eq!(
            cells,
            vec![
                RawCell::Text("x".to_string()),
                RawCell::Missing,
                RawCell::Text("3".to_string())
            ]
        );
    }

    #[test]
    fn test_raw_cells_from_numeric_series() {
        let series = Series::new("a".into(), &[Some(1i64), None]);
        let cells = raw_cells(&series).unwrap();
        assert_eq!(cells, vec![RawCell::Number(1.0), RawCell::Missing]);
    }

    #[test]
    fn test_cell_to_number() {
        assert_eq!(cell_to_number(&RawCell::Text("12".to_string())), Some(12.0));
        assert_eq!(cell_to_number(&RawCell::Text("twelve".to_string())), None);
        assert_eq!(cell_to_number(&RawCell::Number(7.5)), Some(7.5));
        assert_eq!(cell_to_number(&RawCell::Missing), None);
    }

    #[test]
    fn test_parse_date_first_match_wins() {
        let date = parse_date("03/04/2024", &formats()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 4, 3).unwrap());
    }

    #[test]
    fn test_parse_date_timestamp_takes_date_part() {
        let date = parse_date("2024-01-05 13:45:00", &formats()).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert_eq!(parse_date("bad-date", &formats()), None);
        assert_eq!(parse_date("2024-02-30", &formats()), None);
    }

    #[test]
    fn test_parse_date_rejects_short_years() {
        assert_eq!(parse_date("05/02/24", &formats()), None);
        assert_eq!(parse_date("0024-02-05", &formats()), None);

        let mut with_short_year = formats();
        with_short_year.push("%d/%m/%y".to_string());
        assert_eq!(
            parse_date("05/02/24", &with_short_year),
            NaiveDate::from_ymd_opt(2024, 2, 5)
        );
    }

    #[test]
    fn test_epoch_days_roundtrip() {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_epoch_days(epoch), 0);

        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(epoch_days_to_date(date_to_epoch_days(date)), Some(date));
    }

    #[test]
    fn test_date_series_dtype() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let series = date_series("d".into(), &[Some(date), None]).unwrap();
        assert_eq!(series.dtype(), &DataType::Date);
        assert_eq!(series.null_count(), 1);
    }
}
