//! Weather-year filtering.
//!
//! A row's weather year is the calendar year of its `weather_datetime`, read in
//! the timestamp's own offset (no conversion to UTC).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::domain::{TIMESTAMP_COLUMN, Table, TimestampPolicy};
use crate::error::BlendError;

const DATETIME_FMTS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const OFFSET_FMTS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const DATE_FMTS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Filtered rows plus counts of what was dropped.
#[derive(Debug, Clone)]
pub struct FilteredTable {
    pub table: Table,
    /// Row index in the unfiltered table of each kept row.
    pub kept_rows: Vec<usize>,
    pub rows_in: usize,
    pub unparsable: usize,
    pub other_years: usize,
}

impl FilteredTable {
    /// 1-based data line (header is line 1) of a kept row in the fetched file.
    pub fn source_line(&self, row: usize) -> usize {
        self.kept_rows.get(row).copied().unwrap_or(row) + 2
    }
}

/// Keep only rows whose `weather_datetime` falls in `weather_year`.
pub fn filter_by_weather_year(
    table: &Table,
    weather_year: i32,
    policy: TimestampPolicy,
) -> Result<FilteredTable, BlendError> {
    let ts_col = table
        .column_index(TIMESTAMP_COLUMN)
        .ok_or_else(|| BlendError::MalformedTimestamp {
            detail: format!("column `{TIMESTAMP_COLUMN}` is missing"),
        })?;

    let mut keep = Vec::new();
    let mut unparsable = 0usize;
    let mut other_years = 0usize;

    for (idx, row) in table.rows().iter().enumerate() {
        let raw = row.get(ts_col).map(String::as_str).unwrap_or("");
        match timestamp_year(raw) {
            Some(year) if year == weather_year => keep.push(idx),
            Some(_) => other_years += 1,
            None => {
                if policy == TimestampPolicy::Reject {
                    return Err(BlendError::MalformedTimestamp {
                        detail: format!("unparsable value '{raw}' at line {}", idx + 2),
                    });
                }
                unparsable += 1;
            }
        }
    }

    Ok(FilteredTable {
        table: table.select_rows(&keep),
        kept_rows: keep,
        rows_in: table.len(),
        unparsable,
        other_years,
    })
}

/// Calendar year of a timestamp string, or `None` if it is not a recognised form.
pub fn timestamp_year(raw: &str) -> Option<i32> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.year());
    }
    for fmt in OFFSET_FMTS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.year());
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.year());
        }
    }
    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d.year());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::fixtures::table;

    #[test]
    fn recognises_common_forms() {
        assert_eq!(timestamp_year("2023-01-01"), Some(2023));
        assert_eq!(timestamp_year("2012-07-04 13:00:00"), Some(2012));
        assert_eq!(timestamp_year("2012-07-04 13:00"), Some(2012));
        assert_eq!(timestamp_year("2012-07-04T13:00:00.250"), Some(2012));
        assert_eq!(timestamp_year("2012-12-31T23:00:00-05:00"), Some(2012));
        assert_eq!(timestamp_year("2012-12-31 23:00:00-05:00"), Some(2012));
        assert_eq!(timestamp_year("12/31/2012 23:00"), Some(2012));
        assert_eq!(timestamp_year("not a date"), None);
        assert_eq!(timestamp_year(""), None);
    }

    #[test]
    fn offset_year_is_local_not_utc() {
        // 23:00 at -05:00 is already next year in UTC.
        assert_eq!(timestamp_year("2012-12-31T23:00:00-05:00"), Some(2012));
    }

    #[test]
    fn keeps_only_requested_year() {
        let t = table(
            &["weather_datetime", "subsector", "TX"],
            &[
                &["2012-01-01 00:00", "res", "1"],
                &["2013-01-01 00:00", "res", "2"],
                &["garbage", "res", "3"],
                &["2012-12-31 23:00", "res", "4"],
            ],
        );

        let out = filter_by_weather_year(&t, 2012, TimestampPolicy::Exclude).unwrap();
        assert_eq!(out.table.len(), 2);
        assert_eq!(out.rows_in, 4);
        assert_eq!(out.unparsable, 1);
        assert_eq!(out.other_years, 1);
        assert_eq!(out.kept_rows, vec![0, 3]);
        assert_eq!(out.source_line(1), 5);
        for row in 0..out.table.len() {
            let ts = out.table.cell(row, 0).unwrap();
            assert_eq!(timestamp_year(ts), Some(2012));
        }
    }

    #[test]
    fn reject_policy_fails_on_unparsable_value() {
        let t = table(
            &["weather_datetime", "subsector"],
            &[&["2012-01-01", "res"], &["??", "res"]],
        );
        let err = filter_by_weather_year(&t, 2012, TimestampPolicy::Reject).unwrap_err();
        assert_eq!(err.kind(), "malformed-timestamp");
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn missing_timestamp_column_is_malformed() {
        let t = table(&["subsector", "TX"], &[&["res", "1"]]);
        let err = filter_by_weather_year(&t, 2012, TimestampPolicy::Exclude).unwrap_err();
        assert_eq!(err.kind(), "malformed-timestamp");
    }

    #[test]
    fn no_matching_rows_is_empty_not_error() {
        let t = table(&["weather_datetime", "subsector"], &[&["2011-01-01", "res"]]);
        let out = filter_by_weather_year(&t, 2012, TimestampPolicy::Exclude).unwrap();
        assert!(out.table.is_empty());
        assert_eq!(out.table.columns(), t.columns());
    }
}
