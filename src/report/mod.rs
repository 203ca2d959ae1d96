//! Terminal summaries for `blend run` and `blend inspect`.

use std::collections::BTreeMap;
use std::fmt::Write;

use crate::app::pipeline::BlendReport;
use crate::domain::{BlendRequest, CATEGORY_COLUMN, TIMESTAMP_COLUMN, Table};
use crate::transform::timestamp_year;

/// One-screen summary of a finished run.
pub fn format_run_summary(request: &BlendRequest, report: &BlendReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "blend {}_{} weather_year={}",
        request.year, request.scenario, request.weather_year
    );
    let _ = writeln!(
        out,
        "  rows: fetched={} kept={} other_years={} unparsable_timestamps={}",
        report.rows_fetched, report.rows_kept, report.rows_other_years, report.rows_unparsable
    );
    for (key, cells) in &report.overrides_applied {
        let multiplier = request.overrides.get(key).copied().unwrap_or(f64::NAN);
        let _ = writeln!(out, "  override {key} x{multiplier}: {cells} cells");
    }
    for key in &report.overrides_skipped {
        let _ = writeln!(out, "  override {key}: column not in dataset (skipped)");
    }
    for fb in &report.fallbacks_applied {
        let _ = writeln!(out, "  fallback {} <- {}: {} rows", fb.category, fb.scenario, fb.rows);
    }
    for category in &report.fallbacks_self_referencing {
        let _ = writeln!(out, "  fallback {category}: same as primary (no-op)");
    }
    out
}

/// Shape of a dataset: columns, entity columns, subsector and weather-year counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetProfile {
    pub rows: usize,
    pub columns: Vec<String>,
    pub entity_columns: Vec<String>,
    pub categories: BTreeMap<String, usize>,
    pub weather_years: BTreeMap<i32, usize>,
    pub unparsable_timestamps: usize,
}

pub fn profile_table(table: &Table, entity_offset: usize) -> DatasetProfile {
    let mut categories = BTreeMap::new();
    if let Some(col) = table.column_index(CATEGORY_COLUMN) {
        for row in table.rows() {
            *categories.entry(row[col].clone()).or_insert(0) += 1;
        }
    }

    let mut weather_years = BTreeMap::new();
    let mut unparsable_timestamps = 0;
    if let Some(col) = table.column_index(TIMESTAMP_COLUMN) {
        for row in table.rows() {
            match timestamp_year(&row[col]) {
                Some(year) => *weather_years.entry(year).or_insert(0) += 1,
                None => unparsable_timestamps += 1,
            }
        }
    }

    DatasetProfile {
        rows: table.len(),
        columns: table.columns().to_vec(),
        entity_columns: table.entity_columns(entity_offset).to_vec(),
        categories,
        weather_years,
        unparsable_timestamps,
    }
}

pub fn format_profile(label: &str, profile: &DatasetProfile) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{label}: {} rows", profile.rows);
    let _ = writeln!(out, "columns: {}", profile.columns.join(", "));
    let _ = writeln!(
        out,
        "entity columns ({}): {}",
        profile.entity_columns.len(),
        profile.entity_columns.join(", ")
    );
    let _ = writeln!(out, "subsectors:");
    for (category, n) in &profile.categories {
        let _ = writeln!(out, "  {category}: {n}");
    }
    let _ = writeln!(out, "weather years:");
    for (year, n) in &profile.weather_years {
        let _ = writeln!(out, "  {year}: {n}");
    }
    if profile.unparsable_timestamps > 0 {
        let _ = writeln!(out, "unparsable timestamps: {}", profile.unparsable_timestamps);
    }
    out
}
