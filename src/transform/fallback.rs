//! Category-scoped fallback substitution.
//!
//! For every `category -> scenario` mapping that points away from the primary
//! scenario, the primary table's entity columns for that category are replaced
//! by the fallback scenario's rows for the same category. Rows are paired by
//! position within the category, so both sides must carry the same number of
//! rows for it.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, info};

use crate::data::DatasetSource;
use crate::domain::{BlendSettings, CATEGORY_COLUMN, Table};
use crate::error::{BlendError, PipelineError, Stage};
use crate::transform::temporal::filter_by_weather_year;

/// One category whose rows were taken from another scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedFallback {
    pub category: String,
    pub scenario: String,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct FallbackOutcome {
    pub table: Table,
    pub applied: Vec<AppliedFallback>,
    /// Categories mapped to the primary scenario itself (nothing to do).
    pub self_references: Vec<String>,
    /// Distinct scenarios fetched, in name order.
    pub scenarios_fetched: Vec<String>,
}

/// Replace whole categories with rows from their fallback scenarios.
///
/// Each distinct fallback scenario is fetched and filtered once, no matter how
/// many categories map to it.
pub fn apply_fallbacks<S: DatasetSource + ?Sized>(
    table: &Table,
    year: i32,
    weather_year: i32,
    primary_scenario: &str,
    fallbacks: &BTreeMap<String, String>,
    source: &S,
    settings: &BlendSettings,
) -> Result<FallbackOutcome, PipelineError> {
    let fail = |error: BlendError| PipelineError::new(Stage::Fallback, error);

    let (self_refs, active): (Vec<_>, Vec<_>) = fallbacks
        .iter()
        .partition(|(_, scenario)| scenario.as_str() == primary_scenario);
    let self_references: Vec<String> = self_refs.into_iter().map(|(c, _)| c.clone()).collect();

    if active.is_empty() {
        return Ok(FallbackOutcome {
            table: table.clone(),
            applied: Vec::new(),
            self_references,
            scenarios_fetched: Vec::new(),
        });
    }

    let category_col = table.require_column(CATEGORY_COLUMN).map_err(fail)?;

    // Categories grouped under the scenario that supplies them, in name order.
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (category, scenario) in &active {
        grouped.entry(scenario.as_str()).or_default().push(category.as_str());
    }
    let groups: Vec<(&str, Vec<&str>)> = grouped.into_iter().collect();

    info!(scenarios = ?groups.iter().map(|(s, _)| *s).collect::<Vec<_>>(), "fetching fallback scenarios");
    let results: Vec<Result<Table, BlendError>> = groups
        .par_iter()
        .map(|(scenario, _)| -> Result<Table, BlendError> {
            let fetched = source.fetch(year, scenario)?;
            let filtered = filter_by_weather_year(&fetched, weather_year, settings.timestamp_policy)?;
            debug!(
                scenario,
                rows_in = filtered.rows_in,
                rows_kept = filtered.table.len(),
                "fallback dataset filtered"
            );
            Ok(filtered.table)
        })
        .collect();

    // Consumed in scenario order so the reported error does not depend on fetch timing.
    let mut out = table.clone();
    let mut applied = Vec::with_capacity(active.len());
    for ((scenario, categories), result) in groups.iter().zip(results) {
        let fallback = result.map_err(fail)?;
        for category in categories {
            let rows = substitute_category(
                &mut out,
                category_col,
                &fallback,
                category,
                scenario,
                settings.entity_offset,
            )
            .map_err(fail)?;
            debug!(category, scenario, rows, "fallback substituted");
            applied.push(AppliedFallback {
                category: category.to_string(),
                scenario: scenario.to_string(),
                rows,
            });
        }
    }
    applied.sort_by(|a, b| a.category.cmp(&b.category));

    Ok(FallbackOutcome {
        table: out,
        applied,
        self_references,
        scenarios_fetched: groups.into_iter().map(|(s, _)| s.to_string()).collect(),
    })
}

/// Overwrite every entity column of `category` rows in `table` with `fallback`'s.
///
/// Returns the number of rows replaced.
pub fn substitute_category(
    table: &mut Table,
    category_col: usize,
    fallback: &Table,
    category: &str,
    scenario: &str,
    entity_offset: usize,
) -> Result<usize, BlendError> {
    let column_missing = |column: &str| BlendError::FallbackColumnMissing {
        category: category.to_string(),
        scenario: scenario.to_string(),
        column: column.to_string(),
    };

    let fb_category_col = fallback
        .column_index(CATEGORY_COLUMN)
        .ok_or_else(|| column_missing(CATEGORY_COLUMN))?;

    let primary_rows = table.rows_matching(category_col, category);
    let fallback_rows = fallback.rows_matching(fb_category_col, category);

    if fallback_rows.is_empty() {
        return Err(BlendError::FallbackCategoryNotFound {
            category: category.to_string(),
            scenario: scenario.to_string(),
        });
    }
    if primary_rows.len() != fallback_rows.len() {
        return Err(BlendError::FallbackAlignment {
            category: category.to_string(),
            scenario: scenario.to_string(),
            primary_rows: primary_rows.len(),
            fallback_rows: fallback_rows.len(),
        });
    }

    // Resolve every column before writing so a missing one leaves `table` intact.
    let mut column_pairs = Vec::new();
    for (offset_idx, name) in table.entity_columns(entity_offset).iter().enumerate() {
        let fb_idx = fallback.column_index(name).ok_or_else(|| column_missing(name))?;
        column_pairs.push((entity_offset + offset_idx, fb_idx));
    }

    for (col, fb_col) in column_pairs {
        for (&p, &f) in primary_rows.iter().zip(&fallback_rows) {
            let value = fallback.cell(f, fb_col).unwrap_or("").to_string();
            table.set_cell(p, col, value);
        }
    }

    Ok(primary_rows.len())
}
