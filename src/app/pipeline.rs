//! Shared "blend pipeline" logic used by the CLI.
//!
//! Keeping this in one place keeps the workflow fixed:
//! fetch -> weather-year filter -> overrides -> fallback substitution
//!
//! Overrides run before fallbacks, so an override on a category that a
//! fallback later replaces has no effect on the output.

use tracing::{info, warn};

use crate::data::{DatasetSource, HttpDatasetSource, SourceConfig};
use crate::domain::{BlendRequest, BlendSettings, OverrideKey, Table};
use crate::error::{AppError, PipelineError, Stage};
use crate::transform::{AppliedFallback, apply_fallbacks, apply_overrides_at, filter_by_weather_year};

/// What a run did, for logging and the CLI summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlendReport {
    pub rows_fetched: usize,
    pub rows_kept: usize,
    pub rows_unparsable: usize,
    pub rows_other_years: usize,
    pub overrides_applied: Vec<(OverrideKey, usize)>,
    pub overrides_skipped: Vec<OverrideKey>,
    pub fallbacks_applied: Vec<AppliedFallback>,
    pub fallbacks_self_referencing: Vec<String>,
}

/// All outputs of a single blend run.
#[derive(Debug, Clone)]
pub struct BlendOutput {
    pub table: Table,
    pub report: BlendReport,
}

/// Run the pipeline against the HTTP source described by `source_config`.
pub fn run_blend(
    source_config: SourceConfig,
    request: &BlendRequest,
    settings: &BlendSettings,
) -> Result<BlendOutput, AppError> {
    let source = HttpDatasetSource::new(source_config)?;
    Ok(run_blend_with_source(&source, request, settings)?)
}

/// Run the pipeline against any dataset source.
pub fn run_blend_with_source<S: DatasetSource + ?Sized>(
    source: &S,
    request: &BlendRequest,
    settings: &BlendSettings,
) -> Result<BlendOutput, PipelineError> {
    request
        .validate()
        .map_err(|e| PipelineError::new(Stage::Request, e))?;

    info!(
        year = request.year,
        scenario = %request.scenario,
        weather_year = request.weather_year,
        overrides = request.overrides.len(),
        fallbacks = request.fallbacks.len(),
        "blend started"
    );

    // 1) Fetch the primary dataset.
    let fetched = source
        .fetch(request.year, &request.scenario)
        .map_err(|e| PipelineError::new(Stage::Fetch, e))?;

    // 2) Keep one weather year.
    let filtered = filter_by_weather_year(&fetched, request.weather_year, settings.timestamp_policy)
        .map_err(|e| PipelineError::new(Stage::TemporalFilter, e))?;
    if filtered.unparsable > 0 {
        warn!(rows = filtered.unparsable, "rows with unparsable weather_datetime excluded");
    }
    if filtered.table.is_empty() {
        warn!(weather_year = request.weather_year, "no rows for the requested weather year");
    }

    // 3) Rescale overridden cells. Errors name the line in the fetched file.
    let overridden = apply_overrides_at(&filtered.table, &request.overrides, |row| filtered.source_line(row))
        .map_err(|e| PipelineError::new(Stage::Overrides, e))?;

    // 4) Swap in fallback categories.
    let fallen_back = apply_fallbacks(
        &overridden.table,
        request.year,
        request.weather_year,
        &request.scenario,
        &request.fallbacks,
        source,
        settings,
    )?;

    let report = BlendReport {
        rows_fetched: filtered.rows_in,
        rows_kept: filtered.table.len(),
        rows_unparsable: filtered.unparsable,
        rows_other_years: filtered.other_years,
        overrides_applied: overridden.applied,
        overrides_skipped: overridden.skipped,
        fallbacks_applied: fallen_back.applied,
        fallbacks_self_referencing: fallen_back.self_references,
    };

    info!(
        rows = report.rows_kept,
        overrides_applied = report.overrides_applied.len(),
        overrides_skipped = report.overrides_skipped.len(),
        fallbacks_applied = report.fallbacks_applied.len(),
        "blend finished"
    );

    Ok(BlendOutput {
        table: fallen_back.table,
        report,
    })
}
