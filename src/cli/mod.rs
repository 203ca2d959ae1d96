//! Command-line parsing for the scenario blender.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! pipeline. Flag values are parsed into domain types here so `app` only deals
//! with validated pieces.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::OverrideKey;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "blend", version, about = "Blend scenario datasets with overrides and fallbacks")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch, filter, override and blend, then write the result as CSV.
    Run(RunArgs),
    /// Fetch one dataset and print its columns, subsectors and weather years.
    Inspect(InspectArgs),
}

/// Where datasets are fetched from. Unset flags fall back to `BLEND_*` env vars.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Base URL holding `<year>_<scenario>.<ext>` files (env: BLEND_BASE_URL).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-fetch timeout in seconds (env: BLEND_TIMEOUT_SECS, default 30).
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Dataset file extension (env: BLEND_FILE_EXT, default csv).
    #[arg(long)]
    pub extension: Option<String>,
}

/// Table layout options shared by `run` and `inspect`.
#[derive(Debug, Args, Clone, Default)]
pub struct LayoutArgs {
    /// Number of leading non-entity columns (env: BLEND_ENTITY_OFFSET, default 4).
    #[arg(long)]
    pub entity_offset: Option<usize>,

    /// Fail on unparsable `weather_datetime` values instead of dropping the rows.
    #[arg(long)]
    pub strict_timestamps: bool,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    /// Request JSON file; inline flags below are applied on top of it.
    #[arg(long, value_name = "JSON")]
    pub request: Option<PathBuf>,

    /// Target year (required without --request).
    #[arg(long)]
    pub year: Option<i32>,

    /// Primary scenario (required without --request).
    #[arg(long)]
    pub scenario: Option<String>,

    /// Weather year to keep (required without --request).
    #[arg(long)]
    pub weather_year: Option<i32>,

    /// Scale one entity column for one subsector, e.g. `TX:residential=1.5`.
    #[arg(long = "override", value_name = "ENTITY:SUBSECTOR=MULT", value_parser = parse_override)]
    pub overrides: Vec<(OverrideKey, f64)>,

    /// Take one subsector from another scenario, e.g. `industrial=baseline`.
    #[arg(long = "fallback", value_name = "SUBSECTOR=SCENARIO", value_parser = parse_fallback)]
    pub fallbacks: Vec<(String, String)>,

    /// Output CSV path (`-` for stdout).
    #[arg(short = 'o', long, default_value = "custom_output.csv")]
    pub output: PathBuf,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    #[arg(long)]
    pub year: i32,

    #[arg(long)]
    pub scenario: String,

    /// Only describe rows of this weather year.
    #[arg(long)]
    pub weather_year: Option<i32>,

    #[command(flatten)]
    pub layout: LayoutArgs,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Parse `ENTITY:SUBSECTOR=MULT`.
pub fn parse_override(raw: &str) -> Result<(OverrideKey, f64), String> {
    let (key, value) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected ENTITY:SUBSECTOR=MULT, got '{raw}'"))?;
    let (entity, category) = key
        .split_once(':')
        .ok_or_else(|| format!("expected ENTITY:SUBSECTOR before '=', got '{key}'"))?;
    let (entity, category) = (entity.trim(), category.trim());
    if entity.is_empty() || category.is_empty() {
        return Err(format!("entity and subsector must be non-empty in '{raw}'"));
    }
    let multiplier = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid multiplier '{value}': {e}"))?;
    Ok((OverrideKey::new(entity, category), multiplier))
}

/// Parse `SUBSECTOR=SCENARIO`.
pub fn parse_fallback(raw: &str) -> Result<(String, String), String> {
    let (category, scenario) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected SUBSECTOR=SCENARIO, got '{raw}'"))?;
    let category = category.trim();
    if category.is_empty() {
        return Err(format!("subsector must be non-empty in '{raw}'"));
    }
    Ok((category.to_string(), scenario.trim().to_string()))
}
