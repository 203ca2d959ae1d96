//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - installs logging
//! - parses CLI arguments
//! - resolves configuration (flags over `BLEND_*` env vars / `.env`)
//! - runs the blend pipeline or the dataset inspector
//! - writes the output CSV

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{Command, InspectArgs, LayoutArgs, RunArgs, SourceArgs};
use crate::data::{DatasetSource, HttpDatasetSource, SourceConfig};
use crate::domain::{BlendRequest, BlendSettings, TimestampPolicy};
use crate::error::{AppError, PipelineError, Stage};
use crate::transform::filter_by_weather_year;

pub mod pipeline;

/// Entry point for the `blend` binary.
pub fn run() -> Result<(), AppError> {
    init_logging();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let request = build_request(&args)?;
    let settings = resolve_settings(&args.layout)?;
    let source_config = resolve_source_config(&args.source)?;

    let output = pipeline::run_blend(source_config, &request, &settings)?;

    eprint!("{}", crate::report::format_run_summary(&request, &output.report));

    crate::io::table::write_table_csv(&args.output, &output.table)?;
    info!(path = %args.output.display(), rows = output.table.len(), "output written");
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let settings = resolve_settings(&args.layout)?;
    let source = HttpDatasetSource::new(resolve_source_config(&args.source)?)?;

    let mut table = source
        .fetch(args.year, &args.scenario)
        .map_err(|e| PipelineError::new(Stage::Fetch, e))?;
    if let Some(weather_year) = args.weather_year {
        table = filter_by_weather_year(&table, weather_year, settings.timestamp_policy)
            .map_err(|e| PipelineError::new(Stage::TemporalFilter, e))?
            .table;
    }

    let profile = crate::report::profile_table(&table, settings.entity_offset);
    let label = format!("{}_{}", args.year, args.scenario);
    println!("{}", crate::report::format_profile(&label, &profile));
    Ok(())
}

/// Merge the request file (if any) with inline flags; flags win.
pub fn build_request(args: &RunArgs) -> Result<BlendRequest, AppError> {
    let mut request = match &args.request {
        Some(path) => crate::io::request::read_request_json(path)?,
        None => {
            let (Some(year), Some(scenario), Some(weather_year)) =
                (args.year, args.scenario.clone(), args.weather_year)
            else {
                return Err(AppError::new(
                    2,
                    "Either --request or all of --year, --scenario and --weather-year are required.",
                ));
            };
            BlendRequest::new(year, scenario, weather_year)
        }
    };

    if let Some(year) = args.year {
        request.year = year;
    }
    if let Some(scenario) = &args.scenario {
        request.scenario = scenario.clone();
    }
    if let Some(weather_year) = args.weather_year {
        request.weather_year = weather_year;
    }
    for (key, multiplier) in &args.overrides {
        request.overrides.insert(key.clone(), *multiplier);
    }
    for (category, scenario) in &args.fallbacks {
        if scenario.is_empty() {
            request.fallbacks.remove(category);
        } else {
            request.fallbacks.insert(category.clone(), scenario.clone());
        }
    }

    request.validate()?;
    Ok(request)
}

fn resolve_settings(layout: &LayoutArgs) -> Result<BlendSettings, AppError> {
    let mut settings = BlendSettings::from_env()?;
    if let Some(offset) = layout.entity_offset {
        settings.entity_offset = offset;
    }
    if layout.strict_timestamps {
        settings.timestamp_policy = TimestampPolicy::Reject;
    }
    Ok(settings)
}

fn resolve_source_config(args: &SourceArgs) -> Result<SourceConfig, AppError> {
    let mut config = SourceConfig::from_env(args.base_url.clone())?;
    if let Some(secs) = args.timeout_secs {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(ext) = &args.extension {
        config.extension = ext.trim_start_matches('.').to_string();
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::domain::OverrideKey;

    fn run_args() -> RunArgs {
        RunArgs {
            request: None,
            year: None,
            scenario: None,
            weather_year: None,
            overrides: Vec::new(),
            fallbacks: Vec::new(),
            output: PathBuf::from("-"),
            layout: LayoutArgs::default(),
            source: SourceArgs::default(),
        }
    }

    #[test]
    fn inline_flags_build_a_request() {
        let mut args = run_args();
        args.year = Some(2030);
        args.scenario = Some("high".to_string());
        args.weather_year = Some(2012);
        args.overrides = vec![(OverrideKey::new("TX", "residential"), 1.5)];
        args.fallbacks = vec![("industrial".to_string(), "baseline".to_string())];

        let request = build_request(&args).unwrap();
        assert_eq!(request.year, 2030);
        assert_eq!(request.overrides.len(), 1);
        assert_eq!(request.fallbacks.get("industrial").map(String::as_str), Some("baseline"));
    }

    #[test]
    fn missing_parameters_are_an_input_error() {
        let mut args = run_args();
        args.year = Some(2030);
        let err = build_request(&args).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn request_file_is_merged_with_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("request.json");
        std::fs::write(
            &path,
            r#"{"year": 2030, "scenario": "high", "weather_year": 2012,
                "custom_values": [{"entity": "TX", "category": "residential", "multiplier": 1.5}],
                "fallback_scenarios": {"industrial": "baseline"}}"#,
        )
        .unwrap();

        let mut args = run_args();
        args.request = Some(path.clone());
        args.weather_year = Some(2019);
        args.fallbacks = vec![("industrial".to_string(), String::new())];

        let request = build_request(&args).unwrap();
        assert_eq!(request.weather_year, 2019);
        assert_eq!(request.overrides.get(&OverrideKey::new("TX", "residential")), Some(&1.5));
        assert!(request.fallbacks.is_empty());
    }
}
