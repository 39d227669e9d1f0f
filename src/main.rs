//! Entry point for the ocean time-series driver.
//! Handles CLI parsing and configuration, runs the pipeline and verifies the final output.

use clap::Parser;
use log::{error, info, warn};
use ocean_timeseries::cli::Args;
use ocean_timeseries::config::PipelineConfig;
use ocean_timeseries::errors::Result;
use ocean_timeseries::netcdf_io::{compare_horizontal_grids, count_timesteps, level_count, GridComparison};
use ocean_timeseries::operations::{DryRunRunner, SystemRunner};
use ocean_timeseries::pipeline::{Pipeline, RunSummary};
use std::process::ExitCode;

fn main() -> ExitCode {
    // Parse command-line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    println!(
        r#"
------------------------------------------------------------------
          ___   ___ ___   _   _  _   _____ ___ __  __ ___
         / _ \ / __| __| /_\ | \| | |_   _|_ _|  \/  | __|
        | (_) | (__| _| / _ \| .` |   | |  | || |\/| | _|
         \___/ \___|___/_/ \_\_|\_|   |_| |___|_|  |_|___|
              monthly 3D NetCDF -> annual 2D series
------------------------------------------------------------------
                        "#
    );

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_toml_file(path)?,
        None => PipelineConfig::default(),
    };
    args.apply(&mut config);
    let config = config;

    info!(
        "Region '{}', years {}-{}, inputs in {}",
        config.region,
        config.first_year,
        config.last_year,
        config.input_dir.display()
    );

    let summary = if args.dry_run {
        Pipeline::new(&config, DryRunRunner).run()?
    } else {
        preflight(&config);
        Pipeline::new(&config, SystemRunner)
            .handle_interrupts(true)
            .run()?
    };

    report(&config, &summary, !args.dry_run);

    if let Some(path) = &args.report {
        summary.write_report(path)?;
        info!("Saved run report to {}", path.display());
    }

    Ok(())
}

/// Non-fatal checks on the bathymetry and the first available input
fn preflight(config: &PipelineConfig) {
    let first_input = config
        .years()
        .flat_map(|year| (1..=12).map(move |month| config.input_file(year, month)))
        .find(|path| path.is_file());
    let Some(input) = first_input else {
        return;
    };

    match level_count(&input, &config.dimensions.level) {
        Ok(levels) if levels != config.model_levels => warn!(
            "⚠ {} has {} levels, expected {}",
            input.display(),
            levels,
            config.model_levels
        ),
        Ok(_) => {}
        Err(e) => warn!("⚠ Could not read levels of {}: {}", input.display(), e),
    }

    match compare_horizontal_grids(&config.bathymetry, &input, &config.dimensions) {
        Ok(GridComparison::Identical) => {}
        Ok(GridComparison::ShapeMismatch { left, right }) => warn!(
            "⚠ Bathymetry grid {:?} differs from input grid {:?}",
            left, right
        ),
        Ok(GridComparison::CoordinatesDiffer { max_difference }) => warn!(
            "⚠ Bathymetry and input coordinates differ by up to {}",
            max_difference
        ),
        Err(e) => warn!("⚠ Could not compare bathymetry and input grids: {}", e),
    }
}

fn report(config: &PipelineConfig, summary: &RunSummary, verify: bool) {
    info!(
        "Processed {} month(s), skipped {} month(s)",
        summary.manifest.months_processed(),
        summary.manifest.months_skipped()
    );

    let Some(output) = &summary.final_output else {
        warn!("⚠ No annual means were produced, no time series written");
        return;
    };

    if !verify {
        println!("[dry-run] Time series would be saved to {}", output.display());
        return;
    }

    match count_timesteps(output, &config.dimensions.time) {
        Ok(steps) if steps == summary.annual_steps() => {}
        Ok(steps) => warn!(
            "⚠ {} has {} timesteps, expected {}",
            output.display(),
            steps,
            summary.annual_steps()
        ),
        Err(e) => warn!("⚠ Could not verify {}: {}", output.display(), e),
    }

    println!("✅ Saved time series to {}", output.display());
}
