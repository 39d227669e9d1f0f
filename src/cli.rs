//! Defines command-line interface options using `clap` for the time-series driver.
//!
//! Every option is optional: without arguments the run uses the built-in
//! configuration, optionally replaced by a TOML file and then overridden flag by flag.

use crate::config::PipelineConfig;
use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

/// Builds an annual 2D time series from monthly 3D ocean-model NetCDF files
#[derive(Parser, Debug)]
#[command(
    version,
    name = "ocean-timeseries",
    about = "Reduce monthly 3D ocean-model output to a multi-year annual 2D time series"
)]
pub struct Args {
    /// TOML configuration file. Flags below override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Region label used in the output file name
    #[arg(long)]
    pub region: Option<String>,

    /// Inclusive year range, formatted as <first>-<last> (or a single year)
    #[arg(long, value_parser = parse_year_range)]
    pub years: Option<(i32, i32)>,

    /// Directory holding the monthly input files
    #[arg(long)]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving the final time series
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Parent directory for the run's temporary directory
    #[arg(long)]
    pub temp_root: Option<PathBuf>,

    /// Input file name prefix, files are named <prefix><year>_<MM>.mean.nc
    #[arg(long)]
    pub prefix: Option<String>,

    /// Bathymetry file merged into each input before regridding
    #[arg(long)]
    pub bathymetry: Option<PathBuf>,

    /// Comma-separated variables averaged over the top of the water column
    #[arg(long, value_parser = parse_var_list)]
    pub surface_vars: Option<VarList>,

    /// Variable extracted at the bottom level
    #[arg(long)]
    pub bottom_var: Option<String>,

    /// Number of vertical levels in the model output
    #[arg(long)]
    pub model_levels: Option<usize>,

    /// Print the tool calls without running them
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Write a JSON summary of the run to this path
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Args {
    /// Overlay the flags that were given onto `config`
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some((first, last)) = self.years {
            config.first_year = first;
            config.last_year = last;
        }
        if let Some(dir) = &self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(dir) = &self.temp_root {
            config.temp_root = Some(dir.clone());
        }
        if let Some(prefix) = &self.prefix {
            config.input_prefix = prefix.clone();
        }
        if let Some(path) = &self.bathymetry {
            config.bathymetry = path.clone();
        }
        if let Some(VarList(vars)) = &self.surface_vars {
            config.surface_vars = vars.clone();
        }
        if let Some(var) = &self.bottom_var {
            config.bottom_var = var.clone();
        }
        if let Some(levels) = self.model_levels {
            config.model_levels = levels;
        }
    }
}

/// Ordered list of distinct variable names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarList(pub Vec<String>);

pub fn parse_year_range(s: &str) -> Result<(i32, i32), String> {
    let parse = |part: &str| {
        part.trim()
            .parse::<i32>()
            .map_err(|_| format!("Invalid year '{}'", part.trim()))
    };

    let parts: Vec<&str> = s.split('-').collect();
    match parts.as_slice() {
        [year] => {
            let year = parse(*year)?;
            Ok((year, year))
        }
        [first, last] => Ok((parse(*first)?, parse(*last)?)),
        _ => Err("Invalid format: Expected '<first_year>-<last_year>'.".to_string()),
    }
}

pub fn parse_var_list(s: &str) -> Result<VarList, String> {
    let mut seen = HashSet::new();
    let mut vars = Vec::new();
    for name in s.split(',').map(str::trim) {
        if name.is_empty() {
            return Err("Invalid format: Expected '<var>[,<var>...]'.".to_string());
        }
        if !seen.insert(name) {
            return Err(format!("Variable '{}' listed more than once", name));
        }
        vars.push(name.to_string());
    }
    Ok(VarList(vars))
}
