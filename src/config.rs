//! Pipeline configuration
//!
//! A [`PipelineConfig`] is built once at startup (defaults, then an optional
//! TOML file, then command-line overrides) and passed by reference to every
//! pipeline step. It also owns the file naming contract for inputs and outputs.

use crate::errors::Result;
use serde::Deserialize;
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Complete configuration for one run
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Region label, used only in output file names
    pub region: String,
    pub first_year: i32,
    pub last_year: i32,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Parent of the run's temporary directory. System temp dir when unset.
    pub temp_root: Option<PathBuf>,
    /// Monthly inputs are named `<prefix><year>_<MM>.mean.nc`
    pub input_prefix: String,
    pub bathymetry: PathBuf,
    /// Variables averaged over the regridded top of the water column
    pub surface_vars: Vec<String>,
    /// Variable extracted at the bottom model level
    pub bottom_var: String,
    /// Name given to the bottom variable in the monthly file
    pub bottom_rename: Option<String>,
    /// Number of native model levels in the inputs
    pub model_levels: usize,
    /// Index of the bottom level (1-based, level 1 is the deepest)
    pub bottom_level: usize,
    pub dimensions: DimensionNames,
    pub regrid: RegridSpec,
    pub tools: ToolNames,
}

/// Dimension and coordinate names in the model output
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DimensionNames {
    pub time: String,
    pub level: String,
    pub latitude: String,
    pub longitude: String,
}

/// Target of the vertical regridding step
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RegridSpec {
    /// Regridding executable
    pub program: String,
    /// Depth of the averaging window in metres
    pub depth: f64,
    /// Spacing of the target levels in metres
    pub step: f64,
    /// Upper bound on the number of target levels
    pub levels: usize,
    /// Extra flags selecting the interpolation mode
    pub flags: Vec<String>,
}

/// Program names of the generic NetCDF tools
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ToolNames {
    pub cdo: String,
    pub ncwa: String,
    pub ncrename: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            region: "baltic".to_string(),
            first_year: 1993,
            last_year: 2020,
            input_dir: PathBuf::from("data/monthly"),
            output_dir: PathBuf::from("data/timeseries"),
            temp_root: None,
            input_prefix: "ocean_3d_".to_string(),
            bathymetry: PathBuf::from("data/bathymetry.nc"),
            surface_vars: vec![
                "temp".to_string(),
                "salt".to_string(),
                "chl".to_string(),
            ],
            bottom_var: "o2".to_string(),
            bottom_rename: None,
            model_levels: 69,
            bottom_level: 1,
            dimensions: DimensionNames::default(),
            regrid: RegridSpec::default(),
            tools: ToolNames::default(),
        }
    }
}

impl Default for DimensionNames {
    fn default() -> Self {
        Self {
            time: "time".to_string(),
            level: "depth".to_string(),
            latitude: "lat".to_string(),
            longitude: "lon".to_string(),
        }
    }
}

impl Default for RegridSpec {
    fn default() -> Self {
        Self {
            program: "vertregrid".to_string(),
            depth: 20.0,
            step: 0.5,
            levels: 40,
            flags: vec!["--linear".to_string()],
        }
    }
}

impl Default for ToolNames {
    fn default() -> Self {
        Self {
            cdo: "cdo".to_string(),
            ncwa: "ncwa".to_string(),
            ncrename: "ncrename".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a TOML file. Keys not present keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Years to process, in chronological order. Empty when the range is inverted.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.first_year..=self.last_year
    }

    /// Expected monthly input for a given year and month
    pub fn input_file(&self, year: i32, month: u32) -> PathBuf {
        self.input_dir
            .join(format!("{}{}_{:02}.mean.nc", self.input_prefix, year, month))
    }

    /// Annual-mean file for a year. Lives in the output directory until the
    /// final concatenation succeeds.
    pub fn annual_file(&self, year: i32) -> PathBuf {
        self.output_dir
            .join(format!("{}_annual_{}.nc", self.region, year))
    }

    /// Final multi-year time series
    pub fn final_output(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_timeseries_{}-{}.nc",
            self.region, self.first_year, self.last_year
        ))
    }

    /// Name of the bottom variable after renaming
    pub fn renamed_bottom_var(&self) -> String {
        self.bottom_rename
            .clone()
            .unwrap_or_else(|| format!("{}_bottom", self.bottom_var))
    }

    /// Surface variables as the comma-joined list the tools expect
    pub fn surface_var_list(&self) -> String {
        self.surface_vars.join(",")
    }
}
