//! Batch pipeline driver
//!
//! For every month of every configured year the driver runs a fixed chain of
//! external tool calls that turns a 3D monthly model file into a 2D file with
//! the bottom variable and depth-averaged surface variables. Each year's
//! monthly files are then merged and reduced to an annual mean, and all annual
//! means are concatenated into the final time series.
//!
//! Execution is strictly sequential. The first failing tool call aborts the
//! run; a missing monthly input and a year without any monthly output are the
//! only tolerated gaps.

use crate::config::PipelineConfig;
use crate::errors::Result;
use crate::interrupt;
use crate::manifest::{RunManifest, YearRecord};
use crate::operations::{CommandRunner, Step};
use crate::tools::Toolchain;
use crate::workspace::Workspace;
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// Result of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub region: String,
    pub first_year: i32,
    pub last_year: i32,
    pub started_at: String,
    pub finished_at: String,
    pub manifest: RunManifest,
    /// Final time series. `None` when no year produced an annual mean.
    pub final_output: Option<PathBuf>,
}

impl RunSummary {
    /// Number of annual timesteps in the final output
    pub fn annual_steps(&self) -> usize {
        self.manifest
            .years
            .iter()
            .filter(|y| y.annual.is_some())
            .count()
    }

    /// Write the summary as pretty-printed JSON
    pub fn write_report(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

/// Drives one run over the configured year range
pub struct Pipeline<'a, R: CommandRunner> {
    config: &'a PipelineConfig,
    runner: R,
    search_path: Option<OsString>,
    handle_interrupts: bool,
}

impl<'a, R: CommandRunner> Pipeline<'a, R> {
    pub fn new(config: &'a PipelineConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            search_path: None,
            handle_interrupts: false,
        }
    }

    /// Resolve tools against this search path instead of `PATH`
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    /// Stop the running tool on Ctrl-C or SIGTERM and fail with
    /// [`PipelineError::Interrupted`](crate::errors::PipelineError::Interrupted)
    /// once the workspace is removed
    pub fn handle_interrupts(mut self, enabled: bool) -> Self {
        self.handle_interrupts = enabled;
        self
    }

    /// Run the whole pipeline
    ///
    /// # Errors
    ///
    /// Returns an error if a required tool is missing (before any directory is
    /// created), if a tool call fails or is interrupted, or on filesystem
    /// errors. The temporary directory is removed on every path.
    pub fn run(&self) -> Result<RunSummary> {
        let config = self.config;
        let started_at = Utc::now();

        let toolchain = match &self.search_path {
            Some(path) => Toolchain::resolve_in(config, path)?,
            None => Toolchain::resolve(config)?,
        };
        debug!("Resolved tools: {:?}", toolchain);

        fs::create_dir_all(&config.output_dir)?;
        // Declared before the workspace so signals stay deferred until it is removed
        let guard = if self.handle_interrupts {
            Some(interrupt::install()?)
        } else {
            None
        };
        let workspace = Workspace::create(config.temp_root.as_deref())?;

        let mut manifest = RunManifest::new();
        for year in config.years() {
            let mut record = YearRecord::new(year);
            for month in 1..=12 {
                interrupt::checkpoint()?;
                match self.process_month(&toolchain, &workspace, year, month)? {
                    Some(path) => record.push_month(month, path),
                    None => record.skip_month(month),
                }
            }
            record.annual = self.aggregate_year(&toolchain, &workspace, &record)?;
            manifest.push(record);
        }

        let final_output = self.finalize(&toolchain, &manifest)?;
        workspace.close()?;
        if let Some(guard) = guard {
            guard.disarm()?;
        }

        Ok(RunSummary {
            region: config.region.clone(),
            first_year: config.first_year,
            last_year: config.last_year,
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            manifest,
            final_output,
        })
    }

    /// Reduce one monthly 3D file to a 2D file. `None` when the input is absent.
    fn process_month(
        &self,
        toolchain: &Toolchain,
        workspace: &Workspace,
        year: i32,
        month: u32,
    ) -> Result<Option<PathBuf>> {
        let config = self.config;
        let input = config.input_file(year, month);
        if !input.is_file() {
            warn!(
                "⚠ Input for {}-{:02} not found, skipping: {}",
                year,
                month,
                input.display()
            );
            return Ok(None);
        }

        info!("Processing {}-{:02}", year, month);
        let files = workspace.month(year, month);

        // Bottom variable at the deepest level, as a 2D field under a new name
        self.runner
            .run(&toolchain.select_bottom(config, &input, &files.bottom_slice))?;
        self.runner
            .run(&toolchain.squeeze_level(config, &files.bottom_slice, &files.bottom_2d))?;
        self.runner
            .run(&toolchain.rename_bottom(config, &files.bottom_2d, &files.bottom_renamed))?;

        // The regridder needs the bathymetry fields even when the input already has them
        self.runner
            .run(&toolchain.merge_bathymetry(config, &input, &files.with_bathymetry))?;
        self.runner.run(&toolchain.regrid(
            &config.regrid,
            &files.with_bathymetry,
            &files.regridded,
        ))?;
        self.runner
            .run(&toolchain.vertical_mean(config, &files.regridded, &files.surface_mean))?;

        self.runner.run(&toolchain.merge_month(
            &files.bottom_renamed,
            &files.surface_mean,
            &files.merged,
        ))?;
        files.discard()?;

        Ok(Some(files.merged))
    }

    /// Merge a year's monthly files and compute the annual mean
    fn aggregate_year(
        &self,
        toolchain: &Toolchain,
        workspace: &Workspace,
        record: &YearRecord,
    ) -> Result<Option<PathBuf>> {
        if record.is_empty() {
            info!("No monthly files for {}, no annual mean produced", record.year);
            return Ok(None);
        }

        let series = workspace.year_series(record.year);
        let annual = self.config.annual_file(record.year);
        info!(
            "Computing annual mean for {} from {} month(s)",
            record.year,
            record.months.len()
        );

        self.runner.run(&toolchain.merge_time(
            Step::MergeYear,
            &record.monthly_files(),
            &series,
        ))?;
        self.runner.run(&toolchain.annual_mean(&series, &annual))?;

        Ok(Some(annual))
    }

    /// Concatenate the annual means and remove them afterwards
    fn finalize(&self, toolchain: &Toolchain, manifest: &RunManifest) -> Result<Option<PathBuf>> {
        let annual_files = manifest.annual_files();
        if annual_files.is_empty() {
            info!(
                "No annual means in {}-{}, final time series not created",
                self.config.first_year, self.config.last_year
            );
            return Ok(None);
        }

        let output = self.config.final_output();
        info!(
            "Concatenating {} annual mean(s) into {}",
            annual_files.len(),
            output.display()
        );
        self.runner.run(&toolchain.merge_time(
            Step::ConcatenateYears,
            &annual_files,
            &output,
        ))?;

        for path in annual_files {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }

        Ok(Some(output))
    }
}
