//! ocean_timeseries: monthly 3D ocean-model output to an annual 2D time series
//!
//! A batch driver that turns monthly 3D NetCDF files from an ocean model into
//! training data for a forecasting model: one 2D field per year holding the
//! bottom variable at the deepest model level and the mean of selected
//! variables over the top of the water column. All numerical work is done by
//! external tools (CDO, NCO and a vertical regridder); this crate fixes the
//! order of the calls, the file naming and the cleanup.
//!
//! ## Module Organization
//!
//! - [`config`]: Run configuration and file naming
//! - [`tools`]: Discovery of the external programs
//! - [`operations`]: Argument grammar of each tool call and the runner seam
//! - [`workspace`]: Process-scoped temporary directory
//! - [`manifest`]: In-memory record of produced artifacts
//! - [`pipeline`]: The batch driver
//! - [`netcdf_io`]: Grid and timestep inspection of NetCDF files
//! - [`interrupt`]: Ctrl-C / SIGTERM handling that stops the running tool
//! - [`errors`]: Centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ocean_timeseries::prelude::*;
//!
//! let config = PipelineConfig {
//!     region: "baltic".to_string(),
//!     first_year: 2000,
//!     last_year: 2001,
//!     ..PipelineConfig::default()
//! };
//! let summary = Pipeline::new(&config, SystemRunner).run().unwrap();
//! println!("{:?}", summary.final_output);
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod interrupt;
pub mod manifest;
pub mod netcdf_io;
pub mod operations;
pub mod pipeline;
pub mod tools;
pub mod workspace;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::config::{DimensionNames, PipelineConfig, RegridSpec, ToolNames};
    pub use crate::errors::{PipelineError, Result};
    pub use crate::manifest::{RunManifest, YearRecord};
    pub use crate::operations::{CommandRunner, DryRunRunner, Invocation, Step, SystemRunner};
    pub use crate::pipeline::{Pipeline, RunSummary};
    pub use crate::tools::Toolchain;
}
