//! Centralized error handling for the time-series driver
//!
//! Only fatal conditions are errors. A missing monthly input or a year without
//! any monthly output is recorded in the run manifest instead.

use crate::interrupt::INTERRUPTED_EXIT_CODE;
use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

/// Main error type for pipeline operations
#[derive(Debug)]
pub enum PipelineError {
    /// A required external program is not on the search path
    MissingTool { family: String, program: String },

    /// An external program ran but returned a non-zero status
    ToolFailed {
        step: String,
        command: String,
        status: ExitStatus,
    },

    /// Ctrl-C or SIGTERM stopped the run, possibly while `step` was running
    Interrupted { step: Option<String> },

    /// An external program could not be started at all
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    /// I/O operation errors
    IoError(std::io::Error),

    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// Dimension not found in a NetCDF file
    DimensionNotFound { file: PathBuf, dim: String },

    /// Configuration file could not be parsed
    TomlError(toml::de::Error),

    /// Run report could not be serialized
    JsonError(serde_json::Error),
}

impl PipelineError {
    /// Process exit code for this error
    ///
    /// A missing tool or unreadable configuration exits with 2 so callers can tell
    /// them apart from a tool failing halfway through a run. An interrupt exits
    /// with 130 like a shell job stopped by SIGINT.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::MissingTool { .. }
            | PipelineError::TomlError(_) => 2,
            PipelineError::Interrupted { .. } => INTERRUPTED_EXIT_CODE,
            _ => 1,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MissingTool { family, program } => write!(
                f,
                "Required {} program '{}' not found on PATH",
                family, program
            ),
            PipelineError::ToolFailed {
                step,
                command,
                status,
            } => write!(f, "{} failed ({}): {}", step, status, command),
            PipelineError::Interrupted { step: Some(step) } => {
                write!(f, "Interrupted during {}", step)
            }
            PipelineError::Interrupted { step: None } => write!(f, "Interrupted"),
            PipelineError::Spawn { program, source } => {
                write!(f, "Could not start '{}': {}", program.display(), source)
            }
            PipelineError::IoError(e) => write!(f, "I/O error: {}", e),
            PipelineError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            PipelineError::DimensionNotFound { file, dim } => {
                write!(f, "Dimension '{}' not found in '{}'", dim, file.display())
            }
            PipelineError::TomlError(e) => write!(f, "Configuration file error: {}", e),
            PipelineError::JsonError(e) => write!(f, "Report serialization error: {}", e),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Spawn { source, .. } => Some(source),
            PipelineError::IoError(e) => Some(e),
            PipelineError::NetCDFError(e) => Some(e),
            PipelineError::TomlError(e) => Some(e),
            PipelineError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(error: std::io::Error) -> Self {
        PipelineError::IoError(error)
    }
}

impl From<netcdf::Error> for PipelineError {
    fn from(error: netcdf::Error) -> Self {
        PipelineError::NetCDFError(error)
    }
}

impl From<toml::de::Error> for PipelineError {
    fn from(error: toml::de::Error) -> Self {
        PipelineError::TomlError(error)
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(error: serde_json::Error) -> Self {
        PipelineError::JsonError(error)
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
