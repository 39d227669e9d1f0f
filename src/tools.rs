//! Discovery of the external programs the pipeline drives
//!
//! Three tool families are required: CDO, NCO (`ncwa` and `ncrename`) and the
//! vertical regridder. All of them are resolved to absolute paths before the
//! run touches any directory.

use crate::config::PipelineConfig;
use crate::errors::{Result, PipelineError};
use std::env;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Tool family, used in diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolFamily {
    Cdo,
    Nco,
    Regridder,
}

impl ToolFamily {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cdo => "CDO",
            Self::Nco => "NCO",
            Self::Regridder => "vertical regridding",
        }
    }
}

/// Resolved locations of every program the pipeline invokes
#[derive(Debug, Clone)]
pub struct Toolchain {
    pub cdo: PathBuf,
    pub ncwa: PathBuf,
    pub ncrename: PathBuf,
    pub regridder: PathBuf,
}

impl Toolchain {
    /// Resolve all programs against the process `PATH`
    pub fn resolve(config: &PipelineConfig) -> Result<Self> {
        let search_path = env::var_os("PATH").unwrap_or_default();
        Self::resolve_in(config, &search_path)
    }

    /// Resolve all programs against an explicit search path
    pub fn resolve_in(config: &PipelineConfig, search_path: &OsStr) -> Result<Self> {
        let lookup = |family: ToolFamily, program: &str| {
            find_program(program, search_path).ok_or_else(|| PipelineError::MissingTool {
                family: family.as_str().to_string(),
                program: program.to_string(),
            })
        };

        Ok(Self {
            cdo: lookup(ToolFamily::Cdo, &config.tools.cdo)?,
            ncwa: lookup(ToolFamily::Nco, &config.tools.ncwa)?,
            ncrename: lookup(ToolFamily::Nco, &config.tools.ncrename)?,
            regridder: lookup(ToolFamily::Regridder, &config.regrid.program)?,
        })
    }
}

/// Find an executable the way a shell would. A name containing a path
/// separator is checked as given.
pub fn find_program(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return is_executable(candidate).then(|| candidate.to_path_buf());
    }

    env::split_paths(search_path)
        .filter(|dir| !dir.as_os_str().is_empty())
        .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
        .find(|path| is_executable(path))
}

#[cfg(windows)]
fn executable_names(program: &str) -> impl Iterator<Item = OsString> {
    let with_ext = OsString::from(format!("{}.exe", program));
    [OsString::from(program), with_ext].into_iter()
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> impl Iterator<Item = OsString> {
    std::iter::once(OsString::from(program))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
