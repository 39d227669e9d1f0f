//! Process-scoped temporary directory and intermediate file naming

use crate::errors::Result;
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::{Builder, TempDir};

const PREFIX: &str = "ocean_timeseries.";

/// Temporary directory owned by a single run
///
/// The directory is removed when the value is dropped, so every early return
/// through `?` cleans up. [`Workspace::close`] does the same but reports
/// removal errors.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, uniquely named directory under `root`, or under the
    /// system temporary directory when `root` is `None`.
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = Builder::new();
        builder.prefix(PREFIX);
        let dir = match root {
            Some(root) => {
                fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Intermediate files of one month
    pub fn month(&self, year: i32, month: u32) -> MonthArtifacts {
        let key = format!("{}_{:02}", year, month);
        let file = |stage: &str| self.path().join(format!("{}_{}.nc", stage, key));
        MonthArtifacts {
            bottom_slice: file("bottom_slice"),
            bottom_2d: file("bottom_2d"),
            bottom_renamed: file("bottom_renamed"),
            with_bathymetry: file("with_bathymetry"),
            regridded: file("regridded"),
            surface_mean: file("surface_mean"),
            merged: file("monthly"),
        }
    }

    /// Time series of all monthly files of one year
    pub fn year_series(&self, year: i32) -> PathBuf {
        self.path().join(format!("year_{}.nc", year))
    }

    /// Remove the directory tree
    pub fn close(self) -> Result<()> {
        let path = self.path().to_path_buf();
        self.dir.close()?;
        debug!("Removed workspace {}", path.display());
        Ok(())
    }
}

/// Paths of the seven per-month intermediates, unique per (year, month)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthArtifacts {
    pub bottom_slice: PathBuf,
    pub bottom_2d: PathBuf,
    pub bottom_renamed: PathBuf,
    pub with_bathymetry: PathBuf,
    pub regridded: PathBuf,
    pub surface_mean: PathBuf,
    /// Bottom field and surface means in one 2D file
    pub merged: PathBuf,
}

impl MonthArtifacts {
    fn intermediates(&self) -> [&Path; 6] {
        [
            self.bottom_slice.as_path(),
            self.bottom_2d.as_path(),
            self.bottom_renamed.as_path(),
            self.with_bathymetry.as_path(),
            self.regridded.as_path(),
            self.surface_mean.as_path(),
        ]
    }

    /// Delete everything but the monthly merge. Files that were never written
    /// are ignored.
    pub fn discard(&self) -> Result<()> {
        for path in self.intermediates() {
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}
