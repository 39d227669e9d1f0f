//! NetCDF inspection of pipeline inputs and outputs
//!
//! The pipeline itself never reads NetCDF data; these helpers back the
//! preflight grid check and the post-run verification of the final file.
//! None of their findings abort a run.

use crate::config::DimensionNames;
use crate::errors::{PipelineError, Result};
use ndarray::Array1;
use netcdf::File;
use std::path::Path;

/// Largest coordinate difference still treated as the same grid
pub const COORDINATE_TOLERANCE: f64 = 1e-6;

/// How two files' horizontal grids relate
#[derive(Debug, Clone, PartialEq)]
pub enum GridComparison {
    /// Same shape and coordinate values
    Identical,
    /// Different (lat, lon) lengths
    ShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },
    /// Same shape but coordinates disagree by more than the tolerance
    CoordinatesDiffer { max_difference: f64 },
}

impl GridComparison {
    pub fn is_identical(&self) -> bool {
        matches!(self, GridComparison::Identical)
    }
}

fn dimension_len(file: &File, path: &Path, dim: &str) -> Result<usize> {
    file.dimension(dim)
        .map(|d| d.len())
        .ok_or_else(|| PipelineError::DimensionNotFound {
            file: path.to_path_buf(),
            dim: dim.to_string(),
        })
}

/// Number of timesteps in a file
pub fn count_timesteps(path: &Path, time_dim: &str) -> Result<usize> {
    let file = netcdf::open(path)?;
    dimension_len(&file, path, time_dim)
}

/// Number of vertical levels in a file
pub fn level_count(path: &Path, level_dim: &str) -> Result<usize> {
    let file = netcdf::open(path)?;
    dimension_len(&file, path, level_dim)
}

/// Values of a coordinate variable, if the file has one
fn coordinate(file: &File, name: &str) -> Result<Option<Array1<f64>>> {
    match file.variable(name) {
        Some(var) if var.dimensions().len() == 1 => {
            let values = var.get_values::<f64, _>(..)?;
            Ok(Some(Array1::from_vec(values)))
        }
        _ => Ok(None),
    }
}

fn max_abs_difference(a: &Array1<f64>, b: &Array1<f64>) -> f64 {
    (a - b).mapv(f64::abs).fold(0.0, |acc, &x| acc.max(x))
}

/// Compare the horizontal grids of two files
///
/// Lengths of the latitude and longitude dimensions must match. When both
/// files carry 1D coordinate variables of the same names, their values are
/// compared as well.
pub fn compare_horizontal_grids(
    left: &Path,
    right: &Path,
    dims: &DimensionNames,
) -> Result<GridComparison> {
    let a = netcdf::open(left)?;
    let b = netcdf::open(right)?;

    let shape_a = (
        dimension_len(&a, left, &dims.latitude)?,
        dimension_len(&a, left, &dims.longitude)?,
    );
    let shape_b = (
        dimension_len(&b, right, &dims.latitude)?,
        dimension_len(&b, right, &dims.longitude)?,
    );
    if shape_a != shape_b {
        return Ok(GridComparison::ShapeMismatch {
            left: shape_a,
            right: shape_b,
        });
    }

    let mut max_difference: f64 = 0.0;
    for name in [&dims.latitude, &dims.longitude] {
        if let (Some(ca), Some(cb)) = (coordinate(&a, name)?, coordinate(&b, name)?) {
            if ca.len() == cb.len() {
                max_difference = max_difference.max(max_abs_difference(&ca, &cb));
            }
        }
    }

    if max_difference > COORDINATE_TOLERANCE {
        Ok(GridComparison::CoordinatesDiffer { max_difference })
    } else {
        Ok(GridComparison::Identical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_max_abs_difference() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![1.0, 2.5, 2.0];
        assert_eq!(max_abs_difference(&a, &b), 1.0);
        assert_eq!(max_abs_difference(&a, &a), 0.0);
    }

    #[test]
    fn test_grid_comparison_identity() {
        assert!(GridComparison::Identical.is_identical());
        assert!(!GridComparison::CoordinatesDiffer {
            max_difference: 0.1
        }
        .is_identical());
    }
}
