//! Fixed-height extracts from a terrain-following solution
//!
//! Cells are stored layer by layer: cell `layer * base + column`. The height
//! above ground of every layer is taken from the first column, so all columns
//! share one vertical profile and only their ground offsets differ. Where the
//! stretching varies between columns this is an approximation.

use crate::core_types::Vec3;
use crate::error::{ConfigError, OutputError};
use crate::grid::VerticalLayering;
use crate::physics::canopy::ColumnIndex;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Final solution in layer-major cell order
#[derive(Debug, Clone, PartialEq)]
pub struct LayeredSolution {
    positions: Vec<Vec3>,
    velocity: Vec<Vec3>,
    pressure: Vec<f64>,
    base: usize,
}

impl LayeredSolution {
    /// Wrap a solution of `base` columns
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if the arrays differ in length,
    /// `base` is zero, the cell count is not a multiple of `base`, or there
    /// are fewer than two layers
    pub fn new(
        positions: Vec<Vec3>,
        velocity: Vec<Vec3>,
        pressure: Vec<f64>,
        base: usize,
    ) -> Result<Self, ConfigError> {
        if velocity.len() != positions.len() || pressure.len() != positions.len() {
            return Err(ConfigError::LayoutMismatch(format!(
                "{} cell positions, {} velocities, {} pressures",
                positions.len(),
                velocity.len(),
                pressure.len()
            )));
        }
        if base == 0 || positions.len() % base != 0 {
            return Err(ConfigError::LayoutMismatch(format!(
                "{} cells do not stack into columns of base {base}",
                positions.len()
            )));
        }
        if positions.len() / base < 2 {
            return Err(ConfigError::LayoutMismatch(format!(
                "{} cells over {base} columns give fewer than two layers",
                positions.len()
            )));
        }
        Ok(Self {
            positions,
            velocity,
            pressure,
            base,
        })
    }

    /// Gather cells in any order into layer-major columns, one column per
    /// ground element
    ///
    /// A cell belongs to the column of the ground element sharing its
    /// horizontal position within `COLUMN_TOLERANCE`; each column is ordered
    /// bottom to top.
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if a cell sits above no ground
    /// element, columns differ in height, or the result fails `new`
    pub fn from_columns(
        ground: &[Vec3],
        positions: Vec<Vec3>,
        velocity: Vec<Vec3>,
        pressure: Vec<f64>,
    ) -> Result<Self, ConfigError> {
        if velocity.len() != positions.len() || pressure.len() != positions.len() {
            return Err(ConfigError::LayoutMismatch(format!(
                "{} cell positions, {} velocities, {} pressures",
                positions.len(),
                velocity.len(),
                pressure.len()
            )));
        }

        let index = ColumnIndex::new(&positions);
        let columns: Vec<Vec<usize>> = ground
            .iter()
            .map(|g| {
                let mut column = index.column(g.x, g.y);
                column.sort_by(|&a, &b| positions[a].z.total_cmp(&positions[b].z));
                column
            })
            .collect();

        let layers = columns.first().map_or(0, Vec::len);
        if let Some((k, column)) = columns.iter().enumerate().find(|(_, c)| c.len() != layers) {
            return Err(ConfigError::LayoutMismatch(format!(
                "column {k} holds {} cells, column 0 holds {layers}",
                column.len()
            )));
        }
        let assigned: usize = columns.iter().map(Vec::len).sum();
        if assigned != positions.len() {
            return Err(ConfigError::LayoutMismatch(format!(
                "{} of {} cells sit above a ground element",
                assigned,
                positions.len()
            )));
        }

        let order: Vec<usize> = (0..layers)
            .flat_map(|j| columns.iter().map(move |c| c[j]))
            .collect();
        Self::new(
            order.iter().map(|&i| positions[i]).collect(),
            order.iter().map(|&i| velocity[i]).collect(),
            order.iter().map(|&i| pressure[i]).collect(),
            ground.len(),
        )
    }

    /// Columns per layer
    pub fn base(&self) -> usize {
        self.base
    }

    /// Number of layers
    pub fn layer_count(&self) -> usize {
        self.positions.len() / self.base
    }

    #[inline]
    fn cell(&self, layer: usize, column: usize) -> usize {
        layer * self.base + column
    }
}

/// One row of a height slice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SliceRow {
    pub position: Vec3,
    pub velocity: Vec3,
    pub pressure: f64,
}

/// Flow sampled at one height above ground in every column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightSlice {
    /// Requested height above ground (site units)
    pub height: f64,
    pub rows: Vec<SliceRow>,
}

impl HeightSlice {
    /// File name of the extract: the height rounded to an integer
    pub fn file_name(&self) -> String {
        format!("{:.0}", self.height)
    }

    /// Write `x  y  z  ux  uy  uz  p` rows into `dir`
    ///
    /// # Errors
    /// Returns `OutputError` if the directory or file cannot be written
    pub fn write(&self, dir: &Path) -> Result<PathBuf, OutputError> {
        fs::create_dir_all(dir).map_err(|e| OutputError::CreateDir(dir.to_path_buf(), e))?;
        let path = dir.join(self.file_name());

        let mut contents = String::with_capacity(self.rows.len() * 96);
        for row in &self.rows {
            let _ = writeln!(
                contents,
                "{}  {}  {}  {}  {}  {}  {}",
                row.position.x,
                row.position.y,
                row.position.z,
                row.velocity.x,
                row.velocity.y,
                row.velocity.z,
                row.pressure
            );
        }

        fs::write(&path, contents).map_err(|e| OutputError::Write(path.clone(), e))?;
        Ok(path)
    }
}

/// Resamples a layered solution at fixed heights above ground
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerticalProfileInterpolator {
    layering: VerticalLayering,
}

impl VerticalProfileInterpolator {
    pub fn new(layering: VerticalLayering) -> Self {
        Self { layering }
    }

    /// Ground offset of every column from its layer-0 cell
    pub fn ground_offsets(&self, solution: &LayeredSolution) -> Vec<f64> {
        (0..solution.base)
            .map(|k| self.layering.ground_offset(solution.positions[k].z))
            .collect()
    }

    /// Height above ground of every layer, measured in column 0 and shared
    /// by all columns
    pub fn profile(&self, solution: &LayeredSolution) -> Vec<f64> {
        let g0 = self.layering.ground_offset(solution.positions[0].z);
        (0..solution.layer_count())
            .map(|j| solution.positions[solution.cell(j, 0)].z - g0)
            .collect()
    }

    /// Lower layer and weight of the bracket containing `target`
    fn bracket(profile: &[f64], target: f64) -> Option<(usize, f64)> {
        let n = profile.len();
        if n < 2 || !(target >= profile[0] && target <= profile[n - 1]) {
            return None;
        }
        let above = profile.partition_point(|&p| p <= target);
        if above >= n {
            return Some((n - 2, 1.0));
        }
        let j = above - 1;
        let span = profile[j + 1] - profile[j];
        let w = if span == 0.0 { 0.0 } else { (target - profile[j]) / span };
        Some((j, w))
    }

    /// Sample the solution at `height` above ground (site units)
    pub fn slice(&self, solution: &LayeredSolution, height: f64) -> Option<HeightSlice> {
        let profile = self.profile(solution);
        let target = height * self.layering.scale;

        let Some((j, w)) = Self::bracket(&profile, target) else {
            warn!(
                "Height {} (target {:.3}) outside the vertical profile [{:.3}, {:.3}], skipped",
                height,
                target,
                profile.first().copied().unwrap_or(f64::NAN),
                profile.last().copied().unwrap_or(f64::NAN)
            );
            return None;
        };

        let offsets = self.ground_offsets(solution);
        let rows = (0..solution.base)
            .map(|k| {
                let lo = solution.cell(j, k);
                let hi = solution.cell(j + 1, k);
                let p = solution.positions[lo];
                SliceRow {
                    position: Vec3::new(p.x, p.y, target + offsets[k]),
                    velocity: solution.velocity[lo] + (solution.velocity[hi] - solution.velocity[lo]) * w,
                    pressure: solution.pressure[lo] + (solution.pressure[hi] - solution.pressure[lo]) * w,
                }
            })
            .collect();

        debug!("Height {}: layers {}-{}, weight {:.4}", height, j, j + 1, w);
        Some(HeightSlice { height, rows })
    }

    /// Sample every requested height, skipping those outside the profile
    pub fn extract(&self, solution: &LayeredSolution, heights: &[f64]) -> Vec<HeightSlice> {
        let expected = self.layering.layer_count();
        if expected != solution.layer_count() {
            warn!(
                "Layering parameters imply {} layers, solution has {}",
                expected,
                solution.layer_count()
            );
        }
        heights.iter().filter_map(|&z| self.slice(solution, z)).collect()
    }
}
