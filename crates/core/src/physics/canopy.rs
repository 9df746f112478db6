//! Vegetation canopy drag
//!
//! The canopy height is reconstructed from the roughness lattice at every
//! ground element inside the cutoff radius. Cells of the vertical column above
//! the element then receive a drag coefficient shaped by a Gaussian leaf area
//! density profile peaking at mid-canopy:
//!
//! ```text
//! C(h0) = (1/scale) · Cd · lad_max · exp(−10 · (h0/hf − 0.5)²),  0 ≤ h0 ≤ hf
//! ```
//!
//! The coefficient field is static for a run. Each outer iteration the drag
//! force `F = −½ ρ u |u| C` is evaluated from the current velocity.

use crate::config::{CaseConfig, CANOPY_AIR_DENSITY};
use crate::core_types::{Vec2, Vec3, VectorField};
use crate::error::ConfigError;
use crate::grid::{reduce, Decomposition, RoughnessLattice, Subdomain, VerticalLayering};
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Cells whose horizontal position is within this distance of a ground
/// element belong to its column
pub const COLUMN_TOLERANCE: f64 = 1e-5;

/// Scalars of the drag coefficient profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanopyParams {
    /// Canopy drag coefficient `Cd`
    pub drag_coefficient: f64,
    /// Peak leaf area density `lad_max`
    pub max_area_density: f64,
    /// Site-to-mesh scale factor
    pub scale: f64,
    /// Radius (site units) inside which drag is applied
    pub cutoff_radius: f64,
}

impl CanopyParams {
    pub fn from_config(config: &CaseConfig) -> Self {
        Self {
            drag_coefficient: config.roughness.drag_coefficient,
            max_area_density: config.roughness.max_area_density,
            scale: config.mesh.scale,
            cutoff_radius: config.terrain.canopy_cutoff(),
        }
    }

    /// Drag coefficient at height `h0` above ground under a canopy of height
    /// `hf` (mesh units). Zero without canopy or outside `[0, hf]`.
    #[inline]
    pub fn coefficient(&self, h0: f64, hf: f64) -> f64 {
        if hf == 0.0 || h0 < 0.0 || h0 > hf {
            return 0.0;
        }
        let shape = h0 / hf - 0.5;
        (self.drag_coefficient * self.max_area_density * (-10.0 * shape * shape).exp() / self.scale).max(0.0)
    }
}

/// Summary of a coefficient field build
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CanopyStats {
    /// Ground elements visited
    pub ground_elements: usize,
    /// Ground elements inside the cutoff radius with a non-zero canopy
    pub within_cutoff: usize,
    /// Cells that received a non-zero coefficient
    pub cells_with_drag: usize,
    /// Tallest reconstructed canopy (mesh units)
    pub max_canopy_height: f64,
}

/// Horizontal index of the cells of one subdomain, bucketed by
/// `COLUMN_TOLERANCE`
pub(crate) struct ColumnIndex<'a> {
    cells: &'a [Vec3],
    buckets: FxHashMap<(i64, i64), Vec<usize>>,
}

impl<'a> ColumnIndex<'a> {
    fn key(x: f64, y: f64) -> (i64, i64) {
        (
            (x / COLUMN_TOLERANCE).floor() as i64,
            (y / COLUMN_TOLERANCE).floor() as i64,
        )
    }

    pub(crate) fn new(cells: &'a [Vec3]) -> Self {
        let mut buckets: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
        for (i, p) in cells.iter().enumerate() {
            buckets.entry(Self::key(p.x, p.y)).or_default().push(i);
        }
        Self { cells, buckets }
    }

    /// Cells within `COLUMN_TOLERANCE` of `(x, y)` on both axes
    pub(crate) fn column(&self, x: f64, y: f64) -> Vec<usize> {
        let (kx, ky) = Self::key(x, y);
        let mut found = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = self.buckets.get(&(kx + dx, ky + dy)) {
                    found.extend(bucket.iter().copied().filter(|&i| {
                        let p = &self.cells[i];
                        (p.x - x).abs() < COLUMN_TOLERANCE && (p.y - y).abs() < COLUMN_TOLERANCE
                    }));
                }
            }
        }
        found.sort_unstable();
        found
    }
}

/// Builds the static canopy coefficient field from the roughness lattice
pub struct CanopyFieldBuilder<'a> {
    lattice: &'a RoughnessLattice,
    layering: VerticalLayering,
    params: CanopyParams,
}

impl<'a> CanopyFieldBuilder<'a> {
    pub fn new(lattice: &'a RoughnessLattice, layering: VerticalLayering, params: CanopyParams) -> Self {
        Self {
            lattice,
            layering,
            params,
        }
    }

    /// Canopy height (mesh units) above a ground element at mesh position
    /// `(x, y)`; zero outside the cutoff radius
    pub fn canopy_height(&self, x: f64, y: f64) -> f64 {
        let scale = self.params.scale;
        let cutoff = self.params.cutoff_radius * scale;
        if x * x + y * y >= cutoff * cutoff {
            return 0.0;
        }
        scale * self.lattice.canopy_height_at(Vec2::new(x / scale, y / scale))
    }

    fn build_subdomain(&self, subdomain: &Subdomain) -> (Vec<Vec3>, CanopyStats) {
        let mut coefficients = vec![Vec3::zeros(); subdomain.cell_count()];
        let mut stats = CanopyStats {
            ground_elements: subdomain.ground_count(),
            ..CanopyStats::default()
        };
        let index = ColumnIndex::new(subdomain.cells());

        for element in subdomain.ground() {
            let hf = self.canopy_height(element.x, element.y);
            if hf == 0.0 {
                continue;
            }
            stats.within_cutoff += 1;
            stats.max_canopy_height = stats.max_canopy_height.max(hf);

            for cell in index.column(element.x, element.y) {
                let h0 = self
                    .layering
                    .height_above_ground(subdomain.cells()[cell].z, element.z);
                let c = self.params.coefficient(h0, hf);
                if c > 0.0 {
                    coefficients[cell] = Vec3::new(c, c, c);
                }
            }
        }

        stats.cells_with_drag = coefficients.iter().filter(|c| c.x > 0.0).count();
        (coefficients, stats)
    }

    /// Coefficient field for every cell of every subdomain
    pub fn build(&self, decomposition: &Decomposition) -> (VectorField, CanopyStats) {
        let (parts, partial_stats): (Vec<_>, Vec<_>) = decomposition
            .subdomains()
            .par_iter()
            .map(|s| self.build_subdomain(s))
            .unzip();

        let counts = |f: fn(&CanopyStats) -> usize| -> usize {
            reduce::sum_counts(&partial_stats.iter().map(f).collect::<Vec<_>>())
        };
        let heights: Vec<f64> = partial_stats.iter().map(|s| s.max_canopy_height).collect();
        let stats = CanopyStats {
            ground_elements: counts(|s| s.ground_elements),
            within_cutoff: counts(|s| s.within_cutoff),
            cells_with_drag: counts(|s| s.cells_with_drag),
            max_canopy_height: reduce::max(&heights).max(0.0),
        };

        info!(
            "Canopy field: {} of {} ground elements under canopy, {} cells with drag, max height {:.3}",
            stats.within_cutoff, stats.ground_elements, stats.cells_with_drag, stats.max_canopy_height
        );

        (VectorField::from_parts(parts), stats)
    }
}

/// Canopy drag force for the current velocity, written into `out`
///
/// # Errors
/// Returns `ConfigError::LayoutMismatch` if the three fields are not laid out
/// identically
pub fn apply_drag(coefficients: &VectorField, velocity: &VectorField, out: &mut VectorField) -> Result<(), ConfigError> {
    let same_layout = |a: &VectorField, b: &VectorField| {
        a.rank_count() == b.rank_count() && a.parts().iter().zip(b.parts()).all(|(p, q)| p.len() == q.len())
    };
    if !same_layout(coefficients, velocity) || !same_layout(coefficients, out) {
        return Err(ConfigError::LayoutMismatch(
            "drag coefficient, velocity and drag force fields differ in layout".to_string(),
        ));
    }

    out.parts_mut()
        .par_iter_mut()
        .zip(coefficients.parts().par_iter())
        .zip(velocity.parts().par_iter())
        .for_each(|((f, c), u)| {
            for ((f, c), u) in f.iter_mut().zip(c).zip(u) {
                let magnitude = u.norm();
                *f = -0.5 * CANOPY_AIR_DENSITY * magnitude * u.component_mul(c);
            }
        });

    debug!("Canopy drag updated for {} cells", out.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{RasterStrategy, RoughnessSample};
    use approx::assert_relative_eq;

    fn params() -> CanopyParams {
        CanopyParams {
            drag_coefficient: 0.2,
            max_area_density: 0.1,
            scale: 1.0,
            cutoff_radius: 1700.0,
        }
    }

    fn layering() -> VerticalLayering {
        VerticalLayering {
            domain_height: 1000.0,
            near_ground_height: 40.0,
            near_ground_layers: 8.0,
            growth_ratio: 1.2,
            scale: 1.0,
        }
    }

    /// Flat lattice with every node at `height`
    fn flat_lattice(height: f64) -> RoughnessLattice {
        let mut lattice = RoughnessLattice::new(350.0, 100.0);
        let samples: Vec<_> = (0..lattice.node_count())
            .map(|i| RoughnessSample {
                position: lattice.node_position(i),
                height,
            })
            .collect();
        lattice.rasterize(&samples, RasterStrategy::Indexed);
        lattice
    }

    #[test]
    fn test_profile_peaks_mid_canopy() {
        let p = params();
        let peak = p.coefficient(10.0, 20.0);

        assert_relative_eq!(peak, 0.02, epsilon = 1e-15);
        assert!(p.coefficient(5.0, 20.0) < peak);
        assert!(p.coefficient(15.0, 20.0) < peak);
        assert_relative_eq!(p.coefficient(5.0, 20.0), p.coefficient(15.0, 20.0), epsilon = 1e-15);
        assert_relative_eq!(p.coefficient(0.0, 20.0), 0.02 * (-2.5f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn test_no_canopy_no_drag() {
        let p = params();
        assert_eq!(p.coefficient(0.0, 0.0), 0.0);
        assert_eq!(p.coefficient(-0.1, 20.0), 0.0);
        assert_eq!(p.coefficient(20.1, 20.0), 0.0);
    }

    #[test]
    fn test_column_cells_get_coefficient() {
        let lattice = flat_lattice(20.0);
        // Flat ground: first-layer centre at hh/2 = 2.5
        let mesh = Decomposition::serial(
            vec![
                Vec3::new(10.0, 10.0, 2.5),
                Vec3::new(10.0, 10.0, 10.0),
                Vec3::new(10.0 + 1e-7, 10.0, 25.0),
                Vec3::new(60.0, 10.0, 10.0),
            ],
            vec![Vec3::new(10.0, 10.0, 2.5)],
        );

        let builder = CanopyFieldBuilder::new(&lattice, layering(), params());
        let (field, stats) = builder.build(&mesh);
        let part = field.part(0);

        assert_eq!(stats.within_cutoff, 1);
        assert_eq!(stats.cells_with_drag, 2);
        assert_relative_eq!(stats.max_canopy_height, 20.0, epsilon = 1e-12);
        assert_relative_eq!(part[1].x, 0.02, epsilon = 1e-12);
        assert_eq!(part[1].x, part[1].z);
        assert!(part[0].x > 0.0);
        // Above the canopy
        assert_eq!(part[2], Vec3::zeros());
        // Different column
        assert_eq!(part[3], Vec3::zeros());
    }

    #[test]
    fn test_outside_cutoff_is_bare() {
        let lattice = flat_lattice(20.0);
        let builder = CanopyFieldBuilder::new(
            &lattice,
            layering(),
            CanopyParams {
                cutoff_radius: 10.0,
                ..params()
            },
        );

        assert_eq!(builder.canopy_height(10.0, 0.0), 0.0);
        assert_relative_eq!(builder.canopy_height(5.0, 5.0), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn test_drag_opposes_velocity() {
        let coefficients = VectorField::from_parts(vec![vec![Vec3::new(0.02, 0.02, 0.02), Vec3::zeros()]]);
        let velocity = VectorField::from_parts(vec![vec![Vec3::new(3.0, -4.0, 0.0), Vec3::new(5.0, 0.0, 0.0)]]);
        let mut out = VectorField::from_parts(vec![vec![Vec3::zeros(); 2]]);

        apply_drag(&coefficients, &velocity, &mut out).unwrap();
        let f = out.part(0);

        assert_relative_eq!(f[0].x, -0.5 * 1.22 * 3.0 * 5.0 * 0.02, epsilon = 1e-12);
        assert_relative_eq!(f[0].y, 0.5 * 1.22 * 4.0 * 5.0 * 0.02, epsilon = 1e-12);
        assert_eq!(f[0].z, 0.0);
        assert_eq!(f[1], Vec3::zeros());
    }

    #[test]
    fn test_drag_rejects_layout_mismatch() {
        let coefficients = VectorField::from_parts(vec![vec![Vec3::zeros(); 2]]);
        let velocity = VectorField::from_parts(vec![vec![Vec3::zeros(); 3]]);
        let mut out = VectorField::from_parts(vec![vec![Vec3::zeros(); 2]]);

        assert!(apply_drag(&coefficients, &velocity, &mut out).is_err());
    }
}
