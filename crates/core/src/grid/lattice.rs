//! Roughness lattice: scattered canopy samples → regular grid
//!
//! A uniform square lattice of spacing `cee` covers the domain, extended to the
//! next multiple of the spacing and centred on the origin. Every sample
//! overwrites the canopy height of its nearest node; nodes no sample reaches
//! stay at zero. Nothing is averaged, so two samples sharing a node leave the
//! value of the one processed last.
//!
//! Canopy height between nodes is reconstructed by splitting each lattice cell
//! along its anti-diagonal into two triangles and interpolating linearly on the
//! triangle containing the query point.
//!
//! All coordinates here are site units in the domain frame.

use crate::core_types::vec3::Vec2;
use serde::{Deserialize, Serialize};

/// A scattered canopy-height sample in the domain frame (site units)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoughnessSample {
    /// Planar position
    pub position: Vec2,
    /// Canopy height, already scaled by the vegetation multiplier
    pub height: f64,
}

/// How the nearest node of a sample is located
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RasterStrategy {
    /// Compare the sample against every node (samples × nodes)
    LinearScan,
    /// Compute the node directly from the uniform spacing
    #[default]
    Indexed,
}

/// Outcome of a rasterization pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RasterStats {
    /// Samples written to the lattice
    pub samples: usize,
    /// Distinct nodes that received at least one sample
    pub nodes_written: usize,
    /// Samples that overwrote a node written earlier in the same pass
    pub overwrites: usize,
}

/// Uniform lattice of canopy heights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoughnessLattice {
    spacing: f64,
    /// Side length of the covered square
    extent: f64,
    /// Intervals per side; nodes per side is `intervals + 1`
    intervals: usize,
    /// Row-major node heights: `row * (intervals + 1) + col`
    heights: Vec<f64>,
}

impl RoughnessLattice {
    /// Lattice covering a square domain of side `domain_size`
    pub fn new(domain_size: f64, spacing: f64) -> Self {
        let extent = domain_size + spacing - domain_size % spacing;
        let intervals = (extent / spacing).round() as usize;
        let n = intervals + 1;
        Self {
            spacing,
            extent,
            intervals,
            heights: vec![0.0; n * n],
        }
    }

    /// Node spacing
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Side length of the covered square
    pub fn extent(&self) -> f64 {
        self.extent
    }

    /// Nodes per side
    pub fn nodes_per_side(&self) -> usize {
        self.intervals + 1
    }

    /// Total node count
    pub fn node_count(&self) -> usize {
        self.heights.len()
    }

    /// Row-major node heights
    pub fn heights(&self) -> &[f64] {
        &self.heights
    }

    /// Height at node `(col, row)`
    #[inline]
    pub fn height(&self, col: usize, row: usize) -> f64 {
        self.heights[row * self.nodes_per_side() + col]
    }

    /// Position of node `index`
    pub fn node_position(&self, index: usize) -> Vec2 {
        let n = self.nodes_per_side();
        let col = index % n;
        let row = index / n;
        Vec2::new(
            col as f64 * self.spacing - self.extent / 2.0,
            row as f64 * self.spacing - self.extent / 2.0,
        )
    }

    /// Nearest node by exhaustive search. Ties go to the smallest node index.
    pub fn nearest_node_scan(&self, p: Vec2) -> usize {
        let mut best = 0;
        let mut best_dist = f64::INFINITY;
        for i in 0..self.node_count() {
            let d = (self.node_position(i) - p).norm_squared();
            if d < best_dist {
                best_dist = d;
                best = i;
            }
        }
        best
    }

    /// Nearest node computed from the lattice spacing.
    /// Rounds half down on each axis, which picks the smallest index on ties.
    pub fn nearest_node_indexed(&self, p: Vec2) -> usize {
        let axis = |v: f64| -> usize {
            let t = (v + self.extent / 2.0) / self.spacing;
            let k = (t - 0.5).ceil();
            if k <= 0.0 {
                0
            } else {
                (k as usize).min(self.intervals)
            }
        };
        axis(p.y) * self.nodes_per_side() + axis(p.x)
    }

    /// Write every sample onto its nearest node, in order
    pub fn rasterize(&mut self, samples: &[RoughnessSample], strategy: RasterStrategy) -> RasterStats {
        let mut written = vec![false; self.node_count()];
        let mut stats = RasterStats::default();

        for sample in samples {
            let node = match strategy {
                RasterStrategy::LinearScan => self.nearest_node_scan(sample.position),
                RasterStrategy::Indexed => self.nearest_node_indexed(sample.position),
            };
            if written[node] {
                stats.overwrites += 1;
            } else {
                written[node] = true;
                stats.nodes_written += 1;
            }
            self.heights[node] = sample.height;
            stats.samples += 1;
        }

        stats
    }

    /// Canopy height at a planar position by triangular interpolation
    pub fn canopy_height_at(&self, p: Vec2) -> f64 {
        let n = self.nodes_per_side();
        if n < 2 {
            return self.heights.first().copied().unwrap_or(0.0);
        }

        // Upper cell index along one axis and the offset from the lower node
        let locate = |v: f64| -> (usize, f64) {
            let t = (v + self.extent / 2.0) / self.spacing;
            let upper = (t.ceil().max(1.0) as usize).min(self.intervals);
            let frac = (t - (upper - 1) as f64).clamp(0.0, 1.0);
            (upper, frac)
        };
        let (aa, tx) = locate(p.x);
        let (bb, ty) = locate(p.y);

        let n00 = self.height(aa - 1, bb - 1);
        let n10 = self.height(aa, bb - 1);
        let n01 = self.height(aa - 1, bb);
        let n11 = self.height(aa, bb);

        if tx + ty <= 1.0 {
            n00 + (n10 - n00) * tx + (n01 - n00) * ty
        } else {
            n10 + n01 - n11 + (n11 - n01) * tx + (n11 - n10) * ty
        }
    }
}
