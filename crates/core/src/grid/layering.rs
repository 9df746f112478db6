//! Vertical layering of the terrain-following mesh
//!
//! The mesh stacks `ceng` uniform layers of thickness `hh = h1 / ceng` in the
//! near-ground band, then grows layers geometrically with ratio `q1` up to the
//! domain top `h`. Columns follow the terrain, so heights above ground are
//! recovered from the first-layer cell of each column.
//!
//! ```text
//! offset(z_ref) = (2·z_ref − hh·scale) · h / (2h − hh)
//! h0            = z − offset(z_ref)
//! ```

use serde::{Deserialize, Serialize};

/// Layering parameters (site units, except `scale`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerticalLayering {
    /// Domain height `h`
    pub domain_height: f64,
    /// Near-ground band height `h1`
    pub near_ground_height: f64,
    /// Number of uniform layers in the near-ground band `ceng`
    pub near_ground_layers: f64,
    /// Geometric growth ratio above the band `q1`
    pub growth_ratio: f64,
    /// Site-to-mesh scale factor
    pub scale: f64,
}

impl VerticalLayering {
    /// Thickness of one near-ground layer `hh = h1 / ceng` (site units)
    pub fn first_layer_thickness(&self) -> f64 {
        self.near_ground_height / self.near_ground_layers
    }

    /// Total number of layers implied by the layering parameters
    pub fn layer_count(&self) -> usize {
        let hh = self.first_layer_thickness();
        let band = self.near_ground_layers.round() as usize;
        let upper = self.domain_height - self.near_ground_height;
        if upper <= 0.0 {
            return band;
        }
        let q = self.growth_ratio;
        let grown = if (q - 1.0).abs() < 1e-12 {
            (upper / hh).ceil()
        } else {
            ((upper * (q - 1.0) / hh / q + 1.0).ln() / q.ln()).ceil()
        };
        band + grown.max(0.0) as usize
    }

    /// Terrain offset of a column, from the elevation of its reference
    /// (first-layer) element, in mesh units
    #[inline]
    pub fn ground_offset(&self, reference_z: f64) -> f64 {
        let hh = self.first_layer_thickness();
        let h = self.domain_height;
        (2.0 * reference_z - hh * self.scale) * h / (2.0 * h - hh)
    }

    /// Height above local ground of a point at elevation `z` in the column
    /// whose reference element sits at `reference_z` (mesh units)
    #[inline]
    pub fn height_above_ground(&self, z: f64, reference_z: f64) -> f64 {
        z - self.ground_offset(reference_z)
    }
}
