//! Site-to-domain coordinate transform
//!
//! The mesh is built with the inflow along +x. Site coordinates (turbine
//! layout, vegetation samples) are rotated by the wind direction; turbine
//! coordinates are additionally scaled into mesh units.

use crate::core_types::vec3::Vec2;
use std::f64::consts::PI;

/// Rotation by the wind direction plus the site-to-mesh scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    angle: f64,
    cos: f64,
    sin: f64,
    scale: f64,
    origin: Vec2,
}

impl FrameTransform {
    /// Build the transform for a meteorological wind direction in degrees
    pub fn from_wind_angle(wind_angle_deg: f64, scale: f64, origin: Vec2) -> Self {
        let angle = -(90.0 + wind_angle_deg) * PI / 180.0;
        Self {
            angle,
            cos: angle.cos(),
            sin: angle.sin(),
            scale,
            origin,
        }
    }

    /// Rotation angle in radians
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Site-to-mesh scale factor
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Rotate a planar vector into the domain frame
    #[inline]
    pub fn rotate(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            p.x * self.cos + p.y * self.sin,
            -p.x * self.sin + p.y * self.cos,
        )
    }

    /// Turbine layout position: scaled, then rotated
    #[inline]
    pub fn turbine_position(&self, x: f64, y: f64) -> Vec2 {
        self.rotate(Vec2::new(x * self.scale, y * self.scale))
    }

    /// Vegetation sample position: shifted to the origin, then rotated (site units)
    #[inline]
    pub fn sample_position(&self, easting: f64, northing: f64) -> Vec2 {
        self.rotate(Vec2::new(easting - self.origin.x, northing - self.origin.y))
    }
}
