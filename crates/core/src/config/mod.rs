//! Case configuration
//!
//! Mirrors the case JSON file (`Input/input.json`). Section and field names
//! follow the file format; the Rust-side names are descriptive and mapped with
//! `#[serde(rename)]`.

use crate::core_types::Vec2;
use crate::error::ConfigError;
use crate::grid::{FrameTransform, VerticalLayering};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Air density used by the actuator-disk thrust law (kg/m³)
pub const AIR_DENSITY: f64 = 1.225;

/// Air density used by the canopy drag law (kg/m³)
pub const CANOPY_AIR_DENSITY: f64 = 1.22;

/// Computational domain extent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    /// Site longitude (degrees), informational
    #[serde(rename = "long", default)]
    pub longitude: f64,
    /// Site latitude (degrees), informational
    #[serde(rename = "lat", default)]
    pub latitude: f64,
    /// Horizontal side length of the square domain (site units)
    #[serde(rename = "lt")]
    pub size: f64,
    /// Domain height (site units)
    #[serde(rename = "h")]
    pub height: f64,
}

/// Inflow conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindConfig {
    /// Meteorological wind direction (degrees)
    pub angle: f64,
    /// Inlet speed (m/s), also the initial inflow estimate of every turbine
    pub speed: f64,
}

/// Mesh layering and scaling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshConfig {
    /// Height of the uniformly layered near-ground band (site units)
    pub h1: f64,
    /// Number of layers in the near-ground band
    #[serde(rename = "ceng")]
    pub near_ground_layers: f64,
    /// Geometric growth ratio above the near-ground band
    #[serde(rename = "q1")]
    pub growth_ratio: f64,
    /// Characteristic horizontal cell size per turbine type (site units)
    #[serde(rename = "lc2")]
    pub length_scales: Vec<f64>,
    /// Site-to-mesh scale factor
    pub scale: f64,
}

/// Terrain blending radii
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainConfig {
    /// Radius of the fully resolved terrain (site units)
    pub r1: f64,
    /// Outer radius of the blending ring (site units)
    pub r2: f64,
}

impl TerrainConfig {
    /// Radius inside which canopy drag is applied
    pub fn canopy_cutoff(&self) -> f64 {
        (self.r1 + self.r2) / 2.0
    }
}

/// Vegetation drag parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoughnessConfig {
    /// Canopy drag coefficient
    #[serde(rename = "Cd")]
    pub drag_coefficient: f64,
    /// Peak leaf area density (1/m)
    #[serde(rename = "lad_max")]
    pub max_area_density: f64,
    /// Multiplier applied to every canopy height sample
    #[serde(rename = "vege_times")]
    pub vegetation_multiplier: f64,
    /// Roughness lattice spacing (site units)
    #[serde(rename = "cee", default = "default_lattice_spacing")]
    pub lattice_spacing: f64,
    /// Planar origin of the sample coordinate system (easting, northing)
    #[serde(default)]
    pub origin: [f64; 2],
}

fn default_lattice_spacing() -> f64 {
    100.0
}

/// Ground projection matching
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroundConfig {
    /// Distance band for matching the nearest ground element.
    /// Zero means exact floating-point equality with the reduced minimum.
    #[serde(default)]
    pub tolerance: f64,
}

/// Post-processing request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostConfig {
    /// Declared number of heights; checked against `heights` when present
    #[serde(rename = "num_udh", default, skip_serializing_if = "Option::is_none")]
    pub height_count: Option<usize>,
    /// Heights above ground to extract (site units)
    #[serde(rename = "udh", default)]
    pub heights: Vec<f64>,
    /// Horizontal output spacing requested by the front end, informational
    #[serde(rename = "meshSize", default)]
    pub mesh_size: f64,
}

/// Complete case configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseConfig {
    pub domain: DomainConfig,
    pub wind: WindConfig,
    pub mesh: MeshConfig,
    pub terrain: TerrainConfig,
    pub roughness: RoughnessConfig,
    #[serde(default)]
    pub ground: GroundConfig,
    #[serde(default)]
    pub post: PostConfig,
}

impl CaseConfig {
    /// Load and validate a case file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_json(&contents, &path.display().to_string())
    }

    /// Parse and validate a case from a JSON string
    ///
    /// # Errors
    /// Returns error if the JSON is malformed or fails validation
    pub fn from_json(json: &str, source: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            source: source.to_string(),
            line: e.line(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every scalar the source terms depend on
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidParameter` naming the first bad value
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("domain.lt", self.domain.size)?;
        positive("domain.h", self.domain.height)?;
        finite("wind.angle", self.wind.angle)?;
        finite("wind.speed", self.wind.speed)?;
        positive("mesh.h1", self.mesh.h1)?;
        positive("mesh.ceng", self.mesh.near_ground_layers)?;
        positive("mesh.q1", self.mesh.growth_ratio)?;
        positive("mesh.scale", self.mesh.scale)?;
        if self.mesh.length_scales.is_empty() {
            return Err(ConfigError::InvalidParameter {
                name: "mesh.lc2",
                message: "at least one length scale is required".to_string(),
            });
        }
        for &l in &self.mesh.length_scales {
            positive("mesh.lc2", l)?;
        }
        if self.mesh.h1 >= self.domain.height {
            return Err(ConfigError::InvalidParameter {
                name: "mesh.h1",
                message: format!(
                    "near-ground band {} must be below the domain height {}",
                    self.mesh.h1, self.domain.height
                ),
            });
        }
        non_negative("terrain.r1", self.terrain.r1)?;
        non_negative("terrain.r2", self.terrain.r2)?;
        non_negative("roughness.Cd", self.roughness.drag_coefficient)?;
        non_negative("roughness.lad_max", self.roughness.max_area_density)?;
        non_negative("roughness.vege_times", self.roughness.vegetation_multiplier)?;
        positive("roughness.cee", self.roughness.lattice_spacing)?;
        finite("roughness.origin", self.roughness.origin[0])?;
        finite("roughness.origin", self.roughness.origin[1])?;
        non_negative("ground.tolerance", self.ground.tolerance)?;
        for &z in &self.post.heights {
            finite("post.udh", z)?;
        }
        if let Some(n) = self.post.height_count {
            if n != self.post.heights.len() {
                return Err(ConfigError::InvalidParameter {
                    name: "post.num_udh",
                    message: format!(
                        "declares {n} heights but post.udh lists {}",
                        self.post.heights.len()
                    ),
                });
            }
        }
        Ok(())
    }

    /// Mesh-frame length scale for a 1-based turbine type
    ///
    /// # Errors
    /// Returns `ConfigError::MissingLengthScale` if `mesh.lc2` has no entry for the type
    pub fn length_scale(&self, type_id: usize) -> Result<f64, ConfigError> {
        type_id
            .checked_sub(1)
            .and_then(|i| self.mesh.length_scales.get(i))
            .map(|l| l * self.mesh.scale)
            .ok_or(ConfigError::MissingLengthScale { type_id })
    }

    /// Rotation/scaling from site coordinates into the domain frame
    pub fn frame(&self) -> FrameTransform {
        FrameTransform::from_wind_angle(
            self.wind.angle,
            self.mesh.scale,
            Vec2::new(self.roughness.origin[0], self.roughness.origin[1]),
        )
    }

    /// Vertical layering of the terrain-following mesh
    pub fn layering(&self) -> VerticalLayering {
        VerticalLayering {
            domain_height: self.domain.height,
            near_ground_height: self.mesh.h1,
            near_ground_layers: self.mesh.near_ground_layers,
            growth_ratio: self.mesh.growth_ratio,
            scale: self.mesh.scale,
        }
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            message: format!("must be finite, got {value}"),
        })
    }
}

fn positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            message: format!("must be finite and positive, got {value}"),
        })
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            message: format!("must be finite and non-negative, got {value}"),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const SAMPLE_CASE: &str = r#"{
        "domain": { "long": 113.2, "lat": 23.1, "lt": 4000.0, "h": 1000.0 },
        "wind": { "angle": 270.0, "speed": 8.0 },
        "mesh": { "h1": 40.0, "ceng": 8, "q1": 1.2, "lc2": [20.0, 25.0], "scale": 1.0 },
        "terrain": { "r1": 1500.0, "r2": 1900.0 },
        "roughness": { "Cd": 0.2, "lad_max": 0.1, "vege_times": 1.5 },
        "post": { "num_udh": 2, "udh": [10.0, 20.0], "meshSize": 20.0 }
    }"#;

    #[test]
    fn test_parse_sample_case() {
        let config = CaseConfig::from_json(SAMPLE_CASE, "sample").unwrap();

        assert_eq!(config.domain.size, 4000.0);
        assert_eq!(config.mesh.near_ground_layers, 8.0);
        assert_eq!(config.roughness.lattice_spacing, 100.0);
        assert_eq!(config.roughness.origin, [0.0, 0.0]);
        assert_eq!(config.ground.tolerance, 0.0);
        assert_eq!(config.post.heights, vec![10.0, 20.0]);
        assert_eq!(config.terrain.canopy_cutoff(), 1700.0);
    }

    #[test]
    fn test_length_scale_lookup() {
        let config = CaseConfig::from_json(SAMPLE_CASE, "sample").unwrap();

        assert_eq!(config.length_scale(1).unwrap(), 20.0);
        assert_eq!(config.length_scale(2).unwrap(), 25.0);
        assert_eq!(
            config.length_scale(3),
            Err(ConfigError::MissingLengthScale { type_id: 3 })
        );
        assert!(config.length_scale(0).is_err());
    }

    #[test]
    fn test_rejects_non_positive_scale() {
        let json = SAMPLE_CASE.replace("\"scale\": 1.0", "\"scale\": 0.0");
        let err = CaseConfig::from_json(&json, "sample").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "mesh.scale",
                ..
            }
        ));
    }

    #[test]
    fn test_rejects_height_count_mismatch() {
        let json = SAMPLE_CASE.replace("\"num_udh\": 2", "\"num_udh\": 3");
        let err = CaseConfig::from_json(&json, "sample").unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidParameter {
                name: "post.num_udh",
                ..
            }
        ));
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = CaseConfig::from_json(r#"{ "wind": { "angle": 0, "speed": 5 } }"#, "broken")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
