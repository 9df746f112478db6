//! Turbine layout and per-turbine runtime state

use crate::config::CaseConfig;
use crate::core_types::{Vec2, Vec3};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

use super::{MAX_TURBINES, MAX_TURBINE_TYPES};

/// One line of the turbine layout file, in site units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurbineSpec {
    /// Site easting
    pub x: f64,
    /// Site northing
    pub y: f64,
    /// Hub height above local ground
    pub hub: f64,
    /// Rotor diameter
    pub diameter: f64,
    /// 1-based turbine type as read (may be out of range until validated)
    pub type_id: i64,
}

/// Values that change while the flow iterates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurbineState {
    /// Subdomain owning the matched ground element
    pub rank: usize,
    /// Horizontal distance to the matched ground element
    pub ground_distance: f64,
    /// Matched ground element centroid, if any
    pub ground: Option<Vec3>,
    /// Hub elevation in the mesh (`hub_offset + ground z`)
    pub hub_height: f64,
    /// Current inflow speed estimate (m/s)
    pub inflow_speed: f64,
    /// Thrust coefficient at the current inflow
    pub ct: f64,
    /// Power at the current inflow (kW)
    pub power: f64,
    /// Body force magnitude applied inside the disk
    pub force: f64,
}

/// A turbine placed in the domain frame (mesh units)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turbine {
    /// 0-based index; reported as `WT-{id + 1}`
    pub id: usize,
    /// Planar hub position after scaling and rotation
    pub position: Vec2,
    /// Hub height above local ground
    pub hub_offset: f64,
    pub diameter: f64,
    /// 1-based type id, validated against `MAX_TURBINE_TYPES`
    pub type_id: usize,
    /// Characteristic mesh length `L` of this type
    pub length_scale: f64,
    pub state: TurbineState,
}

impl Turbine {
    /// Display label used in logs and diagnostic tables
    pub fn label(&self) -> String {
        format!("WT-{}", self.id + 1)
    }

    /// Hub centre in the domain frame
    pub fn hub(&self) -> Vec3 {
        Vec3::new(self.position.x, self.position.y, self.state.hub_height)
    }

    /// Distance from the rotor axis in the plane normal to the inflow
    #[inline]
    pub fn radial_distance(&self, p: &Vec3) -> f64 {
        let dy = p.y - self.position.y;
        let dz = p.z - self.state.hub_height;
        (dy * dy + dz * dz).sqrt()
    }

    /// Upstream band used to estimate the undisturbed inflow: axial
    /// half-width of three length scales centred one diameter upstream,
    /// radius of a quarter diameter
    #[inline]
    pub fn in_induction_zone(&self, p: &Vec3) -> bool {
        let centre = self.position.x - self.diameter;
        let half_width = 3.0 * self.length_scale;
        p.x >= centre - half_width
            && p.x <= centre + half_width
            && self.radial_distance(p) <= self.diameter / 4.0
    }

    /// Rotor disk: axial half-thickness of one length scale, full rotor radius
    #[inline]
    pub fn in_disk(&self, p: &Vec3) -> bool {
        (p.x - self.position.x).abs() <= self.length_scale
            && self.radial_distance(p) <= self.diameter / 2.0
    }
}

/// Validate a layout and place it in the domain frame
///
/// # Errors
/// Returns `ConfigError` when the layout exceeds `MAX_TURBINES`, a type id is
/// outside `1..=MAX_TURBINE_TYPES`, a type has no length scale, or a
/// dimension is not finite and positive
pub fn place_turbines(specs: &[TurbineSpec], config: &CaseConfig) -> Result<Vec<Turbine>, ConfigError> {
    if specs.len() > MAX_TURBINES {
        return Err(ConfigError::TooManyTurbines {
            count: specs.len(),
            capacity: MAX_TURBINES,
        });
    }

    let frame = config.frame();
    let scale = config.mesh.scale;

    specs
        .iter()
        .enumerate()
        .map(|(id, spec)| {
            let type_id = usize::try_from(spec.type_id)
                .ok()
                .filter(|t| (1..=MAX_TURBINE_TYPES).contains(t))
                .ok_or(ConfigError::TurbineTypeOutOfRange {
                    turbine: id,
                    type_id: spec.type_id,
                })?;
            if !(spec.x.is_finite() && spec.y.is_finite() && spec.hub.is_finite()) {
                return Err(ConfigError::InvalidParameter {
                    name: "Turbines.txt",
                    message: format!("WT-{} has a non-finite coordinate", id + 1),
                });
            }
            if !(spec.diameter.is_finite() && spec.diameter > 0.0) {
                return Err(ConfigError::InvalidParameter {
                    name: "Turbines.txt",
                    message: format!(
                        "WT-{} diameter must be positive, got {}",
                        id + 1,
                        spec.diameter
                    ),
                });
            }
            let hub_offset = spec.hub * scale;

            Ok(Turbine {
                id,
                position: frame.turbine_position(spec.x, spec.y),
                hub_offset,
                diameter: spec.diameter * scale,
                type_id,
                length_scale: config.length_scale(type_id)?,
                state: TurbineState {
                    rank: 0,
                    ground_distance: f64::INFINITY,
                    ground: None,
                    hub_height: hub_offset,
                    inflow_speed: config.wind.speed,
                    ct: 0.0,
                    power: 0.0,
                    force: 0.0,
                },
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE_CASE;

    fn westerly_case() -> CaseConfig {
        let json = SAMPLE_CASE.replace("\"angle\": 270.0", "\"angle\": -90.0");
        CaseConfig::from_json(&json, "sample").unwrap()
    }

    fn spec(type_id: i64) -> TurbineSpec {
        TurbineSpec {
            x: 100.0,
            y: -50.0,
            hub: 80.0,
            diameter: 80.0,
            type_id,
        }
    }

    #[test]
    fn test_place_in_identity_frame() {
        let turbines = place_turbines(&[spec(2)], &westerly_case()).unwrap();
        let t = &turbines[0];

        assert_eq!(t.position, Vec2::new(100.0, -50.0));
        assert_eq!(t.length_scale, 25.0);
        assert_eq!(t.state.hub_height, 80.0);
        assert_eq!(t.state.inflow_speed, 8.0);
        assert_eq!(t.label(), "WT-1");
    }

    #[test]
    fn test_type_out_of_range() {
        let err = place_turbines(&[spec(1), spec(11)], &westerly_case()).unwrap_err();
        assert_eq!(
            err,
            ConfigError::TurbineTypeOutOfRange {
                turbine: 1,
                type_id: 11
            }
        );

        let err = place_turbines(&[spec(0)], &westerly_case()).unwrap_err();
        assert!(matches!(err, ConfigError::TurbineTypeOutOfRange { .. }));
    }

    #[test]
    fn test_type_without_length_scale() {
        let err = place_turbines(&[spec(3)], &westerly_case()).unwrap_err();
        assert_eq!(err, ConfigError::MissingLengthScale { type_id: 3 });
    }

    #[test]
    fn test_capacity_enforced() {
        let specs = vec![spec(1); MAX_TURBINES + 1];
        let err = place_turbines(&specs, &westerly_case()).unwrap_err();
        assert!(matches!(err, ConfigError::TooManyTurbines { count: 201, .. }));
    }

    #[test]
    fn test_zone_and_disk_membership() {
        let t = &place_turbines(&[spec(1)], &westerly_case()).unwrap()[0];
        // D = 80, L = 20: band x ∈ [-40, 80], disk x ∈ [80, 120]
        assert!(t.in_induction_zone(&Vec3::new(20.0, -50.0, 80.0)));
        assert!(t.in_induction_zone(&Vec3::new(-40.0, -50.0 + 20.0, 80.0)));
        assert!(!t.in_induction_zone(&Vec3::new(-40.1, -50.0, 80.0)));
        assert!(!t.in_induction_zone(&Vec3::new(20.0, -50.0, 80.0 + 20.1)));

        assert!(t.in_disk(&Vec3::new(120.0, -50.0 + 40.0, 80.0)));
        assert!(!t.in_disk(&Vec3::new(120.1, -50.0, 80.0)));
        assert!(!t.in_disk(&Vec3::new(100.0, -50.0, 80.0 + 40.1)));
    }
}
