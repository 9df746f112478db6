//! Actuator-disk thrust feedback
//!
//! Each outer iteration the inflow of every turbine is re-estimated, looked up
//! in its power curve and turned into a uniform axial body force over the
//! rotor disk:
//!
//! ```text
//! force = 0.25 / L · ρ · Ct · U²
//! ```
//!
//! The force is applied against the inflow (`F_x = −force`) in every cell of
//! the disk window. Overlapping windows are not summed; the turbine processed
//! last owns the cell.

use crate::config::AIR_DENSITY;
use crate::core_types::{Vec3, VectorField};
use crate::error::ConfigError;
use crate::grid::Decomposition;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ground::{GroundProjection, GroundProjector};
use super::induction::{InductionCache, InductionSampler, InflowSample};
use super::power_curve::PowerCurveSet;
use super::turbine::Turbine;

/// Which sampling phase produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SamplingPhase {
    /// Full scan that built the induction cache
    Scan,
    /// Replay of the cached cells
    Refresh,
}

/// Operating point of one turbine after an update
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TurbinePerformance {
    /// Inflow speed used (m/s)
    pub speed: f64,
    /// Power (kW)
    pub power: f64,
    pub ct: f64,
    /// Body force magnitude
    pub force: f64,
}

/// Result of one inflow update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationReport {
    pub phase: SamplingPhase,
    /// Reduced inflow samples, one per turbine
    pub samples: Vec<InflowSample>,
    /// Operating points after the update, one per turbine
    pub performance: Vec<TurbinePerformance>,
}

impl IterationReport {
    /// Turbines whose sampling band held no cell
    pub fn starved(&self) -> impl Iterator<Item = usize> + '_ {
        self.samples
            .iter()
            .enumerate()
            .filter(|(_, s)| s.count == 0)
            .map(|(i, _)| i)
    }
}

/// Axial force magnitude for a thrust coefficient and inflow speed
#[inline]
pub fn thrust_force(ct: f64, speed: f64, length_scale: f64) -> f64 {
    0.25 / length_scale * AIR_DENSITY * ct * speed * speed
}

/// Turbines, their curves and the body force they produce
#[derive(Debug, Clone)]
pub struct TurbineForceModel {
    turbines: Vec<Turbine>,
    curves: PowerCurveSet,
    cache: Option<InductionCache>,
    body_force: Option<VectorField>,
}

impl TurbineForceModel {
    /// Create the model, starting every turbine at `inlet_speed`
    ///
    /// # Errors
    /// Returns `ConfigError::MissingPowerCurve` when a turbine references a
    /// type without a curve
    pub fn new(mut turbines: Vec<Turbine>, curves: PowerCurveSet, inlet_speed: f64) -> Result<Self, ConfigError> {
        for turbine in &mut turbines {
            let point = curves.require(turbine.type_id)?.lookup(inlet_speed);
            let state = &mut turbine.state;
            state.inflow_speed = inlet_speed;
            state.power = point.power;
            state.ct = point.ct;
            state.force = thrust_force(point.ct, inlet_speed, turbine.length_scale);
        }

        info!(
            "Turbine model: {} turbines, {} power curves, inlet speed {:.3} m/s",
            turbines.len(),
            curves.len(),
            inlet_speed
        );

        Ok(Self {
            turbines,
            curves,
            cache: None,
            body_force: None,
        })
    }

    /// Turbines in id order
    pub fn turbines(&self) -> &[Turbine] {
        &self.turbines
    }

    /// Power curves by type
    pub fn curves(&self) -> &PowerCurveSet {
        &self.curves
    }

    /// Induction cache, once `initialize` has run
    pub fn induction_cache(&self) -> Option<&InductionCache> {
        self.cache.as_ref()
    }

    /// Attach every turbine to the ground and fix its hub height
    pub fn project_ground(&mut self, projector: &GroundProjector, decomposition: &Decomposition) -> Vec<GroundProjection> {
        projector.project(decomposition, &mut self.turbines)
    }

    /// Scan the mesh for the sampling bands, cache them and update every
    /// turbine from the first samples
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` does not match the
    /// decomposition
    pub fn initialize(&mut self, decomposition: &Decomposition, velocity: &VectorField) -> Result<IterationReport, ConfigError> {
        let (cache, samples) = InductionSampler::scan(decomposition, velocity, &self.turbines)?;

        info!(
            "Induction scan: {} cells cached for {} turbines",
            cache.len(),
            self.turbines.len()
        );

        self.cache = Some(cache);
        Ok(self.update(SamplingPhase::Scan, samples))
    }

    /// Re-sample the cached cells and update every turbine. Falls back to a
    /// full scan when no cache exists yet.
    ///
    /// # Errors
    /// Returns `ConfigError::LayoutMismatch` if `velocity` is not laid out
    /// like the field the cache was built from
    pub fn refresh(&mut self, decomposition: &Decomposition, velocity: &VectorField) -> Result<IterationReport, ConfigError> {
        let samples = match self.cache.as_ref().map(|cache| cache.refresh(velocity)) {
            Some(samples) => samples?,
            None => {
                warn!("Induction cache missing, running a full scan");
                return self.initialize(decomposition, velocity);
            }
        };
        Ok(self.update(SamplingPhase::Refresh, samples))
    }

    fn update(&mut self, phase: SamplingPhase, samples: Vec<InflowSample>) -> IterationReport {
        let mut performance = Vec::with_capacity(self.turbines.len());

        for (turbine, sample) in self.turbines.iter_mut().zip(&samples) {
            match sample.mean() {
                Some(mean) => turbine.state.inflow_speed = mean,
                None => warn!(
                    "WT-{}: no cell in the induction zone, keeping inflow {:.4} m/s",
                    turbine.id + 1,
                    turbine.state.inflow_speed
                ),
            }

            let speed = turbine.state.inflow_speed;
            // Types were checked against the curve set in `new`
            let point = self
                .curves
                .get(turbine.type_id)
                .map(|c| c.lookup(speed))
                .unwrap_or_default();
            let force = thrust_force(point.ct, speed, turbine.length_scale);

            let state = &mut turbine.state;
            state.power = point.power;
            state.ct = point.ct;
            state.force = force;

            debug!(
                "WT-{} {:?}: cells {} speed {:.4} power {:.3} ct {:.4} force {:.6}",
                turbine.id + 1,
                phase,
                sample.count,
                speed,
                point.power,
                point.ct,
                force
            );

            performance.push(TurbinePerformance {
                speed,
                power: point.power,
                ct: point.ct,
                force,
            });
        }

        IterationReport {
            phase,
            samples,
            performance,
        }
    }

    /// Rebuild the body-force field from the current turbine states
    pub fn rebuild_body_force(&mut self, decomposition: &Decomposition) -> &VectorField {
        let turbines = &self.turbines;
        let parts: Vec<Vec<Vec3>> = decomposition
            .subdomains()
            .par_iter()
            .map(|subdomain| {
                subdomain
                    .cells()
                    .iter()
                    .map(|p| {
                        turbines
                            .iter()
                            .rev()
                            .find(|t| t.in_disk(p))
                            .map_or_else(Vec3::zeros, |t| Vec3::new(-t.state.force, 0.0, 0.0))
                    })
                    .collect()
            })
            .collect();

        let field = VectorField::from_parts(parts);
        let disk_cells = field
            .parts()
            .iter()
            .flatten()
            .filter(|f| f.x != 0.0)
            .count();
        debug!("Body force rebuilt: {} cells inside rotor disks", disk_cells);

        self.body_force.insert(field)
    }

    /// Current body-force field (`SourceT`), if built
    pub fn body_force(&self) -> Option<&VectorField> {
        self.body_force.as_ref()
    }

    /// Inflow speed of the first turbine plus one half, truncated toward
    /// zero; labels the final performance table
    pub fn reference_inlet_speed(&self) -> Option<i64> {
        self.turbines
            .first()
            .map(|t| (t.state.inflow_speed + 0.5).trunc() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{DecomposedField, Vec2};
    use crate::physics::power_curve::{CurveRow, PowerCurve};
    use crate::physics::turbine::TurbineState;
    use approx::assert_relative_eq;

    fn turbine(id: usize, x: f64, y: f64) -> Turbine {
        Turbine {
            id,
            position: Vec2::new(x, y),
            hub_offset: 80.0,
            diameter: 80.0,
            type_id: 1,
            length_scale: 20.0,
            state: TurbineState {
                rank: 0,
                ground_distance: 0.0,
                ground: None,
                hub_height: 80.0,
                inflow_speed: 0.0,
                ct: 0.0,
                power: 0.0,
                force: 0.0,
            },
        }
    }

    fn curves() -> PowerCurveSet {
        let mut set = PowerCurveSet::new();
        set.insert(
            1,
            PowerCurve::new(
                1,
                vec![CurveRow::new(3.0, 0.0, 0.9), CurveRow::new(12.0, 1000.0, 0.3)],
            )
            .unwrap(),
        );
        set
    }

    fn uniform(decomposition: &Decomposition, ux: f64) -> VectorField {
        DecomposedField::filled(decomposition, Vec3::new(ux, 0.0, 0.0))
    }

    #[test]
    fn test_thrust_force_law() {
        assert_relative_eq!(thrust_force(0.6, 8.0, 20.0), 0.25 / 20.0 * 1.225 * 0.6 * 64.0);
    }

    #[test]
    fn test_missing_curve_is_fatal() {
        let mut t = turbine(0, 0.0, 0.0);
        t.type_id = 2;
        let err = TurbineForceModel::new(vec![t], curves(), 8.0).unwrap_err();
        assert_eq!(err, ConfigError::MissingPowerCurve { type_id: 2 });
    }

    #[test]
    fn test_starved_turbine_keeps_inlet_speed() {
        let mesh = Decomposition::serial(vec![Vec3::new(5000.0, 0.0, 80.0)], vec![]);
        let mut model = TurbineForceModel::new(vec![turbine(0, 0.0, 0.0)], curves(), 7.0).unwrap();

        let report = model.initialize(&mesh, &uniform(&mesh, 11.0)).unwrap();

        assert_eq!(report.starved().collect::<Vec<_>>(), vec![0]);
        assert_eq!(model.turbines()[0].state.inflow_speed, 7.0);
        assert_relative_eq!(report.performance[0].ct, 0.9 - 0.6 * 4.0 / 9.0, epsilon = 1e-12);

        let report = model.refresh(&mesh, &uniform(&mesh, 11.0)).unwrap();
        assert_eq!(report.phase, SamplingPhase::Refresh);
        assert_eq!(model.turbines()[0].state.inflow_speed, 7.0);
    }

    #[test]
    fn test_body_force_zero_outside_disk() {
        let mesh = Decomposition::serial(
            vec![
                Vec3::new(-80.0, 0.0, 80.0),
                Vec3::new(10.0, 0.0, 80.0),
                Vec3::new(10.0, 0.0, 121.0),
                Vec3::new(21.0, 0.0, 80.0),
            ],
            vec![],
        );
        let mut model = TurbineForceModel::new(vec![turbine(0, 0.0, 0.0)], curves(), 8.0).unwrap();
        model.initialize(&mesh, &uniform(&mesh, 8.0)).unwrap();

        let force = model.turbines()[0].state.force;
        let field = model.rebuild_body_force(&mesh);
        let part = field.part(0);

        assert_eq!(part[0], Vec3::zeros());
        assert_eq!(part[1], Vec3::new(-force, 0.0, 0.0));
        assert_eq!(part[2], Vec3::zeros());
        assert_eq!(part[3], Vec3::zeros());
    }

    #[test]
    fn test_overlapping_disks_last_turbine_wins() {
        // Second turbine 30 downstream; both disks cover x ∈ [10, 20]
        let mesh = Decomposition::serial(
            vec![
                Vec3::new(-130.0, 0.0, 80.0),
                Vec3::new(0.0, 0.0, 80.0),
                Vec3::new(15.0, 0.0, 80.0),
            ],
            vec![],
        );
        let turbines = vec![turbine(0, 0.0, 0.0), turbine(1, 30.0, 0.0)];
        let mut model = TurbineForceModel::new(turbines, curves(), 8.0).unwrap();
        model
            .initialize(
                &mesh,
                &VectorField::from_parts(vec![vec![
                    Vec3::new(6.0, 0.0, 0.0),
                    Vec3::new(10.0, 0.0, 0.0),
                    Vec3::zeros(),
                ]]),
            )
            .unwrap();

        assert_eq!(model.turbines()[0].state.inflow_speed, 6.0);
        assert_eq!(model.turbines()[1].state.inflow_speed, 10.0);
        let f0 = model.turbines()[0].state.force;
        let f1 = model.turbines()[1].state.force;
        assert!(f0 != f1);

        let field = model.rebuild_body_force(&mesh);
        assert_eq!(field.part(0)[2], Vec3::new(-f1, 0.0, 0.0));
    }

    #[test]
    fn test_reference_inlet_speed_rounds_half_up() {
        let mut model = TurbineForceModel::new(vec![turbine(0, 0.0, 0.0)], curves(), 7.5).unwrap();
        assert_eq!(model.reference_inlet_speed(), Some(8));

        model.turbines[0].state.inflow_speed = 7.49;
        assert_eq!(model.reference_inlet_speed(), Some(7));
    }

    #[test]
    fn test_reference_inlet_speed_truncates_reversed_flow() {
        let mut model = TurbineForceModel::new(vec![turbine(0, 0.0, 0.0)], curves(), 8.0).unwrap();

        model.turbines[0].state.inflow_speed = -0.7;
        assert_eq!(model.reference_inlet_speed(), Some(0));

        model.turbines[0].state.inflow_speed = -2.7;
        assert_eq!(model.reference_inlet_speed(), Some(-2));
    }
}
