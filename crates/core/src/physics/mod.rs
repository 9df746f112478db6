//! Momentum source terms: turbine thrust and canopy drag

pub mod actuator_disk;
pub mod canopy;
pub mod ground;
pub mod induction;
pub mod power_curve;
pub mod turbine;

/// Turbine type ids run from 1 to this value
pub const MAX_TURBINE_TYPES: usize = 10;

/// Largest turbine layout accepted
pub const MAX_TURBINES: usize = 200;

pub use actuator_disk::{
    thrust_force, IterationReport, SamplingPhase, TurbineForceModel, TurbinePerformance,
};
pub use canopy::{apply_drag, CanopyFieldBuilder, CanopyParams, CanopyStats};
pub use ground::{GroundProjection, GroundProjector, GroundTieBreak};
pub use induction::{InductionCache, InductionSampler, InflowSample};
pub use power_curve::{CurvePoint, CurveRow, PowerCurve, PowerCurveSet};
pub use turbine::{place_turbines, Turbine, TurbineSpec, TurbineState};
