//! Wind Farm Source Terms Library
//!
//! Momentum source terms for an external incompressible flow solver over
//! complex terrain:
//!
//! - Actuator-disk turbine thrust with inflow feedback through tabulated
//!   power curves
//! - Vegetation canopy drag rebuilt from scattered height samples on a
//!   regular roughness lattice
//! - Fixed-height extracts from the converged terrain-following solution
//!
//! The host solver owns the mesh, its decomposition and the outer iteration.
//! It hands cell centres and ground elements per subdomain to
//! [`SourceTermCoupling`] once, then exchanges velocity and force fields every
//! outer iteration.

// Core types and utilities
pub mod config;
pub mod core_types;
pub mod error;

// Mesh view, frames and lattice
pub mod grid;

// Source terms and post-processing
pub mod physics;
pub mod post;

// Case files and orchestration
pub mod io;
pub mod simulation;

// Re-export core types
pub use config::CaseConfig;
pub use core_types::{DecomposedField, ScalarField, Vec2, Vec3, VectorField};
pub use error::{ConfigError, OutputError};

// Re-export grid and physics types
pub use grid::{Decomposition, RasterStrategy, RoughnessLattice, Subdomain};
pub use physics::{GroundTieBreak, PowerCurve, PowerCurveSet, Turbine, TurbineForceModel};
pub use post::{HeightSlice, LayeredSolution, VerticalProfileInterpolator};

// Re-export orchestration
pub use io::CaseInputs;
pub use simulation::{CouplingOptions, FinalReport, SourceTermCoupling};
