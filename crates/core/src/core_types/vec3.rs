//! Vector type aliases for positions, velocities and forces.

use nalgebra::{Vector2, Vector3};

/// 3D vector type for cell centres, velocities and body forces.
///
/// This is a simple alias for `nalgebra::Vector3<f64>`. Double precision is
/// used throughout because turbine thrust and ground matching compare values
/// produced by the host solver bit for bit.
pub type Vec3 = Vector3<f64>;

/// Planar (horizontal) vector type for turbine positions and roughness samples.
pub type Vec2 = Vector2<f64>;
