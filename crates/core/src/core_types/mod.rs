//! Core types and utilities

pub mod field;
pub mod vec3;

pub use field::{DecomposedField, ScalarField, VectorField};
pub use vec3::{Vec2, Vec3};
