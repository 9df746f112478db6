//! Post-processing of the converged solution

pub mod vertical_profile;

pub use vertical_profile::{HeightSlice, LayeredSolution, SliceRow, VerticalProfileInterpolator};
