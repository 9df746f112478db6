//! Grid-side modules: distributed mesh view, coordinate frames, vertical
//! layering, the roughness lattice and global reductions

pub mod frame;
pub mod lattice;
pub mod layering;
pub mod mesh;
pub mod reduce;

// Re-export main types
pub use frame::FrameTransform;
pub use lattice::{RasterStats, RasterStrategy, RoughnessLattice, RoughnessSample};
pub use layering::VerticalLayering;
pub use mesh::{Decomposition, Subdomain};
