//! Run orchestration

pub mod coupling;

pub use coupling::{CouplingOptions, FinalReport, SourceTermCoupling};
