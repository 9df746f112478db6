//! Case inputs and diagnostic outputs

pub mod case;
pub mod diagnostics;
pub mod layout;
pub mod roughness;
mod text;

pub use case::CaseInputs;
pub use diagnostics::{warn_on_error, DiagnosticWriter};
pub use layout::{parse_power_curve, parse_turbines, read_power_curve, read_turbines};
pub use roughness::{DomainSamples, RoughnessGroup, RoughnessSource, SampleRecord};
