//! Case directory loading
//!
//! ```text
//! <case>/Input/input.json      case configuration
//! <case>/Input/Turbines.txt    turbine layout
//! <case>/Input/<k>-U-P-Ct.txt  power curve of type k
//! <case>/Input/rou             vegetation samples (optional)
//! ```

use crate::config::CaseConfig;
use crate::error::ConfigError;
use crate::physics::{place_turbines, PowerCurveSet, Turbine, TurbineSpec};
use std::path::{Path, PathBuf};
use tracing::info;

use super::layout::{read_power_curve, read_turbines};
use super::roughness::RoughnessSource;

/// Input subdirectory of a case
pub const INPUT_DIR: &str = "Input";
/// Case configuration file name
pub const CONFIG_FILE: &str = "input.json";
/// Turbine layout file name
pub const TURBINES_FILE: &str = "Turbines.txt";
/// Vegetation source file name
pub const ROUGHNESS_FILE: &str = "rou";

/// Everything read from a case directory
#[derive(Debug, Clone)]
pub struct CaseInputs {
    pub config: CaseConfig,
    /// Layout as read, in site units
    pub layout: Vec<TurbineSpec>,
    /// Layout placed in the domain frame
    pub turbines: Vec<Turbine>,
    pub curves: PowerCurveSet,
    /// Vegetation samples, when the case has a source file
    pub roughness: Option<RoughnessSource>,
}

impl CaseInputs {
    /// Load and validate a case directory
    ///
    /// # Errors
    /// Returns the first `ConfigError` hit: unreadable or malformed files,
    /// invalid parameters, out-of-range turbine types or missing curves
    pub fn load<P: AsRef<Path>>(case_dir: P) -> Result<Self, ConfigError> {
        let input = Self::input_dir(case_dir.as_ref());

        let config = CaseConfig::load(input.join(CONFIG_FILE))?;
        let layout = read_turbines(&input.join(TURBINES_FILE))?;
        let turbines = place_turbines(&layout, &config)?;

        // Every type up to the largest one referenced needs a curve
        let max_type = turbines.iter().map(|t| t.type_id).max().unwrap_or(0);
        let mut curves = PowerCurveSet::new();
        for type_id in 1..=max_type {
            curves.insert(type_id, read_power_curve(&input, type_id)?);
        }

        let rou = input.join(ROUGHNESS_FILE);
        let roughness = if rou.is_file() {
            Some(RoughnessSource::load(&rou)?)
        } else {
            info!("No vegetation source at {}, canopy drag disabled", rou.display());
            None
        };

        info!(
            "Loaded case {}: {} turbines, {} power curves, {} vegetation points",
            case_dir.as_ref().display(),
            turbines.len(),
            max_type,
            roughness.as_ref().map_or(0, RoughnessSource::point_count)
        );

        Ok(Self {
            config,
            layout,
            turbines,
            curves,
            roughness,
        })
    }

    /// `Input` directory of a case
    pub fn input_dir(case_dir: &Path) -> PathBuf {
        case_dir.join(INPUT_DIR)
    }
}
