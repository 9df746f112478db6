//! Error types
//!
//! Configuration problems are fatal and surface before the first outer
//! iteration. Output problems are reported to the caller, which normally logs
//! them and keeps going.

use std::path::PathBuf;

/// Errors detected while loading or validating a case
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A file could not be read
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error text
        message: String,
    },
    /// A text input could not be parsed
    Parse {
        /// Source being parsed (file name or description)
        source: String,
        /// 1-based line number, 0 when not line oriented
        line: usize,
        /// What went wrong
        message: String,
    },
    /// A scalar parameter is missing, non-finite or out of range
    InvalidParameter {
        /// Parameter name as it appears in the case file
        name: &'static str,
        /// Constraint that was violated
        message: String,
    },
    /// No power curve was supplied for a referenced turbine type
    MissingPowerCurve {
        /// 1-based turbine type id
        type_id: usize,
    },
    /// A power curve has fewer than two rows or non-increasing speeds
    MalformedPowerCurve {
        /// 1-based turbine type id
        type_id: usize,
        /// What is wrong with the table
        message: String,
    },
    /// Turbine type id outside `1..=MAX_TURBINE_TYPES`
    TurbineTypeOutOfRange {
        /// 0-based turbine index
        turbine: usize,
        /// Offending type id
        type_id: i64,
    },
    /// More turbines than the configured capacity
    TooManyTurbines {
        /// Turbines supplied
        count: usize,
        /// Capacity
        capacity: usize,
    },
    /// No characteristic length scale for a turbine type
    MissingLengthScale {
        /// 1-based turbine type id
        type_id: usize,
    },
    /// A field or mesh does not match the expected layout
    LayoutMismatch(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, message } => {
                write!(f, "Failed to read {}: {message}", path.display())
            }
            ConfigError::Parse {
                source,
                line,
                message,
            } => {
                if *line == 0 {
                    write!(f, "Failed to parse {source}: {message}")
                } else {
                    write!(f, "Failed to parse {source} line {line}: {message}")
                }
            }
            ConfigError::InvalidParameter { name, message } => {
                write!(f, "Invalid parameter '{name}': {message}")
            }
            ConfigError::MissingPowerCurve { type_id } => {
                write!(f, "No power curve for turbine type {type_id}")
            }
            ConfigError::MalformedPowerCurve { type_id, message } => {
                write!(f, "Malformed power curve for turbine type {type_id}: {message}")
            }
            ConfigError::TurbineTypeOutOfRange { turbine, type_id } => write!(
                f,
                "Turbine WT-{} has type {type_id}, expected 1..={}",
                turbine + 1,
                crate::physics::MAX_TURBINE_TYPES
            ),
            ConfigError::TooManyTurbines { count, capacity } => {
                write!(f, "{count} turbines exceed the capacity of {capacity}")
            }
            ConfigError::MissingLengthScale { type_id } => {
                write!(f, "No mesh length scale (mesh.lc2) for turbine type {type_id}")
            }
            ConfigError::LayoutMismatch(msg) => write!(f, "Layout mismatch: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur while writing diagnostic tables or extracts
#[derive(Debug)]
pub enum OutputError {
    /// Failed to create an output directory
    CreateDir(PathBuf, std::io::Error),
    /// Failed to write an output file
    Write(PathBuf, std::io::Error),
}

impl std::fmt::Display for OutputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputError::CreateDir(path, e) => {
                write!(f, "Failed to create directory {}: {e}", path.display())
            }
            OutputError::Write(path, e) => write!(f, "Failed to write {}: {e}", path.display()),
        }
    }
}

impl std::error::Error for OutputError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OutputError::CreateDir(_, e) | OutputError::Write(_, e) => Some(e),
        }
    }
}
