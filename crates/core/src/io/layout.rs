//! Turbine layout and power curve tables

use crate::error::ConfigError;
use crate::physics::{CurveRow, PowerCurve, TurbineSpec};
use std::path::Path;

use super::text::{data_lines, parse_row, read_file};

/// Parse `x y hub diameter type` rows
///
/// # Errors
/// Returns `ConfigError::Parse` for a malformed row or a non-integral type
pub fn parse_turbines(text: &str, source: &str) -> Result<Vec<TurbineSpec>, ConfigError> {
    data_lines(text)
        .map(|(line_no, line)| {
            let [x, y, hub, diameter, type_value] = parse_row::<5>(line, source, line_no)?;
            if !type_value.is_finite() || type_value.fract() != 0.0 {
                return Err(ConfigError::Parse {
                    source: source.to_string(),
                    line: line_no,
                    message: format!("turbine type {type_value} is not an integer"),
                });
            }
            Ok(TurbineSpec {
                x,
                y,
                hub,
                diameter,
                type_id: type_value as i64,
            })
        })
        .collect()
}

/// Read a turbine layout file
///
/// # Errors
/// Returns `ConfigError` if the file is unreadable or malformed
pub fn read_turbines(path: &Path) -> Result<Vec<TurbineSpec>, ConfigError> {
    let text = read_file(path)?;
    parse_turbines(&text, &path.display().to_string())
}

/// Parse `speed power ct` rows of one turbine type
///
/// # Errors
/// Returns `ConfigError` for malformed rows or an invalid table
pub fn parse_power_curve(text: &str, source: &str, type_id: usize) -> Result<PowerCurve, ConfigError> {
    let rows = data_lines(text)
        .map(|(line_no, line)| {
            let [speed, power, ct] = parse_row::<3>(line, source, line_no)?;
            Ok(CurveRow::new(speed, power, ct))
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;
    PowerCurve::new(type_id, rows)
}

/// File name of the power curve of a type
pub fn power_curve_file_name(type_id: usize) -> String {
    format!("{type_id}-U-P-Ct.txt")
}

/// Read the power curve of `type_id` from `dir`
///
/// # Errors
/// Returns `ConfigError::MissingPowerCurve` when the file does not exist,
/// otherwise any read or table error
pub fn read_power_curve(dir: &Path, type_id: usize) -> Result<PowerCurve, ConfigError> {
    let path = dir.join(power_curve_file_name(type_id));
    if !path.is_file() {
        return Err(ConfigError::MissingPowerCurve { type_id });
    }
    let text = read_file(&path)?;
    parse_power_curve(&text, &path.display().to_string(), type_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_layout() {
        let specs = parse_turbines("100 200 80 80 1\n\n-5.5 3 90 100 2.0\n", "Turbines.txt").unwrap();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].x, -5.5);
        assert_eq!(specs[1].type_id, 2);
    }

    #[test]
    fn test_fractional_type_rejected() {
        let err = parse_turbines("0 0 80 80 1.5", "Turbines.txt").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_short_row_rejected() {
        let err = parse_turbines("0 0 80 80 1\n0 0 80", "Turbines.txt").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_parse_curve() {
        let curve = parse_power_curve("3 0 0.9\n12 1000 0.3\n", "1-U-P-Ct.txt", 1).unwrap();
        assert_eq!(curve.rows().len(), 2);
        assert_eq!(curve.lookup(12.0).power, 1000.0);
    }

    #[test]
    fn test_unsorted_curve_rejected() {
        let err = parse_power_curve("12 1000 0.3\n3 0 0.9\n", "1-U-P-Ct.txt", 1).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedPowerCurve { type_id: 1, .. }));
    }

    #[test]
    fn test_missing_curve_file() {
        let dir = std::env::temp_dir().join("windsim_no_such_case_dir");
        assert_eq!(
            read_power_curve(&dir, 4).unwrap_err(),
            ConfigError::MissingPowerCurve { type_id: 4 }
        );
    }
}
