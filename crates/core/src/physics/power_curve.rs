//! Tabulated turbine power and thrust curves
//!
//! Each turbine type has a table of `(speed, power, Ct)` rows with strictly
//! increasing speeds. Between rows both power and thrust coefficient are
//! interpolated linearly; outside the tabulated range the turbine is parked
//! (zero power, zero thrust) rather than extrapolated.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// One row of a power curve table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveRow {
    /// Inflow speed (m/s)
    pub speed: f64,
    /// Electrical power (kW)
    pub power: f64,
    /// Thrust coefficient
    pub ct: f64,
}

impl CurveRow {
    pub const fn new(speed: f64, power: f64, ct: f64) -> Self {
        Self { speed, power, ct }
    }
}

/// Interpolated operating point
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CurvePoint {
    /// Electrical power (kW)
    pub power: f64,
    /// Thrust coefficient
    pub ct: f64,
}

/// Validated power curve of one turbine type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerCurve {
    rows: Vec<CurveRow>,
}

impl PowerCurve {
    /// Validate and wrap a table for 1-based turbine type `type_id`
    ///
    /// # Errors
    /// Returns `ConfigError::MalformedPowerCurve` for fewer than two rows,
    /// non-finite values, or speeds that are not strictly increasing
    pub fn new(type_id: usize, rows: Vec<CurveRow>) -> Result<Self, ConfigError> {
        if rows.len() < 2 {
            return Err(ConfigError::MalformedPowerCurve {
                type_id,
                message: format!("need at least 2 rows, got {}", rows.len()),
            });
        }
        if let Some((i, _)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| !(r.speed.is_finite() && r.power.is_finite() && r.ct.is_finite()))
        {
            return Err(ConfigError::MalformedPowerCurve {
                type_id,
                message: format!("row {} is not finite", i + 1),
            });
        }
        if let Some(i) = rows.windows(2).position(|w| w[1].speed <= w[0].speed) {
            return Err(ConfigError::MalformedPowerCurve {
                type_id,
                message: format!(
                    "speeds must be strictly increasing, row {} ({}) follows {}",
                    i + 2,
                    rows[i + 1].speed,
                    rows[i].speed
                ),
            });
        }
        Ok(Self { rows })
    }

    /// Table rows
    pub fn rows(&self) -> &[CurveRow] {
        &self.rows
    }

    /// Lowest and highest tabulated speeds
    pub fn speed_range(&self) -> (f64, f64) {
        (self.rows[0].speed, self.rows[self.rows.len() - 1].speed)
    }

    /// Power and thrust coefficient at `speed`
    pub fn lookup(&self, speed: f64) -> CurvePoint {
        let (lo, hi) = self.speed_range();
        if !(speed >= lo && speed <= hi) {
            return CurvePoint::default();
        }

        // First row strictly above `speed`; the bracket starts one before it
        let above = self.rows.partition_point(|r| r.speed <= speed);
        if above == self.rows.len() {
            let last = self.rows[above - 1];
            return CurvePoint {
                power: last.power,
                ct: last.ct,
            };
        }

        let r0 = self.rows[above - 1];
        let r1 = self.rows[above];
        let w = (speed - r0.speed) / (r1.speed - r0.speed);
        CurvePoint {
            power: r0.power + (r1.power - r0.power) * w,
            ct: r0.ct + (r1.ct - r0.ct) * w,
        }
    }
}

/// Power curves indexed by 1-based turbine type
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerCurveSet {
    curves: Vec<Option<PowerCurve>>,
}

impl PowerCurveSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the curve of a 1-based type id, replacing any previous one
    pub fn insert(&mut self, type_id: usize, curve: PowerCurve) {
        debug_assert!(type_id >= 1);
        if self.curves.len() < type_id {
            self.curves.resize(type_id, None);
        }
        self.curves[type_id - 1] = Some(curve);
    }

    /// Curve of a 1-based type id
    pub fn get(&self, type_id: usize) -> Option<&PowerCurve> {
        type_id
            .checked_sub(1)
            .and_then(|i| self.curves.get(i))
            .and_then(Option::as_ref)
    }

    /// Curve of a 1-based type id, or the fatal load error
    ///
    /// # Errors
    /// Returns `ConfigError::MissingPowerCurve` when no curve was registered
    pub fn require(&self, type_id: usize) -> Result<&PowerCurve, ConfigError> {
        self.get(type_id)
            .ok_or(ConfigError::MissingPowerCurve { type_id })
    }

    /// Number of registered curves
    pub fn len(&self) -> usize {
        self.curves.iter().filter(|c| c.is_some()).count()
    }

    /// True when no curve is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_row_curve() -> PowerCurve {
        PowerCurve::new(
            1,
            vec![CurveRow::new(5.0, 100.0, 0.8), CurveRow::new(10.0, 500.0, 0.4)],
        )
        .unwrap()
    }

    #[test]
    fn test_midpoint_interpolation() {
        let point = two_row_curve().lookup(7.5);

        assert_relative_eq!(point.power, 300.0, epsilon = 1e-12);
        assert_relative_eq!(point.ct, 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_outside_range_is_parked() {
        let curve = two_row_curve();

        assert_eq!(curve.lookup(4.999), CurvePoint::default());
        assert_eq!(curve.lookup(10.001), CurvePoint::default());
        assert_eq!(curve.lookup(0.0), CurvePoint::default());
        assert_eq!(curve.lookup(f64::NAN), CurvePoint::default());
    }

    #[test]
    fn test_endpoints_return_rows() {
        let curve = two_row_curve();

        assert_eq!(curve.lookup(5.0), CurvePoint { power: 100.0, ct: 0.8 });
        assert_eq!(curve.lookup(10.0), CurvePoint { power: 500.0, ct: 0.4 });
    }

    #[test]
    fn test_multi_row_bracket() {
        let curve = PowerCurve::new(
            2,
            vec![
                CurveRow::new(3.0, 0.0, 0.9),
                CurveRow::new(6.0, 300.0, 0.8),
                CurveRow::new(12.0, 1500.0, 0.3),
                CurveRow::new(25.0, 1500.0, 0.05),
            ],
        )
        .unwrap();

        let at_six = curve.lookup(6.0);
        assert_eq!(at_six, CurvePoint { power: 300.0, ct: 0.8 });

        let at_nine = curve.lookup(9.0);
        assert_relative_eq!(at_nine.power, 900.0, epsilon = 1e-12);
        assert_relative_eq!(at_nine.ct, 0.55, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_bracket_rejected() {
        let err = PowerCurve::new(
            3,
            vec![
                CurveRow::new(4.0, 10.0, 0.8),
                CurveRow::new(4.0, 20.0, 0.7),
            ],
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::MalformedPowerCurve { type_id: 3, .. }));
    }

    #[test]
    fn test_single_row_rejected() {
        let err = PowerCurve::new(1, vec![CurveRow::new(4.0, 10.0, 0.8)]).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedPowerCurve { .. }));
    }

    #[test]
    fn test_curve_set_lookup() {
        let mut set = PowerCurveSet::new();
        set.insert(2, two_row_curve());

        assert!(set.get(1).is_none());
        assert!(set.get(2).is_some());
        assert_eq!(set.len(), 1);
        assert_eq!(
            set.require(1).unwrap_err(),
            ConfigError::MissingPowerCurve { type_id: 1 }
        );
        assert!(set.require(0).is_err());
    }
}
