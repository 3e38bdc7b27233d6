//! Pressure to valve position lookup.

use heapless::Vec;

use crate::config::{validate_curve, CurveConfig, MAX_CURVE_POINTS};
use crate::error::ConfigError;

/// Monotonic piecewise-linear throttle curve with equally spaced breakpoints.
///
/// Equal spacing turns the segment search into one division, so a lookup
/// costs the same at any pressure.
///
/// ```rust
/// use throttle_stand::config::CurveConfig;
/// use throttle_stand::controller::ThrottleCurve;
///
/// let curve = ThrottleCurve::from_config(&CurveConfig::default()).unwrap();
/// assert_eq!(curve.lookup(150.0), 37.5);
/// assert_eq!(curve.lookup(-20.0), 0.0);
/// assert_eq!(curve.lookup(1e6), 100.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleCurve {
    points: Vec<[f32; 2], MAX_CURVE_POINTS>,
    increment: f32,
}

impl ThrottleCurve {
    /// Validate and adopt a set of breakpoints.
    pub fn new(points: Vec<[f32; 2], MAX_CURVE_POINTS>) -> Result<Self, ConfigError> {
        validate_curve(&points)?;
        let increment = points[1][0] - points[0][0];
        Ok(Self { points, increment })
    }

    /// Build from configuration.
    pub fn from_config(config: &CurveConfig) -> Result<Self, ConfigError> {
        Self::new(config.points.clone())
    }

    /// Valve position for `pressure`, clamped to the curve's end values.
    pub fn lookup(&self, pressure: f32) -> f32 {
        let first = self.points[0];
        let last = self.points[self.points.len() - 1];

        if pressure.is_nan() || pressure <= first[0] {
            return first[1];
        }
        if pressure >= last[0] {
            return last[1];
        }

        // Rounding can push the index one past the last interval.
        let i = ((pressure - first[0]) / self.increment) as usize;
        let i = i.min(self.points.len() - 2);

        let [x0, y0] = self.points[i];
        let [x1, y1] = self.points[i + 1];
        y0 + (y1 - y0) * ((pressure - x0) / (x1 - x0))
    }

    /// Breakpoints in use.
    pub fn points(&self) -> &[[f32; 2]] {
        &self.points
    }
}
