//! Controller, calibration and throttle curve configuration from TOML.

use heapless::Vec;
use serde::Deserialize;

/// Maximum number of throttle curve breakpoints.
pub const MAX_CURVE_POINTS: usize = 16;

/// Control loop timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Fixed control tick period in milliseconds.
    pub control_period_ms: u32,

    /// Abort returns to Idle once strictly more than this has elapsed since entry.
    pub abort_duration_ms: u32,
}

impl ControllerConfig {
    /// Control period in seconds.
    #[inline]
    pub fn control_period_s(&self) -> f32 {
        self.control_period_ms as f32 / 1000.0
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            control_period_ms: 1,
            abort_duration_ms: 500,
        }
    }
}

/// Hard stop calibration parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Per-tick advance toward the hard stop on the first repetition, in degrees.
    #[serde(rename = "step_size_deg")]
    pub step_size: f32,

    /// Number of times each valve is driven into its hard stop.
    pub num_reps: u32,

    /// Open-loop/encoder divergence that counts as hitting the stop, in degrees.
    #[serde(rename = "error_limit_deg")]
    pub error_limit: f32,

    /// Distance to recede from the stop before seeking again, in degrees.
    #[serde(rename = "backoff_margin_deg")]
    pub backoff_margin: f32,

    /// Dwell after the final rebase before powering off.
    pub settle_ms: u32,

    /// How long the drivers stay de-energized.
    pub power_off_ms: u32,

    /// Dwell after re-energizing before calibration completes.
    pub repower_ms: u32,

    /// Seeking longer than this is a calibration fault.
    pub seek_timeout_ms: u32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            step_size: 0.5,
            num_reps: 2,
            error_limit: 0.5,
            backoff_margin: 0.5,
            settle_ms: 300,
            power_off_ms: 3000,
            repower_ms: 300,
            seek_timeout_ms: 30_000,
        }
    }
}

/// Pressure to valve position breakpoints for closed-loop throttling.
///
/// Each point is `[pressure, valve_degrees]`. X must be equally spaced.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Breakpoints in increasing pressure order.
    pub points: Vec<[f32; 2], MAX_CURVE_POINTS>,
}

impl Default for CurveConfig {
    fn default() -> Self {
        let mut points = Vec::new();
        for i in 0..5u8 {
            let x = f32::from(i) * 100.0;
            let _ = points.push([x, x / 4.0]);
        }
        Self { points }
    }
}
