//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::controller::{CalibrationConfig, ControllerConfig};
use super::{StandConfig, ValveConfig};

/// Validate a stand configuration.
///
/// Checks:
/// - Valve mechanics and rate limits are positive (NaN is rejected)
/// - The control period is non-zero
/// - Calibration parameters are usable
/// - The throttle curve is equally spaced and monotonic
pub fn validate_config(config: &StandConfig) -> Result<()> {
    validate_valve(&config.valves.fuel)?;
    validate_valve(&config.valves.lox)?;
    validate_controller(&config.controller)?;
    validate_calibration(&config.calibration)?;
    validate_curve(&config.throttle_curve.points).map_err(Error::Config)?;
    Ok(())
}

fn validate_valve(config: &ValveConfig) -> Result<()> {
    if !(config.gear_ratio > 0.0) {
        return Err(Error::Config(ConfigError::InvalidGearRatio(config.gear_ratio)));
    }

    if config.encoder_cpr == 0 {
        return Err(Error::Config(ConfigError::InvalidEncoderCpr(config.encoder_cpr)));
    }

    if !(config.max_velocity.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidMaxVelocity(
            config.max_velocity.0,
        )));
    }

    if !(config.max_acceleration.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidMaxAcceleration(
            config.max_acceleration.0,
        )));
    }

    Ok(())
}

fn validate_controller(config: &ControllerConfig) -> Result<()> {
    if config.control_period_ms == 0 {
        return Err(Error::Config(ConfigError::InvalidControlPeriod(0)));
    }
    Ok(())
}

fn validate_calibration(config: &CalibrationConfig) -> Result<()> {
    let field = if config.num_reps == 0 {
        "num_reps"
    } else if !(config.step_size > 0.0) {
        "step_size_deg"
    } else if !(config.error_limit > 0.0) {
        "error_limit_deg"
    } else if !(config.backoff_margin >= 0.0) {
        "backoff_margin_deg"
    } else {
        return Ok(());
    };
    Err(Error::Config(ConfigError::InvalidCalibration(field)))
}

/// Check throttle curve breakpoints.
///
/// The O(1) lookup depends on equal x spacing, so spacing is checked against
/// the first interval with a small relative tolerance.
pub fn validate_curve(points: &[[f32; 2]]) -> core::result::Result<(), ConfigError> {
    if points.len() < 2 {
        return Err(ConfigError::CurveTooShort(points.len()));
    }

    let increment = points[1][0] - points[0][0];
    if increment <= 0.0 {
        return Err(ConfigError::CurveNotEquallySpaced { index: 1 });
    }

    for (i, pair) in points.windows(2).enumerate() {
        let index = i + 1;
        let dx = pair[1][0] - pair[0][0];
        if (dx - increment).abs() > increment * 1e-4 {
            return Err(ConfigError::CurveNotEquallySpaced { index });
        }
        if pair[1][1] < pair[0][1] {
            return Err(ConfigError::CurveNotMonotonic { index });
        }
    }

    Ok(())
}
