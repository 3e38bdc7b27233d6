//! Unit tests for configuration validation.

use throttle_stand::config::{parse_config, validate_config, StandConfig};
use throttle_stand::error::{ConfigError, Error};

/// Test validation of the installed stand configuration.
#[test]
fn test_default_config_passes_validation() {
    assert!(validate_config(&StandConfig::default()).is_ok());
}

/// Test validation fails for a zero encoder resolution.
#[test]
fn test_zero_encoder_cpr() {
    let toml_str = r#"
[valves.fuel]
encoder_cpr = 0
safe_position_deg = 81.0
"#;
    let config: StandConfig = toml::from_str(toml_str).expect("Failed to parse TOML");
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidEncoderCpr(0)))
    );
}

/// Test validation fails for a non-positive velocity limit.
#[test]
fn test_invalid_max_velocity() {
    let mut config = StandConfig::default();
    config.valves.lox.max_velocity.0 = 0.0;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxVelocity(_)))
    ));
}

/// Test validation names the bad calibration field.
#[test]
fn test_invalid_calibration_field() {
    let toml_str = r#"
[calibration]
error_limit_deg = 0.0
"#;
    assert_eq!(
        parse_config(toml_str),
        Err(Error::Config(ConfigError::InvalidCalibration("error_limit_deg")))
    );
}

/// Test that the throttle curve must be equally spaced.
#[test]
fn test_unequal_curve_spacing() {
    let toml_str = r#"
[throttle_curve]
points = [[0.0, 0.0], [100.0, 25.0], [150.0, 50.0]]
"#;
    assert_eq!(
        parse_config(toml_str),
        Err(Error::Config(ConfigError::CurveNotEquallySpaced { index: 2 }))
    );
}

/// Test that the throttle curve may not close the valve as pressure rises.
#[test]
fn test_decreasing_curve() {
    let toml_str = r#"
[throttle_curve]
points = [[0.0, 0.0], [100.0, 25.0], [200.0, 20.0]]
"#;
    let err = parse_config(toml_str).unwrap_err();
    assert_eq!(err, Error::Config(ConfigError::CurveNotMonotonic { index: 2 }));
    assert_eq!(
        format!("{}", err),
        "configuration error: throttle curve point 2 decreases"
    );
}

/// Test that a single point is not a curve.
#[test]
fn test_curve_too_short() {
    let toml_str = r#"
[throttle_curve]
points = [[0.0, 0.0]]
"#;
    assert_eq!(
        parse_config(toml_str),
        Err(Error::Config(ConfigError::CurveTooShort(1)))
    );
}

/// Test that a NaN velocity limit does not slip past validation.
#[test]
fn test_nan_max_velocity_rejected() {
    let toml_str = r#"
[valves.fuel]
safe_position_deg = 81.0
max_velocity_deg_per_sec = nan
"#;
    match parse_config(toml_str) {
        Err(Error::Config(ConfigError::InvalidMaxVelocity(v))) => assert!(v.is_nan()),
        other => panic!("expected InvalidMaxVelocity, got {:?}", other),
    }
}

/// Test that NaN calibration parameters are rejected by name.
#[test]
fn test_nan_calibration_fields_rejected() {
    for (key, field) in [
        ("step_size_deg", "step_size_deg"),
        ("error_limit_deg", "error_limit_deg"),
        ("backoff_margin_deg", "backoff_margin_deg"),
    ] {
        let toml_str = format!("[calibration]\n{} = nan\n", key);
        assert_eq!(
            parse_config(&toml_str),
            Err(Error::Config(ConfigError::InvalidCalibration(field)))
        );
    }
}

/// Test that NaN acceleration and gear ratio are rejected.
#[test]
fn test_nan_mechanics_rejected() {
    let mut config = StandConfig::default();
    config.valves.lox.max_acceleration.0 = f32::NAN;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidMaxAcceleration(_)))
    ));

    let mut config = StandConfig::default();
    config.valves.fuel.gear_ratio = f32::NAN;
    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidGearRatio(_)))
    ));
}
