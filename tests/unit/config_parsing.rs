//! Unit tests for TOML configuration parsing.

use throttle_stand::config::{load_config, parse_config, StandConfig};
use throttle_stand::valve::AxisId;

const STAND_TOML: &str = r#"
[controller]
control_period_ms = 2
abort_duration_ms = 750

[valves.fuel]
steps_per_revolution = 200
microsteps = 16
gear_ratio = 5.0
encoder_cpr = 4000
max_velocity_deg_per_sec = 600.0
max_acceleration_deg_per_sec2 = 240000.0
invert_encoder = true
safe_position_deg = 80.0

[valves.lox]
safe_position_deg = 72.5

[calibration]
step_size_deg = 0.25
num_reps = 3
error_limit_deg = 0.4
backoff_margin_deg = 1.0
power_off_ms = 1000

[throttle_curve]
points = [[0.0, 10.0], [50.0, 20.0], [100.0, 45.0]]
"#;

/// Test parsing a complete stand configuration.
#[test]
fn test_parse_stand_config() {
    let config = parse_config(STAND_TOML).expect("Failed to parse stand config");

    assert_eq!(config.controller.control_period_ms, 2);
    assert_eq!(config.controller.abort_duration_ms, 750);

    let fuel = config.valve(AxisId::Fuel);
    assert_eq!(fuel.microsteps.value(), 16);
    assert_eq!(fuel.max_velocity.0, 600.0);
    assert!(fuel.invert_encoder);
    assert_eq!(config.safe_positions(), [80.0, 72.5]);

    assert_eq!(config.calibration.num_reps, 3);
    assert_eq!(config.calibration.step_size, 0.25);
    // Unlisted calibration fields keep their defaults.
    assert_eq!(config.calibration.settle_ms, 300);

    assert_eq!(config.throttle_curve.points.len(), 3);
    assert_eq!(config.throttle_curve.points[2], [100.0, 45.0]);
}

/// Test that derived constants follow the parsed mechanics.
#[test]
fn test_axis_constants_from_parsed_config() {
    let config = parse_config(STAND_TOML).unwrap();

    let fuel = config.axis_constants(AxisId::Fuel);
    // 200 * 16 * 5 = 16000 microsteps per valve turn
    assert!((fuel.degrees_per_step - 360.0 / 16_000.0).abs() < 1e-7);
    assert!((fuel.degrees_per_count - 360.0 / 20_000.0).abs() < 1e-7);
    assert!((fuel.control_period_s - 0.002).abs() < 1e-7);
    assert!(fuel.invert_encoder);

    let lox = config.axis_constants(AxisId::Lox);
    assert!((lox.degrees_per_step - 0.045).abs() < 1e-7);
    assert!(!lox.invert_encoder);
}

/// Test that the raw toml deserializer and the validating parser agree.
#[test]
fn test_raw_deserialize_matches_parser() {
    let raw: StandConfig = toml::from_str(STAND_TOML).expect("Failed to parse TOML");
    assert_eq!(raw, parse_config(STAND_TOML).unwrap());
}

/// Test that unknown microstep values are rejected while parsing.
#[test]
fn test_parse_rejects_bad_microsteps() {
    let toml_str = r#"
[valves.lox]
microsteps = 3
safe_position_deg = 74.0
"#;
    assert!(toml::from_str::<StandConfig>(toml_str).is_err());
    assert!(parse_config(toml_str).is_err());
}

/// Test loading from a file on disk.
#[test]
fn test_load_config_from_file() {
    let path = std::env::temp_dir().join(format!(
        "throttle-stand-config-{}.toml",
        std::process::id()
    ));
    std::fs::write(&path, STAND_TOML).unwrap();

    let config = load_config(&path);
    let _ = std::fs::remove_file(&path);

    assert_eq!(config.unwrap().controller.abort_duration_ms, 750);
}

/// Test that a missing file is reported as an I/O error.
#[test]
fn test_load_config_missing_file() {
    let result = load_config("/nonexistent/throttle-stand.toml");
    let msg = format!("{}", result.unwrap_err());
    assert!(msg.starts_with("configuration error: I/O error"), "{}", msg);
}
