//! Unit tests for motion trace parsing and loading.

use throttle_stand::error::{Error, TraceError};
use throttle_stand::trace::{SegmentKind, Trace};
use throttle_stand::parse_trace;

/// Test a ramp, a sine dither and a ramp down.
#[test]
fn test_parse_and_play_trace() {
    let toml_str = r#"
[[segments]]
type = "linear"
length_ms = 500
start = 20.0
end = 60.0

[[segments]]
type = "sine"
length_ms = 1000
offset = 60.0
amplitude = 2.0
period_ms = 100.0

[[segments]]
type = "linear"
length_ms = 500
start = 60.0
end = 20.0
"#;

    let motion = parse_trace(toml_str).expect("Failed to parse trace");
    assert_eq!(motion.total_time_ms, 2000);
    assert_eq!(motion.segments[2].start_ms, 1500);
    assert!(matches!(
        motion.segments[1].kind,
        SegmentKind::Sine { phase_deg, .. } if phase_deg == 0.0
    ));

    let mut trace = Trace::new();
    trace.load(&motion).unwrap();
    assert!((trace.sample(250.0).unwrap() - 40.0).abs() < 1e-3);
    // A quarter period into the sine is its peak.
    assert!((trace.sample(525.0).unwrap() - 62.0).abs() < 1e-3);
    assert!((trace.sample(1750.0).unwrap() - 40.0).abs() < 1e-3);
    assert!((trace.sample(9999.0).unwrap() - 20.0).abs() < 1e-3);
}

/// Test that a jump between segments is rejected.
#[test]
fn test_discontinuous_trace_rejected() {
    let toml_str = r#"
[[segments]]
type = "linear"
length_ms = 100
start = 0.0
end = 50.0

[[segments]]
type = "linear"
length_ms = 100
start = 60.0
end = 60.0
"#;

    assert_eq!(
        parse_trace(toml_str),
        Err(Error::Trace(TraceError::Discontinuous {
            segment: 2,
            previous_end: 50.0,
            start: 60.0,
        }))
    );
}

/// Test that sine parameters are checked.
#[test]
fn test_negative_amplitude_rejected() {
    let toml_str = r#"
[[segments]]
type = "sine"
length_ms = 100
offset = 10.0
amplitude = -1.0
period_ms = 50.0
"#;

    let err = parse_trace(toml_str).unwrap_err();
    assert!(matches!(
        err,
        Error::Trace(TraceError::NegativeAmplitude { segment: 1, .. })
    ));
}

/// Test that an unknown segment type is a parse error.
#[test]
fn test_unknown_segment_type() {
    let toml_str = r#"
[[segments]]
type = "cubic"
length_ms = 100
"#;

    assert!(matches!(
        parse_trace(toml_str),
        Err(Error::Config(_))
    ));
}

/// Test that an empty trace is rejected at load.
#[test]
fn test_empty_trace_rejected() {
    assert_eq!(
        parse_trace("segments = []"),
        Err(Error::Trace(TraceError::ZeroTotalTime))
    );
}
