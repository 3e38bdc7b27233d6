//! Configuration and trace loading from TOML (std only).

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ConfigError, Error, Result};
use crate::trace::{MotionTrace, Trace, TraceBuilder};

use super::StandConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use throttle_stand::load_config;
///
/// let config = load_config("stand.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<StandConfig> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::Config(ConfigError::IoError(truncated(&e.to_string()))))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<StandConfig> {
    let config: StandConfig = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(truncated(e.message()))))?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

#[derive(Debug, Deserialize)]
struct RawTrace {
    total_time_ms: Option<u32>,
    segments: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawSegment {
    Linear {
        length_ms: u32,
        start: f32,
        end: f32,
    },
    Sine {
        length_ms: u32,
        offset: f32,
        amplitude: f32,
        period_ms: f32,
        #[serde(default)]
        phase_deg: f32,
    },
}

/// Parse and validate a motion trace from a TOML string.
///
/// Segments are laid end to end. `total_time_ms` is optional and, when
/// given, must match the sum of segment lengths.
///
/// ```rust
/// let trace = throttle_stand::parse_trace(r#"
///     [[segments]]
///     type = "linear"
///     length_ms = 1000
///     start = 0.0
///     end = 50.0
///
///     [[segments]]
///     type = "sine"
///     length_ms = 500
///     offset = 50.0
///     amplitude = 5.0
///     period_ms = 250.0
/// "#).unwrap();
/// assert_eq!(trace.total_time_ms, 1500);
/// ```
///
/// # Errors
///
/// Returns a parse error for malformed TOML and a trace error for a trace
/// that would be rejected at load.
pub fn parse_trace(content: &str) -> Result<MotionTrace> {
    let raw: RawTrace = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(truncated(e.message()))))?;

    let mut builder = TraceBuilder::new();
    for segment in raw.segments {
        builder = match segment {
            RawSegment::Linear {
                length_ms,
                start,
                end,
            } => builder.linear(length_ms, start, end),
            RawSegment::Sine {
                length_ms,
                offset,
                amplitude,
                period_ms,
                phase_deg,
            } => builder.sine(length_ms, offset, amplitude, period_ms, phase_deg),
        };
    }
    if let Some(total) = raw.total_time_ms {
        builder = builder.total_time_ms(total);
    }

    let trace = builder.build()?;
    Trace::new().load(&trace)?;
    Ok(trace)
}

fn truncated(msg: &str) -> heapless::String<128> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
