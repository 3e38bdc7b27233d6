//! Error types for throttle-stand.
//!
//! Typed errors are produced where a failure is detected. They are turned into a
//! [`Report`](crate::report::Report) as they propagate toward the command handler,
//! which is the only place a report is rendered into a message.

use core::fmt;

use crate::controller::ControllerMode;
use crate::valve::AxisId;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all throttle-stand operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Valve axis bring-up or operation error
    Axis(AxisError),
    /// Motion trace validation or sampling error
    Trace(TraceError),
    /// Command rejected by the controller
    Command(CommandError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Invalid microstep value (must be power of 2: 1, 2, 4, 8, 16, 32, 64, 128, 256)
    InvalidMicrosteps(u16),
    /// Invalid gear ratio (must be > 0)
    InvalidGearRatio(f32),
    /// Invalid encoder counts per revolution (must be > 0)
    InvalidEncoderCpr(u32),
    /// Invalid max velocity (must be > 0)
    InvalidMaxVelocity(f32),
    /// Invalid max acceleration (must be > 0)
    InvalidMaxAcceleration(f32),
    /// Invalid control period (must be > 0)
    InvalidControlPeriod(u32),
    /// Invalid calibration parameter
    InvalidCalibration(&'static str),
    /// Throttle curve needs at least two points
    CurveTooShort(usize),
    /// Throttle curve breakpoints must be equally spaced and increasing in x
    CurveNotEquallySpaced {
        /// Index of the offending point
        index: usize,
    },
    /// Throttle curve output must be non-decreasing
    CurveNotMonotonic {
        /// Index of the offending point
        index: usize,
    },
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Valve axis errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisError {
    /// A GPIO line failed to configure or switch
    Pin {
        /// Axis the pin belongs to
        axis: AxisId,
        /// Which line failed
        line: PinLine,
    },
    /// The pulse generator counter is not ready
    TimerNotReady(AxisId),
    /// Builder is missing a required part
    Missing(&'static str),
    /// Position can only be rebased while the axis is stopped
    NotStopped(AxisId),
}

/// Physical line of a valve axis, used to label pin failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinLine {
    /// Step pulse output
    Pulse,
    /// Direction output
    Direction,
    /// Driver enable output
    Enable,
    /// Quadrature channel A input
    EncoderA,
    /// Quadrature channel B input
    EncoderB,
}

/// Motion trace errors.
///
/// Segment numbers are 1-based, matching how operators number segments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceError {
    /// Total time must be greater than zero
    ZeroTotalTime,
    /// Trace has no segments
    NoSegments,
    /// Too many segments for the trace buffer
    TooManySegments,
    /// Sine amplitude must be non-negative
    NegativeAmplitude {
        /// Segment number
        segment: usize,
        /// Offending amplitude
        amplitude: f32,
    },
    /// Sine period must be positive
    NonPositivePeriod {
        /// Segment number
        segment: usize,
        /// Offending period in ms
        period: f32,
    },
    /// Segment does not start where the previous one ended
    NonContiguous {
        /// Segment number
        segment: usize,
        /// Expected start in ms
        expected_ms: u32,
    },
    /// Segment length may not be zero
    ZeroLength {
        /// Segment number
        segment: usize,
    },
    /// Segment value jumps at its start
    Discontinuous {
        /// Segment number
        segment: usize,
        /// Value the previous segment ended at
        previous_end: f32,
        /// Value this segment starts at
        start: f32,
    },
    /// Declared total time does not match the sum of segment lengths
    TotalTimeMismatch {
        /// Sum of segment lengths
        expected_ms: u32,
        /// Declared total
        declared_ms: u32,
    },
    /// No valid trace has been loaded
    NotLoaded,
    /// No segment covers the requested time
    SegmentNotFound(u32),
}

/// Command rejection errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandError {
    /// Axis selector does not name a valve
    InvalidAxis(u8),
    /// Command is not allowed in the current mode
    NotAllowed {
        /// Mode the controller is in
        mode: ControllerMode,
        /// Command that was attempted
        command: &'static str,
    },
    /// A sequence needs a trace loaded on this axis
    TraceMissing(AxisId),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "configuration error: {}", e),
            Error::Axis(e) => write!(f, "valve error: {}", e),
            Error::Trace(e) => write!(f, "trace error: {}", e),
            Error::Command(e) => write!(f, "command rejected: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "parse error: {}", msg),
            ConfigError::InvalidMicrosteps(v) => {
                write!(f, "invalid microsteps: {}. Valid values: 1, 2, 4, 8, 16, 32, 64, 128, 256", v)
            }
            ConfigError::InvalidGearRatio(v) => write!(f, "invalid gear ratio: {}. Must be > 0", v),
            ConfigError::InvalidEncoderCpr(v) => write!(f, "invalid encoder cpr: {}. Must be > 0", v),
            ConfigError::InvalidMaxVelocity(v) => write!(f, "invalid max velocity: {}. Must be > 0", v),
            ConfigError::InvalidMaxAcceleration(v) => write!(f, "invalid max acceleration: {}. Must be > 0", v),
            ConfigError::InvalidControlPeriod(v) => write!(f, "invalid control period: {} ms. Must be > 0", v),
            ConfigError::InvalidCalibration(field) => write!(f, "invalid calibration parameter `{}`", field),
            ConfigError::CurveTooShort(n) => write!(f, "throttle curve needs at least 2 points, got {}", n),
            ConfigError::CurveNotEquallySpaced { index } => {
                write!(f, "throttle curve point {} breaks the equal x spacing", index)
            }
            ConfigError::CurveNotMonotonic { index } => {
                write!(f, "throttle curve point {} decreases", index)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for AxisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisError::Pin { axis, line } => {
                write!(f, "{} GPIO not ready on {} valve", line, axis)
            }
            AxisError::TimerNotReady(axis) => write!(f, "stepper counter not ready on {} valve", axis),
            AxisError::Missing(part) => write!(f, "{} is required", part),
            AxisError::NotStopped(axis) => {
                write!(f, "cannot reset {} valve position while it is not stopped", axis)
            }
        }
    }
}

impl fmt::Display for PinLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PinLine::Pulse => "pulse",
            PinLine::Direction => "direction",
            PinLine::Enable => "enable",
            PinLine::EncoderA => "encoder A",
            PinLine::EncoderB => "encoder B",
        })
    }
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceError::ZeroTotalTime => write!(f, "total time must be greater than zero"),
            TraceError::NoSegments => write!(f, "no segments specified"),
            TraceError::TooManySegments => write!(f, "too many segments"),
            TraceError::NegativeAmplitude { segment, amplitude } => write!(
                f,
                "amplitude for sine segment {} must be non-negative, got {}",
                segment, amplitude
            ),
            TraceError::NonPositivePeriod { segment, period } => write!(
                f,
                "period for sine segment {} must be positive, got {}",
                segment, period
            ),
            TraceError::NonContiguous { segment, expected_ms } => write!(
                f,
                "segment {}'s start time is not continuous with previous segment (expected {} ms)",
                segment, expected_ms
            ),
            TraceError::ZeroLength { segment } => {
                write!(f, "segment {}'s length may not be zero", segment)
            }
            TraceError::Discontinuous { segment, previous_end, start } => write!(
                f,
                "segment {}'s start is discontinuous, previous ended at {} but this one started at {}",
                segment, previous_end, start
            ),
            TraceError::TotalTimeMismatch { expected_ms, declared_ms } => write!(
                f,
                "total time is incorrect, expected {} ms but got {} ms",
                expected_ms, declared_ms
            ),
            TraceError::NotLoaded => write!(f, "valid trace not loaded"),
            TraceError::SegmentNotFound(t) => write!(f, "failed to find matching segment at {} ms", t),
        }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::InvalidAxis(raw) => {
                write!(f, "invalid valve selector (must be fuel or lox) `{}`", raw)
            }
            CommandError::NotAllowed { mode, command } => {
                write!(f, "cannot {} while in {} mode", command, mode)
            }
            CommandError::TraceMissing(axis) => write!(f, "no {} trace loaded", axis),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<AxisError> for Error {
    fn from(e: AxisError) -> Self {
        Error::Axis(e)
    }
}

impl From<TraceError> for Error {
    fn from(e: TraceError) -> Self {
        Error::Trace(e)
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Error::Command(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for AxisError {}

#[cfg(feature = "std")]
impl std::error::Error for TraceError {}

#[cfg(feature = "std")]
impl std::error::Error for CommandError {}
