//! Typed operator commands, as decoded by the command server.

use crate::trace::MotionTrace;

use super::mode::ControllerMode;

/// A request from the operator console.
///
/// Axis selectors are raw wire values (`0` = fuel, `1` = lox) and are
/// checked when the command is handled.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::large_enum_variant)]
pub enum Command {
    /// Validate and load a trace for one valve.
    LoadMotionTrace {
        /// Raw axis selector.
        axis: u8,
        /// Trace to load.
        trace: MotionTrace,
    },
    /// Start playing back both traces.
    StartSequence,
    /// Abort whatever is running.
    Halt,
    /// Start closed-loop throttling.
    StartClosedLoop,
    /// Start hard stop calibration.
    StartCalibration,
    /// Rebase one valve's position estimates.
    ResetValvePosition {
        /// Raw axis selector.
        axis: u8,
        /// New position in degrees.
        degrees: f32,
    },
    /// Switch to a mode through its start command.
    SetMode(ControllerMode),
}

impl Command {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::LoadMotionTrace { .. } => "load motion trace",
            Command::StartSequence => "start sequence",
            Command::Halt => "halt",
            Command::StartClosedLoop => "start closed loop",
            Command::StartCalibration => "start calibration",
            Command::ResetValvePosition { .. } => "reset valve position",
            Command::SetMode(_) => "set mode",
        }
    }
}
