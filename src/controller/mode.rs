//! Operating modes and the interface each one implements.

use core::fmt;

use serde::Serialize;

use crate::trace::Trace;

use super::output::ControllerOutput;
use super::sensors::SensorSnapshot;

/// Top-level operating mode of the stand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControllerMode {
    /// Valves stopped, waiting for a command.
    Idle,
    /// Playing back the loaded motion traces.
    Sequence,
    /// Driving both valves to their safe positions.
    Abort,
    /// Following the throttle curve from feedback pressure.
    ClosedLoopThrottle,
    /// Hard stop calibration.
    Calibration,
}

impl ControllerMode {
    /// Mode name for display/debugging.
    pub fn name(self) -> &'static str {
        match self {
            ControllerMode::Idle => "idle",
            ControllerMode::Sequence => "sequence",
            ControllerMode::Abort => "abort",
            ControllerMode::ClosedLoopThrottle => "closed loop throttle",
            ControllerMode::Calibration => "calibration",
        }
    }
}

impl fmt::Display for ControllerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position estimates of one axis at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisReading {
    /// Position from commanded steps, in degrees.
    pub open_loop: f32,
    /// Position from the encoder, in degrees.
    pub encoder: f32,
}

/// Everything a mode may look at during one tick.
pub struct TickContext<'a> {
    /// Tick time in milliseconds.
    pub now_ms: u32,
    /// Sensor values for this tick.
    pub sensors: &'a SensorSnapshot,
    /// Axis readings, fuel first.
    pub axes: [AxisReading; 2],
    /// Loaded traces, fuel first. Sampling moves their cursors.
    pub traces: &'a mut [Trace; 2],
}

/// One operating mode.
///
/// `tick` returns what should happen and never drives hardware itself.
pub trait OperatingMode {
    /// Which mode this is.
    fn mode(&self) -> ControllerMode;

    /// Called when the controller switches into this mode.
    fn init(&mut self, _now_ms: u32) {}

    /// Compute this tick's output.
    fn tick(&mut self, ctx: &mut TickContext<'_>) -> ControllerOutput;

    /// Called when the controller switches away from this mode.
    fn end(&mut self) {}
}
