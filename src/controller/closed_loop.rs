//! Closed-loop throttle mode.

use super::curve::ThrottleCurve;
use super::mode::{ControllerMode, OperatingMode, TickContext};
use super::output::ControllerOutput;

/// Drives both valves to the curve position for the feedback pressure.
///
/// Losing the feedback reading aborts within the same tick.
#[derive(Debug, Clone)]
pub struct ClosedLoopMode {
    curve: ThrottleCurve,
}

impl ClosedLoopMode {
    /// Use `curve` to map pressure to valve position.
    pub fn new(curve: ThrottleCurve) -> Self {
        Self { curve }
    }

    /// The curve in use.
    pub fn curve(&self) -> &ThrottleCurve {
        &self.curve
    }
}

impl OperatingMode for ClosedLoopMode {
    fn mode(&self) -> ControllerMode {
        ControllerMode::ClosedLoopThrottle
    }

    fn init(&mut self, _now_ms: u32) {
        info!("entering closed loop throttle");
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> ControllerOutput {
        if !ctx.sensors.has_feedback {
            error!("lost feedback sensor, aborting closed loop");
            return ControllerOutput::stop(ControllerMode::Abort);
        }

        let target = self.curve.lookup(ctx.sensors.feedback_pressure);
        ControllerOutput::move_to([target, target], ControllerMode::ClosedLoopThrottle)
    }

    fn end(&mut self) {
        info!("exited closed loop throttle");
    }
}
