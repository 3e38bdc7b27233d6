//! Idle mode.

use super::mode::{ControllerMode, OperatingMode, TickContext};
use super::output::ControllerOutput;

/// Holds both valves stopped.
#[derive(Debug, Clone, Default)]
pub struct IdleMode;

impl OperatingMode for IdleMode {
    fn mode(&self) -> ControllerMode {
        ControllerMode::Idle
    }

    fn tick(&mut self, _ctx: &mut TickContext<'_>) -> ControllerOutput {
        ControllerOutput::stop(ControllerMode::Idle)
    }
}
