//! Pure per-tick output of an operating mode.

use super::mode::ControllerMode;

/// What one valve should do this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisCommand {
    /// Powered, holding position.
    Stop,
    /// Powered, following a target in degrees.
    MoveTo(f32),
    /// Driver disabled.
    PowerOff,
}

impl AxisCommand {
    /// Commanded position, if any.
    #[inline]
    pub fn target(self) -> Option<f32> {
        match self {
            AxisCommand::MoveTo(target) => Some(target),
            AxisCommand::Stop | AxisCommand::PowerOff => None,
        }
    }
}

/// Output of one mode tick, applied by the dispatcher.
///
/// Modes never touch hardware. The dispatcher runs both axis commands
/// first and then applies `rebase`, so a rebase always lands on axes the
/// same output has just stopped.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerOutput {
    /// Per-axis commands, fuel first.
    pub commands: [AxisCommand; 2],
    /// Mode to run on the next tick.
    pub next_state: ControllerMode,
    /// New position estimates for both axes, fuel first.
    pub rebase: Option<[f32; 2]>,
}

impl ControllerOutput {
    /// Same command on both axes.
    pub fn both(command: AxisCommand, next_state: ControllerMode) -> Self {
        Self {
            commands: [command, command],
            next_state,
            rebase: None,
        }
    }

    /// Stop both axes.
    pub fn stop(next_state: ControllerMode) -> Self {
        Self::both(AxisCommand::Stop, next_state)
    }

    /// Move each axis to its own target.
    pub fn move_to(targets: [f32; 2], next_state: ControllerMode) -> Self {
        Self {
            commands: [
                AxisCommand::MoveTo(targets[0]),
                AxisCommand::MoveTo(targets[1]),
            ],
            next_state,
            rebase: None,
        }
    }

    /// Request a rebase after the commands run.
    pub fn with_rebase(mut self, positions: [f32; 2]) -> Self {
        self.rebase = Some(positions);
        self
    }
}
