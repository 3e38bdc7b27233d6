//! Abort mode.

use super::mode::{ControllerMode, OperatingMode, TickContext};
use super::output::ControllerOutput;

/// Drives both valves to their safe positions, then returns to Idle.
#[derive(Debug, Clone)]
pub struct AbortMode {
    safe_positions: [f32; 2],
    duration_ms: u32,
    entered_ms: u32,
}

impl AbortMode {
    /// Abort toward `safe_positions` (fuel first) for `duration_ms`.
    pub fn new(safe_positions: [f32; 2], duration_ms: u32) -> Self {
        Self {
            safe_positions,
            duration_ms,
            entered_ms: 0,
        }
    }

    /// When the current abort started.
    pub fn entered_ms(&self) -> u32 {
        self.entered_ms
    }
}

impl OperatingMode for AbortMode {
    fn mode(&self) -> ControllerMode {
        ControllerMode::Abort
    }

    fn init(&mut self, now_ms: u32) {
        warn!("abort at {} ms", now_ms);
        self.entered_ms = now_ms;
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> ControllerOutput {
        let next = if ctx.now_ms.wrapping_sub(self.entered_ms) > self.duration_ms {
            ControllerMode::Idle
        } else {
            ControllerMode::Abort
        };
        ControllerOutput::move_to(self.safe_positions, next)
    }
}
