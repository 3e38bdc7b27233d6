//! Sequence mode: trace playback.

use crate::valve::AxisId;

use super::mode::{ControllerMode, OperatingMode, TickContext};
use super::output::ControllerOutput;

/// Plays back both loaded traces from the moment the mode starts.
#[derive(Debug, Clone, Default)]
pub struct SequenceMode {
    start_ms: u32,
}

impl SequenceMode {
    /// When the running sequence started.
    pub fn start_ms(&self) -> u32 {
        self.start_ms
    }
}

impl OperatingMode for SequenceMode {
    fn mode(&self) -> ControllerMode {
        ControllerMode::Sequence
    }

    fn init(&mut self, now_ms: u32) {
        info!("sequence started at {} ms", now_ms);
        self.start_ms = now_ms;
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> ControllerOutput {
        let elapsed = ctx.now_ms.wrapping_sub(self.start_ms);
        let mut targets = [0.0; 2];

        for axis in AxisId::ALL {
            let trace = &mut ctx.traces[axis.index()];
            let exhausted = match trace.total_time_ms() {
                Some(total) => elapsed >= total,
                None => true,
            };
            if exhausted {
                info!("sequence finished after {} ms", elapsed);
                return ControllerOutput::stop(ControllerMode::Idle);
            }
            match trace.sample(elapsed as f32) {
                Ok(target) => targets[axis.index()] = target,
                Err(_) => return ControllerOutput::stop(ControllerMode::Idle),
            }
        }

        ControllerOutput::move_to(targets, ControllerMode::Sequence)
    }
}
