//! Step pulse generation.
//!
//! A hardware counter fires [`StepPulseIsr::on_trigger`] every half step
//! period. Each trigger toggles the pulse line once, and the step count
//! moves on the rising edge.

use embedded_hal::digital::StatefulOutputPin;

use crate::error::{AxisError, PinLine};
use crate::motion::Direction;

use super::shared::{AxisId, AxisShared};

/// Hardware counter that drives the pulse ISR.
pub trait PulseTimer {
    /// Error reported by the counter driver.
    type Error: core::fmt::Debug;

    /// Whether the counter device finished initialization.
    fn is_ready(&self) -> bool;

    /// Longest period the counter can be programmed with.
    fn max_period_ns(&self) -> u32;

    /// Program the trigger period and start (or keep) the counter running.
    fn start(&mut self, half_period_ns: u32) -> Result<(), Self::Error>;

    /// Stop the counter. No triggers fire until the next `start`.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

/// Interrupt handler state for the step and direction lines of one axis.
pub struct StepPulseIsr<'a, PUL, DIR>
where
    PUL: StatefulOutputPin,
    DIR: StatefulOutputPin,
{
    axis: AxisId,
    shared: &'a AxisShared,
    pulse: PUL,
    direction: DIR,
    last_trigger_ns: Option<u64>,
}

impl<'a, PUL, DIR> StepPulseIsr<'a, PUL, DIR>
where
    PUL: StatefulOutputPin,
    DIR: StatefulOutputPin,
{
    /// Create the handler for one axis.
    pub fn new(axis: AxisId, shared: &'a AxisShared, pulse: PUL, direction: DIR) -> Self {
        Self {
            axis,
            shared,
            pulse,
            direction,
            last_trigger_ns: None,
        }
    }

    /// Drive both lines inactive.
    pub fn init(&mut self) -> Result<(), AxisError> {
        self.pulse.set_low().map_err(|_| AxisError::Pin {
            axis: self.axis,
            line: PinLine::Pulse,
        })?;
        self.direction.set_low().map_err(|_| AxisError::Pin {
            axis: self.axis,
            line: PinLine::Direction,
        })?;
        Ok(())
    }

    /// Handle one counter trigger at `now_ns`.
    ///
    /// After a direction reversal the first trigger only flips DIR; the
    /// driver needs that tick to settle before the next step.
    pub fn on_trigger(&mut self, now_ns: u64) {
        if let Some(last) = self.last_trigger_ns {
            let interval = now_ns.saturating_sub(last).min(u32::MAX as u64) as u32;
            self.shared.set_pulse_interval_ns(interval);
        }
        self.last_trigger_ns = Some(now_ns);

        // Read errors count as low.
        let dir_high = self.direction.is_set_high().unwrap_or(false);
        let pul_high = self.pulse.is_set_high().unwrap_or(false);

        let wanted = match Direction::from_velocity(self.shared.velocity()) {
            Some(d) => d,
            None => return,
        };

        let current = Direction::from_line(dir_high);
        if current != wanted {
            let _ = self.direction.toggle();
            return;
        }

        if !pul_high {
            let steps = self.shared.step_count().wrapping_add(current.sign());
            self.shared.set_step_count(steps);
        }
        let _ = self.pulse.toggle();
    }

    /// Axis this handler drives.
    pub fn axis(&self) -> AxisId {
        self.axis
    }

    /// Release the pins.
    pub fn release(self) -> (PUL, DIR) {
        (self.pulse, self.direction)
    }
}
