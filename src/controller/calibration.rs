//! Hard stop calibration.
//!
//! Each valve is driven into its mechanical stop, which shows up as the
//! open-loop position running away from the encoder once the shaft stalls.
//! Both valves seek together. After `num_reps` hits, progressively slower
//! each time, both axes are rebased to the latched stop positions and the
//! drivers are power cycled.

use serde::Serialize;

use crate::config::CalibrationConfig;
use crate::valve::AxisId;

use super::mode::{ControllerMode, OperatingMode, TickContext};
use super::output::{AxisCommand, ControllerOutput};

/// Phase of the calibration sub-state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationPhase {
    /// Advance both valves until each one stalls.
    SeekHardstop,
    /// Recede from the latched stops before the next seek.
    BackOff,
    /// Stopped and rebased, settling before power off.
    EndMovement,
    /// Drivers de-energized.
    PowerOff,
    /// Drivers re-energized, settling.
    Repower,
    /// Done. Returns to Idle.
    Complete,
    /// Faulted. Holds both valves stopped.
    Error,
}

/// Calibration progress reported with telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationTelemetry {
    /// Current phase.
    pub phase: CalibrationPhase,
    /// Completed hard stop hits.
    pub rep_counter: u32,
    /// Latched stop positions, fuel first.
    pub hardstop: [f32; 2],
    /// Per-axis stop detection in the current seek, fuel first.
    pub found: [bool; 2],
}

/// Calibration mode state.
#[derive(Debug, Clone)]
pub struct CalibrationMode {
    config: CalibrationConfig,
    phase: CalibrationPhase,
    phase_entered_ms: u32,
    rep_counter: u32,
    found: [bool; 2],
    hardstop: [f32; 2],
}

impl CalibrationMode {
    /// Calibrate with `config`.
    pub fn new(config: CalibrationConfig) -> Self {
        Self {
            config,
            phase: CalibrationPhase::SeekHardstop,
            phase_entered_ms: 0,
            rep_counter: 0,
            found: [false; 2],
            hardstop: [0.0; 2],
        }
    }

    /// Current phase.
    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    /// Snapshot for telemetry.
    pub fn telemetry(&self) -> CalibrationTelemetry {
        CalibrationTelemetry {
            phase: self.phase,
            rep_counter: self.rep_counter,
            hardstop: self.hardstop,
            found: self.found,
        }
    }

    fn enter(&mut self, phase: CalibrationPhase, now_ms: u32) {
        info!("calibration phase {} -> {}", self.phase, phase);
        self.phase = phase;
        self.phase_entered_ms = now_ms;
    }

    fn elapsed(&self, now_ms: u32) -> u32 {
        now_ms.wrapping_sub(self.phase_entered_ms)
    }

    fn seek_hardstop(&mut self, ctx: &TickContext<'_>) -> ControllerOutput {
        if self.elapsed(ctx.now_ms) > self.config.seek_timeout_ms {
            error!("calibration timed out seeking hard stops");
            self.enter(CalibrationPhase::Error, ctx.now_ms);
            return ControllerOutput::stop(ControllerMode::Calibration);
        }

        let step = self.config.step_size / (self.rep_counter + 1) as f32;
        let mut targets = [0.0; 2];

        for axis in AxisId::ALL {
            let i = axis.index();
            let reading = ctx.axes[i];
            let tracking = (reading.open_loop - reading.encoder).abs() <= self.config.error_limit;

            if !self.found[i] && tracking {
                targets[i] = reading.open_loop + step;
            } else {
                if !self.found[i] {
                    info!("{} valve hit its hard stop at {} deg", axis, reading.encoder);
                    self.found[i] = true;
                    self.hardstop[i] = reading.encoder;
                }
                targets[i] = self.hardstop[i];
            }
        }

        if self.found == [true; 2] {
            self.rep_counter += 1;
            self.found = [false; 2];

            if self.rep_counter >= self.config.num_reps {
                self.enter(CalibrationPhase::EndMovement, ctx.now_ms);
                return ControllerOutput::stop(ControllerMode::Calibration)
                    .with_rebase(self.hardstop);
            }

            // The stalled motor lost steps, so resync the open-loop count
            // before backing off.
            let encoders = [ctx.axes[0].encoder, ctx.axes[1].encoder];
            self.enter(CalibrationPhase::BackOff, ctx.now_ms);
            return ControllerOutput::stop(ControllerMode::Calibration).with_rebase(encoders);
        }

        ControllerOutput::move_to(targets, ControllerMode::Calibration)
    }

    fn back_off(&mut self, ctx: &TickContext<'_>) -> ControllerOutput {
        // TODO: confirm whether the back-off margin is meant to shrink with
        // each repetition.
        let divisor = (self.rep_counter + 1) as f32;
        let step = self.config.step_size / divisor;
        let margin = self.config.backoff_margin / divisor;

        let targets = [ctx.axes[0].encoder - step, ctx.axes[1].encoder - step];
        let receded = AxisId::ALL
            .iter()
            .all(|a| self.hardstop[a.index()] - ctx.axes[a.index()].encoder >= margin);

        if receded {
            self.enter(CalibrationPhase::SeekHardstop, ctx.now_ms);
        }
        ControllerOutput::move_to(targets, ControllerMode::Calibration)
    }

    fn dwell(
        &mut self,
        now_ms: u32,
        duration_ms: u32,
        command: AxisCommand,
        next: CalibrationPhase,
    ) -> ControllerOutput {
        if self.elapsed(now_ms) >= duration_ms {
            self.enter(next, now_ms);
        }
        ControllerOutput::both(command, ControllerMode::Calibration)
    }
}

impl OperatingMode for CalibrationMode {
    fn mode(&self) -> ControllerMode {
        ControllerMode::Calibration
    }

    fn init(&mut self, now_ms: u32) {
        info!("calibration started");
        *self = Self::new(self.config.clone());
        self.phase_entered_ms = now_ms;
    }

    fn tick(&mut self, ctx: &mut TickContext<'_>) -> ControllerOutput {
        let now = ctx.now_ms;
        match self.phase {
            CalibrationPhase::SeekHardstop => self.seek_hardstop(ctx),
            CalibrationPhase::BackOff => self.back_off(ctx),
            CalibrationPhase::EndMovement => self.dwell(
                now,
                self.config.settle_ms,
                AxisCommand::Stop,
                CalibrationPhase::PowerOff,
            ),
            CalibrationPhase::PowerOff => self.dwell(
                now,
                self.config.power_off_ms,
                AxisCommand::PowerOff,
                CalibrationPhase::Repower,
            ),
            CalibrationPhase::Repower => self.dwell(
                now,
                self.config.repower_ms,
                AxisCommand::Stop,
                CalibrationPhase::Complete,
            ),
            CalibrationPhase::Complete => ControllerOutput::stop(ControllerMode::Idle),
            CalibrationPhase::Error => ControllerOutput::stop(ControllerMode::Calibration),
        }
    }

    fn end(&mut self) {
        info!("calibration left in phase {}", self.phase);
    }
}
