//! Per-valve motion controller.
//!
//! A [`ValveAxis`] owns the enable line and the pulse counter of one valve.
//! The pulse and encoder interrupt handlers run separately and talk to it
//! through [`AxisShared`].

use embedded_hal::digital::{InputPin, OutputPin, StatefulOutputPin};

use crate::config::AxisConstants;
use crate::controller::AxisCommand;
use crate::error::{AxisError, PinLine};
use crate::motion::{half_period_ns, plan_velocity, MotionLimits};

use super::builder::ValveAxisBuilder;
use super::encoder::QuadratureDecoder;
use super::pulse::{PulseTimer, StepPulseIsr};
use super::shared::{AxisId, AxisShared};

/// Drive state of one axis, recomputed every control tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisState {
    /// Driver disabled, shaft free.
    Off,
    /// Powered and holding position.
    Stopped,
    /// Powered and following a target.
    Running,
}

/// Interface the controller uses to drive a valve.
pub trait Valve {
    /// Run one control tick.
    ///
    /// `enabled` powers the driver, `hold_position` selects following
    /// `target` over stopping.
    fn tick(&mut self, enabled: bool, hold_position: bool, target: f32);

    /// Rebase both position estimates to `degrees`. Only allowed while stopped.
    fn reset_pos(&mut self, degrees: f32) -> Result<(), AxisError>;

    /// Position from commanded steps, in degrees.
    fn open_loop_position(&self) -> f32;

    /// Position from the encoder, in degrees.
    fn encoder_position(&self) -> f32;

    /// Commanded velocity, in degrees per second.
    fn velocity(&self) -> f32;

    /// Whether the driver is enabled.
    fn is_powered(&self) -> bool;

    /// Whether the axis is powered and holding.
    fn is_stopped(&self) -> bool;

    /// Apply one controller command.
    fn apply(&mut self, command: AxisCommand) {
        match command {
            AxisCommand::Stop => self.tick(true, false, 0.0),
            AxisCommand::MoveTo(target) => self.tick(true, true, target),
            AxisCommand::PowerOff => self.tick(false, false, 0.0),
        }
    }
}

/// Motion controller for one valve.
pub struct ValveAxis<'a, ENA, T>
where
    ENA: OutputPin,
    T: PulseTimer,
{
    id: AxisId,
    shared: &'a AxisShared,
    enable: ENA,
    timer: T,
    constants: AxisConstants,
    limits: MotionLimits,
    state: AxisState,
    prev_state: AxisState,
    acceleration: f32,
    encoder_position: f32,
    prev_encoder_position: f32,
}

impl<'a, ENA, T> ValveAxis<'a, ENA, T>
where
    ENA: OutputPin,
    T: PulseTimer,
{
    /// Start building an axis.
    pub fn builder() -> ValveAxisBuilder<'a, ENA, T> {
        ValveAxisBuilder::new()
    }

    pub(crate) fn new(
        id: AxisId,
        shared: &'a AxisShared,
        enable: ENA,
        timer: T,
        constants: AxisConstants,
    ) -> Self {
        let limits = MotionLimits {
            max_velocity: constants.max_velocity,
            max_acceleration: constants.max_acceleration,
            period_s: constants.control_period_s,
        };
        Self {
            id,
            shared,
            enable,
            timer,
            constants,
            limits,
            state: AxisState::Stopped,
            prev_state: AxisState::Stopped,
            acceleration: 0.0,
            encoder_position: 0.0,
            prev_encoder_position: 0.0,
        }
    }

    /// Bring up the axis hardware.
    ///
    /// Checks the counter, drives pulse and direction inactive, enables the
    /// driver and latches the encoder lines. Stops at the first failure.
    pub fn init<PUL, DIR, A, B>(
        &mut self,
        pulse: &mut StepPulseIsr<'_, PUL, DIR>,
        encoder: &mut QuadratureDecoder<'_, A, B>,
    ) -> Result<(), AxisError>
    where
        PUL: StatefulOutputPin,
        DIR: StatefulOutputPin,
        A: InputPin,
        B: InputPin,
    {
        if !self.timer.is_ready() {
            error!("{} valve: pulse counter not ready", self.id);
            return Err(AxisError::TimerNotReady(self.id));
        }
        pulse.init()?;
        self.enable.set_high().map_err(|_| AxisError::Pin {
            axis: self.id,
            line: PinLine::Enable,
        })?;
        encoder.init();
        self.encoder_position = self.read_encoder_position();
        self.prev_encoder_position = self.encoder_position;
        info!("{} valve initialized", self.id);
        Ok(())
    }

    /// Run one control tick.
    pub fn tick(&mut self, enabled: bool, hold_position: bool, target: f32) {
        self.prev_encoder_position = self.encoder_position;
        self.encoder_position = self.read_encoder_position();

        self.prev_state = self.state;
        self.state = if !enabled {
            AxisState::Off
        } else if !hold_position {
            AxisState::Stopped
        } else {
            AxisState::Running
        };

        match self.state {
            AxisState::Off => {
                self.halt_pulses();
                self.power_on(false);
            }
            AxisState::Stopped => self.stop(),
            AxisState::Running => self.move_to(target),
        }
    }

    /// Power the driver and hold position.
    pub fn stop(&mut self) {
        self.power_on(true);
        self.halt_pulses();
        self.state = AxisState::Stopped;
    }

    /// Rebase step and encoder counts to `degrees`.
    pub fn reset_pos(&mut self, degrees: f32) -> Result<(), AxisError> {
        if self.state != AxisState::Stopped {
            warn!("{} valve: cannot reset position while not stopped", self.id);
            return Err(AxisError::NotStopped(self.id));
        }
        self.shared
            .set_step_count(self.constants.degrees_to_steps(degrees));
        self.shared
            .set_encoder_count(self.constants.degrees_to_counts(degrees));
        self.encoder_position = self.read_encoder_position();
        self.prev_encoder_position = self.encoder_position;
        debug!("{} valve rebased", self.id);
        Ok(())
    }

    fn move_to(&mut self, target: f32) {
        self.power_on(true);

        let planned = plan_velocity(
            target,
            self.open_loop_position(),
            self.shared.velocity(),
            &self.limits,
        );
        self.acceleration = planned.acceleration;
        self.shared.set_velocity(planned.velocity);

        let result = match half_period_ns(planned.velocity, self.constants.degrees_per_step) {
            Some(ns) => self.timer.start(ns.min(self.timer.max_period_ns())),
            None => self.timer.stop(),
        };
        if result.is_err() {
            error!("{} valve: failed to program pulse counter", self.id);
        }
    }

    fn halt_pulses(&mut self) {
        if self.timer.stop().is_err() {
            error!("{} valve: failed to stop pulse counter", self.id);
        }
        self.shared.set_velocity(0.0);
        self.acceleration = 0.0;
    }

    // Edges are relative to the state of the previous tick.
    fn power_on(&mut self, on: bool) {
        let result = if on && self.prev_state == AxisState::Off {
            info!("{} valve powered on", self.id);
            self.enable.set_high()
        } else if !on && self.prev_state != AxisState::Off {
            info!("{} valve powered off", self.id);
            self.enable.set_low()
        } else {
            Ok(())
        };
        if result.is_err() {
            error!("{} valve: enable line failed", self.id);
        }
    }

    fn read_encoder_position(&self) -> f32 {
        self.constants.counts_to_degrees(self.shared.encoder_count())
    }

    /// Position from commanded steps, in degrees.
    pub fn open_loop_position(&self) -> f32 {
        self.constants.steps_to_degrees(self.shared.step_count())
    }

    /// Position from the encoder, in degrees.
    pub fn encoder_position(&self) -> f32 {
        self.read_encoder_position()
    }

    /// Commanded velocity, in degrees per second.
    pub fn velocity(&self) -> f32 {
        self.shared.velocity()
    }

    /// Encoder velocity over the last tick, in degrees per second.
    pub fn encoder_velocity(&self) -> f32 {
        (self.encoder_position - self.prev_encoder_position) / self.constants.control_period_s
    }

    /// Acceleration commanded on the last tick.
    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    /// Measured interval between the last two pulse triggers.
    pub fn pulse_interval_ns(&self) -> u32 {
        self.shared.pulse_interval_ns()
    }

    /// Whether the driver is enabled.
    pub fn is_powered(&self) -> bool {
        self.state != AxisState::Off
    }

    /// Current drive state.
    pub fn state(&self) -> AxisState {
        self.state
    }

    /// Which valve this is.
    pub fn id(&self) -> AxisId {
        self.id
    }

    /// Derived constants in use.
    pub fn constants(&self) -> &AxisConstants {
        &self.constants
    }

    /// Release the enable pin and the counter.
    pub fn release(self) -> (ENA, T) {
        (self.enable, self.timer)
    }
}

impl<ENA, T> Valve for ValveAxis<'_, ENA, T>
where
    ENA: OutputPin,
    T: PulseTimer,
{
    fn tick(&mut self, enabled: bool, hold_position: bool, target: f32) {
        ValveAxis::tick(self, enabled, hold_position, target)
    }

    fn reset_pos(&mut self, degrees: f32) -> Result<(), AxisError> {
        ValveAxis::reset_pos(self, degrees)
    }

    fn open_loop_position(&self) -> f32 {
        ValveAxis::open_loop_position(self)
    }

    fn encoder_position(&self) -> f32 {
        ValveAxis::encoder_position(self)
    }

    fn velocity(&self) -> f32 {
        ValveAxis::velocity(self)
    }

    fn is_powered(&self) -> bool {
        ValveAxis::is_powered(self)
    }

    fn is_stopped(&self) -> bool {
        self.state == AxisState::Stopped
    }
}

/// The fuel and oxidizer valves, addressable by [`AxisId`].
pub struct ValvePair<F, L> {
    /// Fuel valve.
    pub fuel: F,
    /// Oxidizer valve.
    pub lox: L,
}

impl<F: Valve, L: Valve> ValvePair<F, L> {
    /// Pair up two valves.
    pub fn new(fuel: F, lox: L) -> Self {
        Self { fuel, lox }
    }

    /// Borrow one valve.
    pub fn get(&self, axis: AxisId) -> &dyn Valve {
        match axis {
            AxisId::Fuel => &self.fuel,
            AxisId::Lox => &self.lox,
        }
    }

    /// Mutably borrow one valve.
    pub fn get_mut(&mut self, axis: AxisId) -> &mut dyn Valve {
        match axis {
            AxisId::Fuel => &mut self.fuel,
            AxisId::Lox => &mut self.lox,
        }
    }
}
