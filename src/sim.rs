//! Software-in-the-loop stand hardware (std only).
//!
//! [`SimPin`] and [`SimTimer`] implement the hardware traits with shared
//! state, so a test can hand one clone to a [`ValveAxis`] and keep another
//! to observe it. [`SimPlant`] plays the role of the valve itself: it fires
//! the pulse ISR at the programmed rate, moves a simulated shaft on every
//! step the driver accepts, stalls it at an optional hard stop and feeds the
//! resulting quadrature edges to the decoder.

use core::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, StatefulOutputPin};

use crate::config::{AxisConstants, StandConfig};
use crate::error::{AxisError, Result};
use crate::valve::{AxisId, AxisShared, PulseTimer, QuadratureDecoder, StepPulseIsr, ValveAxis};

/// A valve axis wired to simulated hardware.
pub type SimValve<'a> = ValveAxis<'a, SimPin, SimTimer>;

/// Digital line shared between clones.
#[derive(Debug, Clone, Default)]
pub struct SimPin(Arc<AtomicBool>);

impl SimPin {
    /// New line at `high`.
    pub fn new(high: bool) -> Self {
        Self(Arc::new(AtomicBool::new(high)))
    }

    /// Current level.
    pub fn level(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Drive the line from outside.
    pub fn set_level(&self, high: bool) {
        self.0.store(high, Ordering::SeqCst);
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.set_level(false);
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.set_level(true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_set_low(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(!self.level())
    }
}

impl InputPin for SimPin {
    fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(!self.level())
    }
}

#[derive(Debug)]
struct TimerState {
    ready: AtomicBool,
    running: AtomicBool,
    half_period_ns: AtomicU32,
}

/// Pulse counter shared between clones.
#[derive(Debug, Clone)]
pub struct SimTimer(Arc<TimerState>);

impl SimTimer {
    /// Longest programmable period.
    pub const MAX_PERIOD_NS: u32 = 1_000_000_000;

    /// A ready, stopped counter.
    pub fn new() -> Self {
        Self::with_ready(true)
    }

    /// A counter whose device failed to come up.
    pub fn not_ready() -> Self {
        Self::with_ready(false)
    }

    fn with_ready(ready: bool) -> Self {
        Self(Arc::new(TimerState {
            ready: AtomicBool::new(ready),
            running: AtomicBool::new(false),
            half_period_ns: AtomicU32::new(0),
        }))
    }

    /// Programmed half period while running.
    pub fn half_period_ns(&self) -> Option<u32> {
        if self.0.running.load(Ordering::SeqCst) {
            Some(self.0.half_period_ns.load(Ordering::SeqCst))
        } else {
            None
        }
    }
}

impl Default for SimTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseTimer for SimTimer {
    type Error = Infallible;

    fn is_ready(&self) -> bool {
        self.0.ready.load(Ordering::SeqCst)
    }

    fn max_period_ns(&self) -> u32 {
        Self::MAX_PERIOD_NS
    }

    fn start(&mut self, half_period_ns: u32) -> core::result::Result<(), Infallible> {
        self.0.half_period_ns.store(half_period_ns.max(1), Ordering::SeqCst);
        self.0.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) -> core::result::Result<(), Infallible> {
        self.0.running.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Quadrature states in forward order, `(B << 1) | A`.
const GRAY_SEQUENCE: [u8; 4] = [0b00, 0b01, 0b11, 0b10];

/// Simulated valve: driver, shaft, optional hard stop and encoder.
pub struct SimPlant<'a> {
    axis: AxisId,
    shared: &'a AxisShared,
    isr: StepPulseIsr<'a, SimPin, SimPin>,
    decoder: QuadratureDecoder<'a, SimPin, SimPin>,
    timer: SimTimer,
    pulse: SimPin,
    direction: SimPin,
    enable: SimPin,
    channel_a: SimPin,
    channel_b: SimPin,
    degrees_per_step: f32,
    degrees_per_count: f32,
    reversed: bool,
    hardstop_deg: Option<f32>,
    shaft_deg: f32,
    wire_count: i32,
    now_ns: u64,
    next_trigger_ns: Option<u64>,
    scheduled_half_ns: u64,
}

impl<'a> SimPlant<'a> {
    /// Simulate one axis with its derived constants.
    pub fn new(axis: AxisId, shared: &'a AxisShared, constants: &AxisConstants) -> Self {
        let pulse = SimPin::new(false);
        let direction = SimPin::new(false);
        let channel_a = SimPin::new(false);
        let channel_b = SimPin::new(false);

        Self {
            axis,
            shared,
            isr: StepPulseIsr::new(axis, shared, pulse.clone(), direction.clone()),
            decoder: QuadratureDecoder::new(
                shared,
                channel_a.clone(),
                channel_b.clone(),
                constants.invert_encoder,
            ),
            timer: SimTimer::new(),
            pulse,
            direction,
            enable: SimPin::new(false),
            channel_a,
            channel_b,
            degrees_per_step: constants.degrees_per_step,
            degrees_per_count: constants.degrees_per_count,
            reversed: constants.invert_encoder,
            hardstop_deg: None,
            shaft_deg: 0.0,
            wire_count: 0,
            now_ns: 0,
            next_trigger_ns: None,
            scheduled_half_ns: 0,
        }
    }

    /// Simulate one axis of a configured stand.
    pub fn from_config(axis: AxisId, shared: &'a AxisShared, config: &StandConfig) -> Self {
        Self::new(axis, shared, &config.axis_constants(axis))
    }

    /// Stall the shaft once it reaches `degrees` while opening.
    pub fn with_hardstop(mut self, degrees: f32) -> Self {
        self.hardstop_deg = Some(degrees);
        self
    }

    /// Replace the counter, e.g. with [`SimTimer::not_ready`].
    pub fn with_timer(mut self, timer: SimTimer) -> Self {
        self.timer = timer;
        self
    }

    /// Build the valve axis wired to this plant.
    pub fn build_valve(&self, config: &StandConfig) -> Result<SimValve<'a>> {
        ValveAxis::builder()
            .from_config(config, self.axis)
            .shared(self.shared)
            .enable_pin(self.enable.clone())
            .timer(self.timer.clone())
            .build()
    }

    /// Run the axis bring-up against this plant's ISR and decoder.
    pub fn bring_up(&mut self, valve: &mut SimValve<'_>) -> core::result::Result<(), AxisError> {
        valve.init(&mut self.isr, &mut self.decoder)
    }

    /// Run the interrupt handlers up to `until_ns`.
    ///
    /// Reprogramming the counter restarts its period from the last advance,
    /// like a counter whose top value is rewritten.
    pub fn advance_to(&mut self, until_ns: u64) {
        loop {
            let half_period = match self.timer.half_period_ns() {
                Some(ns) => u64::from(ns),
                None => {
                    self.next_trigger_ns = None;
                    break;
                }
            };
            let next = match self.next_trigger_ns {
                Some(t) if self.scheduled_half_ns == half_period => t,
                _ => self.now_ns + half_period,
            };
            self.scheduled_half_ns = half_period;
            if next > until_ns {
                self.next_trigger_ns = Some(next);
                break;
            }

            let was_high = self.pulse.level();
            self.isr.on_trigger(next);
            if !was_high && self.pulse.level() {
                self.on_step();
            }
            self.now_ns = next;
            self.next_trigger_ns = Some(next + half_period);
        }
        self.now_ns = self.now_ns.max(until_ns);
    }

    /// Run the interrupt handlers up to `until_ms`.
    pub fn advance_to_ms(&mut self, until_ms: u32) {
        self.advance_to(u64::from(until_ms) * 1_000_000);
    }

    fn on_step(&mut self) {
        if !self.enable.level() {
            return;
        }
        let delta = if self.direction.level() {
            self.degrees_per_step
        } else {
            -self.degrees_per_step
        };
        let mut next = self.shaft_deg + delta;
        if let Some(stop) = self.hardstop_deg {
            if next > stop {
                next = stop;
            }
        }
        self.shaft_deg = next;
        self.sync_encoder();
    }

    // Walk the quadrature lines one state at a time so every edge is valid.
    fn sync_encoder(&mut self) {
        let counts = libm::roundf(self.shaft_deg / self.degrees_per_count) as i32;
        let target = if self.reversed { -counts } else { counts };

        while self.wire_count != target {
            self.wire_count += if target > self.wire_count { 1 } else { -1 };
            let state = GRAY_SEQUENCE[self.wire_count.rem_euclid(4) as usize];
            self.channel_a.set_level(state & 0b01 != 0);
            self.channel_b.set_level(state & 0b10 != 0);
            self.decoder.on_edge();
        }
    }

    /// Which valve this plant simulates.
    pub fn axis(&self) -> AxisId {
        self.axis
    }

    /// True shaft position in degrees.
    pub fn shaft_position(&self) -> f32 {
        self.shaft_deg
    }

    /// Whether the driver enable line is high.
    pub fn is_enabled(&self) -> bool {
        self.enable.level()
    }

    /// Observer for the pulse counter.
    pub fn timer(&self) -> &SimTimer {
        &self.timer
    }
}
