//! State shared between a valve axis and its interrupt handlers.

use core::fmt;
use core::sync::atomic::{AtomicI32, AtomicU32, Ordering};

use serde::Serialize;

use crate::error::CommandError;

/// Identity of a physical valve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AxisId {
    /// Fuel valve.
    Fuel,
    /// Liquid oxygen valve.
    Lox,
}

impl AxisId {
    /// Both axes, fuel first.
    pub const ALL: [AxisId; 2] = [AxisId::Fuel, AxisId::Lox];

    /// Index into per-axis arrays.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            AxisId::Fuel => 0,
            AxisId::Lox => 1,
        }
    }

    /// Decode a wire selector (`0` = fuel, `1` = lox).
    pub fn from_selector(raw: u8) -> Result<Self, CommandError> {
        match raw {
            0 => Ok(AxisId::Fuel),
            1 => Ok(AxisId::Lox),
            other => Err(CommandError::InvalidAxis(other)),
        }
    }
}

impl fmt::Display for AxisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AxisId::Fuel => "fuel",
            AxisId::Lox => "lox",
        })
    }
}

/// Counters of one axis that interrupt handlers write.
///
/// Every field has exactly one writer outside of a stopped-axis rebase:
/// the step pulse ISR owns `step_count` and `pulse_interval_ns`, the encoder
/// ISR owns `encoder_count`, and the control task owns `velocity`. Only
/// atomic loads and stores are used, so the type also works on cores
/// without read-modify-write atomics.
///
/// A rebase races the encoder ISR's load-then-store: if the shaft is still
/// moving when `reset_pos` writes `encoder_count`, the write can be lost.
///
/// ```rust
/// use throttle_stand::valve::AxisShared;
///
/// static FUEL: AxisShared = AxisShared::new();
/// FUEL.set_velocity(-12.5);
/// assert_eq!(FUEL.velocity(), -12.5);
/// ```
#[derive(Debug, Default)]
pub struct AxisShared {
    step_count: AtomicI32,
    encoder_count: AtomicI32,
    velocity_bits: AtomicU32,
    pulse_interval_ns: AtomicU32,
}

impl AxisShared {
    /// All counters zero.
    pub const fn new() -> Self {
        Self {
            step_count: AtomicI32::new(0),
            encoder_count: AtomicI32::new(0),
            velocity_bits: AtomicU32::new(0),
            pulse_interval_ns: AtomicU32::new(0),
        }
    }

    /// Open-loop microstep count.
    #[inline]
    pub fn step_count(&self) -> i32 {
        self.step_count.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_step_count(&self, steps: i32) {
        self.step_count.store(steps, Ordering::Release);
    }

    /// Decoded encoder count.
    #[inline]
    pub fn encoder_count(&self) -> i32 {
        self.encoder_count.load(Ordering::Acquire)
    }

    #[inline]
    pub(crate) fn set_encoder_count(&self, counts: i32) {
        self.encoder_count.store(counts, Ordering::Release);
    }

    /// Commanded velocity in degrees per second.
    #[inline]
    pub fn velocity(&self) -> f32 {
        f32::from_bits(self.velocity_bits.load(Ordering::Acquire))
    }

    /// Publish the commanded velocity to the pulse ISR.
    #[inline]
    pub fn set_velocity(&self, velocity: f32) {
        self.velocity_bits.store(velocity.to_bits(), Ordering::Release);
    }

    /// Measured time between the last two pulse triggers.
    #[inline]
    pub fn pulse_interval_ns(&self) -> u32 {
        self.pulse_interval_ns.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn set_pulse_interval_ns(&self, ns: u32) {
        self.pulse_interval_ns.store(ns, Ordering::Relaxed);
    }
}
