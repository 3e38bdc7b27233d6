//! Motion module for throttle-stand.
//!
//! Provides the per-tick velocity planner and step direction handling.

mod planner;

pub use planner::{half_period_ns, plan_velocity, MotionLimits, PlannedMotion};

/// Direction of valve travel, as driven on the DIR line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Opening (DIR high, step count increases).
    Opening,
    /// Closing (DIR low, step count decreases).
    Closing,
}

impl Direction {
    /// Direction for a signed velocity, `None` when stationary.
    #[inline]
    pub fn from_velocity(velocity: f32) -> Option<Self> {
        if velocity > 0.0 {
            Some(Direction::Opening)
        } else if velocity < 0.0 {
            Some(Direction::Closing)
        } else {
            None
        }
    }

    /// Direction driven by a DIR line level.
    #[inline]
    pub fn from_line(high: bool) -> Self {
        if high {
            Direction::Opening
        } else {
            Direction::Closing
        }
    }

    /// Step count change per pulse.
    #[inline]
    pub fn sign(self) -> i32 {
        match self {
            Direction::Opening => 1,
            Direction::Closing => -1,
        }
    }
}
