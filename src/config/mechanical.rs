//! Per-axis constants derived from valve configuration.

use super::controller::ControllerConfig;
use super::valve::ValveConfig;

/// Derived parameters of one valve axis.
///
/// Computed once at bring-up and used by the planner, the pulse ISR and the
/// position accessors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisConstants {
    /// Valve degrees per microstep.
    pub degrees_per_step: f32,

    /// Valve degrees per encoder count.
    pub degrees_per_count: f32,

    /// Maximum velocity in degrees per second.
    pub max_velocity: f32,

    /// Maximum acceleration in degrees per second squared.
    pub max_acceleration: f32,

    /// Control loop period in seconds.
    pub control_period_s: f32,

    /// Encoder deltas are subtracted instead of added.
    pub invert_encoder: bool,

    /// Abort target in degrees.
    pub safe_position: f32,
}

impl AxisConstants {
    /// Compute axis constants from valve and controller configuration.
    pub fn from_config(valve: &ValveConfig, controller: &ControllerConfig) -> Self {
        Self {
            degrees_per_step: 360.0 / valve.steps_per_valve_revolution(),
            degrees_per_count: 360.0 / valve.counts_per_valve_revolution(),
            max_velocity: valve.max_velocity.value(),
            max_acceleration: valve.max_acceleration.value(),
            control_period_s: controller.control_period_s(),
            invert_encoder: valve.invert_encoder,
            safe_position: valve.safe_position.value(),
        }
    }

    /// Open-loop position of a step count.
    #[inline]
    pub fn steps_to_degrees(&self, steps: i32) -> f32 {
        steps as f32 * self.degrees_per_step
    }

    /// Nearest step count for a position.
    #[inline]
    pub fn degrees_to_steps(&self, degrees: f32) -> i32 {
        libm::roundf(degrees / self.degrees_per_step) as i32
    }

    /// Measured position of an encoder count.
    #[inline]
    pub fn counts_to_degrees(&self, counts: i32) -> f32 {
        counts as f32 * self.degrees_per_count
    }

    /// Nearest encoder count for a position.
    #[inline]
    pub fn degrees_to_counts(&self, degrees: f32) -> i32 {
        libm::roundf(degrees / self.degrees_per_count) as i32
    }
}
