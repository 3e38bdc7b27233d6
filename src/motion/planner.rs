//! Per-tick trapezoidal velocity planning.
//!
//! Each control tick the planner picks the velocity that would reach the
//! target within one period, then limits it by acceleration and velocity.
//! Following a target that moves every tick yields a trapezoidal profile.

/// Rate limits of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionLimits {
    /// Maximum velocity in degrees per second.
    pub max_velocity: f32,
    /// Maximum acceleration in degrees per second squared.
    pub max_acceleration: f32,
    /// Control period in seconds.
    pub period_s: f32,
}

/// Output of one planning step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlannedMotion {
    /// Velocity to hold until the next tick, degrees per second.
    pub velocity: f32,
    /// Acceleration implied by the velocity change, degrees per second squared.
    pub acceleration: f32,
}

/// Plan the velocity for the next control period.
///
/// `position` is the open-loop position and `current_velocity` the velocity
/// commanded on the previous tick. A non-finite target holds position.
pub fn plan_velocity(
    target: f32,
    position: f32,
    current_velocity: f32,
    limits: &MotionLimits,
) -> PlannedMotion {
    let dt = limits.period_s;
    let a_max = limits.max_acceleration;
    let v_max = limits.max_velocity;

    let target = if target.is_finite() { target } else { position };
    let mut velocity = (target - position) / dt;

    let required_acceleration = (velocity - current_velocity) / dt;
    if required_acceleration > a_max {
        velocity = current_velocity + dt * a_max;
    } else if required_acceleration < -a_max {
        velocity = current_velocity - dt * a_max;
    }

    let velocity = velocity.clamp(-v_max, v_max);

    PlannedMotion {
        velocity,
        acceleration: (velocity - current_velocity) / dt,
    }
}

/// Pulse generator half period for a velocity.
///
/// Each timer trigger toggles the pulse line once, so one microstep takes two
/// triggers. Returns `None` for zero velocity, where the generator is paused.
pub fn half_period_ns(velocity: f32, degrees_per_step: f32) -> Option<u32> {
    let speed = velocity.abs();
    if !(speed > 0.0) || !speed.is_finite() {
        return None;
    }
    let ns = 1e9 / speed as f64 * degrees_per_step as f64 / 2.0;
    Some(if ns >= u32::MAX as f64 { u32::MAX } else { ns as u32 })
}
