//! Sensor values consumed by the controller.

use serde::Serialize;

/// Sensor readings for one control tick.
///
/// Refreshed by the acquisition task before every tick and read-only to the
/// controller. The default snapshot has no feedback.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorSnapshot {
    /// Whether the feedback transducer produced a reading.
    pub has_feedback: bool,
    /// Feedback chamber pressure.
    pub feedback_pressure: f32,
}

impl SensorSnapshot {
    /// Snapshot with a valid feedback reading.
    pub fn with_feedback(pressure: f32) -> Self {
        Self {
            has_feedback: true,
            feedback_pressure: pressure,
        }
    }
}
