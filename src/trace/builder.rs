//! Trace builder for programmatic trace creation.

use heapless::Vec;

use crate::error::TraceError;

use super::segment::{MotionTrace, Segment, MAX_SEGMENTS};

/// Builder that lays segments end to end.
///
/// Start times are filled in from the running total, so traces built this
/// way are always contiguous. Value continuity is still checked at load.
///
/// ```rust
/// use throttle_stand::trace::TraceBuilder;
///
/// let trace = TraceBuilder::new()
///     .linear(1000, 0.0, 50.0)
///     .hold(1000, 50.0)
///     .build()
///     .unwrap();
/// assert_eq!(trace.total_time_ms, 2000);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TraceBuilder {
    segments: Vec<Segment, MAX_SEGMENTS>,
    cursor_ms: u32,
    total_time_ms: Option<u32>,
    overflowed: bool,
}

impl TraceBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a linear ramp.
    pub fn linear(self, length_ms: u32, start: f32, end: f32) -> Self {
        let seg = Segment::linear(self.cursor_ms, length_ms, start, end);
        self.push(seg)
    }

    /// Append a constant value.
    pub fn hold(self, length_ms: u32, value: f32) -> Self {
        self.linear(length_ms, value, value)
    }

    /// Append a sine segment.
    pub fn sine(
        self,
        length_ms: u32,
        offset: f32,
        amplitude: f32,
        period_ms: f32,
        phase_deg: f32,
    ) -> Self {
        let seg = Segment::sine(
            self.cursor_ms,
            length_ms,
            offset,
            amplitude,
            period_ms,
            phase_deg,
        );
        self.push(seg)
    }

    /// Declare a total time instead of using the segment sum.
    pub fn total_time_ms(mut self, total_ms: u32) -> Self {
        self.total_time_ms = Some(total_ms);
        self
    }

    fn push(mut self, segment: Segment) -> Self {
        if self.segments.push(segment).is_err() {
            self.overflowed = true;
        }
        self.cursor_ms = segment.end_ms();
        self
    }

    /// Build the trace.
    ///
    /// # Errors
    ///
    /// Returns `TraceError::TooManySegments` if more than [`MAX_SEGMENTS`]
    /// segments were appended.
    pub fn build(self) -> Result<MotionTrace, TraceError> {
        if self.overflowed {
            return Err(TraceError::TooManySegments);
        }
        Ok(MotionTrace {
            total_time_ms: self.total_time_ms.unwrap_or(self.cursor_ms),
            segments: self.segments,
        })
    }
}
