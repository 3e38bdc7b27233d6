//! Motion trace definitions.
//!
//! A [`MotionTrace`] is what an operator uploads: a list of timed segments
//! for one valve. It is plain data; [`Trace::load`](super::Trace::load)
//! decides whether it is valid.

use heapless::Vec;

/// Maximum number of segments in one trace.
pub const MAX_SEGMENTS: usize = 32;

/// Shape of one trace segment.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SegmentKind {
    /// Straight line from `start` to `end` degrees over the segment.
    Linear {
        /// Value at the segment start
        start: f32,
        /// Value at the segment end
        end: f32,
    },
    /// `offset + amplitude * sin(2π t / period + phase)`.
    Sine {
        /// Center value in degrees
        offset: f32,
        /// Peak deviation in degrees, non-negative
        amplitude: f32,
        /// Period in milliseconds, positive
        period_ms: f32,
        /// Phase in degrees
        phase_deg: f32,
    },
}

/// One timed segment of a trace.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    /// Start time relative to the trace start.
    pub start_ms: u32,
    /// Duration, non-zero.
    pub length_ms: u32,
    /// Segment shape.
    pub kind: SegmentKind,
}

impl Segment {
    /// Linear segment.
    pub const fn linear(start_ms: u32, length_ms: u32, start: f32, end: f32) -> Self {
        Self {
            start_ms,
            length_ms,
            kind: SegmentKind::Linear { start, end },
        }
    }

    /// Sine segment.
    pub const fn sine(
        start_ms: u32,
        length_ms: u32,
        offset: f32,
        amplitude: f32,
        period_ms: f32,
        phase_deg: f32,
    ) -> Self {
        Self {
            start_ms,
            length_ms,
            kind: SegmentKind::Sine {
                offset,
                amplitude,
                period_ms,
                phase_deg,
            },
        }
    }

    /// Time this segment ends, relative to the trace start.
    #[inline]
    pub fn end_ms(&self) -> u32 {
        self.start_ms.saturating_add(self.length_ms)
    }
}

/// A motion profile for one valve, as uploaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MotionTrace {
    /// Declared duration; must equal the sum of segment lengths.
    pub total_time_ms: u32,
    /// Segments in time order.
    pub segments: Vec<Segment, MAX_SEGMENTS>,
}

impl MotionTrace {
    /// Create a trace from a declared duration and segments.
    pub fn new(total_time_ms: u32, segments: Vec<Segment, MAX_SEGMENTS>) -> Self {
        Self {
            total_time_ms,
            segments,
        }
    }

    /// Sum of segment lengths.
    pub fn segment_time_ms(&self) -> u32 {
        self.segments
            .iter()
            .fold(0u32, |acc, s| acc.saturating_add(s.length_ms))
    }
}
