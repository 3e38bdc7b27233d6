//! Trace validation and sampling.

use core::f32::consts::TAU;

use heapless::Vec;

use crate::error::TraceError;

use super::segment::{MotionTrace, SegmentKind, MAX_SEGMENTS};

/// Boundary values of adjacent segments must agree within this.
pub const CONTINUITY_EPSILON: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Linear {
        start: f32,
        end: f32,
    },
    Sine {
        offset: f32,
        amplitude: f32,
        period_ms: f32,
        phase_rad: f32,
    },
}

/// Validated segment with its phase already in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Compiled {
    start_ms: u32,
    length_ms: u32,
    shape: Shape,
}

impl Compiled {
    fn value_at(&self, segment_time_ms: f32) -> f32 {
        match self.shape {
            Shape::Linear { start, end } => {
                start + (end - start) * (segment_time_ms / self.length_ms as f32)
            }
            Shape::Sine {
                offset,
                amplitude,
                period_ms,
                phase_rad,
            } => offset + amplitude * libm::sinf(segment_time_ms / period_ms * TAU + phase_rad),
        }
    }

    #[inline]
    fn contains(&self, time_ms: u32) -> bool {
        time_ms >= self.start_ms && time_ms - self.start_ms < self.length_ms
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Loaded {
    total_time_ms: u32,
    segments: Vec<Compiled, MAX_SEGMENTS>,
}

/// Trace engine for one valve.
///
/// Holds at most one validated trace. A failed [`load`](Self::load) leaves
/// the previous trace in place.
#[derive(Debug, Clone, Default)]
pub struct Trace {
    loaded: Option<Loaded>,
    last_used_segment_index: usize,
}

impl Trace {
    /// Create an engine with no trace loaded.
    pub const fn new() -> Self {
        Self {
            loaded: None,
            last_used_segment_index: 0,
        }
    }

    /// Whether a valid trace is loaded.
    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Duration of the loaded trace.
    pub fn total_time_ms(&self) -> Option<u32> {
        self.loaded.as_ref().map(|l| l.total_time_ms)
    }

    /// Validate `trace` and make it the active trace.
    ///
    /// # Errors
    ///
    /// Returns the first violation found, checked in order: zero total time,
    /// no segments, then per segment sine parameters, contiguity, zero length
    /// and value continuity, and finally the declared total.
    pub fn load(&mut self, trace: &MotionTrace) -> Result<(), TraceError> {
        if trace.total_time_ms == 0 {
            return Err(TraceError::ZeroTotalTime);
        }
        if trace.segments.is_empty() {
            return Err(TraceError::NoSegments);
        }

        let mut compiled: Vec<Compiled, MAX_SEGMENTS> = Vec::new();
        let mut prev_end: u32 = 0;
        let mut prev_end_value = 0.0f32;

        for (i, seg) in trace.segments.iter().enumerate() {
            let number = i + 1;
            let shape = match seg.kind {
                SegmentKind::Linear { start, end } => Shape::Linear { start, end },
                SegmentKind::Sine {
                    offset,
                    amplitude,
                    period_ms,
                    phase_deg,
                } => {
                    // Negated comparisons also reject NaN.
                    if !(amplitude >= 0.0) {
                        return Err(TraceError::NegativeAmplitude {
                            segment: number,
                            amplitude,
                        });
                    }
                    if !(period_ms > 0.0) {
                        return Err(TraceError::NonPositivePeriod {
                            segment: number,
                            period: period_ms,
                        });
                    }
                    Shape::Sine {
                        offset,
                        amplitude,
                        period_ms,
                        phase_rad: phase_deg / 360.0 * TAU,
                    }
                }
            };

            if seg.start_ms != prev_end {
                return Err(TraceError::NonContiguous {
                    segment: number,
                    expected_ms: prev_end,
                });
            }
            if seg.length_ms == 0 {
                return Err(TraceError::ZeroLength { segment: number });
            }

            let c = Compiled {
                start_ms: seg.start_ms,
                length_ms: seg.length_ms,
                shape,
            };

            if i > 0 {
                let start = c.value_at(0.0);
                if !((start - prev_end_value).abs() <= CONTINUITY_EPSILON) {
                    return Err(TraceError::Discontinuous {
                        segment: number,
                        previous_end: prev_end_value,
                        start,
                    });
                }
            }
            prev_end_value = c.value_at(c.length_ms as f32);
            prev_end = prev_end.saturating_add(c.length_ms);

            // Cannot overflow: the source holds at most MAX_SEGMENTS.
            let _ = compiled.push(c);
        }

        if trace.total_time_ms != prev_end {
            return Err(TraceError::TotalTimeMismatch {
                expected_ms: prev_end,
                declared_ms: trace.total_time_ms,
            });
        }

        self.loaded = Some(Loaded {
            total_time_ms: trace.total_time_ms,
            segments: compiled,
        });
        self.last_used_segment_index = 0;
        Ok(())
    }

    /// Sample the loaded trace at `time_ms` since the trace start.
    ///
    /// Times before the start sample the first instant and times past the end
    /// sample the final instant. NaN samples as time zero.
    ///
    /// # Errors
    ///
    /// Returns `TraceError::NotLoaded` if no valid trace is loaded.
    pub fn sample(&mut self, time_ms: f32) -> Result<f32, TraceError> {
        let loaded = self.loaded.as_ref().ok_or(TraceError::NotLoaded)?;

        let total = loaded.total_time_ms;
        let time = if time_ms.is_nan() {
            0.0
        } else {
            time_ms.clamp(0.0, total as f32)
        };
        // Segment lookup uses whole milliseconds so boundaries never round
        // into the wrong segment.
        let time_trunc = (libm::floorf(time) as u32).min(total - 1);

        let n = loaded.segments.len();
        for i in 0..n {
            let index = (self.last_used_segment_index + i) % n;
            let seg = &loaded.segments[index];
            if seg.contains(time_trunc) {
                self.last_used_segment_index = index;
                return Ok(seg.value_at(time - seg.start_ms as f32));
            }
        }

        Err(TraceError::SegmentNotFound(time_trunc))
    }
}
