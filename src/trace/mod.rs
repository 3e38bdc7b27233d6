//! Motion traces.
//!
//! Operators upload one [`MotionTrace`] per valve. The [`Trace`] engine
//! validates it as a whole and samples it by elapsed time during a sequence.

mod builder;
mod engine;
mod segment;

pub use builder::TraceBuilder;
pub use engine::{Trace, CONTINUITY_EPSILON};
pub use segment::{MotionTrace, Segment, SegmentKind, MAX_SEGMENTS};
