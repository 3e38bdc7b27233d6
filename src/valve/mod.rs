//! Valve module for throttle-stand.
//!
//! Provides the per-valve motion controller, the step pulse and encoder
//! interrupt handlers, and the counters they share.

mod axis;
mod builder;
mod encoder;
mod pulse;
mod shared;

pub use axis::{AxisState, Valve, ValveAxis, ValvePair};
pub use builder::ValveAxisBuilder;
pub use encoder::QuadratureDecoder;
pub use pulse::{PulseTimer, StepPulseIsr};
pub use shared::{AxisId, AxisShared};
