//! Configuration module for throttle-stand.
//!
//! Provides types for loading and validating valve, controller, calibration
//! and throttle curve configuration from TOML files (with `std` feature) or
//! from the built-in stand defaults.

mod controller;
mod mechanical;
mod system;
pub mod units;
mod valve;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use controller::{
    CalibrationConfig, ControllerConfig, CurveConfig, MAX_CURVE_POINTS,
};
pub use mechanical::AxisConstants;
pub use system::{StandConfig, ValvesConfig};
pub use validation::{validate_config, validate_curve};
pub use valve::ValveConfig;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config, parse_trace};

// Re-export unit types at config level
pub use units::{Degrees, DegreesPerSec, DegreesPerSecSquared, Microsteps};
