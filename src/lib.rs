//! # throttle-stand
//!
//! Fail-safe throttle valve sequencing for a liquid-propellant test stand,
//! with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Per-valve motion control**: trapezoidal velocity planning, step pulse
//!   generation and quadrature decoding for each throttle valve
//! - **Operating modes**: Idle, Sequence, Abort, closed-loop throttle and hard
//!   stop calibration, run by a fixed-period dispatcher
//! - **Motion traces**: validated piecewise linear/sine profiles
//! - **Heapless error reports**: bounded context stacks rendered into a
//!   fixed-size message
//! - **no_std compatible**: core library works without standard library
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use throttle_stand::{Controller, StandConfig, ValveAxis, ValvePair};
//! use throttle_stand::valve::{AxisId, AxisShared};
//!
//! static FUEL: AxisShared = AxisShared::new();
//! static LOX: AxisShared = AxisShared::new();
//!
//! let config: StandConfig = throttle_stand::load_config("stand.toml")?;
//!
//! let fuel = ValveAxis::builder()
//!     .from_config(&config, AxisId::Fuel)
//!     .shared(&FUEL)
//!     .enable_pin(fuel_enable)
//!     .timer(fuel_counter)
//!     .build()?;
//! let lox = /* same for the oxidizer valve */;
//!
//! let mut controller = Controller::new(ValvePair::new(fuel, lox), &config)?;
//!
//! // Every control period:
//! controller.tick(now_ms, &sensors, &mut telemetry_producer);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): enables file I/O, TOML parsing and the `sim` module
//! - `defmt`: enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[macro_use]
mod fmt;

// Core modules
pub mod config;
pub mod controller;
pub mod error;
pub mod motion;
pub mod report;
pub mod trace;
pub mod valve;

#[cfg(feature = "std")]
pub mod sim;

// Re-exports for ergonomic API
pub use config::{validate_config, StandConfig, ValveConfig};
pub use controller::{Command, Controller, ControllerMode, SensorSnapshot, TelemetryRecord};
pub use error::{Error, Result};
pub use motion::Direction;
pub use report::{ErrorMessage, Report};
pub use trace::{MotionTrace, Trace, TraceBuilder};
pub use valve::{ValveAxis, ValvePair};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config, parse_trace};

// Unit types
pub use config::units::{Degrees, DegreesPerSec, DegreesPerSecSquared, Microsteps};
