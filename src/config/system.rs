//! Stand configuration - root configuration structure.

use serde::Deserialize;

use super::controller::{CalibrationConfig, ControllerConfig, CurveConfig};
use super::mechanical::AxisConstants;
use super::valve::ValveConfig;
use crate::valve::AxisId;

/// Root configuration structure from TOML.
///
/// Every table is optional; missing tables fall back to the stand's
/// installed hardware.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct StandConfig {
    /// Control loop timing.
    pub controller: ControllerConfig,

    /// The two throttle valves.
    pub valves: ValvesConfig,

    /// Hard stop calibration.
    pub calibration: CalibrationConfig,

    /// Closed-loop throttle curve.
    pub throttle_curve: CurveConfig,
}

/// Configuration of both valves, keyed by axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValvesConfig {
    /// Fuel valve.
    #[serde(default = "ValveConfig::fuel")]
    pub fuel: ValveConfig,

    /// Oxidizer valve.
    #[serde(default = "ValveConfig::lox")]
    pub lox: ValveConfig,
}

impl Default for ValvesConfig {
    fn default() -> Self {
        Self {
            fuel: ValveConfig::fuel(),
            lox: ValveConfig::lox(),
        }
    }
}

impl StandConfig {
    /// Get a valve configuration by axis.
    pub fn valve(&self, axis: AxisId) -> &ValveConfig {
        match axis {
            AxisId::Fuel => &self.valves.fuel,
            AxisId::Lox => &self.valves.lox,
        }
    }

    /// Derived constants for one axis.
    pub fn axis_constants(&self, axis: AxisId) -> AxisConstants {
        AxisConstants::from_config(self.valve(axis), &self.controller)
    }

    /// Abort targets for both axes, fuel first.
    pub fn safe_positions(&self) -> [f32; 2] {
        [
            self.valves.fuel.safe_position.value(),
            self.valves.lox.safe_position.value(),
        ]
    }
}
