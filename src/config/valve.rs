//! Per-valve configuration from TOML.

use serde::Deserialize;

use super::units::{Degrees, DegreesPerSec, DegreesPerSecSquared, Microsteps};

/// Complete configuration of one throttle valve axis.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ValveConfig {
    /// Base motor steps per revolution (200 for 1.8° motors).
    #[serde(default = "default_steps_per_revolution")]
    pub steps_per_revolution: u16,

    /// Driver microstep setting.
    #[serde(default)]
    pub microsteps: Microsteps,

    /// Gearbox reduction between motor and valve shaft.
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f32,

    /// Quadrature encoder counts per motor revolution (all four edges).
    #[serde(default = "default_encoder_cpr")]
    pub encoder_cpr: u32,

    /// Maximum valve velocity in degrees per second.
    #[serde(rename = "max_velocity_deg_per_sec", default = "default_max_velocity")]
    pub max_velocity: DegreesPerSec,

    /// Maximum valve acceleration in degrees per second squared.
    #[serde(
        rename = "max_acceleration_deg_per_sec2",
        default = "default_max_acceleration"
    )]
    pub max_acceleration: DegreesPerSecSquared,

    /// Encoder wiring is reversed; decoded deltas are subtracted.
    #[serde(default)]
    pub invert_encoder: bool,

    /// Nominal position the valve is driven to during an abort.
    #[serde(rename = "safe_position_deg")]
    pub safe_position: Degrees,
}

fn default_steps_per_revolution() -> u16 {
    200
}

fn default_gear_ratio() -> f32 {
    5.0
}

fn default_encoder_cpr() -> u32 {
    4000
}

fn default_max_velocity() -> DegreesPerSec {
    DegreesPerSec(900.0)
}

fn default_max_acceleration() -> DegreesPerSecSquared {
    DegreesPerSecSquared(480_000.0)
}

impl ValveConfig {
    /// Fuel valve as installed on the stand. Its encoder is wired reversed.
    pub fn fuel() -> Self {
        Self {
            invert_encoder: true,
            safe_position: Degrees(81.0),
            ..Self::stand_valve()
        }
    }

    /// Oxidizer valve as installed on the stand.
    pub fn lox() -> Self {
        Self {
            invert_encoder: false,
            safe_position: Degrees(74.0),
            ..Self::stand_valve()
        }
    }

    fn stand_valve() -> Self {
        Self {
            steps_per_revolution: default_steps_per_revolution(),
            microsteps: Microsteps::EIGHTH,
            gear_ratio: default_gear_ratio(),
            encoder_cpr: default_encoder_cpr(),
            max_velocity: default_max_velocity(),
            max_acceleration: default_max_acceleration(),
            invert_encoder: false,
            safe_position: Degrees(0.0),
        }
    }

    /// Microsteps per valve shaft revolution (steps × microsteps × gear_ratio).
    pub fn steps_per_valve_revolution(&self) -> f32 {
        self.steps_per_revolution as f32 * self.microsteps.value() as f32 * self.gear_ratio
    }

    /// Encoder counts per valve shaft revolution.
    pub fn counts_per_valve_revolution(&self) -> f32 {
        self.encoder_cpr as f32 * self.gear_ratio
    }
}
