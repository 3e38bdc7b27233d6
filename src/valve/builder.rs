//! Builder pattern for ValveAxis.

use embedded_hal::digital::OutputPin;

use crate::config::{AxisConstants, StandConfig};
use crate::error::{AxisError, Result};

use super::axis::ValveAxis;
use super::pulse::PulseTimer;
use super::shared::{AxisId, AxisShared};

/// Builder for creating ValveAxis instances.
pub struct ValveAxisBuilder<'a, ENA, T>
where
    ENA: OutputPin,
    T: PulseTimer,
{
    id: Option<AxisId>,
    shared: Option<&'a AxisShared>,
    enable: Option<ENA>,
    timer: Option<T>,
    constants: Option<AxisConstants>,
}

impl<ENA, T> Default for ValveAxisBuilder<'_, ENA, T>
where
    ENA: OutputPin,
    T: PulseTimer,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, ENA, T> ValveAxisBuilder<'a, ENA, T>
where
    ENA: OutputPin,
    T: PulseTimer,
{
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            id: None,
            shared: None,
            enable: None,
            timer: None,
            constants: None,
        }
    }

    /// Set which valve this axis drives.
    pub fn id(mut self, id: AxisId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the counters shared with the interrupt handlers.
    pub fn shared(mut self, shared: &'a AxisShared) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Set the driver enable pin.
    pub fn enable_pin(mut self, pin: ENA) -> Self {
        self.enable = Some(pin);
        self
    }

    /// Set the pulse counter.
    pub fn timer(mut self, timer: T) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Set derived axis constants directly.
    pub fn constants(mut self, constants: AxisConstants) -> Self {
        self.constants = Some(constants);
        self
    }

    /// Configure id and constants from the stand configuration.
    pub fn from_config(mut self, config: &StandConfig, id: AxisId) -> Self {
        self.id = Some(id);
        self.constants = Some(config.axis_constants(id));
        self
    }

    /// Build the ValveAxis.
    ///
    /// # Errors
    ///
    /// Returns [`AxisError::Missing`] naming the first part not provided.
    pub fn build(self) -> Result<ValveAxis<'a, ENA, T>> {
        let id = self.id.ok_or(AxisError::Missing("axis id"))?;
        let shared = self.shared.ok_or(AxisError::Missing("shared counters"))?;
        let enable = self.enable.ok_or(AxisError::Missing("enable pin"))?;
        let timer = self.timer.ok_or(AxisError::Missing("pulse timer"))?;
        let constants = self
            .constants
            .ok_or(AxisError::Missing("axis constants"))?;

        Ok(ValveAxis::new(id, shared, enable, timer, constants))
    }
}
