//! Per-tick telemetry records and the sinks they are sent to.

use heapless::spsc::Producer;
use heapless::Deque;
use serde::Serialize;

use super::calibration::CalibrationTelemetry;
use super::mode::ControllerMode;
use super::sensors::SensorSnapshot;

/// State of one valve in a telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AxisTelemetry {
    /// Position commanded this tick, if the valve was following a target.
    pub commanded: Option<f32>,
    /// Position from commanded steps, in degrees.
    pub open_loop: f32,
    /// Position from the encoder, in degrees.
    pub encoder: f32,
    /// Commanded velocity, in degrees per second.
    pub velocity: f32,
    /// Whether the driver is enabled.
    pub powered: bool,
}

/// One telemetry record, emitted after every control tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    /// Increments by one per record, including dropped ones.
    pub sequence: u32,
    /// Tick time in milliseconds.
    pub time_ms: u32,
    /// Mode after this tick's transition.
    pub mode: ControllerMode,
    /// Sensor values the tick ran with.
    pub sensors: SensorSnapshot,
    /// Fuel then oxidizer.
    pub axes: [AxisTelemetry; 2],
    /// Calibration progress, only while calibrating.
    pub calibration: Option<CalibrationTelemetry>,
    /// Records dropped so far because the sink was full.
    pub dropped_records: u32,
}

/// Non-blocking destination for telemetry records.
pub trait TelemetrySink {
    /// Queue `record`, or hand it back if there is no room.
    fn try_send(&mut self, record: TelemetryRecord) -> Result<(), TelemetryRecord>;
}

impl<const N: usize> TelemetrySink for Deque<TelemetryRecord, N> {
    fn try_send(&mut self, record: TelemetryRecord) -> Result<(), TelemetryRecord> {
        self.push_back(record)
    }
}

impl<const N: usize> TelemetrySink for Producer<'_, TelemetryRecord, N> {
    fn try_send(&mut self, record: TelemetryRecord) -> Result<(), TelemetryRecord> {
        self.enqueue(record)
    }
}
