//! Controller module for throttle-stand.
//!
//! The [`Controller`] runs once per control period. It asks the active
//! [`OperatingMode`] for a [`ControllerOutput`], switches modes when the
//! output asks for it, applies the axis commands to both valves and emits a
//! telemetry record. Modes are pure, so every bit of hardware I/O happens
//! here.
//!
//! Operator commands arrive through [`Controller::handle_command`], the one
//! place where error reports are rendered into messages.

mod abort;
mod calibration;
mod closed_loop;
mod command;
mod curve;
mod idle;
mod mode;
mod output;
mod sensors;
mod sequence;
mod telemetry;

pub use abort::AbortMode;
pub use calibration::{CalibrationMode, CalibrationPhase, CalibrationTelemetry};
pub use closed_loop::ClosedLoopMode;
pub use command::Command;
pub use curve::ThrottleCurve;
pub use idle::IdleMode;
pub use mode::{AxisReading, ControllerMode, OperatingMode, TickContext};
pub use output::{AxisCommand, ControllerOutput};
pub use sensors::SensorSnapshot;
pub use sequence::SequenceMode;
pub use telemetry::{AxisTelemetry, TelemetryRecord, TelemetrySink};

use crate::config::StandConfig;
use crate::error::{CommandError, Result};
use crate::report::{ErrorMessage, Report, ResultExt};
use crate::trace::{MotionTrace, Trace};
use crate::valve::{AxisId, Valve, ValvePair};

/// State of every operating mode. Only the active one is ticked.
struct Modes {
    idle: IdleMode,
    sequence: SequenceMode,
    abort: AbortMode,
    closed_loop: ClosedLoopMode,
    calibration: CalibrationMode,
}

impl Modes {
    fn get_mut(&mut self, mode: ControllerMode) -> &mut dyn OperatingMode {
        match mode {
            ControllerMode::Idle => &mut self.idle,
            ControllerMode::Sequence => &mut self.sequence,
            ControllerMode::Abort => &mut self.abort,
            ControllerMode::ClosedLoopThrottle => &mut self.closed_loop,
            ControllerMode::Calibration => &mut self.calibration,
        }
    }
}

/// Top-level state machine of the stand.
pub struct Controller<F: Valve, L: Valve> {
    valves: ValvePair<F, L>,
    traces: [Trace; 2],
    modes: Modes,
    mode: ControllerMode,
    sequence: u32,
    dropped_records: u32,
}

impl<F: Valve, L: Valve> Controller<F, L> {
    /// Create a controller in Idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured throttle curve is invalid.
    pub fn new(valves: ValvePair<F, L>, config: &StandConfig) -> Result<Self> {
        let curve = ThrottleCurve::from_config(&config.throttle_curve)?;
        Ok(Self {
            valves,
            traces: [Trace::new(), Trace::new()],
            modes: Modes {
                idle: IdleMode,
                sequence: SequenceMode::default(),
                abort: AbortMode::new(
                    config.safe_positions(),
                    config.controller.abort_duration_ms,
                ),
                closed_loop: ClosedLoopMode::new(curve),
                calibration: CalibrationMode::new(config.calibration.clone()),
            },
            mode: ControllerMode::Idle,
            sequence: 0,
            dropped_records: 0,
        })
    }

    /// Run one control tick at `now_ms`.
    pub fn tick<S>(&mut self, now_ms: u32, sensors: &SensorSnapshot, sink: &mut S)
    where
        S: TelemetrySink + ?Sized,
    {
        let axes = [self.reading(AxisId::Fuel), self.reading(AxisId::Lox)];
        let out = {
            let mut ctx = TickContext {
                now_ms,
                sensors,
                axes,
                traces: &mut self.traces,
            };
            self.modes.get_mut(self.mode).tick(&mut ctx)
        };

        self.change_mode(out.next_state, now_ms);

        for axis in AxisId::ALL {
            self.valves.get_mut(axis).apply(out.commands[axis.index()]);
        }
        if let Some(positions) = out.rebase {
            for axis in AxisId::ALL {
                if self.valves.get_mut(axis).reset_pos(positions[axis.index()]).is_err() {
                    warn!("{} valve: rebase skipped, axis not stopped", axis);
                }
            }
        }

        self.emit_telemetry(now_ms, sensors, &out, sink);
    }

    fn reading(&self, axis: AxisId) -> AxisReading {
        let valve = self.valves.get(axis);
        AxisReading {
            open_loop: valve.open_loop_position(),
            encoder: valve.encoder_position(),
        }
    }

    fn axis_telemetry(&self, axis: AxisId, command: AxisCommand) -> AxisTelemetry {
        let valve = self.valves.get(axis);
        AxisTelemetry {
            commanded: command.target(),
            open_loop: valve.open_loop_position(),
            encoder: valve.encoder_position(),
            velocity: valve.velocity(),
            powered: valve.is_powered(),
        }
    }

    fn emit_telemetry<S>(
        &mut self,
        now_ms: u32,
        sensors: &SensorSnapshot,
        out: &ControllerOutput,
        sink: &mut S,
    ) where
        S: TelemetrySink + ?Sized,
    {
        let record = TelemetryRecord {
            sequence: self.sequence,
            time_ms: now_ms,
            mode: self.mode,
            sensors: *sensors,
            axes: [
                self.axis_telemetry(AxisId::Fuel, out.commands[0]),
                self.axis_telemetry(AxisId::Lox, out.commands[1]),
            ],
            calibration: (self.mode == ControllerMode::Calibration)
                .then(|| self.modes.calibration.telemetry()),
            dropped_records: self.dropped_records,
        };
        self.sequence = self.sequence.wrapping_add(1);

        if sink.try_send(record).is_err() {
            self.dropped_records = self.dropped_records.saturating_add(1);
            warn!(
                "telemetry sink full, {} records dropped",
                self.dropped_records
            );
        }
    }

    // Re-entering the active mode is a no-op, which makes halt idempotent.
    fn change_mode(&mut self, next: ControllerMode, now_ms: u32) {
        if next == self.mode {
            return;
        }
        info!("mode {} -> {}", self.mode, next);
        self.modes.get_mut(self.mode).end();
        self.mode = next;
        self.modes.get_mut(next).init(now_ms);
    }

    fn require_mode(
        &self,
        allowed: &[ControllerMode],
        command: &'static str,
    ) -> core::result::Result<(), Report> {
        if allowed.contains(&self.mode) {
            Ok(())
        } else {
            Err(CommandError::NotAllowed {
                mode: self.mode,
                command,
            }
            .into())
        }
    }

    /// Validate and load a trace for one valve.
    ///
    /// Rejected while a sequence is playing. A trace that fails validation
    /// leaves the previous one loaded.
    pub fn load_motion_trace(
        &mut self,
        axis: AxisId,
        trace: &MotionTrace,
    ) -> core::result::Result<(), Report> {
        if self.mode == ControllerMode::Sequence {
            return Err(CommandError::NotAllowed {
                mode: self.mode,
                command: "load a motion trace",
            }
            .into());
        }
        let label = match axis {
            AxisId::Fuel => "invalid fuel trace",
            AxisId::Lox => "invalid lox trace",
        };
        self.traces[axis.index()].load(trace).context(label)
    }

    /// Start playing back both traces from `now_ms`.
    pub fn start_sequence(&mut self, now_ms: u32) -> core::result::Result<(), Report> {
        self.require_mode(&[ControllerMode::Idle], "start a sequence")?;
        for axis in AxisId::ALL {
            if !self.traces[axis.index()].is_loaded() {
                return Err(CommandError::TraceMissing(axis).into());
            }
        }
        self.change_mode(ControllerMode::Sequence, now_ms);
        Ok(())
    }

    /// Abort. Allowed in every mode, and a no-op while already aborting.
    pub fn halt(&mut self, now_ms: u32) {
        self.change_mode(ControllerMode::Abort, now_ms);
    }

    /// Start closed-loop throttling.
    pub fn start_closed_loop(&mut self, now_ms: u32) -> core::result::Result<(), Report> {
        self.require_mode(&[ControllerMode::Idle], "start closed loop throttle")?;
        self.change_mode(ControllerMode::ClosedLoopThrottle, now_ms);
        Ok(())
    }

    /// Start hard stop calibration.
    pub fn start_calibration(&mut self, now_ms: u32) -> core::result::Result<(), Report> {
        self.require_mode(&[ControllerMode::Idle], "start calibration")?;
        self.change_mode(ControllerMode::Calibration, now_ms);
        Ok(())
    }

    /// Rebase one valve's position estimates. Only allowed from Idle.
    pub fn reset_valve_position(
        &mut self,
        axis: AxisId,
        degrees: f32,
    ) -> core::result::Result<(), Report> {
        self.require_mode(&[ControllerMode::Idle], "reset a valve position")?;
        info!("resetting {} valve position to {} deg", axis, degrees);
        self.valves
            .get_mut(axis)
            .reset_pos(degrees)
            .context(format_args!("cannot reset {} valve", axis))
    }

    /// Switch modes through the matching start command.
    ///
    /// Idle is reachable from Idle, closed loop throttle and calibration.
    /// A running sequence or abort can only end on its own or through halt.
    pub fn set_mode(&mut self, mode: ControllerMode, now_ms: u32) -> core::result::Result<(), Report> {
        match mode {
            ControllerMode::Idle => {
                self.require_mode(
                    &[
                        ControllerMode::Idle,
                        ControllerMode::ClosedLoopThrottle,
                        ControllerMode::Calibration,
                    ],
                    "return to idle",
                )?;
                self.change_mode(ControllerMode::Idle, now_ms);
                Ok(())
            }
            ControllerMode::Sequence => self.start_sequence(now_ms),
            ControllerMode::Abort => {
                self.halt(now_ms);
                Ok(())
            }
            ControllerMode::ClosedLoopThrottle => self.start_closed_loop(now_ms),
            ControllerMode::Calibration => self.start_calibration(now_ms),
        }
    }

    /// Handle one operator command.
    ///
    /// # Errors
    ///
    /// Returns the rendered error message when the command is rejected.
    /// Rejected commands change nothing.
    pub fn handle_command(
        &mut self,
        command: Command,
        now_ms: u32,
    ) -> core::result::Result<(), ErrorMessage> {
        let name = command.name();
        let result = match command {
            Command::LoadMotionTrace { axis, trace } => AxisId::from_selector(axis)
                .map_err(Report::from)
                .and_then(|axis| self.load_motion_trace(axis, &trace)),
            Command::StartSequence => self.start_sequence(now_ms),
            Command::Halt => {
                self.halt(now_ms);
                Ok(())
            }
            Command::StartClosedLoop => self.start_closed_loop(now_ms),
            Command::StartCalibration => self.start_calibration(now_ms),
            Command::ResetValvePosition { axis, degrees } => AxisId::from_selector(axis)
                .map_err(Report::from)
                .and_then(|axis| self.reset_valve_position(axis, degrees)),
            Command::SetMode(mode) => self.set_mode(mode, now_ms),
        };

        result.map_err(|report| {
            warn!("{} rejected", name);
            report.build_message()
        })
    }

    /// Active mode.
    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    /// Both valves.
    pub fn valves(&self) -> &ValvePair<F, L> {
        &self.valves
    }

    /// Both valves, mutably.
    pub fn valves_mut(&mut self) -> &mut ValvePair<F, L> {
        &mut self.valves
    }

    /// Trace engine of one valve.
    pub fn trace(&self, axis: AxisId) -> &Trace {
        &self.traces[axis.index()]
    }

    /// Calibration progress.
    pub fn calibration(&self) -> CalibrationTelemetry {
        self.modes.calibration.telemetry()
    }

    /// Sequence number of the next telemetry record.
    pub fn next_sequence(&self) -> u32 {
        self.sequence
    }

    /// Telemetry records dropped so far.
    pub fn dropped_records(&self) -> u32 {
        self.dropped_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AxisError;
    use crate::trace::TraceBuilder;
    use heapless::Deque;

    /// Valve that follows its target exactly.
    #[derive(Debug, Default)]
    struct IdealValve {
        position: f32,
        powered: bool,
        stopped: bool,
    }

    impl Valve for IdealValve {
        fn tick(&mut self, enabled: bool, hold_position: bool, target: f32) {
            self.powered = enabled;
            self.stopped = enabled && !hold_position;
            if enabled && hold_position {
                self.position = target;
            }
        }

        fn reset_pos(&mut self, degrees: f32) -> core::result::Result<(), AxisError> {
            if !self.stopped {
                return Err(AxisError::NotStopped(AxisId::Fuel));
            }
            self.position = degrees;
            Ok(())
        }

        fn open_loop_position(&self) -> f32 {
            self.position
        }

        fn encoder_position(&self) -> f32 {
            self.position
        }

        fn velocity(&self) -> f32 {
            0.0
        }

        fn is_powered(&self) -> bool {
            self.powered
        }

        fn is_stopped(&self) -> bool {
            self.stopped
        }
    }

    type Sink = Deque<TelemetryRecord, 8>;

    fn controller() -> Controller<IdealValve, IdealValve> {
        let valves = ValvePair::new(IdealValve::default(), IdealValve::default());
        match Controller::new(valves, &StandConfig::default()) {
            Ok(c) => c,
            Err(e) => panic!("{}", e),
        }
    }

    fn ramp() -> MotionTrace {
        TraceBuilder::new()
            .linear(1000, 0.0, 50.0)
            .hold(1000, 50.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_abort_window() {
        let mut c = controller();
        let mut sink = Sink::new();

        c.halt(1000);
        c.tick(1000, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.mode(), ControllerMode::Abort);
        assert_eq!(c.valves().fuel.position, 81.0);
        assert_eq!(c.valves().lox.position, 74.0);

        c.tick(1499, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.mode(), ControllerMode::Abort);
        c.tick(1501, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.mode(), ControllerMode::Idle);
    }

    #[test]
    fn test_halt_while_aborting_keeps_entry_time() {
        let mut c = controller();
        let mut sink = Sink::new();

        c.halt(1000);
        c.halt(1400);
        c.tick(1501, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.mode(), ControllerMode::Idle);
    }

    #[test]
    fn test_sequence_needs_both_traces() {
        let mut c = controller();
        assert!(c.load_motion_trace(AxisId::Fuel, &ramp()).is_ok());

        let msg = c.handle_command(Command::StartSequence, 0).unwrap_err();
        assert_eq!(msg.as_str(), "command rejected: no lox trace loaded");
        assert_eq!(c.mode(), ControllerMode::Idle);
    }

    #[test]
    fn test_sequence_plays_and_finishes() {
        let mut c = controller();
        let mut sink = Sink::new();
        for axis in AxisId::ALL {
            assert!(c.load_motion_trace(axis, &ramp()).is_ok());
        }

        assert_eq!(c.handle_command(Command::StartSequence, 100), Ok(()));
        c.tick(600, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.valves().fuel.position, 25.0);

        let msg = c
            .handle_command(Command::LoadMotionTrace { axis: 0, trace: ramp() }, 601)
            .unwrap_err();
        assert_eq!(
            msg.as_str(),
            "command rejected: cannot load a motion trace while in sequence mode"
        );

        c.tick(2100, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.mode(), ControllerMode::Idle);
        assert!(c.valves().fuel.stopped);
    }

    #[test]
    fn test_invalid_trace_is_labeled_and_keeps_previous() {
        let mut c = controller();
        assert!(c.load_motion_trace(AxisId::Lox, &ramp()).is_ok());

        let mut bad = ramp();
        bad.segments[1] = crate::trace::Segment::linear(1000, 1000, 60.0, 60.0);
        let msg = c
            .handle_command(Command::LoadMotionTrace { axis: 1, trace: bad }, 0)
            .unwrap_err();
        // The long root cause keeps its head and tail.
        assert!(msg.starts_with("trace error: segment 2's start is  [...] d at 50"));
        assert!(msg.ends_with("but this one started at 60: invalid lox trace"));
        assert_eq!(c.trace(AxisId::Lox).total_time_ms(), Some(2000));
    }

    #[test]
    fn test_bad_selector_rejected() {
        let mut c = controller();
        let msg = c
            .handle_command(Command::ResetValvePosition { axis: 2, degrees: 0.0 }, 0)
            .unwrap_err();
        assert_eq!(
            msg.as_str(),
            "command rejected: invalid valve selector (must be fuel or lox) `2`"
        );
    }

    #[test]
    fn test_reset_only_from_idle() {
        let mut c = controller();
        let mut sink = Sink::new();
        c.tick(0, &SensorSnapshot::default(), &mut sink);

        assert_eq!(
            c.handle_command(Command::ResetValvePosition { axis: 1, degrees: 12.0 }, 1),
            Ok(())
        );
        assert_eq!(c.valves().lox.position, 12.0);

        c.halt(2);
        let msg = c
            .handle_command(Command::ResetValvePosition { axis: 1, degrees: 0.0 }, 3)
            .unwrap_err();
        assert_eq!(
            msg.as_str(),
            "command rejected: cannot reset a valve position while in abort mode"
        );
    }

    #[test]
    fn test_closed_loop_feedback_loss_aborts() {
        let mut c = controller();
        let mut sink = Sink::new();
        assert_eq!(c.handle_command(Command::SetMode(ControllerMode::ClosedLoopThrottle), 0), Ok(()));

        c.tick(1, &SensorSnapshot::with_feedback(300.0), &mut sink);
        assert_eq!(c.valves().fuel.position, 75.0);
        assert_eq!(c.valves().lox.position, 75.0);

        c.tick(2, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.mode(), ControllerMode::Abort);
        c.tick(3, &SensorSnapshot::default(), &mut sink);
        assert_eq!(c.valves().fuel.position, 81.0);
    }

    #[test]
    fn test_idle_only_from_interruptible_modes() {
        let mut c = controller();
        assert_eq!(c.set_mode(ControllerMode::Calibration, 0).map_err(|r| r.build_message()), Ok(()));
        assert_eq!(c.set_mode(ControllerMode::Idle, 1).map_err(|r| r.build_message()), Ok(()));

        c.halt(2);
        let msg = c.handle_command(Command::SetMode(ControllerMode::Idle), 3).unwrap_err();
        assert_eq!(msg.as_str(), "command rejected: cannot return to idle while in abort mode");
    }

    #[test]
    fn test_telemetry_drop_is_counted() {
        let mut c = controller();
        let mut sink: Deque<TelemetryRecord, 2> = Deque::new();
        for t in 0..4 {
            c.tick(t, &SensorSnapshot::default(), &mut sink);
        }
        assert_eq!(c.dropped_records(), 2);
        assert_eq!(c.next_sequence(), 4);
        assert_eq!(sink.back().map(|r| r.sequence), Some(1));
    }

    #[test]
    fn test_calibration_telemetry_only_while_calibrating() {
        let mut c = controller();
        let mut sink = Sink::new();
        c.tick(0, &SensorSnapshot::default(), &mut sink);
        assert_eq!(sink.back().and_then(|r| r.calibration), None);

        assert_eq!(c.handle_command(Command::StartCalibration, 1), Ok(()));
        c.tick(1, &SensorSnapshot::default(), &mut sink);
        let cal = sink.back().and_then(|r| r.calibration);
        assert_eq!(cal.map(|t| t.phase), Some(CalibrationPhase::SeekHardstop));
    }
}
