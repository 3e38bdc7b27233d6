//! Integration tests for throttle-stand.
//!
//! These run the controller against simulated valves: every tick the pulse
//! and encoder interrupt handlers are driven up to the tick time before the
//! controller reads positions and reprograms the pulse counters.

mod unit;

use heapless::Deque;
use throttle_stand::controller::{CalibrationPhase, TelemetryRecord};
use throttle_stand::error::AxisError;
use throttle_stand::sim::{SimPlant, SimTimer, SimValve};
use throttle_stand::valve::{AxisId, AxisShared};
use throttle_stand::{
    Command, Controller, ControllerMode, SensorSnapshot, StandConfig, TraceBuilder, ValvePair,
};

// =============================================================================
// Simulated stand
// =============================================================================

struct Stand<'a> {
    plants: [SimPlant<'a>; 2],
    controller: Controller<SimValve<'a>, SimValve<'a>>,
    telemetry: Deque<TelemetryRecord, 4>,
    now_ms: u32,
}

impl<'a> Stand<'a> {
    fn new(config: &StandConfig, shared: &'a [AxisShared; 2]) -> Self {
        Self::with_plants(
            config,
            SimPlant::from_config(AxisId::Fuel, &shared[0], config),
            SimPlant::from_config(AxisId::Lox, &shared[1], config),
        )
    }

    fn with_hardstops(config: &StandConfig, shared: &'a [AxisShared; 2], stops: [f32; 2]) -> Self {
        Self::with_plants(
            config,
            SimPlant::from_config(AxisId::Fuel, &shared[0], config).with_hardstop(stops[0]),
            SimPlant::from_config(AxisId::Lox, &shared[1], config).with_hardstop(stops[1]),
        )
    }

    fn with_plants(config: &StandConfig, mut fuel_plant: SimPlant<'a>, mut lox_plant: SimPlant<'a>) -> Self {
        let mut fuel = fuel_plant.build_valve(config).unwrap();
        let mut lox = lox_plant.build_valve(config).unwrap();
        fuel_plant.bring_up(&mut fuel).unwrap();
        lox_plant.bring_up(&mut lox).unwrap();

        Self {
            plants: [fuel_plant, lox_plant],
            controller: Controller::new(ValvePair::new(fuel, lox), config).unwrap(),
            telemetry: Deque::new(),
            now_ms: 0,
        }
    }

    fn command(&mut self, command: Command) {
        let name = command.name();
        if let Err(msg) = self.controller.handle_command(command, self.now_ms) {
            panic!("{} rejected: {}", name, msg);
        }
    }

    /// Advance the hardware to the next tick, run it and return its record.
    fn step(&mut self, sensors: &SensorSnapshot) -> TelemetryRecord {
        for plant in &mut self.plants {
            plant.advance_to_ms(self.now_ms);
        }
        self.controller.tick(self.now_ms, sensors, &mut self.telemetry);
        self.now_ms += 1;
        self.telemetry.pop_front().expect("one record per tick")
    }

    fn step_n(&mut self, ticks: u32, sensors: &SensorSnapshot) -> TelemetryRecord {
        let mut last = self.step(sensors);
        for _ in 1..ticks {
            last = self.step(sensors);
        }
        last
    }

    fn open_loop(&self) -> [f32; 2] {
        let valves = self.controller.valves();
        [valves.fuel.open_loop_position(), valves.lox.open_loop_position()]
    }

    fn encoder(&self) -> [f32; 2] {
        let valves = self.controller.valves();
        [valves.fuel.encoder_position(), valves.lox.encoder_position()]
    }
}

fn assert_near(actual: [f32; 2], expected: [f32; 2], tolerance: f32) {
    for i in 0..2 {
        assert!(
            (actual[i] - expected[i]).abs() <= tolerance,
            "axis {}: {} is not within {} of {}",
            i,
            actual[i],
            tolerance,
            expected[i]
        );
    }
}

fn ramp_traces(stand: &mut Stand<'_>) {
    let fuel = TraceBuilder::new().linear(1000, 0.0, 20.0).build().unwrap();
    let lox = TraceBuilder::new().linear(1000, 0.0, 10.0).build().unwrap();
    stand.command(Command::LoadMotionTrace { axis: 0, trace: fuel });
    stand.command(Command::LoadMotionTrace { axis: 1, trace: lox });
}

// =============================================================================
// Bring-up
// =============================================================================

#[test]
fn test_bring_up_enables_drivers() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let stand = Stand::new(&config, &shared);

    assert!(stand.plants.iter().all(|p| p.is_enabled()));
    assert_eq!(stand.controller.mode(), ControllerMode::Idle);
    assert_eq!(stand.open_loop(), [0.0, 0.0]);
}

#[test]
fn test_bring_up_fails_without_counter() {
    let config = StandConfig::default();
    let shared = AxisShared::new();
    let mut plant =
        SimPlant::from_config(AxisId::Lox, &shared, &config).with_timer(SimTimer::not_ready());
    let mut valve = plant.build_valve(&config).unwrap();

    assert_eq!(
        plant.bring_up(&mut valve),
        Err(AxisError::TimerNotReady(AxisId::Lox))
    );
    assert!(!plant.is_enabled());
}

// =============================================================================
// Sequence playback
// =============================================================================

#[test]
fn test_sequence_follows_traces_then_idles() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);
    let none = SensorSnapshot::default();

    ramp_traces(&mut stand);
    stand.command(Command::StartSequence);

    stand.step_n(500, &none);
    let halfway = stand.step(&none);
    assert_eq!(halfway.time_ms, 500);
    assert_eq!(halfway.mode, ControllerMode::Sequence);
    assert!((halfway.axes[0].commanded.unwrap() - 10.0).abs() < 1e-3);
    assert!((halfway.axes[1].commanded.unwrap() - 5.0).abs() < 1e-3);
    assert_near(stand.open_loop(), [10.0, 5.0], 0.3);

    let last = stand.step_n(499, &none);
    assert_eq!(last.time_ms, 999);
    assert_eq!(last.mode, ControllerMode::Sequence);

    let end = stand.step(&none);
    assert_eq!(end.mode, ControllerMode::Idle);
    assert_eq!(end.axes[0].commanded, None);

    assert_near(stand.open_loop(), [20.0, 10.0], 0.3);
    assert_near(stand.encoder(), stand.open_loop(), 0.05);
    assert_near(
        [stand.plants[0].shaft_position(), stand.plants[1].shaft_position()],
        stand.open_loop(),
        0.05,
    );
}

#[test]
fn test_sequence_rejects_trace_reload() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);

    ramp_traces(&mut stand);
    stand.command(Command::StartSequence);
    stand.step_n(10, &SensorSnapshot::default());

    let trace = TraceBuilder::new().linear(100, 0.0, 1.0).build().unwrap();
    let msg = stand
        .controller
        .handle_command(Command::LoadMotionTrace { axis: 0, trace }, stand.now_ms)
        .unwrap_err();
    assert_eq!(
        msg.as_str(),
        "command rejected: cannot load a motion trace while in sequence mode"
    );
    assert_eq!(stand.controller.trace(AxisId::Fuel).total_time_ms(), Some(1000));
}

#[test]
fn test_sequence_needs_both_traces() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);

    let fuel = TraceBuilder::new().linear(1000, 0.0, 20.0).build().unwrap();
    stand.command(Command::LoadMotionTrace { axis: 0, trace: fuel });

    let msg = stand
        .controller
        .handle_command(Command::StartSequence, 0)
        .unwrap_err();
    assert_eq!(msg.as_str(), "command rejected: no lox trace loaded");
    assert_eq!(stand.controller.mode(), ControllerMode::Idle);
}

// =============================================================================
// Abort
// =============================================================================

#[test]
fn test_halt_drives_to_safe_positions_for_abort_window() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);
    let none = SensorSnapshot::default();

    ramp_traces(&mut stand);
    stand.command(Command::StartSequence);
    stand.step_n(200, &none);

    assert_eq!(stand.now_ms, 200);
    stand.command(Command::Halt);
    assert_eq!(stand.controller.mode(), ControllerMode::Abort);

    // Halt again is a no-op and does not restart the window.
    stand.step_n(100, &none);
    stand.command(Command::Halt);

    let last = stand.step_n(401, &none);
    assert_eq!(last.time_ms, 700);
    assert_eq!(last.mode, ControllerMode::Abort);
    assert_eq!(last.axes[0].commanded, Some(81.0));
    assert_near(stand.open_loop(), config.safe_positions(), 0.3);

    let done = stand.step(&none);
    assert_eq!(done.time_ms, 701);
    assert_eq!(done.mode, ControllerMode::Idle);
    assert_near(stand.encoder(), config.safe_positions(), 0.3);
}

// =============================================================================
// Closed-loop throttle
// =============================================================================

#[test]
fn test_closed_loop_tracks_curve_and_aborts_on_feedback_loss() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);

    stand.command(Command::StartClosedLoop);
    let record = stand.step_n(200, &SensorSnapshot::with_feedback(200.0));
    assert_eq!(record.mode, ControllerMode::ClosedLoopThrottle);
    assert_near(stand.open_loop(), [50.0, 50.0], 0.3);

    let record = stand.step_n(200, &SensorSnapshot::with_feedback(150.0));
    assert_eq!(record.axes[1].commanded, Some(37.5));
    assert_near(stand.open_loop(), [37.5, 37.5], 0.3);

    let lost = stand.step(&SensorSnapshot::default());
    assert_eq!(lost.mode, ControllerMode::Abort);
    assert_eq!(lost.axes[0].commanded, None);
    assert_eq!(lost.axes[0].velocity, 0.0);

    let record = stand.step_n(300, &SensorSnapshot::default());
    assert_eq!(record.mode, ControllerMode::Abort);
    assert_near(stand.open_loop(), config.safe_positions(), 0.3);
}

#[test]
fn test_closed_loop_returns_to_idle_on_request() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);

    stand.command(Command::StartClosedLoop);
    stand.step_n(50, &SensorSnapshot::with_feedback(100.0));
    stand.command(Command::SetMode(ControllerMode::Idle));

    let record = stand.step(&SensorSnapshot::with_feedback(100.0));
    assert_eq!(record.mode, ControllerMode::Idle);
    assert_eq!(record.axes[0].velocity, 0.0);
}

// =============================================================================
// Calibration
// =============================================================================

#[test]
fn test_calibration_finds_hard_stops_and_power_cycles() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let stops = [5.0, 3.0];
    let mut stand = Stand::with_hardstops(&config, &shared, stops);
    let none = SensorSnapshot::default();

    stand.command(Command::StartCalibration);

    let mut phases: Vec<CalibrationPhase> = Vec::new();
    let mut unpowered_ticks = 0;
    let mut completed = false;
    for _ in 0..10_000 {
        let record = stand.step(&none);
        if !stand.plants[0].is_enabled() && !stand.plants[1].is_enabled() {
            unpowered_ticks += 1;
        }
        match record.calibration {
            Some(cal) => {
                if phases.last() != Some(&cal.phase) {
                    phases.push(cal.phase);
                }
            }
            None => {
                assert_eq!(record.mode, ControllerMode::Idle);
                completed = true;
                break;
            }
        }
    }

    assert!(completed, "calibration did not finish, phases: {:?}", phases);
    assert_eq!(
        phases,
        [
            CalibrationPhase::SeekHardstop,
            CalibrationPhase::BackOff,
            CalibrationPhase::SeekHardstop,
            CalibrationPhase::EndMovement,
            CalibrationPhase::PowerOff,
            CalibrationPhase::Repower,
            CalibrationPhase::Complete,
        ]
    );
    assert_eq!(unpowered_ticks, config.calibration.power_off_ms);
    assert!(stand.plants.iter().all(|p| p.is_enabled()));

    let result = stand.controller.calibration();
    assert_eq!(result.rep_counter, config.calibration.num_reps);
    assert_near(result.hardstop, stops, 0.05);

    // Both axes were rebased onto the latched stops.
    assert_near(stand.encoder(), result.hardstop, 1e-3);
    assert_near(stand.open_loop(), result.hardstop, 0.05);
}

#[test]
fn test_reset_position_only_from_idle() {
    let config = StandConfig::default();
    let shared = [AxisShared::new(), AxisShared::new()];
    let mut stand = Stand::new(&config, &shared);
    let none = SensorSnapshot::default();

    stand.step(&none);
    stand.command(Command::ResetValvePosition {
        axis: 1,
        degrees: 4.995,
    });
    assert_near(stand.open_loop(), [0.0, 4.995], 1e-3);

    stand.command(Command::StartCalibration);
    stand.step(&none);
    let msg = stand
        .controller
        .handle_command(
            Command::ResetValvePosition {
                axis: 0,
                degrees: 1.0,
            },
            stand.now_ms,
        )
        .unwrap_err();
    assert!(msg.ends_with("cannot reset a valve position while in calibration mode"));

    let msg = stand
        .controller
        .handle_command(
            Command::ResetValvePosition {
                axis: 4,
                degrees: 1.0,
            },
            stand.now_ms,
        )
        .unwrap_err();
    assert_eq!(
        msg.as_str(),
        "command rejected: invalid valve selector (must be fuel or lox) `4`"
    );
}
