//! Example: a full test-stand session against simulated valves.
//!
//! This example demonstrates how to:
//! - Load the stand and trace configuration from TOML
//! - Wire both valve axes to hardware (here, the `sim` module)
//! - Run the control loop with a telemetry queue
//! - Play back a sequence, abort it, and calibrate against hard stops
//!
//! Run with: `cargo run --example test_stand --features std`

use heapless::spsc::{Consumer, Producer, Queue};
use throttle_stand::controller::TelemetryRecord;
use throttle_stand::sim::{SimPlant, SimValve};
use throttle_stand::valve::{AxisId, AxisShared};
use throttle_stand::{
    parse_config, parse_trace, Command, Controller, ControllerMode, Result, SensorSnapshot,
    ValvePair,
};

const STAND_TOML: &str = r#"
[controller]
control_period_ms = 1
abort_duration_ms = 500

[valves.fuel]
invert_encoder = true
safe_position_deg = 81.0

[valves.lox]
safe_position_deg = 74.0

[calibration]
step_size_deg = 0.5
num_reps = 2
power_off_ms = 1000
"#;

const FUEL_TRACE: &str = r#"
[[segments]]
type = "linear"
length_ms = 400
start = 0.0
end = 40.0

[[segments]]
type = "sine"
length_ms = 600
offset = 40.0
amplitude = 3.0
period_ms = 200.0
"#;

const LOX_TRACE: &str = r#"
[[segments]]
type = "linear"
length_ms = 400
start = 0.0
end = 30.0

[[segments]]
type = "linear"
length_ms = 600
start = 30.0
end = 30.0
"#;

static FUEL: AxisShared = AxisShared::new();
static LOX: AxisShared = AxisShared::new();

struct Bench {
    plants: [SimPlant<'static>; 2],
    controller: Controller<SimValve<'static>, SimValve<'static>>,
    now_ms: u32,
}

impl Bench {
    fn send(&mut self, command: Command) {
        let name = command.name();
        match self.controller.handle_command(command, self.now_ms) {
            Ok(()) => println!("[{:>5} ms] {}: ok", self.now_ms, name),
            Err(msg) => println!("[{:>5} ms] {}: {}", self.now_ms, name, msg),
        }
    }

    fn run<const N: usize>(
        &mut self,
        ticks: u32,
        sensors: &SensorSnapshot,
        tx: &mut Producer<'_, TelemetryRecord, N>,
        rx: &mut Consumer<'_, TelemetryRecord, N>,
    ) {
        for _ in 0..ticks {
            for plant in &mut self.plants {
                plant.advance_to_ms(self.now_ms);
            }
            self.controller.tick(self.now_ms, sensors, &mut *tx);
            self.now_ms += 1;

            while let Some(record) = rx.dequeue() {
                if record.time_ms % 100 == 0 {
                    print_record(&record);
                }
            }
        }
    }
}

fn print_record(record: &TelemetryRecord) {
    let [fuel, lox] = record.axes;
    print!(
        "[{:>5} ms] {:<20} fuel {:>7.3}/{:>7.3} deg  lox {:>7.3}/{:>7.3} deg",
        record.time_ms,
        record.mode.to_string(),
        fuel.open_loop,
        fuel.encoder,
        lox.open_loop,
        lox.encoder,
    );
    if let Some(cal) = record.calibration {
        print!("  {:?} rep {}", cal.phase, cal.rep_counter);
    }
    println!();
}

fn main() -> Result<()> {
    println!("=== Throttle Stand Session ===\n");

    let config = parse_config(STAND_TOML)?;
    let fuel_trace = parse_trace(FUEL_TRACE)?;
    let lox_trace = parse_trace(LOX_TRACE)?;

    // The valves stall at their mechanical stops.
    let mut fuel_plant =
        SimPlant::from_config(AxisId::Fuel, &FUEL, &config).with_hardstop(90.0);
    let mut lox_plant = SimPlant::from_config(AxisId::Lox, &LOX, &config).with_hardstop(85.0);

    let mut fuel = fuel_plant.build_valve(&config)?;
    let mut lox = lox_plant.build_valve(&config)?;
    fuel_plant.bring_up(&mut fuel)?;
    lox_plant.bring_up(&mut lox)?;

    let mut bench = Bench {
        plants: [fuel_plant, lox_plant],
        controller: Controller::new(ValvePair::new(fuel, lox), &config)?,
        now_ms: 0,
    };

    let mut queue: Queue<TelemetryRecord, 8> = Queue::new();
    let (mut tx, mut rx) = queue.split();
    let no_feedback = SensorSnapshot::default();

    println!("--- Sequence ---");
    bench.send(Command::StartSequence);
    bench.send(Command::LoadMotionTrace {
        axis: 0,
        trace: fuel_trace,
    });
    bench.send(Command::LoadMotionTrace {
        axis: 1,
        trace: lox_trace,
    });
    bench.send(Command::StartSequence);
    bench.run(700, &no_feedback, &mut tx, &mut rx);

    println!("\n--- Abort ---");
    bench.send(Command::Halt);
    bench.run(600, &no_feedback, &mut tx, &mut rx);

    println!("\n--- Closed loop ---");
    bench.send(Command::StartClosedLoop);
    bench.run(300, &SensorSnapshot::with_feedback(180.0), &mut tx, &mut rx);
    // The transducer drops out and the controller aborts.
    bench.run(600, &no_feedback, &mut tx, &mut rx);

    println!("\n--- Calibration ---");
    bench.send(Command::StartCalibration);
    while bench.controller.mode() == ControllerMode::Calibration && bench.now_ms < 20_000 {
        bench.run(1, &no_feedback, &mut tx, &mut rx);
    }

    let cal = bench.controller.calibration();
    println!(
        "\nHard stops: fuel {:.3} deg, lox {:.3} deg after {} repetitions",
        cal.hardstop[0], cal.hardstop[1], cal.rep_counter
    );
    println!(
        "Dropped telemetry records: {}",
        bench.controller.dropped_records()
    );

    Ok(())
}
