//! End-to-end tests driving the public API with host-side mock HAL
//! implementations, exercising the same scenarios spec'd in worked
//! examples: command framing, GCR telemetry round-trip, and serial
//! telemetry reassembly.

use dshot_core::codec::{Command, FRAME_SLOTS};
use dshot_core::driver::{Config, Driver, State};
use dshot_core::hal::{CaptureEngine, CaptureStatus, DirectionControl, PinMode, PulseEngine, PulseStatus};
use dshot_core::serial::{crc8, SerialTelemetryParser};
use dshot_core::{DShotSpeed, Frame};

struct ImmediatePulse;
impl PulseEngine for ImmediatePulse {
    fn arm(&mut self, _duty: &[u32; FRAME_SLOTS]) {}
    fn poll(&mut self) -> PulseStatus {
        PulseStatus::Complete
    }
}

struct TrackingDirection(PinMode);
impl DirectionControl for TrackingDirection {
    fn mode(&self) -> PinMode {
        self.0
    }
    fn set_mode(&mut self, mode: PinMode) {
        self.0 = mode;
    }
}

struct FixtureCapture {
    edges: Vec<u16>,
}
impl CaptureEngine for FixtureCapture {
    const MAX_SAMPLES: usize = 32;
    fn arm(&mut self) {}
    fn poll(&mut self) -> CaptureStatus {
        CaptureStatus::Complete { count: self.edges.len() }
    }
    fn disarm(&mut self) {}
    fn samples(&self) -> &[u16] {
        &self.edges
    }
}

fn config(bidirectional: bool) -> Config {
    Config {
        speed: DShotSpeed::DShot600,
        f_tck: 168_000_000,
        bidirectional,
        motor_pole_pairs: 14,
        reply_delay_ticks: 1,
        reply_window_ticks: 2,
    }
}

#[test]
fn motor_stop_round_trip_through_command_api() {
    let frame = Frame::from_command(Command::MotorStop, false);
    let decoded = Frame::from_raw(frame.raw()).expect("valid crc");
    assert_eq!(decoded.value(), 0);
    assert_eq!(decoded.telemetry_request(), false);
}

#[test]
fn unidirectional_send_command_reaches_idle_with_one_poll() {
    let mut driver = Driver::new(
        ImmediatePulse,
        TrackingDirection(PinMode::Output),
        FixtureCapture { edges: vec![] },
        config(false),
    );
    assert!(driver.send_command(Command::Beep1));
    driver.poll(0);
    assert!(driver.is_idle());
    assert_eq!(driver.counters().frames_sent, 1);
    assert_eq!(driver.counters().successes, 1);
}

#[test]
fn bidirectional_reply_produces_valid_telemetry() {
    // Same ideal-edge fixture as the gcr module's worked example: period =
    // 0x0C4, crc = 0x8.
    let edges = vec![1000, 1448, 1896, 3016, 3240, 3912, 4136, 4808, 5032, 5256, 5704];
    let mut driver = Driver::new(
        ImmediatePulse,
        TrackingDirection(PinMode::Output),
        FixtureCapture { edges },
        config(true),
    );

    assert!(driver.send_throttle(1046));
    driver.poll(0); // Sending -> WaitReply
    assert_eq!(driver.state(), State::WaitReply);
    driver.poll(10); // WaitReply -> Receiving
    assert_eq!(driver.state(), State::Receiving);
    driver.poll(11); // Receiving -> Processing
    driver.poll(12); // Processing -> Idle

    assert!(driver.is_idle());
    let telemetry = driver.latest_telemetry();
    assert!(telemetry.valid);
    assert_eq!(telemetry.raw_period, 0x0C4);
    assert_eq!(telemetry.rpm_electrical, 60_000_000 / 0x0C4);
}

#[test]
fn serial_scenario_matches_worked_example() {
    let fields = [0x2Au8, 0x05, 0xC8, 0x00, 0xFA, 0x00, 0x7F, 0x00, 0x64];
    let crc = crc8(&fields);

    let mut parser = SerialTelemetryParser::new();
    for (i, &byte) in fields.iter().chain([crc].iter()).enumerate() {
        parser.feed_byte(byte, i as u32);
    }

    let telemetry = parser.consume_new_data().expect("valid packet");
    assert_eq!(telemetry.temperature_c, 42);
    assert_eq!(telemetry.voltage_cv, 1480);
    assert_eq!(telemetry.current_ca, 250);
    assert_eq!(telemetry.consumption_mah, 127);
    assert_eq!(telemetry.rpm_mechanical(14), 1428);
}
