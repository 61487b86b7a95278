//! Component F: the protocol state machine orchestrating A → B → (C → D →
//! E) per frame.
//!
//! The driver is generic over the three hardware traits in [`crate::hal`]
//! so it can be exercised on the host against mocks — see the integration
//! tests under `tests/` — and wired to real silicon identically.

use crate::codec::{BitTiming, Command, DShotSpeed, Frame};
use crate::gcr;
use crate::hal::{CaptureStatus, CaptureEngine, DirectionControl, PulseEngine, PulseStatus};
use crate::telemetry::{Counters, TelemetryRecord};

/// Minimum edge count the GCR reply can be decoded from (20 data bits plus
/// the dropped trailing marker would be 21 edges' worth of runs, but the
/// state machine is allowed to cut capture short once 20 bits' worth of
/// edges have arrived).
const MIN_REPLY_EDGES: usize = 20;

/// Protocol state. The unidirectional variant only ever occupies `Idle`
/// and `Sending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    Idle,
    Sending,
    WaitReply,
    Receiving,
    Processing,
}

/// Compile-time-constant configuration the driver needs, gathered in one
/// place so callers build it once at init.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub speed: DShotSpeed,
    /// Timer reference frequency in Hz.
    pub f_tck: u32,
    /// Whether this channel runs bidirectional (inverted-wire, GCR-reply)
    /// DShot, or unidirectional DShot with a separate serial telemetry
    /// source.
    pub bidirectional: bool,
    pub motor_pole_pairs: u32,
    /// Minimum ticks to wait after the command frame completes before
    /// switching to input and arming capture.
    pub reply_delay_ticks: u32,
    /// Maximum ticks to stay in `Receiving` before giving up on the reply.
    pub reply_window_ticks: u32,
}

/// The per-channel DShot driver. One instance owns one signal pin's duty
/// buffer, capture buffer, state, and telemetry.
pub struct Driver<P, D, C> {
    pulse: P,
    direction: D,
    capture: C,
    config: Config,
    state: State,
    t_ready: u32,
    telemetry: TelemetryRecord,
    counters: Counters,
    telemetry_available: bool,
}

impl<P, D, C> Driver<P, D, C>
where
    P: PulseEngine,
    D: DirectionControl,
    C: CaptureEngine,
{
    /// Builds a driver and puts the pin in output mode. Not re-entrant on
    /// the underlying peripherals; call once at init.
    pub fn new(pulse: P, mut direction: D, capture: C, config: Config) -> Self {
        direction.to_output();
        Driver {
            pulse,
            direction,
            capture,
            config,
            state: State::Idle,
            t_ready: 0,
            telemetry: TelemetryRecord::default(),
            counters: Counters::new(),
            telemetry_available: false,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn latest_telemetry(&self) -> TelemetryRecord {
        self.telemetry
    }

    /// Reads and clears the one-shot "a new GCR reply was processed" flag.
    pub fn consume_telemetry_available(&mut self) -> bool {
        let available = self.telemetry_available;
        self.telemetry_available = false;
        available
    }

    /// Requests a throttle frame (value in `[0, 2047]`, clamped). Silently
    /// ignored (returns `false`) unless idle.
    pub fn send_throttle(&mut self, value: u16) -> bool {
        let telemetry_request = self.config.bidirectional;
        self.start_send(Frame::new(value, telemetry_request))
    }

    /// Requests a command frame. Telemetry-request bit is always 0;
    /// bidirectional channels still use the inverted wire format.
    pub fn send_command(&mut self, command: Command) -> bool {
        self.start_send(Frame::from_command(command, false))
    }

    fn start_send(&mut self, frame: Frame) -> bool {
        if self.state != State::Idle {
            return false;
        }
        let timing = BitTiming::new(self.config.speed, self.config.f_tck, self.config.bidirectional);
        let duty = frame.duty_sequence(&timing);
        self.pulse.arm(&duty);
        self.counters.on_send();
        self.state = State::Sending;
        true
    }

    /// Cooperatively advances the state machine. Must be called
    /// frequently enough that `Receiving` is noticed within
    /// `reply_window_ticks` of entering it.
    pub fn poll(&mut self, now_tick: u32) {
        match self.state {
            State::Idle => {}

            State::Sending => {
                if self.pulse.poll() == PulseStatus::Complete {
                    if self.config.bidirectional {
                        self.t_ready = now_tick;
                        self.state = State::WaitReply;
                    } else {
                        // No reply channel to decode; a completed
                        // transmission is itself the success outcome.
                        self.counters.on_success();
                        self.state = State::Idle;
                    }
                }
            }

            State::WaitReply => {
                if now_tick.wrapping_sub(self.t_ready) >= self.config.reply_delay_ticks {
                    self.direction.to_input();
                    self.capture.arm();
                    self.state = State::Receiving;
                }
            }

            State::Receiving => {
                let status = self.capture.poll();
                let overrun = matches!(status, CaptureStatus::Overrun);
                let buffer_full = matches!(status, CaptureStatus::Complete { .. });
                let edges_ready = self.capture.samples().len() >= MIN_REPLY_EDGES;
                let window_elapsed =
                    now_tick.wrapping_sub(self.t_ready) >= self.config.reply_window_ticks;

                if buffer_full || overrun || edges_ready || window_elapsed {
                    self.capture.disarm();
                    self.state = State::Processing;
                }
            }

            State::Processing => {
                self.process_reply(now_tick);
                self.direction.to_output();
                self.state = State::Idle;
            }
        }
    }

    fn process_reply(&mut self, now_tick: u32) {
        let t_r = self.config.f_tck / self.config.speed.gcr_bit_rate_hz();
        let decoded = gcr::decode(
            self.capture.samples(),
            true,
            t_r,
            self.config.motor_pole_pairs,
        );
        match decoded {
            Ok(reply) => {
                self.telemetry.publish(
                    reply.rpm_electrical,
                    reply.rpm_mechanical,
                    reply.period as u32,
                    now_tick,
                );
                self.counters.on_success();
                self.telemetry_available = true;
            }
            Err(_) => {
                self.counters.on_error();
            }
        }
    }
}
