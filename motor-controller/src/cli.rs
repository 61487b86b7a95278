//! Single-character command console. No argument parsing, no exit codes —
//! this binary runs forever on a microcontroller; `+`/`-`/`0` are the only
//! things a bench operator needs to drive a motor by hand.

use defmt::info;
use dshot_core::codec::Command;
use dshot_core::driver::{Driver, State};
use dshot_core::hal::{CaptureEngine, DirectionControl, PulseEngine};
use embassy_time::{Instant, Timer};

use crate::config::{THROTTLE_MAX, THROTTLE_MIN, THROTTLE_STEP};

pub enum Action {
    None,
    Help,
}

fn now_tick() -> u32 {
    Instant::now().as_millis() as u32
}

/// Polls `driver` to completion, yielding to the executor between polls so
/// other tasks (console/telemetry) keep running while a frame is in flight.
async fn drain_to_idle<P, D, C>(driver: &mut Driver<P, D, C>)
where
    P: PulseEngine,
    D: DirectionControl,
    C: CaptureEngine,
{
    while !driver.is_idle() {
        driver.poll(now_tick());
        Timer::after_millis(1).await;
    }
}

/// Sends BEEP1 ten times with the spec's 10-ms inter-beep spacing.
async fn run_beep<P, D, C>(driver: &mut Driver<P, D, C>)
where
    P: PulseEngine,
    D: DirectionControl,
    C: CaptureEngine,
{
    for _ in 0..10 {
        driver.send_command(Command::Beep1);
        drain_to_idle(driver).await;
        Timer::after_millis(10).await;
    }
}

/// Steps the throttle from MIN to MAX and back down by `THROTTLE_STEP`,
/// draining each frame and pausing between steps.
async fn run_ramp<P, D, C>(driver: &mut Driver<P, D, C>)
where
    P: PulseEngine,
    D: DirectionControl,
    C: CaptureEngine,
{
    info!("ramp test: start");
    let mut value = THROTTLE_MIN;
    loop {
        driver.send_throttle(value);
        drain_to_idle(driver).await;
        Timer::after_millis(20).await;
        if value >= THROTTLE_MAX {
            break;
        }
        value = (value + THROTTLE_STEP).min(THROTTLE_MAX);
    }
    loop {
        driver.send_throttle(value);
        drain_to_idle(driver).await;
        Timer::after_millis(20).await;
        if value <= THROTTLE_MIN {
            break;
        }
        value = value.saturating_sub(THROTTLE_STEP).max(THROTTLE_MIN);
    }
    info!("ramp test: done");
}

/// Applies one console byte to the running throttle setpoint and/or
/// issues a command sequence through `driver`. Returns the (possibly
/// unchanged) throttle value so the caller keeps driving `send_throttle`
/// every tick rather than only on keypresses.
pub async fn handle_byte<P, D, C>(byte: u8, throttle: u16, driver: &mut Driver<P, D, C>) -> (u16, Action)
where
    P: PulseEngine,
    D: DirectionControl,
    C: CaptureEngine,
{
    match byte {
        b'+' => {
            let next = (throttle + THROTTLE_STEP).min(THROTTLE_MAX);
            info!("throttle -> {}", next);
            (next, Action::None)
        }
        b'-' => {
            let next = throttle.saturating_sub(THROTTLE_STEP).max(THROTTLE_MIN);
            info!("throttle -> {}", next);
            (next, Action::None)
        }
        b'0' => {
            info!("throttle -> {} (snap to min)", THROTTLE_MIN);
            (THROTTLE_MIN, Action::None)
        }
        b'b' => {
            run_beep(driver).await;
            (throttle, Action::None)
        }
        b't' => {
            run_ramp(driver).await;
            (throttle, Action::None)
        }
        b's' => {
            let counters = driver.counters();
            info!(
                "state={} sent={} ok={} err={}",
                state_label(driver.state()), counters.frames_sent, counters.successes, counters.errors
            );
            (throttle, Action::None)
        }
        b'h' => (throttle, Action::Help),
        _ => (throttle, Action::None),
    }
}

pub const HELP_TEXT: &str =
    "+ raise throttle, - lower throttle, 0 snap to min, b beep x10, t ramp test, s show counters, h this help";

pub fn state_label(state: State) -> &'static str {
    match state {
        State::Idle => "idle",
        State::Sending => "sending",
        State::WaitReply => "wait_reply",
        State::Receiving => "receiving",
        State::Processing => "processing",
    }
}
