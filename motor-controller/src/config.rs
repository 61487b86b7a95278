//! Compile-time configuration surface (spec: no environment or persisted
//! state). One motor channel; the design scales to more by replication,
//! not by a config list.

use dshot_core::DShotSpeed;
use dshot_core::driver::Config as DriverConfig;

/// DShot wire speed for the single motor channel this binary drives.
pub const DSHOT_SPEED: DShotSpeed = DShotSpeed::DShot600;

/// Timer reference frequency feeding the pulse/capture engine, in Hz.
pub const TIMER_HZ: u32 = 168_000_000;

/// Whether this build talks bidirectional (GCR-reply) DShot or
/// unidirectional DShot with a separate serial telemetry receiver.
pub const BIDIRECTIONAL: bool = cfg!(feature = "bidirectional");

pub const MOTOR_POLE_PAIRS: u32 = 7;

/// Reply-delay / reply-window, expressed in the main loop's tick unit
/// (nominally 1ms — see `dshot_core::hal::Ticker`).
pub const REPLY_DELAY_TICKS: u32 = 1;
pub const REPLY_WINDOW_TICKS: u32 = 2;

pub const THROTTLE_MIN: u16 = 48;
pub const THROTTLE_MAX: u16 = 2047;
pub const THROTTLE_STEP: u16 = 50;

pub fn driver_config() -> DriverConfig {
    DriverConfig {
        speed: DSHOT_SPEED,
        f_tck: TIMER_HZ,
        bidirectional: BIDIRECTIONAL,
        motor_pole_pairs: MOTOR_POLE_PAIRS,
        reply_delay_ticks: REPLY_DELAY_TICKS,
        reply_window_ticks: REPLY_WINDOW_TICKS,
    }
}

pub mod pins {
    //! Board wiring is an external collaborator per the core's scope, but a
    //! demo binary needs concrete pins to build against.
    pub const SIGNAL_PIN: u8 = 15;
    pub const TELEMETRY_UART_RX_PIN: u8 = 5;
    pub const CONSOLE_UART_RX_PIN: u8 = 1;
}
