#![no_std]
//! Hardware-agnostic core of a DShot ESC driver.
//!
//! This crate builds DShot command frames, encodes them to a duty-value
//! sequence for a PWM-compare timer driven by DMA, runs the half-duplex
//! pin-direction state machine needed for bidirectional DShot, decodes the
//! GCR-coded telemetry reply into an rpm value, and parses the separate
//! KISS/BLHeli32 asynchronous-serial telemetry frame used by unidirectional
//! installs.
//!
//! What this crate does **not** do: bring up clocks/PLLs, wire interrupt
//! vectors, touch vendor peripheral registers, or provide a CLI. Those are
//! the caller's concern. This crate only asks for three things, each
//! expressed as a trait in [`hal`]: a monotonic tick source, a PWM timer
//! with DMA-driven compare updates and DMA-driven input capture on the same
//! channel, and a GPIO whose mode can be flipped between compare-output and
//! pulled-up input-capture at runtime.

pub mod codec;
pub mod driver;
pub mod gcr;
pub mod hal;
pub mod serial;
pub mod telemetry;

pub use codec::{Command, DShotSpeed, Frame};
pub use driver::{Driver, State};
pub use serial::SerialTelemetryParser;
pub use telemetry::TelemetryRecord;

/// Errors surfaced at construction / HAL-adapter boundaries.
///
/// Per-frame wire failures (CRC mismatch, capture underrun, serial timeout)
/// are deliberately **not** part of this type: they are observable only
/// through [`telemetry::TelemetryRecord`] and the driver's counters, so a
/// malformed reply never interrupts the caller's update cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "thiserror", derive(thiserror_no_std::Error))]
pub enum Error {
    /// A command code outside the 0-47 DShot command range was requested.
    #[cfg_attr(
        feature = "thiserror",
        error("command code {0} is out of the 0-47 range")
    )]
    InvalidCommand(u16),
}
