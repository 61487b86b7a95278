//! The telemetry record exposed to the caller, and the frame counters.
//!
//! Updates follow the publish order required by the single-word-atomicity
//! argument in the concurrency model: rpm fields are written first, the
//! `valid` flag is raised last, so a reader racing the main-loop update
//! observes either the prior complete record or the new one, never a torn
//! mix of the two.

/// Rotor telemetry as last decoded from either the GCR reply or the serial
/// packet, plus the raw period it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TelemetryRecord {
    pub rpm_electrical: u32,
    pub rpm_mechanical: u32,
    pub raw_period: u32,
    pub last_update_tick: u32,
    pub valid: bool,
}

impl TelemetryRecord {
    /// Publishes a new reading: writes the rpm/period fields, stamps the
    /// tick, and raises `valid` last.
    pub fn publish(&mut self, rpm_electrical: u32, rpm_mechanical: u32, raw_period: u32, now_tick: u32) {
        self.rpm_electrical = rpm_electrical;
        self.rpm_mechanical = rpm_mechanical;
        self.raw_period = raw_period;
        self.last_update_tick = now_tick;
        self.valid = true;
    }
}

/// Frame-level outcome counters: `frames_sent = successes + errors +
/// in_flight`, where `in_flight` is 0 or 1 depending on driver state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Counters {
    pub frames_sent: u32,
    pub successes: u32,
    pub errors: u32,
}

impl Counters {
    pub const fn new() -> Self {
        Counters {
            frames_sent: 0,
            successes: 0,
            errors: 0,
        }
    }

    pub fn on_send(&mut self) {
        self.frames_sent += 1;
    }

    pub fn on_success(&mut self) {
        self.successes += 1;
    }

    pub fn on_error(&mut self) {
        self.errors += 1;
    }
}
