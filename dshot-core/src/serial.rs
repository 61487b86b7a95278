//! Component G: the KISS/BLHeli32 serial telemetry packet parser.
//!
//! Ten bytes, no inter-byte framing besides an idle-gap timeout: the caller
//! feeds bytes one at a time as they arrive off the UART, and the parser
//! reassembles, validates, and converts them into a [`SerialTelemetry`]
//! reading.

/// Inter-byte idle gap, in caller ticks, after which an in-progress packet
/// is discarded and reassembly restarts.
pub const PACKET_TIMEOUT: u32 = 100;

const PACKET_LEN: usize = 10;

/// Decoded serial telemetry fields, with unit conversions applied except
/// where a pole-pair-dependent conversion needs the caller's motor
/// configuration (see [`SerialTelemetry::rpm_mechanical`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerialTelemetry {
    pub temperature_c: u8,
    /// Centivolts (hundredths of a volt).
    pub voltage_cv: u16,
    /// Centiamps (hundredths of an amp).
    pub current_ca: u16,
    pub consumption_mah: u16,
    /// Electrical RPM divided by 100, as carried on the wire.
    pub erpm_div100: u16,
}

impl SerialTelemetry {
    /// Mechanical RPM: `(erpm_div100 * 100 * 2) / motor_pole_pairs`.
    pub fn rpm_mechanical(&self, motor_pole_pairs: u32) -> u32 {
        (self.erpm_div100 as u32 * 100 * 2) / motor_pole_pairs
    }
}

/// CRC-8, polynomial 0xD5, initial value 0, MSB-first, no final XOR.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0xD5
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Byte-at-a-time reassembler for the 10-byte serial telemetry packet.
pub struct SerialTelemetryParser {
    buf: [u8; PACKET_LEN],
    len: usize,
    last_byte_tick: Option<u32>,
    record: SerialTelemetry,
    new_data: bool,
}

impl SerialTelemetryParser {
    pub const fn new() -> Self {
        SerialTelemetryParser {
            buf: [0; PACKET_LEN],
            len: 0,
            last_byte_tick: None,
            record: SerialTelemetry {
                temperature_c: 0,
                voltage_cv: 0,
                current_ca: 0,
                consumption_mah: 0,
                erpm_div100: 0,
            },
            new_data: false,
        }
    }

    /// Feeds one byte from the serial source. If the gap since the
    /// previous byte exceeds [`PACKET_TIMEOUT`], the in-progress packet is
    /// discarded first.
    pub fn feed_byte(&mut self, byte: u8, now_tick: u32) {
        if let Some(last) = self.last_byte_tick {
            if now_tick.wrapping_sub(last) > PACKET_TIMEOUT {
                self.len = 0;
            }
        }
        self.last_byte_tick = Some(now_tick);

        if self.len < PACKET_LEN {
            self.buf[self.len] = byte;
            self.len += 1;
        }

        if self.len == PACKET_LEN {
            self.try_decode();
            self.len = 0;
        }
    }

    fn try_decode(&mut self) {
        let expected = crc8(&self.buf[..9]);
        if expected != self.buf[9] {
            return;
        }
        self.record = SerialTelemetry {
            temperature_c: self.buf[0],
            voltage_cv: u16::from_be_bytes([self.buf[1], self.buf[2]]),
            current_ca: u16::from_be_bytes([self.buf[3], self.buf[4]]),
            consumption_mah: u16::from_be_bytes([self.buf[5], self.buf[6]]),
            erpm_div100: u16::from_be_bytes([self.buf[7], self.buf[8]]),
        };
        self.new_data = true;
    }

    /// Clears any in-progress packet, e.g. on a hardware overrun flag.
    pub fn on_overrun(&mut self) {
        self.len = 0;
        self.last_byte_tick = None;
    }

    /// Reads and clears the one-shot "new packet decoded" flag, returning
    /// the packet if it was set.
    pub fn consume_new_data(&mut self) -> Option<SerialTelemetry> {
        if self.new_data {
            self.new_data = false;
            Some(self.record)
        } else {
            None
        }
    }
}

impl Default for SerialTelemetryParser {
    fn default() -> Self {
        Self::new()
    }
}
