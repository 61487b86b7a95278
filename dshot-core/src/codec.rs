//! Component A: frame assembly with CRC, and bit-to-pulse-width encoding.
//!
//! A DShot frame is 16 bits MSB-first: an 11-bit value, a 1-bit telemetry
//! request, and a 4-bit CRC. The CRC is always the XOR of the three nibbles
//! of `value << 1 | telemetry_request` regardless of wire direction — only
//! the duty-cycle mapping (not the CRC) differs between unidirectional and
//! bidirectional (inverted) DShot.

use num_enum::TryFromPrimitive;

/// DShot protocol speed, named by wire bitrate in kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DShotSpeed {
    DShot150,
    DShot300,
    DShot600,
    DShot1200,
}

impl DShotSpeed {
    /// Command-frame bitrate in Hz.
    pub const fn bit_rate_hz(&self) -> u32 {
        match self {
            Self::DShot150 => 150_000,
            Self::DShot300 => 300_000,
            Self::DShot600 => 600_000,
            Self::DShot1200 => 1_200_000,
        }
    }

    /// GCR telemetry-reply bitrate in Hz: 5/4 of the command bitrate.
    pub const fn gcr_bit_rate_hz(&self) -> u32 {
        self.bit_rate_hz() / 4 * 5
    }
}

/// Rounds `num / den` to the nearest integer (round-half-up), for positive
/// integer arguments only.
const fn round_div(num: u32, den: u32) -> u32 {
    (num + den / 2) / den
}

/// Per-bit duty values and the trailing-slot value for a given speed,
/// timer reference frequency, and wire polarity.
///
/// `t_bit` is the bit period in timer ticks: `f_tck / bit_rate_hz`. Duty for
/// a logical 0 is `round(0.375 * t_bit)`; for a logical 1,
/// `round(0.75 * t_bit)`. In inverted (bidirectional) mode every duty value
/// is replaced with `t_bit - duty`, the line idles high, and the trailing
/// slot is `t_bit` (full-high) instead of `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitTiming {
    pub t_bit: u32,
    pub duty_zero: u32,
    pub duty_one: u32,
    pub trailing_slot: u32,
    pub inverted: bool,
}

impl BitTiming {
    pub const fn new(speed: DShotSpeed, f_tck: u32, inverted: bool) -> Self {
        let t_bit = f_tck / speed.bit_rate_hz();

        let duty_zero = round_div(3 * t_bit, 8);
        let duty_one = round_div(3 * t_bit, 4);

        if inverted {
            BitTiming {
                t_bit,
                duty_zero: t_bit - duty_zero,
                duty_one: t_bit - duty_one,
                trailing_slot: t_bit,
                inverted,
            }
        } else {
            BitTiming {
                t_bit,
                duty_zero,
                duty_one,
                trailing_slot: 0,
                inverted,
            }
        }
    }
}

/// Number of duty-value slots in one DShot frame transmission: 16 data bits
/// plus one trailing slot.
pub const FRAME_SLOTS: usize = 17;

/// A built, CRC-valid 16-bit DShot frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    inner: u16,
}

impl Frame {
    /// Builds a frame from a raw 11-bit value (0-2047) and a telemetry
    /// request bit.
    ///
    /// Values above 2047 are clamped, not rejected, per spec: "send always
    /// succeeds in normal operation."
    pub const fn new(value: u16, telemetry_request: bool) -> Self {
        let value = if value > 0x7FF { 0x7FF } else { value };
        let packet = (value << 1) | (telemetry_request as u16);
        let crc = Self::crc_of(packet);
        Frame {
            inner: (packet << 4) | crc,
        }
    }

    /// Builds a frame for a [`Command`] code (always with value < 48).
    pub const fn from_command(command: Command, telemetry_request: bool) -> Self {
        Self::new(command as u16, telemetry_request)
    }

    const fn crc_of(packet: u16) -> u16 {
        (packet ^ (packet >> 4) ^ (packet >> 8)) & 0x0F
    }

    /// Recovers a frame from its raw 16-bit wire value, verifying the CRC.
    ///
    /// Returns `None` on CRC mismatch.
    pub const fn from_raw(raw: u16) -> Option<Self> {
        let packet = raw >> 4;
        let received_crc = raw & 0x0F;
        if Self::crc_of(packet) != received_crc {
            return None;
        }
        Some(Frame { inner: raw })
    }

    /// The 11-bit value field (0-2047).
    pub const fn value(&self) -> u16 {
        self.inner >> 5
    }

    /// The telemetry-request bit.
    pub const fn telemetry_request(&self) -> bool {
        (self.inner >> 4) & 1 != 0
    }

    /// The 4-bit CRC field.
    pub const fn crc(&self) -> u16 {
        self.inner & 0x0F
    }

    /// The raw 16-bit wire value, MSB first.
    pub const fn raw(&self) -> u16 {
        self.inner
    }

    /// Encodes this frame into a 17-slot duty-value sequence per `timing`.
    ///
    /// Slots 0..16 are the 16 data bits, MSB first; slot 16 is the trailing
    /// slot (`timing.trailing_slot`).
    pub fn duty_sequence(&self, timing: &BitTiming) -> [u32; FRAME_SLOTS] {
        let mut slots = [0u32; FRAME_SLOTS];
        for (i, slot) in slots.iter_mut().take(16).enumerate() {
            let bit = (self.inner >> (15 - i)) & 1;
            *slot = if bit == 1 {
                timing.duty_one
            } else {
                timing.duty_zero
            };
        }
        slots[16] = timing.trailing_slot;
        slots
    }
}

/// Standard DShot/BLHeli32 command codes (values 0-47). 48-2047 are throttle.
///
/// Commands are only meaningful while the motor is stopped (throttle value
/// 0) and generally must be repeated several times — see the doc comment on
/// each variant for the BLHeli32 repeat/delay requirement, where known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u16)]
pub enum Command {
    MotorStop = 0,
    /// Wait at least 260ms before the next command.
    Beep1 = 1,
    /// Wait at least 260ms before the next command.
    Beep2 = 2,
    /// Wait at least 260ms before the next command.
    Beep3 = 3,
    /// Wait at least 260ms before the next command.
    Beep4 = 4,
    /// Wait at least 260ms before the next command.
    Beep5 = 5,
    /// Wait at least 12ms before the next command.
    EscInfo = 6,
    /// Forced normal spin direction. Needs 6 repeats.
    SpinDirection1 = 7,
    /// Forced reversed spin direction. Needs 6 repeats.
    SpinDirection2 = 8,
    /// Needs 6 repeats.
    ThreeDModeOff = 9,
    /// Needs 6 repeats.
    ThreeDModeOn = 10,
    SettingsRequest = 11,
    /// Needs 6 repeats. Wait at least 35ms before the next command.
    SaveSettings = 12,
    /// Extended DShot Telemetry enable. Needs 6 repeats.
    ExtendedTelemetryEnable = 13,
    /// Extended DShot Telemetry disable. Needs 6 repeats.
    ExtendedTelemetryDisable = 14,

    // 15-19 unassigned.
    /// Spin direction normal, with respect to ESC configuration. Needs 6 repeats.
    SpinDirectionNormal = 20,
    /// Spin direction reversed, with respect to ESC configuration. Needs 6 repeats.
    SpinDirectionReversed = 21,
    Led0On = 22,
    Led1On = 23,
    Led2On = 24,
    Led3On = 25,
    Led0Off = 26,
    Led1Off = 27,
    Led2Off = 28,
    Led3Off = 29,
    AudioStreamModeToggle = 30,
    SilentModeToggle = 31,
    /// Disables signal-line telemetry (commands 42-47). Needs 6 repeats.
    SignalLineTelemetryDisable = 32,
    /// Enables signal-line telemetry (commands 42-47). Needs 6 repeats.
    SignalLineTelemetryEnable = 33,
    /// Needs 6 repeats.
    SignalLineContinuousErpmTelemetry = 34,
    /// Needs 6 repeats.
    SignalLineContinuousErpmPeriodTelemetry = 35,

    // 36-41 unassigned.
    /// 1C per LSB.
    SignalLineTemperatureTelemetry = 42,
    /// 10mV per LSB, 40.95V max.
    SignalLineVoltageTelemetry = 43,
    /// 100mA per LSB, 409.5A max.
    SignalLineCurrentTelemetry = 44,
    /// 10mAh per LSB, 40.95Ah max.
    SignalLineConsumptionTelemetry = 45,
    /// 100erpm per LSB, 409500erpm max.
    SignalLineErpmTelemetry = 46,
    /// 16us per LSB, 65520us max.
    SignalLineErpmPeriodTelemetry = 47,
}

impl Command {
    /// Parses a raw DShot value as a command code, surfacing the crate's
    /// own error type rather than `num_enum`'s.
    pub fn parse(code: u16) -> Result<Self, crate::Error> {
        Self::try_from(code).map_err(|_| crate::Error::InvalidCommand(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_crc_is_xor_of_nibbles() {
        for value in 0u16..=2047 {
            for telemetry in [false, true] {
                let frame = Frame::new(value, telemetry);
                let packet = frame.raw() >> 4;
                let nibbles = (packet & 0xF) ^ ((packet >> 4) & 0xF) ^ ((packet >> 8) & 0xF);
                assert_eq!(nibbles ^ frame.crc(), 0);
            }
        }
    }

    #[test]
    fn worked_example_throttle_1046_with_telemetry() {
        // DShot600 frame for throttle 1046, telemetry request set.
        let frame = Frame::new(1046, true);
        assert_eq!(frame.raw(), 0x82D7);
    }

    #[test]
    fn worked_example_motor_stop() {
        let frame = Frame::from_command(Command::MotorStop, false);
        assert_eq!(frame.raw(), 0x0000);
    }

    #[test]
    fn round_trip_decode_recovers_value_and_telemetry_bit() {
        for value in [0u16, 1, 47, 48, 1046, 2047] {
            for telemetry in [false, true] {
                let frame = Frame::new(value, telemetry);
                let decoded = Frame::from_raw(frame.raw()).expect("valid crc");
                assert_eq!(decoded.value(), value);
                assert_eq!(decoded.telemetry_request(), telemetry);
            }
        }
    }

    #[test]
    fn decode_rejects_corrupted_crc() {
        let frame = Frame::new(1046, true);
        let corrupted = frame.raw() ^ 0x0001;
        assert!(Frame::from_raw(corrupted).is_none());
    }

    #[test]
    fn value_above_2047_is_clamped_not_rejected() {
        let frame = Frame::new(2100, false);
        assert_eq!(frame.value(), 2047);
    }

    #[test]
    fn dshot600_bit_timing_matches_worked_example() {
        let timing = BitTiming::new(DShotSpeed::DShot600, 168_000_000, false);
        assert_eq!(timing.t_bit, 280);
        assert_eq!(timing.duty_zero, 105);
        assert_eq!(timing.duty_one, 210);
        assert_eq!(timing.trailing_slot, 0);
    }

    #[test]
    fn duty_sequence_matches_worked_example() {
        let timing = BitTiming::new(DShotSpeed::DShot600, 168_000_000, false);
        let frame = Frame::new(1046, true);
        assert_eq!(frame.raw(), 0x82D7);
        let slots = frame.duty_sequence(&timing);
        let expected = [
            210, 105, 105, 105, 105, 105, 210, 105, 210, 210, 105, 210, 105, 210, 210, 210, 0,
        ];
        assert_eq!(slots, expected);
    }

    #[test]
    fn motor_stop_duty_sequence_is_all_zero_plus_trailing() {
        let timing = BitTiming::new(DShotSpeed::DShot600, 168_000_000, false);
        let frame = Frame::from_command(Command::MotorStop, false);
        let slots = frame.duty_sequence(&timing);
        assert_eq!(slots, [timing.duty_zero; FRAME_SLOTS]);
    }

    #[test]
    fn inverted_timing_substitutes_t_bit_minus_duty() {
        let timing = BitTiming::new(DShotSpeed::DShot600, 168_000_000, true);
        assert_eq!(timing.trailing_slot, timing.t_bit);
        assert_eq!(timing.duty_zero, 280 - 105);
        assert_eq!(timing.duty_one, 280 - 210);
    }

    #[test]
    fn command_try_from_primitive_round_trips() {
        assert_eq!(Command::try_from(0u16), Ok(Command::MotorStop));
        assert_eq!(Command::try_from(12u16), Ok(Command::SaveSettings));
        assert!(Command::try_from(16u16).is_err());
        assert!(Command::try_from(48u16).is_err());
    }

    #[test]
    fn parse_reports_invalid_command_with_the_offending_code() {
        assert_eq!(Command::parse(6), Ok(Command::EscInfo));
        assert_eq!(Command::parse(2047), Err(crate::Error::InvalidCommand(2047)));
    }
}
