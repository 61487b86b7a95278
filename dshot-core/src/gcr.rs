//! Component E: GCR decode of the bidirectional telemetry reply.
//!
//! Turns a sequence of raw timer-counter edge samples (as produced by
//! [`crate::hal::CaptureEngine`]) into an rpm reading: edges → run lengths
//! → 21 bits → four 5-bit GCR symbols → four nibbles → a 16-bit
//! `{period, crc}` value → rpm.

/// Maximum number of data+marker bits a reply carries.
pub const REPLY_BITS: usize = 21;

/// Number of data bits once the trailing marker bit is dropped.
const DATA_BITS: usize = 20;

/// Decode failure, mirroring the error taxonomy in the error-handling design:
/// each variant increments `errors` at the caller and never touches the
/// retained telemetry record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GcrError {
    /// Fewer than 20 bits were recoverable from the captured edges.
    CaptureUnderrun,
    /// A 5-bit symbol had no entry in the GCR table.
    InvalidSymbol,
    /// The reply's own CRC nibble didn't match the computed one.
    CrcMismatch,
}

/// The fixed 5-bit-symbol -> 4-bit-nibble GCR decode table. `None` marks a
/// symbol with no valid nibble.
#[rustfmt::skip]
const GCR_TABLE: [Option<u8>; 32] = [
    None,       None,       None,       None,
    None,       None,       None,       None,
    None,       Some(0x09), Some(0x0A), Some(0x0B),
    None,       Some(0x0D), Some(0x0E), Some(0x0F),
    None,       None,       Some(0x02), Some(0x03),
    None,       Some(0x05), Some(0x06), Some(0x07),
    None,       Some(0x00), Some(0x08), Some(0x01),
    None,       Some(0x04), Some(0x0C), None,
];

/// Computes the wrap-corrected tick delta between two consecutive raw
/// 16-bit counter samples, per the Capture Engine's single-wrap contract.
pub const fn wrap_delta(prev: u16, curr: u16) -> u32 {
    if curr >= prev {
        (curr - prev) as u32
    } else {
        (0x10000u32 - prev as u32) + curr as u32 + 1
    }
}

/// Recovers the 21-bit run-length-coded stream from a sequence of raw edge
/// samples and an initial line level.
///
/// `edges[0]` is the reference timestamp recorded when the capture window
/// opened (the line has not yet transitioned); each subsequent edge closes
/// out one run of `initial_level`-then-toggled bits. Stops once 21 bits
/// have been emitted or the edges are exhausted. Returns the number of
/// bits written into `out`.
fn edges_to_bits(edges: &[u16], initial_level: bool, t_r: u32, out: &mut [bool; REPLY_BITS]) -> usize {
    let mut level = initial_level;
    let mut count = 0usize;

    for pair in edges.windows(2) {
        if count >= REPLY_BITS {
            break;
        }
        let delta = wrap_delta(pair[0], pair[1]);
        let n = round_div_clamped(delta, t_r);
        for _ in 0..n {
            if count >= REPLY_BITS {
                break;
            }
            out[count] = level;
            count += 1;
        }
        level = !level;
    }

    count
}

/// `round(delta / t_r)`, clamped to `[1, 5]`.
fn round_div_clamped(delta: u32, t_r: u32) -> u32 {
    if t_r == 0 {
        return 1;
    }
    let n = (delta + t_r / 2) / t_r;
    n.clamp(1, 5)
}

/// Packs 20 data bits (MSB first) into four 5-bit symbols and maps each
/// through [`GCR_TABLE`], concatenating the resulting nibbles MSB-first
/// into a 16-bit value.
fn symbols_to_value(bits: &[bool; REPLY_BITS]) -> Result<u16, GcrError> {
    let mut value: u16 = 0;
    for symbol_index in 0..4 {
        let mut symbol: u8 = 0;
        for bit_index in 0..5 {
            let bit = bits[symbol_index * 5 + bit_index];
            symbol = (symbol << 1) | (bit as u8);
        }
        let nibble = GCR_TABLE[symbol as usize].ok_or(GcrError::InvalidSymbol)?;
        value = (value << 4) | (nibble as u16);
    }
    Ok(value)
}

/// A decoded, CRC-verified telemetry reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub period: u16,
    pub rpm_electrical: u32,
    pub rpm_mechanical: u32,
}

/// Decodes a captured edge sequence into an rpm reading.
///
/// `edges` are raw [`crate::hal::CaptureEngine`] samples including the
/// leading reference timestamp. `t_r` is the GCR bit period in timer
/// ticks (`f_tck / DShotSpeed::gcr_bit_rate_hz()`). `motor_pole_pairs`
/// must be nonzero.
pub fn decode(
    edges: &[u16],
    initial_level: bool,
    t_r: u32,
    motor_pole_pairs: u32,
) -> Result<Reply, GcrError> {
    let mut bits = [false; REPLY_BITS];
    let emitted = edges_to_bits(edges, initial_level, t_r, &mut bits);
    if emitted < DATA_BITS {
        return Err(GcrError::CaptureUnderrun);
    }

    let value = symbols_to_value(&bits)?;
    let period = value >> 4;
    let received_crc = value & 0xF;
    let expected_crc = (period ^ (period >> 4) ^ (period >> 8)) & 0xF;
    if received_crc != expected_crc {
        return Err(GcrError::CrcMismatch);
    }

    let (rpm_electrical, rpm_mechanical) = if period == 0 {
        (0, 0)
    } else {
        let rpm_electrical = 60_000_000u32 / period as u32;
        let rpm_mechanical = (2 * rpm_electrical) / motor_pole_pairs;
        (rpm_electrical, rpm_mechanical)
    };

    Ok(Reply {
        period,
        rpm_electrical,
        rpm_mechanical,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Inverse of [`GCR_TABLE`], nibble -> 5-bit symbol, used only to build
    /// ideal test fixtures (the driver never needs to encode a GCR reply).
    const NIBBLE_TO_SYMBOL: [u8; 16] = [
        0x19, 0x1B, 0x12, 0x13, 0x1D, 0x15, 0x16, 0x17, 0x1A, 0x09, 0x0A, 0x0B, 0x1E, 0x0D, 0x0E,
        0x0F,
    ];

    fn ideal_edges(value: u16, t_r: u32, start: u16) -> ([u16; 12], usize) {
        let nibbles = [
            ((value >> 12) & 0xF) as u8,
            ((value >> 8) & 0xF) as u8,
            ((value >> 4) & 0xF) as u8,
            (value & 0xF) as u8,
        ];

        let mut bits = [false; REPLY_BITS];
        let mut bit_count = 0;
        for nibble in nibbles {
            let symbol = NIBBLE_TO_SYMBOL[nibble as usize];
            for shift in (0..5).rev() {
                bits[bit_count] = (symbol >> shift) & 1 != 0;
                bit_count += 1;
            }
        }
        // Trailing marker bit, value is irrelevant to decode.
        bits[bit_count] = false;
        bit_count += 1;
        assert_eq!(bit_count, REPLY_BITS);

        let mut edges = [0u16; 12];
        let mut edge_count = 0;
        edges[0] = start;
        edge_count += 1;

        let mut i = 0;
        while i < REPLY_BITS {
            let level = bits[i];
            let mut run = 0u32;
            while i < REPLY_BITS && bits[i] == level {
                run += 1;
                i += 1;
            }
            let prev = edges[edge_count - 1];
            edges[edge_count] = prev.wrapping_add((run * t_r) as u16);
            edge_count += 1;
        }

        (edges, edge_count)
    }

    #[test]
    fn worked_example_period_0x0c4() {
        let value: u16 = 0x0C48;
        let t_r = 224;
        let (edges, count) = ideal_edges(value, t_r, 1000);
        let reply = decode(&edges[..count], true, t_r, 14).expect("decode succeeds");
        assert_eq!(reply.period, 0x0C4);
        assert_eq!(reply.rpm_electrical, 60_000_000 / 0x0C4);
        assert_eq!(reply.rpm_mechanical, (2 * (60_000_000 / 0x0C4)) / 14);
    }

    #[test]
    fn period_zero_is_stopped_rotor_not_an_error() {
        // period = 0, crc = XOR of nibbles of 0 = 0, so value = 0x0000.
        let value: u16 = 0x0000;
        let t_r = 224;
        let (edges, count) = ideal_edges(value, t_r, 2000);
        let reply = decode(&edges[..count], true, t_r, 14).expect("decode succeeds");
        assert_eq!(reply.period, 0);
        assert_eq!(reply.rpm_electrical, 0);
        assert_eq!(reply.rpm_mechanical, 0);
    }

    #[test]
    fn round_trip_for_arbitrary_values() {
        let t_r = 224;
        for period in [0x001u16, 0x0C4, 0x3FF, 0x7FF] {
            let crc = (period ^ (period >> 4) ^ (period >> 8)) & 0xF;
            let value = (period << 4) | crc;
            let (edges, count) = ideal_edges(value, t_r, 500);
            let reply = decode(&edges[..count], true, t_r, 14).expect("decode succeeds");
            assert_eq!(reply.period, period);
        }
    }

    #[test]
    fn crc_mismatch_is_rejected() {
        let t_r = 224;
        // period = 0x0C4 with a deliberately wrong crc nibble.
        let value: u16 = 0x0C49;
        let (edges, count) = ideal_edges(value, t_r, 500);
        assert_eq!(decode(&edges[..count], true, t_r, 14), Err(GcrError::CrcMismatch));
    }

    #[test]
    fn wrap_delta_handles_single_16_bit_wraparound() {
        // prev near the top of u16 range, curr wrapped around to a low value.
        assert_eq!(wrap_delta(0xFFF0, 0x0005), 0x15 + 1);
    }

    #[test]
    fn too_few_edges_is_capture_underrun() {
        let edges = [1000u16, 1224, 1448];
        assert_eq!(decode(&edges, true, 224, 14), Err(GcrError::CaptureUnderrun));
    }

    #[test]
    fn invalid_symbol_is_rejected() {
        // Construct a bitstream whose first symbol (00000) has no table entry.
        let t_r = 224;
        let mut edges = [0u16; 12];
        edges[0] = 1000;
        // initial_level = true, but the first 5 bits must read as 0 to hit
        // symbol 0x00 (invalid) -- so start at level=false instead.
        let runs = [5u32, 5, 5, 5, 1];
        let mut t = 1000u16;
        let mut n = 1;
        edges[0] = t;
        for run in runs {
            t = t.wrapping_add((run * t_r) as u16);
            edges[n] = t;
            n += 1;
        }
        assert_eq!(decode(&edges[..n], false, t_r, 14), Err(GcrError::InvalidSymbol));
    }
}
