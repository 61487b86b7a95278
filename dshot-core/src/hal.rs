//! Hardware collaborator traits (components B, C, D).
//!
//! These are the only three things the protocol state machine in
//! [`crate::driver`] asks of the caller: a monotonic tick source, a pulse
//! engine that can push a 17-slot duty sequence out over DMA, and a
//! direction-switchable capture engine that samples edge timestamps on the
//! same pin once it's turned around to input. None of this crate's code
//! touches a vendor register or an interrupt vector — an implementation of
//! these traits does, on the caller's side.

use crate::codec::FRAME_SLOTS;

/// A free-running, monotonically increasing tick source.
///
/// The unit of a "tick" is caller-defined; `dshot-core`'s reply-timing
/// constants (`REPLY_DELAY`, `REPLY_WINDOW`) are expressed in the same
/// ticks, nominally ~1ms, far coarser than the 25-50us physical reply
/// window — safe only because capture stays armed for the whole window
/// rather than being gated by the ticker's resolution.
pub trait Ticker {
    /// Returns the current tick count. Must never go backwards; wraparound
    /// (at `u32::MAX`) is tolerated by callers that only ever compare
    /// deltas.
    fn now(&self) -> u32;
}

/// Completion status of an armed pulse-engine transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseStatus {
    /// The duty sequence is still draining out of the DMA/timer.
    Pending,
    /// All 17 slots have been shifted out.
    Complete,
}

/// Drives a duty-value sequence out through a PWM-compare timer on DMA.
///
/// One frame transmission is exactly one `arm` followed by polling `poll`
/// until [`PulseStatus::Complete`].
pub trait PulseEngine {
    /// Loads `duty` (see [`crate::codec::Frame::duty_sequence`]) and starts
    /// shifting it out. Calling `arm` while a previous sequence is still
    /// draining is a caller bug; implementations may panic or restart.
    fn arm(&mut self, duty: &[u32; FRAME_SLOTS]);

    /// Non-blocking poll for completion.
    fn poll(&mut self) -> PulseStatus;
}

/// Logical direction of the shared half-duplex signal pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Driving the line as a PWM-compare output (normal send path).
    Output,
    /// Configured as a pulled-up input-capture line (bidirectional reply
    /// window).
    Input,
}

/// Switches the shared signal pin between compare-output and
/// input-capture, idempotently.
pub trait DirectionControl {
    /// The pin's current mode.
    fn mode(&self) -> PinMode;

    /// Reconfigures the pin for the given mode. A no-op if already in that
    /// mode.
    fn set_mode(&mut self, mode: PinMode);

    /// Convenience: switch to output mode if not already there.
    fn to_output(&mut self) {
        if self.mode() != PinMode::Output {
            self.set_mode(PinMode::Output);
        }
    }

    /// Convenience: switch to input mode if not already there.
    fn to_input(&mut self) {
        if self.mode() != PinMode::Input {
            self.set_mode(PinMode::Input);
        }
    }
}

/// Completion status of an armed capture window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    /// Still within the reply window; capture may still collect edges.
    Pending,
    /// The reply window elapsed (or the expected edge count arrived);
    /// `count` edge timestamps are available via [`CaptureEngine::samples`].
    Complete { count: usize },
    /// More edges arrived than the buffer could hold.
    Overrun,
}

/// Captures raw timer-counter values at each edge of the incoming GCR
/// reply, on the same pin and timer channel the [`PulseEngine`] just used
/// for output.
///
/// Samples are raw free-running counter values, not deltas: the state
/// machine in [`crate::driver`] and [`crate::gcr`] are responsible for
/// computing inter-edge deltas and correcting for at most one 16-bit
/// counter wrap across the capture window.
pub trait CaptureEngine {
    /// Capacity of the sample buffer in edges.
    const MAX_SAMPLES: usize;

    /// Arms the capture window. Must be called only while the pin is in
    /// [`PinMode::Input`].
    fn arm(&mut self);

    /// Non-blocking poll for completion or overrun. Reflects only the
    /// buffer-full and hardware-overrun stop conditions; the edge-count and
    /// window-timeout stop conditions are the state machine's job and are
    /// applied by calling [`CaptureEngine::disarm`].
    fn poll(&mut self) -> CaptureStatus;

    /// Commands the engine to stop capturing now, e.g. because the state
    /// machine observed the edge-count threshold or the reply window
    /// elapsed. Idempotent.
    fn disarm(&mut self);

    /// The raw captured counter values collected so far. Readable at any
    /// time; while still `Pending` this reflects a partial, growing
    /// prefix.
    fn samples(&self) -> &[u16];
}
