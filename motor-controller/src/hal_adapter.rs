//! Concrete bindings of `dshot_core::hal`'s traits onto embassy-rp.
//!
//! This is the board-wiring layer the core explicitly treats as an
//! external collaborator (clock bring-up, vendor registers, interrupt
//! vectors). The signal pin alternates between push-pull output (bit
//! timing driven off a free-running timer) and pulled-up input capture,
//! matching the half-duplex nature of the wire.
//!
//! Simplification versus the abstract design: `dshot_core`'s contract
//! calls for DMA-driven compare updates and DMA-driven input capture
//! sharing one timer channel. A real board would own a PWM slice for
//! transmit and switch its pin's alternate function to GPIO for receive;
//! embassy-rp's `Pwm` takes ownership of the pin for its own lifetime and
//! has no safe "hand the pin back" path, which conflicts with the
//! direction control switching the same pin to a plain input. This
//! adapter instead bit-bangs the duty sequence through the same `Flex`
//! pin both `EmbassyDirectionControl` and `EmbassyCaptureEngine` share,
//! timed off a free-running timer rather than a hardware compare
//! register. The [`dshot_core::hal::PulseEngine`]/
//! [`dshot_core::hal::CaptureEngine`] contract (arm once, poll for
//! completion) is unchanged; only what backs it inside `poll()` differs.

use core::cell::RefCell;

use defmt::warn;
use dshot_core::codec::FRAME_SLOTS;
use dshot_core::hal::{CaptureEngine, CaptureStatus, DirectionControl, PinMode, PulseEngine, PulseStatus};
use embassy_rp::gpio::{Flex, Level, Pull};
use embassy_time::Instant;
use static_assertions::assert_impl_all as assert_impl;

/// `DirectionControl`, `PulseEngine` and `CaptureEngine` are all driven
/// from the same poll loop, never reentrantly, so a plain `RefCell` (no
/// cross-core locking) is enough to let them share the one physical pin.
pub type SharedPin<'d> = RefCell<Flex<'d>>;

/// Timer-tick granularity the pulse/capture engines below operate at, a
/// stand-in for a free-running hardware timer shared with capture.
fn now_ticks() -> u32 {
    Instant::now().as_ticks() as u32
}

pub struct EmbassyPulseEngine<'a, 'd> {
    pin: &'a SharedPin<'d>,
    duty: [u32; FRAME_SLOTS],
    slot: usize,
    slot_deadline: u32,
    t_bit_ticks: u32,
}

impl<'a, 'd> EmbassyPulseEngine<'a, 'd> {
    pub fn new(pin: &'a SharedPin<'d>, t_bit_ticks: u32) -> Self {
        EmbassyPulseEngine {
            pin,
            duty: [0; FRAME_SLOTS],
            slot: FRAME_SLOTS,
            slot_deadline: 0,
            t_bit_ticks,
        }
    }

    fn drive_slot(&mut self) {
        let high_ticks = self.duty[self.slot];
        let mut pin = self.pin.borrow_mut();
        pin.set_level(if high_ticks > 0 { Level::High } else { Level::Low });
    }
}

impl<'a, 'd> PulseEngine for EmbassyPulseEngine<'a, 'd> {
    fn arm(&mut self, duty: &[u32; FRAME_SLOTS]) {
        self.duty = *duty;
        self.slot = 0;
        self.drive_slot();
        self.slot_deadline = now_ticks().wrapping_add(self.t_bit_ticks);
    }

    fn poll(&mut self) -> PulseStatus {
        if self.slot >= FRAME_SLOTS {
            return PulseStatus::Complete;
        }
        if now_ticks().wrapping_sub(self.slot_deadline) < u32::MAX / 2 {
            // Deadline reached; advance to the next slot's level.
            self.slot += 1;
            if self.slot < FRAME_SLOTS {
                self.drive_slot();
                self.slot_deadline = self.slot_deadline.wrapping_add(self.t_bit_ticks);
            } else {
                self.pin.borrow_mut().set_low();
            }
        }
        if self.slot >= FRAME_SLOTS {
            PulseStatus::Complete
        } else {
            PulseStatus::Pending
        }
    }
}

/// Reconfigures the shared signal pin between push-pull compare output
/// and pulled-up input capture.
pub struct EmbassyDirectionControl<'a, 'd> {
    pin: &'a SharedPin<'d>,
    mode: PinMode,
}

impl<'a, 'd> EmbassyDirectionControl<'a, 'd> {
    pub fn new(pin: &'a SharedPin<'d>) -> Self {
        EmbassyDirectionControl { pin, mode: PinMode::Output }
    }
}

impl<'a, 'd> DirectionControl for EmbassyDirectionControl<'a, 'd> {
    fn mode(&self) -> PinMode {
        self.mode
    }

    fn set_mode(&mut self, mode: PinMode) {
        let mut pin = self.pin.borrow_mut();
        match mode {
            PinMode::Output => {
                pin.set_as_output();
            }
            PinMode::Input => {
                pin.set_pull(Pull::Up);
                pin.set_as_input();
            }
        }
        self.mode = mode;
    }
}

const MAX_SAMPLES: usize = 32;

/// Polls the shared pin's level on a free-running timer and timestamps
/// each observed transition, standing in for DMA-driven edge capture.
pub struct EmbassyCaptureEngine<'a, 'd> {
    pin: &'a SharedPin<'d>,
    samples: [u16; MAX_SAMPLES],
    count: usize,
    last_level: bool,
    armed: bool,
}

impl<'a, 'd> EmbassyCaptureEngine<'a, 'd> {
    pub fn new(pin: &'a SharedPin<'d>) -> Self {
        EmbassyCaptureEngine {
            pin,
            samples: [0; MAX_SAMPLES],
            count: 0,
            last_level: true,
            armed: false,
        }
    }
}

impl<'a, 'd> CaptureEngine for EmbassyCaptureEngine<'a, 'd> {
    const MAX_SAMPLES: usize = MAX_SAMPLES;

    fn arm(&mut self) {
        self.count = 0;
        self.last_level = true;
        self.armed = true;
    }

    fn poll(&mut self) -> CaptureStatus {
        if !self.armed {
            return CaptureStatus::Pending;
        }
        let level = self.pin.borrow().is_high();
        if level != self.last_level {
            self.last_level = level;
            if self.count < MAX_SAMPLES {
                self.samples[self.count] = now_ticks() as u16;
                self.count += 1;
            } else {
                warn!("GCR capture buffer overrun");
                return CaptureStatus::Overrun;
            }
        }
        if self.count >= MAX_SAMPLES {
            CaptureStatus::Complete { count: self.count }
        } else {
            CaptureStatus::Pending
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn samples(&self) -> &[u16] {
        &self.samples[..self.count]
    }
}

assert_impl!(EmbassyPulseEngine<'static, 'static>: PulseEngine);
assert_impl!(EmbassyDirectionControl<'static, 'static>: DirectionControl);
assert_impl!(EmbassyCaptureEngine<'static, 'static>: CaptureEngine);
