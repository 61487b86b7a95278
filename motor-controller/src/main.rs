#![no_std]
#![no_main]

mod cli;
mod config;
mod hal_adapter;

use defmt::{info, unwrap};
use defmt_rtt as _;
use panic_probe as _;

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::Flex;
use embassy_rp::peripherals::{UART0, UART1};
use embassy_rp::uart::{self, UartRx};
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Instant, Timer};
use static_cell::StaticCell;

use dshot_core::driver::Driver;
use dshot_core::serial::SerialTelemetryParser;

use crate::cli::Action;
use crate::config::{driver_config, pins, THROTTLE_MIN};
use crate::hal_adapter::{EmbassyCaptureEngine, EmbassyDirectionControl, EmbassyPulseEngine, SharedPin};

static SIGNAL_PIN: StaticCell<SharedPin<'static>> = StaticCell::new();
static CONSOLE_BYTES: Channel<NoopRawMutex, u8, 8> = Channel::new();

bind_interrupts!(struct Irqs {
    UART0_IRQ => uart::InterruptHandler<UART0>;
    UART1_IRQ => uart::InterruptHandler<UART1>;
});

/// Reads the opaque CLI byte stream and forwards each byte to the main
/// task, which owns the driver and so must be the one to act on it.
#[embassy_executor::task]
async fn console_task(mut rx: UartRx<'static, embassy_rp::uart::Async>) {
    let mut byte = [0u8; 1];
    loop {
        if rx.read(&mut byte).await.is_ok() {
            CONSOLE_BYTES.send(byte[0]).await;
        }
    }
}

/// Serial telemetry is only read in unidirectional builds; bidirectional
/// builds get their RPM feedback back over the same wire via GCR.
#[embassy_executor::task]
async fn serial_telemetry_task(mut rx: UartRx<'static, embassy_rp::uart::Async>) {
    let mut parser = SerialTelemetryParser::new();
    let mut byte = [0u8; 1];
    loop {
        if rx.read(&mut byte).await.is_ok() {
            parser.feed_byte(byte[0], Instant::now().as_millis() as u32);
            if let Some(record) = parser.consume_new_data() {
                info!(
                    "serial telemetry: {}C {}cV {}cA rpm={}",
                    record.temperature_c,
                    record.voltage_cv,
                    record.current_ca,
                    record.rpm_mechanical(config::MOTOR_POLE_PAIRS)
                );
            }
        }
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    let signal_pin: &'static SharedPin<'static> =
        SIGNAL_PIN.init(RefCell::new(Flex::new(p.PIN_15)));
    let direction = EmbassyDirectionControl::new(signal_pin);
    let capture = EmbassyCaptureEngine::new(signal_pin);

    let t_bit_ticks = config::TIMER_HZ / config::DSHOT_SPEED.bit_rate_hz();
    let pulse = EmbassyPulseEngine::new(signal_pin, t_bit_ticks);

    let mut driver = Driver::new(pulse, direction, capture, driver_config());

    if !config::BIDIRECTIONAL {
        let uart_config = uart::Config::default();
        let rx = UartRx::new(p.UART0, p.PIN_5, Irqs, p.DMA_CH0, uart_config);
        unwrap!(spawner.spawn(serial_telemetry_task(rx)));
    }

    let console_rx = UartRx::new(p.UART1, p.PIN_1, Irqs, p.DMA_CH1, uart::Config::default());
    unwrap!(spawner.spawn(console_task(console_rx)));

    info!("motor-controller ready. {}", cli::HELP_TEXT);
    let _ = pins::TELEMETRY_UART_RX_PIN;
    let _ = pins::CONSOLE_UART_RX_PIN;

    let mut throttle = THROTTLE_MIN;
    loop {
        if let Ok(byte) = CONSOLE_BYTES.try_receive() {
            let (next_throttle, action) = cli::handle_byte(byte, throttle, &mut driver).await;
            throttle = next_throttle;
            if matches!(action, Action::Help) {
                info!("{}", cli::HELP_TEXT);
            }
        }

        driver.send_throttle(throttle);
        let now = Instant::now().as_millis() as u32;
        driver.poll(now);

        if driver.consume_telemetry_available() {
            let telemetry = driver.latest_telemetry();
            info!(
                "gcr telemetry: rpm_mech={} rpm_elec={} period={}",
                telemetry.rpm_mechanical, telemetry.rpm_electrical, telemetry.raw_period
            );
        }

        Timer::after_millis(1).await;
    }
}
