//! Control the vibration motor
//!
//! Implementation based upon https://github.com/tstellanova/cst816s/blob/master/examples/touchpad.rs
//! and https://wiki.pine64.org/wiki/PineTime.

use embassy_nrf::{gpio::Output, peripherals::P0_16};
use embassy_time::{Duration, Timer};

/// Controller for the internal vibration motor
pub struct Vibrator<'a> {
    /// Pin P0.16: High = off, Low = on
    pin_enable: Output<'a, P0_16>,
    /// Length of one pulse and of the pause between pulses
    pulse: Duration,
}

impl<'a> Vibrator<'a> {
    /// Configure vibrator on boot
    pub fn init(pin_enable: Output<'a, P0_16>, pulse_ms: u64) -> Self {
        let mut vibrator = Self {
            pin_enable,
            pulse: Duration::from_millis(pulse_ms),
        };
        vibrator.off();
        vibrator
    }

    /// Pulse the motor the given number of times
    pub async fn pulse(&mut self, times: u8) {
        for i in 0..times {
            if i > 0 {
                Timer::after(self.pulse).await;
            }
            self.on();
            Timer::after(self.pulse).await;
            self.off();
        }
    }

    /// Two pulses with a pause in between
    pub async fn double_pulse(&mut self) {
        self.pulse(2).await
    }

    fn on(&mut self) {
        self.pin_enable.set_low();
    }

    fn off(&mut self) {
        self.pin_enable.set_high();
    }
}
