//! Battery status check
//!
//! Implementation based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/battery.rs
//! and https://wiki.pine64.org/wiki/PineTime.

use embassy_nrf::{gpio::Input, peripherals::P0_12, saadc::Saadc};

use pinetime_watchface::{system::power, ui::BatteryChargeState};

/// Battery API
pub struct Battery<'a> {
    /// ADC instance for battery voltage measurement (P0.31)
    adc: Saadc<'a, 1>,
    /// Charge indication pin:
    /// high = battery, low = charging
    pin_charge_indication: Input<'a, P0_12>,
    /// Last reported state
    state: BatteryChargeState,
}

impl<'a> Battery<'a> {
    /// Configure battery and take a first measurement
    pub async fn init(adc: Saadc<'a, 1>, charge_pin: Input<'a, P0_12>) -> Self {
        let mut battery = Self {
            adc,
            pin_charge_indication: charge_pin,
            state: BatteryChargeState::default(),
        };
        battery.state = battery.measure().await;
        battery
    }

    /// Last measured state
    pub fn state(&self) -> BatteryChargeState {
        self.state
    }

    /// Measure again. Returns the new state if it differs from the last one.
    pub async fn update(&mut self) -> Option<BatteryChargeState> {
        let state = self.measure().await;
        if state == self.state {
            return None;
        }
        self.state = state;
        Some(state)
    }

    async fn measure(&mut self) -> BatteryChargeState {
        let mut buf = [0; 1];
        self.adc.sample(&mut buf).await;
        let millivolts = power::millivolts_from_sample(buf[0]);
        defmt::trace!("Battery at {} mV", millivolts);

        BatteryChargeState {
            charge_percent: power::percent_from_millivolts(millivolts),
            is_charging: self.pin_charge_indication.is_low(),
        }
    }
}
