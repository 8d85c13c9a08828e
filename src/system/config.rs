//! General system configuration

use crate::ui::label::ClockStyle;

/// Compile-time watchface settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchfaceConfig {
    /// Clock format preference of the wearer
    pub clock_style: ClockStyle,
    /// Local time offset from UTC in seconds
    pub timezone_secs: i32,
    /// Weather is requested on minutes divisible by this
    pub weather_refresh_minutes: u32,
    /// Backlight level at boot (0–7)
    pub backlight_level: u8,
    /// Length of each pulse of the disconnect alert
    pub vibration_pulse_ms: u64,
}

impl WatchfaceConfig {
    pub const DEFAULT: Self = Self {
        clock_style: if cfg!(feature = "clock-12h") {
            ClockStyle::TwelveHour
        } else {
            ClockStyle::TwentyFourHour
        },
        timezone_secs: 1 * 3_600,
        weather_refresh_minutes: 30,
        backlight_level: 2,
        vibration_pulse_ms: 200,
    };
}

impl Default for WatchfaceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(feature = "firmware")]
pub use nrf::SystemConfig;

#[cfg(feature = "firmware")]
mod nrf {
    use embassy_nrf::{
        config::{Config, Debug, HfclkSource, LfclkSource},
        interrupt::Priority,
    };

    pub struct SystemConfig {}

    impl SystemConfig {
        /// Create new system configuration
        pub fn new() -> Config {
            // Generate default config, required because Config is set as
            // `non_exhaustive`
            let mut config = Config::default();

            // Set high-frequency and low-frequency clock sources to external
            config.hfclk_source = HfclkSource::ExternalXtal;
            config.lfclk_source = LfclkSource::ExternalXtal;

            // Enable DC/DC regulator to massively reduce runtime current consumption
            config.dcdc.reg1 = true;

            // Configure interrupt priorities to exclude 0 (default), 1, and 4,
            // which are reserved for the nrf SoftDevice
            config.gpiote_interrupt_priority = Priority::P2;
            config.time_interrupt_priority = Priority::P2;

            // Allow debugging
            config.debug = Debug::Allowed;

            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_refresh_is_half_hourly() {
        assert_eq!(WatchfaceConfig::default().weather_refresh_minutes, 30);
    }
}
