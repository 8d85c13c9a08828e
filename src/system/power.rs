//! Battery charge estimation
//!
//! Based upon https://github.com/dbrgn/pinetime-rtic/blob/master/pinetime-rtic/src/battery.rs
//! and https://wiki.pine64.org/wiki/PineTime.

/// Battery voltage in millivolts for a 12 bit SAADC sample.
///
/// The battery is measured through a 1:2 divider against the 3.3 V reference.
pub fn millivolts_from_sample(sample: i16) -> u16 {
    // Use u32 during calculation to prevent overflow
    (sample.clamp(0, 4095) as u32 * 2000 / 1241) as u16
}

/// Battery capacity in percent (0–100).
///
/// Fixed data points with linear interpolation in between.
pub fn percent_from_millivolts(voltage: u16) -> u8 {
    (match voltage {
        0..=3449 => 0,
        3450..=3699 => (voltage - 3450) / 5,
        3700..=4199 => 50 + (voltage - 3700) / 10,
        _ => 100,
    }) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_end_points() {
        assert_eq!(percent_from_millivolts(3000), 0);
        assert_eq!(percent_from_millivolts(3450), 0);
        assert_eq!(percent_from_millivolts(3699), 49);
        assert_eq!(percent_from_millivolts(3700), 50);
        assert_eq!(percent_from_millivolts(4199), 99);
        assert_eq!(percent_from_millivolts(4200), 100);
        assert_eq!(percent_from_millivolts(u16::MAX), 100);
    }

    #[test]
    fn curve_is_monotonic() {
        let mut last = 0;
        for voltage in 3000..4400 {
            let percent = percent_from_millivolts(voltage);
            assert!(percent >= last);
            last = percent;
        }
    }

    #[test]
    fn sample_conversion() {
        assert_eq!(millivolts_from_sample(0), 0);
        assert_eq!(millivolts_from_sample(-12), 0);
        assert_eq!(millivolts_from_sample(2482), 4000);
        assert_eq!(millivolts_from_sample(i16::MAX), millivolts_from_sample(4095));
    }
}
