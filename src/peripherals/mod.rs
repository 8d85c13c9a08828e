//! Device peripherals used by the watchface

pub(crate) mod backlight;
pub(crate) mod battery;
pub(crate) mod display;
pub(crate) mod vibrator;
