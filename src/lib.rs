//! Digital watchface for the PineTime.
//!
//! The library holds everything that does not touch the hardware: the watchface
//! controller and its callback interfaces, the retained layer toolkit it draws
//! through, message decoding and time keeping. The firmware binary (feature
//! `firmware`) wires these to the nRF52832 peripherals and the SoftDevice.

#![cfg_attr(not(test), no_std)]

// This must go first so the logging macros are visible to all other modules.
#[macro_use]
mod fmt;

pub mod error;
pub mod system;
pub mod ui;

pub use error::Error;
