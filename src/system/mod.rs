pub mod config;
pub mod event;
pub mod message;
pub mod power;
pub mod time;

#[cfg(feature = "firmware")]
pub mod bluetooth;
