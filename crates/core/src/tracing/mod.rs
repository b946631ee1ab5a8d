//! Shared tracing functionality for autobid
//!
//! Library crates only emit events; binaries call [`init::init_tracing`] once
//! at startup to install a subscriber.

pub mod config;
#[cfg(feature = "subscriber")]
pub mod init;

pub use config::InstrumentationConfig;
