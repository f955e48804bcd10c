//! # Adapters
//!
//! Production implementations of the outbound ports this crate can provide
//! on its own: the system clock and TOML configuration.

pub mod config;
pub mod time;

pub use config::{StaticConfigProvider, TomlConfigProvider};
pub use time::SystemTimeSource;
