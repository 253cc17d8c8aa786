//! Utility types used across the respool crates.

pub mod logging;

pub use logging::LogLevel;
