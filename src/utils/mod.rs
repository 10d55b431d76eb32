//! Shared helpers: timestamp parsing, logging and progress bars.

pub mod date;
pub mod logging;

pub use date::{TimestampFormatConfig, parse_timestamp};
