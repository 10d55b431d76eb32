//! Logging utilities for output and progress tracking

pub mod log;
pub mod progress;

pub use self::log::{log_operation_complete, log_operation_start, log_step};
pub use self::progress::{create_main_progress_bar, finish_progress_bar};
