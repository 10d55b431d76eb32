//! Utility functions for error handling
//!
//! File-system helpers that attach the offending path and the reason the
//! file was needed to every failure.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{PipelineError, Result};

/// Safely open a file with rich error information
///
/// # Arguments
/// * `path` - The path to the file to open
/// * `purpose` - Why the file is being opened (for error context)
pub fn safe_open_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if !path.exists() {
        return Err(
            PipelineError::io_error(format!("File not found, needed for: {purpose}"))
                .with_path(path),
        );
    }

    if !path.is_file() {
        return Err(
            PipelineError::io_error(format!("Path is not a file, expected a file for: {purpose}"))
                .with_path(path),
        );
    }

    fs::File::open(path).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::PermissionDenied => "Permission denied - check file permissions".to_string(),
            _ => format!("Failed to open file for: {purpose}"),
        };
        PipelineError::io_error_with_source(context, e).with_path(path)
    })
}

/// Create a file for writing, creating parent directories as needed
pub fn safe_create_file(path: &Path, purpose: &str) -> Result<fs::File> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent, purpose)?;
    }

    fs::File::create(path).map_err(|e| {
        PipelineError::io_error_with_source(format!("Failed to create file for: {purpose}"), e)
            .with_path(path)
    })
}

/// Create a directory (and its parents) if it does not exist yet
pub fn ensure_directory(path: &Path, purpose: &str) -> Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(path).map_err(|e| {
        PipelineError::io_error_with_source(format!("Failed to create directory for: {purpose}"), e)
            .with_path(path)
    })
}

/// Safely read a file to string with rich error information
pub fn safe_read_to_string(path: &Path, purpose: &str) -> Result<String> {
    let mut file = safe_open_file(path, purpose)?;

    let mut content = String::new();
    io::Read::read_to_string(&mut file, &mut content).map_err(|e| {
        let context = match e.kind() {
            io::ErrorKind::InvalidData => {
                "File contains invalid UTF-8 data - cannot read as text".to_string()
            }
            _ => format!("Failed to read file content for: {purpose}"),
        };
        PipelineError::io_error_with_source(context, e).with_path(path)
    })?;

    Ok(content)
}
