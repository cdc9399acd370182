//! JSON catalog writer.
//!
//! Writes Catalog structs to JSON files with proper formatting.

use super::schema::Catalog;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write a catalog to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `catalog` - Catalog data to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_catalog(catalog: &Catalog, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing catalog to: {}", output_path.display());

    validate_output_path(output_path)?;

    // Create parent directories if needed
    if let Some(parent) = output_path.parent() {
        if !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, catalog).map_err(OutputError::SerializationFailed)?;

    info!(
        "Catalog written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Read a catalog from a JSON file
///
/// **Public** - used by the validate command and tests
pub fn read_catalog(input_path: impl AsRef<Path>) -> Result<Catalog, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading catalog from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let catalog: Catalog = serde_json::from_reader(file).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Catalog loaded: version {}, {} commands",
        catalog.version,
        catalog.commands.len()
    );

    Ok(catalog)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

/// Calculate file size in bytes
///
/// **Private** - internal utility
fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}
