//! Reconstruction configuration files.

use crate::Result;
use driftseg_algorithms::ReconstructionConfig;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Loads and validates a JSON reconstruction configuration.
///
/// Missing fields take their default values.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if the
/// configuration is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ReconstructionConfig> {
    let file = File::open(path)?;
    let config: ReconstructionConfig = serde_json::from_reader(BufReader::new(file))?;
    config.validate()?;
    Ok(config)
}

/// Writes a configuration as pretty-printed JSON.
///
/// # Errors
/// Returns an error if the file cannot be written.
pub fn save_config<P: AsRef<Path>>(path: P, config: &ReconstructionConfig) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, config)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
