//! driftseg-io: Event and segment file I/O for driftseg.
//!
//! This crate reads raw hits from JSON-lines event files, writes
//! reconstructed segments as JSON lines or CSV, and loads reconstruction
//! configurations.
//!

mod config;
mod error;
mod reader;
mod writer;

pub use config::{load_config, save_config};
pub use error::{Error, Result};
pub use reader::{
    read_segments, EventFileReader, EventRecord, HitRecord, JsonLinesReader, SegmentRecord,
    SuperLayerRecord,
};
pub use writer::{SegmentFileWriter, CSV_HEADER};
