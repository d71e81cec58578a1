//! File writers for reconstructed segments.

use crate::Result;
use driftseg_core::Segment2D;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column names of the CSV output.
pub const CSV_HEADER: &str = "event,superlayer,position,slope,chi2,ndof,t0,n_hits";

#[derive(Serialize)]
struct SegmentRecordRef<'a> {
    event: u64,
    #[serde(flatten)]
    segment: &'a Segment2D,
}

/// Writer for reconstructed segments.
///
/// Writes either JSON lines (one segment per line, readable back with
/// [`read_segments`](crate::read_segments)) or a flat CSV summary.
pub struct SegmentFileWriter {
    writer: BufWriter<File>,
}

impl SegmentFileWriter {
    /// Creates a new file writer.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        Ok(Self { writer })
    }

    /// Writes the segments of one event as JSON lines.
    ///
    /// # Errors
    /// Returns an error if serialization or writing fails.
    pub fn write_segments_jsonl(&mut self, event: u64, segments: &[Segment2D]) -> Result<()> {
        for segment in segments {
            serde_json::to_writer(&mut self.writer, &SegmentRecordRef { event, segment })?;
            self.writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Writes the segments of one event as CSV rows, preceded by the header if asked.
    ///
    /// # Errors
    /// Returns an error if writing fails.
    pub fn write_segments_csv(
        &mut self,
        event: u64,
        segments: &[Segment2D],
        header: bool,
    ) -> Result<()> {
        if header {
            writeln!(self.writer, "{CSV_HEADER}")?;
        }

        for s in segments {
            writeln!(
                self.writer,
                "{},{},{},{},{},{},{},{}",
                event,
                s.superlayer,
                s.position.x,
                s.slope(),
                s.chi2,
                s.degrees_of_freedom,
                s.t0,
                s.n_hits()
            )?;
        }
        Ok(())
    }

    /// Flushes the writer.
    ///
    /// # Errors
    /// Returns an error if flushing fails.
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
