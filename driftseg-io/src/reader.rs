//! Readers for event and segment files.
//!
//! Both formats are JSON lines: one record per line. Blank lines and lines
//! starting with `#` are skipped.

use crate::{Error, Result};
use driftseg_algorithms::SuperLayerHits;
use driftseg_core::{RecHitPair, Segment2D, SuperLayer, WireId, DEFAULT_HIT_ERROR};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};

/// One raw hit of an event file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitRecord {
    /// Layer number (1-based).
    pub layer: u8,
    /// Wire number (1-based).
    pub wire: u16,
    /// Drift distance (cm).
    pub drift_distance: f64,
    /// Raw electronics time (ns).
    #[serde(default)]
    pub drift_time: f64,
    /// Position error (cm).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<f64>,
}

/// The hits of one super-layer together with its placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperLayerRecord {
    /// Super-layer index.
    pub superlayer: u8,
    /// Radial position of the super-layer centre (cm).
    pub radius: f64,
    /// Position along the beam (cm).
    #[serde(default)]
    pub z: f64,
    /// Raw hits.
    pub hits: Vec<HitRecord>,
}

impl SuperLayerRecord {
    /// Barrel geometry of the record.
    #[must_use]
    pub fn geometry(&self) -> SuperLayer {
        SuperLayer::barrel(self.superlayer, self.radius, self.z)
    }

    /// Converts the record into validated hits.
    ///
    /// # Errors
    /// Returns an error if a hit does not fit the super-layer geometry.
    pub fn into_superlayer_hits(self) -> Result<SuperLayerHits> {
        let superlayer = self.geometry();
        let hits = self
            .hits
            .iter()
            .map(|h| {
                let wire = WireId::new(self.superlayer, h.layer, h.wire);
                RecHitPair::new(wire, h.drift_distance, h.drift_time)
                    .with_error(h.error.unwrap_or(DEFAULT_HIT_ERROR))
            })
            .collect();
        let sl_hits = SuperLayerHits::new(superlayer, hits);
        sl_hits.validate()?;
        Ok(sl_hits)
    }
}

/// One event: the hits of every super-layer that fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event number.
    pub event: u64,
    /// Super-layers with hits.
    pub superlayers: Vec<SuperLayerRecord>,
}

impl EventRecord {
    /// Total number of hits.
    #[must_use]
    pub fn n_hits(&self) -> usize {
        self.superlayers.iter().map(|sl| sl.hits.len()).sum()
    }

    /// Converts every super-layer into validated hits.
    ///
    /// # Errors
    /// Returns the first geometry error.
    pub fn into_superlayer_hits(self) -> Result<Vec<SuperLayerHits>> {
        self.superlayers
            .into_iter()
            .map(SuperLayerRecord::into_superlayer_hits)
            .collect()
    }
}

/// A finished segment tagged with its event number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    /// Event number.
    pub event: u64,
    /// The segment.
    #[serde(flatten)]
    pub segment: Segment2D,
}

/// Streaming reader of JSON-lines files.
///
/// Iterates over records in file order; each item carries its own parse
/// error so a bad line does not end the iteration.
pub struct JsonLinesReader<T> {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line: usize,
    _record: std::marker::PhantomData<T>,
}

/// Reader of event files.
pub type EventFileReader = JsonLinesReader<EventRecord>;

impl<T> JsonLinesReader<T> {
    /// Opens a file for reading.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            path: path.as_ref().to_path_buf(),
            line: 0,
            _record: std::marker::PhantomData,
        })
    }

    /// Path of the file being read.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: for<'de> Deserialize<'de>> Iterator for JsonLinesReader<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            return Some(
                serde_json::from_str(trimmed).map_err(|source| Error::InvalidRecord {
                    path: self.path.clone(),
                    line: self.line,
                    source,
                }),
            );
        }
    }
}

/// Reads every segment of a JSON-lines segment file.
///
/// # Errors
/// Returns the first I/O or parse error.
pub fn read_segments<P: AsRef<Path>>(path: P) -> Result<Vec<SegmentRecord>> {
    JsonLinesReader::<SegmentRecord>::open(path)?.collect()
}
