//! Event-level helpers that run the reconstruction over several super-layers.

use crate::{ReconstructionStatistics, SegmentCleaner, SegmentReconstructor, SegmentUpdator};
use driftseg_core::{Error, RecHitPair, Result, Segment2D, SuperLayer};
use rayon::prelude::*;

/// The raw hits of one super-layer.
#[derive(Debug, Clone)]
pub struct SuperLayerHits {
    /// Geometry the hits are resolved in.
    pub superlayer: SuperLayer,
    /// Raw hit pairs.
    pub hits: Vec<RecHitPair>,
}

impl SuperLayerHits {
    /// Bundles hits with their super-layer.
    #[must_use]
    pub fn new(superlayer: SuperLayer, hits: Vec<RecHitPair>) -> Self {
        Self { superlayer, hits }
    }

    /// Checks every hit against the super-layer geometry.
    ///
    /// # Errors
    /// Returns the first wire outside the super-layer, or a drift distance
    /// that is negative or larger than the cell half-width.
    pub fn validate(&self) -> Result<()> {
        let max = self.superlayer.cell().max_drift();
        for hit in &self.hits {
            self.superlayer.validate_wire(hit.wire)?;
            if !(0.0..=max).contains(&hit.drift_distance) {
                return Err(Error::InvalidDriftDistance {
                    distance: hit.drift_distance,
                    max,
                });
            }
        }
        Ok(())
    }
}

/// Reconstructs every super-layer of an event in parallel.
///
/// Segments are returned grouped by super-layer, in input order.
pub fn reconstruct_event<U, C>(
    reco: &SegmentReconstructor<U, C>,
    superlayers: &[SuperLayerHits],
) -> Vec<Segment2D>
where
    U: SegmentUpdator,
    C: SegmentCleaner,
{
    reconstruct_event_with_statistics(reco, superlayers).0
}

/// Same as [`reconstruct_event`], also summing the per-super-layer counters.
pub fn reconstruct_event_with_statistics<U, C>(
    reco: &SegmentReconstructor<U, C>,
    superlayers: &[SuperLayerHits],
) -> (Vec<Segment2D>, ReconstructionStatistics)
where
    U: SegmentUpdator,
    C: SegmentCleaner,
{
    let per_superlayer: Vec<(Vec<Segment2D>, ReconstructionStatistics)> = superlayers
        .par_iter()
        .map(|sl| reco.reconstruct_with_statistics(&sl.superlayer, &sl.hits))
        .collect();

    let mut stats = ReconstructionStatistics::default();
    let mut segments = Vec::new();
    for (sl_segments, sl_stats) in per_superlayer {
        stats.merge(&sl_stats);
        segments.extend(sl_segments);
    }
    (segments, stats)
}
