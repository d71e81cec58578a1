//! Combinatorial segment reconstruction in one super-layer.
//!
//! Every compatible pair of hits seeds a search for each of its four side
//! combinations that points back to the interaction region. The
//! candidates of all seeds are cleaned together and the survivors refined
//! into finished segments.

use crate::{
    GhostBusterCleaner, LinearUpdator, PatternRecoConfig, ReconstructionConfig, SegmentCleaner,
    SegmentSearch, SegmentUpdator,
};
use driftseg_core::{
    polar_angle, AssociationPoint, CellSide, HitForFit, HitId, RecHitPair, Result, Segment2D,
    SegmentCandidate, SuperLayer,
};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Counters collected while reconstructing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionStatistics {
    /// Hits handed to the reconstruction.
    pub n_hits: usize,
    /// Super-layers skipped because of the hit-count ceiling.
    pub skipped: usize,
    /// Compatible seed pairs.
    pub seed_pairs: usize,
    /// Seed side combinations that passed the direction cut and were searched.
    pub seeds_searched: usize,
    /// Candidates produced by the search.
    pub candidates_found: usize,
    /// Candidates left after cleaning.
    pub candidates_cleaned: usize,
    /// Finished segments.
    pub segments: usize,
}

impl ReconstructionStatistics {
    /// Adds the counters of `other`.
    pub fn merge(&mut self, other: &Self) {
        self.n_hits += other.n_hits;
        self.skipped += other.skipped;
        self.seed_pairs += other.seed_pairs;
        self.seeds_searched += other.seeds_searched;
        self.candidates_found += other.candidates_found;
        self.candidates_cleaned += other.candidates_cleaned;
        self.segments += other.segments;
    }
}

/// Reconstructs two-dimensional segments from the hits of one super-layer.
///
/// The reconstructor holds no per-call state and can be shared between
/// threads; every call owns its hits and search watermark.
#[derive(Debug, Clone)]
pub struct SegmentReconstructor<U = LinearUpdator, C = GhostBusterCleaner> {
    config: PatternRecoConfig,
    updator: U,
    cleaner: C,
}

impl SegmentReconstructor {
    /// Creates a reconstructor with the default updator and cleaner.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ReconstructionConfig) -> Result<Self> {
        config.validate()?;
        let ReconstructionConfig {
            pattern,
            updator,
            cleaner,
        } = config;
        Ok(Self {
            config: pattern,
            updator: LinearUpdator::with_config(updator),
            cleaner: GhostBusterCleaner::with_config(cleaner),
        })
    }
}

impl<U: SegmentUpdator, C: SegmentCleaner> SegmentReconstructor<U, C> {
    /// Creates a reconstructor from explicit collaborators.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn with_parts(config: PatternRecoConfig, updator: U, cleaner: C) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            updator,
            cleaner,
        })
    }

    /// Pattern recognition configuration.
    #[must_use]
    pub fn config(&self) -> &PatternRecoConfig {
        &self.config
    }

    /// The updator.
    pub fn updator(&self) -> &U {
        &self.updator
    }

    /// The cleaner.
    pub fn cleaner(&self) -> &C {
        &self.cleaner
    }

    /// Resolves raw hit pairs in the frame of `superlayer`, in input order.
    #[must_use]
    pub fn init_hits(&self, superlayer: &SuperLayer, pairs: &[RecHitPair]) -> Vec<Arc<HitForFit>> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, pair)| Arc::new(HitForFit::new(HitId(i), pair, superlayer)))
            .collect()
    }

    /// Searches and cleans candidates.
    #[must_use]
    pub fn build_segments(
        &self,
        superlayer: &SuperLayer,
        hits: &[Arc<HitForFit>],
    ) -> Vec<SegmentCandidate> {
        let mut stats = ReconstructionStatistics::default();
        self.build(superlayer, hits, &mut stats)
    }

    /// Reconstructs the segments of one super-layer.
    #[must_use]
    pub fn reconstruct(&self, superlayer: &SuperLayer, pairs: &[RecHitPair]) -> Vec<Segment2D> {
        self.reconstruct_with_statistics(superlayer, pairs).0
    }

    /// Reconstructs the segments of one super-layer and reports counters.
    #[must_use]
    pub fn reconstruct_with_statistics(
        &self,
        superlayer: &SuperLayer,
        pairs: &[RecHitPair],
    ) -> (Vec<Segment2D>, ReconstructionStatistics) {
        let mut stats = ReconstructionStatistics::default();
        let hits = self.init_hits(superlayer, pairs);
        let candidates = self.build(superlayer, &hits, &mut stats);

        let segments: Vec<Segment2D> = candidates
            .iter()
            .map(|candidate| self.updator.update(candidate))
            .collect();
        stats.segments = segments.len();
        (segments, stats)
    }

    fn build(
        &self,
        superlayer: &SuperLayer,
        hits: &[Arc<HitForFit>],
        stats: &mut ReconstructionStatistics,
    ) -> Vec<SegmentCandidate> {
        let debug = self.config.debug;
        stats.n_hits = hits.len();

        if debug {
            log::debug!("SL{}: {} hits", superlayer.index(), hits.len());
            for hit in hits {
                log::debug!(
                    "  {} drift {:.4} time {:.1}",
                    hit.wire(),
                    hit.drift_distance(),
                    hit.digi_time()
                );
            }
        }

        if hits.len() > self.config.max_allowed_hits {
            log::warn!(
                "SL{} has {} hits, more than the {} allowed; skipping",
                superlayer.index(),
                hits.len(),
                self.config.max_allowed_hits
            );
            stats.skipped = 1;
            return Vec::new();
        }

        let window = &self.config.compatibility;
        let alpha_max = self.config.alpha_max(superlayer.index());
        let mut search = SegmentSearch::new(superlayer, &self.updator, &self.config);
        let mut result = Vec::new();

        for (i, first) in hits.iter().enumerate() {
            for j in ((i + 1)..hits.len()).rev() {
                let last = &hits[j];
                if !window.is_compatible(first.wire(), last.wire()) {
                    continue;
                }
                stats.seed_pairs += 1;

                let pool: Vec<Arc<HitForFit>> = hits[i + 1..j]
                    .iter()
                    .filter(|hit| {
                        window.is_compatible(hit.wire(), last.wire())
                            && window.is_compatible(hit.wire(), first.wire())
                    })
                    .cloned()
                    .collect();

                for first_side in CellSide::ALL {
                    for last_side in CellSide::ALL {
                        let from_first = superlayer.to_global(&first.local_position(first_side));
                        let from_last = superlayer.to_global(&last.local_position(last_side));
                        let direction = from_last - from_first;
                        let alpha = (polar_angle(&direction) - polar_angle(&from_last.coords)).abs();
                        if alpha > alpha_max {
                            continue;
                        }
                        stats.seeds_searched += 1;

                        let mut points = vec![
                            AssociationPoint::new(Arc::clone(first), first_side),
                            AssociationPoint::new(Arc::clone(last), last_side),
                        ];
                        search.reset_watermark();
                        search.add_hits(&mut points, &pool, &mut result);
                    }
                }
            }
        }
        stats.candidates_found = result.len();

        if debug {
            log::debug!("before cleaning: {} candidates", result.len());
            for candidate in &result {
                log::debug!("  {candidate}");
            }
        }

        let cleaned = self.cleaner.clean(result);
        stats.candidates_cleaned = cleaned.len();

        if debug {
            log::debug!("after cleaning: {} candidates", cleaned.len());
            for candidate in &cleaned {
                log::debug!("  {candidate}");
            }
        }

        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftseg_core::WireId;

    fn pairs(sl: u8, hits: &[(u8, u16, f64)]) -> Vec<RecHitPair> {
        hits.iter()
            .map(|&(layer, wire, d)| RecHitPair::new(WireId::new(sl, layer, wire), d, 0.0))
            .collect()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = ReconstructionConfig::default();
        config.pattern.max_chi2 = -1.0;
        assert!(SegmentReconstructor::new(config).is_err());
    }

    #[test]
    fn test_init_hits_keeps_order() {
        let reco = SegmentReconstructor::new(ReconstructionConfig::default()).unwrap();
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        let hits = reco.init_hits(&sl, &pairs(1, &[(3, 7, 0.2), (1, 2, 0.4)]));
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id(), HitId(0));
        assert_eq!(hits[0].wire(), WireId::new(1, 3, 7));
        assert_eq!(hits[1].id(), HitId(1));
    }

    #[test]
    fn test_empty_input() {
        let reco = SegmentReconstructor::new(ReconstructionConfig::default()).unwrap();
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        let (segments, stats) = reco.reconstruct_with_statistics(&sl, &[]);
        assert!(segments.is_empty());
        assert_eq!(stats, ReconstructionStatistics::default());
    }

    #[test]
    fn test_statistics_merge() {
        let mut total = ReconstructionStatistics {
            n_hits: 4,
            segments: 1,
            ..Default::default()
        };
        total.merge(&ReconstructionStatistics {
            n_hits: 101,
            skipped: 1,
            ..Default::default()
        });
        assert_eq!(total.n_hits, 105);
        assert_eq!(total.skipped, 1);
        assert_eq!(total.segments, 1);
    }
}
