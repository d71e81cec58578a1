//! End-to-end reconstruction of single super-layers.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use driftseg_algorithms::{
    LinearUpdator, PatternRecoConfig, ReconstructionConfig, SegmentCleaner, SegmentReconstructor,
};
use driftseg_core::{CellSide, HitId, RecHitPair, SegmentCandidate, SuperLayer, WireId};

fn pairs(sl: u8, hits: &[(u8, u16, f64)]) -> Vec<RecHitPair> {
    hits.iter()
        .map(|&(layer, wire, d)| RecHitPair::new(WireId::new(sl, layer, wire), d, 0.0))
        .collect()
}

fn reconstructor() -> SegmentReconstructor {
    SegmentReconstructor::new(ReconstructionConfig::default()).unwrap()
}

/// Keeps every candidate.
struct KeepAll;

impl SegmentCleaner for KeepAll {
    fn clean(&self, candidates: Vec<SegmentCandidate>) -> Vec<SegmentCandidate> {
        candidates
    }

    fn name(&self) -> &'static str {
        "KeepAll"
    }
}

const LINE: [(u8, u16, f64); 4] = [(1, 3, 0.11), (2, 4, 1.73), (3, 3, 0.63), (4, 4, 1.21)];

#[test]
fn straight_line_gives_one_segment() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let (segments, stats) = reconstructor().reconstruct_with_statistics(&sl, &pairs(1, &LINE));

    assert_eq!(segments.len(), 1);
    let segment = &segments[0];
    assert_eq!(segment.n_hits(), 4);
    assert_abs_diff_eq!(segment.chi2, 0.0, epsilon = 1e-6);
    assert_relative_eq!(segment.slope(), 0.2, epsilon = 1e-6);

    let sides: Vec<CellSide> = segment.hits.iter().map(|h| h.side).collect();
    assert_eq!(
        sides,
        vec![CellSide::Right, CellSide::Left, CellSide::Right, CellSide::Left]
    );

    assert_eq!(stats.n_hits, 4);
    assert_eq!(stats.skipped, 0);
    assert!(stats.seed_pairs > 0);
    assert!(stats.seeds_searched > 0);
    assert!(stats.candidates_found >= 1);
    assert_eq!(stats.candidates_cleaned, 1);
    assert_eq!(stats.segments, 1);
}

#[test]
fn cleaner_keeps_better_of_two_overlapping_lines() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    for extra in [1.26, 1.31] {
        let mut hits = LINE.to_vec();
        hits.push((4, 4, extra));
        let segments = reconstructor().reconstruct(&sl, &pairs(1, &hits));

        assert_eq!(segments.len(), 1, "extra drift {extra}");
        let last = segments[0]
            .hits
            .iter()
            .find(|h| h.wire.layer == 4)
            .unwrap();
        assert_relative_eq!(last.drift_distance, 1.21, epsilon = 1e-6);
    }
}

#[test]
fn search_keeps_both_overlapping_lines() {
    // The duplicate filter only rejects a worse line found after a better
    // one, so both four-hit lines reach the cleaner.
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let reco =
        SegmentReconstructor::with_parts(PatternRecoConfig::default(), LinearUpdator::new(), KeepAll)
            .unwrap();
    for extra in [1.26, 1.31] {
        let mut hits = LINE.to_vec();
        hits.push((4, 4, extra));
        let candidates = reco.build_segments(&sl, &reco.init_hits(&sl, &pairs(1, &hits)));

        let full_line_with = |id: usize| {
            candidates.iter().any(|c| {
                c.n_hits() == 4
                    && (0..3).all(|i| c.side_of(HitId(i)).is_some())
                    && c.side_of(HitId(id)).is_some()
            })
        };
        assert!(full_line_with(3), "extra drift {extra}");
        assert!(full_line_with(4), "extra drift {extra}");
    }
}

#[test]
fn search_never_stores_identical_candidates() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let mut hits = LINE.to_vec();
    hits.push((4, 4, 1.26));
    let reco =
        SegmentReconstructor::with_parts(PatternRecoConfig::default(), LinearUpdator::new(), KeepAll)
            .unwrap();
    let candidates = reco.build_segments(&sl, &reco.init_hits(&sl, &pairs(1, &hits)));

    assert!(!candidates.is_empty());
    for (i, a) in candidates.iter().enumerate() {
        for b in &candidates[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn separated_clusters_give_nothing() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let hits = pairs(1, &[(1, 3, 0.5), (2, 4, 0.6), (3, 40, 0.5), (4, 41, 0.7)]);
    assert!(reconstructor().reconstruct(&sl, &hits).is_empty());
}

#[test]
fn theta_superlayer_uses_tight_window() {
    let sl = SuperLayer::barrel(2, 400.0, 0.0);
    // Too inclined with respect to the interaction region.
    assert!(reconstructor().reconstruct(&sl, &pairs(2, &LINE)).is_empty());

    let steep = [(1, 3, 0.4025), (2, 4, 1.6325), (3, 3, 0.5325), (4, 4, 1.5025)];
    let segments = reconstructor().reconstruct(&sl, &pairs(2, &steep));
    assert_eq!(segments.len(), 1);
    assert_relative_eq!(segments[0].slope(), 0.05, epsilon = 1e-6);
}

#[test]
fn hit_ceiling_skips_superlayer() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let hits: Vec<(u8, u16, f64)> = (0..101u16)
        .map(|i| (u8::try_from(i % 4).unwrap() + 1, i / 4 + 1, 0.5))
        .collect();
    let (segments, stats) = reconstructor().reconstruct_with_statistics(&sl, &pairs(1, &hits));

    assert!(segments.is_empty());
    assert_eq!(stats.n_hits, 101);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.seed_pairs, 0);
    assert_eq!(stats.seeds_searched, 0);
    assert_eq!(stats.candidates_found, 0);
}

#[test]
fn hit_ceiling_is_inclusive() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let mut config = ReconstructionConfig::default();
    config.pattern = config.pattern.with_max_allowed_hits(8);
    let reco = SegmentReconstructor::new(config).unwrap();

    let mut hits = LINE.to_vec();
    hits.extend(LINE.iter().map(|&(layer, wire, d)| (layer, wire + 20, d)));
    let (segments, stats) = reco.reconstruct_with_statistics(&sl, &pairs(1, &hits));
    assert_eq!(stats.skipped, 0);
    assert!(stats.seed_pairs > 0);
    assert_eq!(segments.len(), 2);

    hits.push((1, 40, 0.5));
    let (segments, stats) = reco.reconstruct_with_statistics(&sl, &pairs(1, &hits));
    assert_eq!(stats.skipped, 1);
    assert!(segments.is_empty());
}

#[test]
fn reconstruction_is_repeatable() {
    let sl = SuperLayer::barrel(1, 400.0, 0.0);
    let mut hits = LINE.to_vec();
    hits.extend([(4, 4, 1.26), (1, 20, 0.9), (2, 21, 0.3)]);
    let hits = pairs(1, &hits);
    let reco = reconstructor();

    let first = reco.reconstruct(&sl, &hits);
    let second = reco.reconstruct(&sl, &hits);
    assert_eq!(first, second);
}
