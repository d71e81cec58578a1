//! Ghost removal among segment candidates.
#![allow(clippy::module_name_repetitions)]

use crate::{CleanerConfig, ConflictMode};
use driftseg_core::SegmentCandidate;
use std::cmp::Ordering;

/// Chi-square difference below which [`ConflictMode::KeepBoth`] treats two
/// candidates on the same hits as equally good.
const KEEP_BOTH_CHI2_TOLERANCE: f64 = 0.1;

/// Removes ghosts and conflicts from a candidate list.
///
/// Implementations may shrink and reorder the list.
pub trait SegmentCleaner: Send + Sync {
    /// Returns the surviving candidates.
    fn clean(&self, candidates: Vec<SegmentCandidate>) -> Vec<SegmentCandidate>;

    /// Returns the name of the cleaner.
    fn name(&self) -> &'static str;
}

/// Default cleaner.
///
/// First settles hits used with opposite sides by two candidates, then
/// discards every candidate that shares too many hits with a better one.
/// Survivors keep their relative order.
#[derive(Debug, Clone, Default)]
pub struct GhostBusterCleaner {
    config: CleanerConfig,
}

impl GhostBusterCleaner {
    /// Creates a cleaner with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cleaner with a custom configuration.
    #[must_use]
    pub fn with_config(config: CleanerConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &CleanerConfig {
        &self.config
    }

    fn solve_conflicts(&self, candidates: &mut [SegmentCandidate]) {
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (head, tail) = candidates.split_at_mut(j);
                let (first, second) = (&mut head[i], &mut tail[0]);

                let conflicts = first.conflicting_hit_pairs(second);
                if conflicts.is_empty() {
                    continue;
                }

                let mirror =
                    conflicts.len() == first.n_hits() && first.n_hits() == second.n_hits();
                if mirror {
                    match self.config.conflict_mode {
                        ConflictMode::KeepBoth => continue,
                        ConflictMode::SmallerAngle => {
                            let steeper = if abs_slope(first) > abs_slope(second) {
                                first
                            } else {
                                second
                            };
                            for hit in conflicts {
                                steeper.remove_hit(hit);
                            }
                            continue;
                        }
                        ConflictMode::BestChi2 => {}
                    }
                }

                for hit in conflicts {
                    if worse(first, second) == Ordering::Less {
                        first.remove_hit(hit);
                    } else {
                        second.remove_hit(hit);
                    }
                }
            }
        }
    }

    fn ghost_buster(&self, candidates: Vec<SegmentCandidate>) -> Vec<SegmentCandidate> {
        let mut ghost = vec![false; candidates.len()];
        for i in 0..candidates.len() {
            for j in (i + 1)..candidates.len() {
                let (first, second) = (&candidates[i], &candidates[j]);
                let shared = first.n_shared_hit_pairs(second);
                if shared == 0 {
                    continue;
                }

                let min = self.config.n_unshared_hits_min;
                let too_close = shared >= self.config.n_shared_hits_max
                    || first.n_hits() - shared <= min
                    || second.n_hits() - shared <= min;
                if !too_close {
                    continue;
                }

                if self.config.conflict_mode == ConflictMode::KeepBoth
                    && shared == first.n_hits()
                    && shared == second.n_hits()
                    && (first.chi2() - second.chi2()).abs() < KEEP_BOTH_CHI2_TOLERANCE
                {
                    continue;
                }

                if worse(first, second) == Ordering::Less {
                    ghost[i] = true;
                } else {
                    ghost[j] = true;
                }
            }
        }

        candidates
            .into_iter()
            .zip(ghost)
            .filter_map(|(candidate, is_ghost)| (!is_ghost).then_some(candidate))
            .collect()
    }
}

impl SegmentCleaner for GhostBusterCleaner {
    fn clean(&self, mut candidates: Vec<SegmentCandidate>) -> Vec<SegmentCandidate> {
        if candidates.len() < 2 {
            return candidates;
        }

        self.solve_conflicts(&mut candidates);
        let chi2_max = self.config.segment_chi2_max;
        candidates.retain(|c| c.is_good(chi2_max));

        let survivors = self.ghost_buster(candidates);
        log::trace!("{} candidates after ghost busting", survivors.len());
        survivors
    }

    fn name(&self) -> &'static str {
        "GhostBuster"
    }
}

/// `Less` if `a` is the worse candidate: fewer hits, or on equal hits a higher chi-square.
fn worse(a: &SegmentCandidate, b: &SegmentCandidate) -> Ordering {
    match a.n_hits().cmp(&b.n_hits()) {
        Ordering::Equal if a.chi2() > b.chi2() => Ordering::Less,
        Ordering::Equal => Ordering::Greater,
        other => other,
    }
}

fn abs_slope(candidate: &SegmentCandidate) -> f64 {
    candidate.fit().map_or(f64::INFINITY, |f| f.slope.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use driftseg_core::{
        AssociationPoint, CandidateFit, CellSide, HitForFit, HitId, RecHitPair, SuperLayer,
        WireId,
    };
    use nalgebra::Matrix2;
    use std::sync::Arc;

    use CellSide::{Left, Right};

    fn hits() -> Vec<Arc<HitForFit>> {
        let sl = SuperLayer::barrel(1, 400.0, 0.0);
        (0..8u8)
            .map(|i| {
                let pair = RecHitPair::new(WireId::new(1, i % 4 + 1, 10 + u16::from(i)), 0.5, 0.0);
                Arc::new(HitForFit::new(HitId(usize::from(i)), &pair, &sl))
            })
            .collect()
    }

    fn candidate(
        hits: &[Arc<HitForFit>],
        assoc: &[(usize, CellSide)],
        chi2: f64,
        slope: f64,
    ) -> SegmentCandidate {
        let mut c = SegmentCandidate::from_points(
            1,
            assoc
                .iter()
                .map(|&(i, side)| AssociationPoint::new(Arc::clone(&hits[i]), side)),
        );
        c.set_fit(Some(CandidateFit {
            position: 0.0,
            slope,
            t0: 0.0,
            drift_offset: 0.0,
            chi2,
            covariance: Matrix2::identity(),
        }));
        c
    }

    #[test]
    fn test_single_candidate_untouched() {
        let h = hits();
        let c = candidate(&h, &[(0, Left), (1, Right), (2, Left)], 1.0, 0.0);
        let out = GhostBusterCleaner::new().clean(vec![c.clone()]);
        assert_eq!(out, vec![c]);
    }

    #[test]
    fn test_disjoint_candidates_kept_in_order() {
        let h = hits();
        let a = candidate(&h, &[(0, Left), (1, Right), (2, Left)], 3.0, 0.0);
        let b = candidate(&h, &[(4, Left), (5, Right), (6, Left)], 1.0, 0.0);
        let out = GhostBusterCleaner::new().clean(vec![a.clone(), b.clone()]);
        assert_eq!(out, vec![a, b]);
    }

    #[test]
    fn test_ghost_with_fewer_hits_removed() {
        let h = hits();
        let long = candidate(&h, &[(0, Left), (1, Right), (2, Left), (3, Right)], 4.0, 0.0);
        let short = candidate(&h, &[(1, Right), (2, Left), (5, Left)], 0.1, 0.0);
        let out = GhostBusterCleaner::new().clean(vec![short, long.clone()]);
        assert_eq!(out, vec![long]);
    }

    #[test]
    fn test_equal_size_ghost_loses_on_chi2() {
        let h = hits();
        let a = candidate(&h, &[(0, Left), (1, Right), (2, Left), (3, Right)], 4.0, 0.0);
        let b = candidate(&h, &[(0, Left), (1, Right), (2, Left), (7, Right)], 1.0, 0.0);
        let out = GhostBusterCleaner::new().clean(vec![a, b.clone()]);
        assert_eq!(out, vec![b]);
    }

    #[test]
    fn test_single_shared_hit_tolerated() {
        let h = hits();
        let a = candidate(&h, &[(0, Left), (1, Right), (2, Left), (3, Right)], 1.0, 0.0);
        let b = candidate(&h, &[(3, Right), (4, Left), (5, Right), (6, Left)], 1.0, 0.0);
        let out = GhostBusterCleaner::new().clean(vec![a, b]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_conflicting_hit_removed_from_smaller() {
        let h = hits();
        let long = candidate(&h, &[(0, Left), (1, Right), (2, Left), (3, Right)], 1.0, 0.0);
        let short = candidate(&h, &[(3, Left), (4, Left), (5, Right)], 0.1, 0.0);
        let cleaner = GhostBusterCleaner::new();
        let mut list = vec![short, long];
        cleaner.solve_conflicts(&mut list);
        assert_eq!(list[0].n_hits(), 2);
        assert_eq!(list[0].side_of(HitId(3)), None);
        assert_eq!(list[1].side_of(HitId(3)), Some(Right));
    }

    #[test]
    fn test_conflict_tie_goes_to_lower_chi2() {
        let h = hits();
        let a = candidate(&h, &[(0, Left), (1, Right), (2, Left), (3, Right)], 2.0, 0.0);
        let b = candidate(&h, &[(3, Left), (4, Left), (5, Right), (6, Right)], 1.0, 0.0);
        let cleaner = GhostBusterCleaner::new();
        let mut list = vec![a, b];
        cleaner.solve_conflicts(&mut list);
        assert_eq!(list[0].side_of(HitId(3)), None);
        assert_eq!(list[1].side_of(HitId(3)), Some(Left));
    }

    #[test]
    fn test_mirror_pair_modes() {
        let h = hits();
        let a = candidate(&h, &[(0, Left), (1, Right), (2, Left)], 0.5, 0.4);
        let b = candidate(&h, &[(0, Right), (1, Left), (2, Right)], 0.55, 0.1);

        let best = GhostBusterCleaner::new().clean(vec![a.clone(), b.clone()]);
        assert_eq!(best.len(), 1);
        assert_eq!(best[0].side_of(HitId(0)), Some(Left));

        let angle = GhostBusterCleaner::with_config(
            CleanerConfig::default().with_conflict_mode(ConflictMode::SmallerAngle),
        )
        .clean(vec![a.clone(), b.clone()]);
        assert_eq!(angle, vec![b.clone()]);

        let both = GhostBusterCleaner::with_config(
            CleanerConfig::default().with_conflict_mode(ConflictMode::KeepBoth),
        )
        .clean(vec![a, b]);
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_bad_candidates_dropped() {
        let h = hits();
        let good = candidate(&h, &[(0, Left), (1, Right), (2, Left)], 1.0, 0.0);
        let bad = candidate(&h, &[(4, Left), (5, Right), (6, Left)], 50.0, 0.0);
        let out = GhostBusterCleaner::new().clean(vec![good.clone(), bad]);
        assert_eq!(out, vec![good]);
    }
}
