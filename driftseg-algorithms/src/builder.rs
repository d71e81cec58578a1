//! Depth-first search for segment candidates.
//!
//! Starting from a seed association set, the search tries every remaining
//! hit on both sides, recurses into the accepted extensions and backtracks.
//! A watermark holding the largest accepted candidate size prunes branches
//! that can no longer reach it.

use crate::{is_new_candidate, FitGate, PatternRecoConfig, SegmentUpdator};
use driftseg_core::{AssociationPoint, CellSide, HitForFit, SegmentCandidate, SuperLayer};
use std::sync::Arc;

/// Smallest association set worth storing.
pub const MIN_SEGMENT_HITS: usize = 3;

/// Recursive candidate search over one super-layer.
///
/// The watermark is owned by the search and carried across every call of
/// one seed; [`reset_watermark`](Self::reset_watermark) starts a new seed.
pub struct SegmentSearch<'a, U: SegmentUpdator + ?Sized> {
    superlayer: &'a SuperLayer,
    updator: &'a U,
    config: &'a PatternRecoConfig,
    gate: FitGate,
    max_found: usize,
}

impl<'a, U: SegmentUpdator + ?Sized> SegmentSearch<'a, U> {
    /// Creates a search with the watermark at [`MIN_SEGMENT_HITS`].
    pub fn new(superlayer: &'a SuperLayer, updator: &'a U, config: &'a PatternRecoConfig) -> Self {
        Self {
            superlayer,
            updator,
            config,
            gate: FitGate::from_config(config),
            max_found: MIN_SEGMENT_HITS,
        }
    }

    /// Largest candidate size accepted since the last reset.
    #[must_use]
    pub fn max_found(&self) -> usize {
        self.max_found
    }

    /// Resets the watermark for a new seed.
    pub fn reset_watermark(&mut self) {
        self.max_found = MIN_SEGMENT_HITS;
    }

    /// Extends `points` with hits from `pool` and stores every maximal candidate in `result`.
    ///
    /// `points` is restored to its input state on return.
    pub fn add_hits(
        &mut self,
        points: &mut Vec<AssociationPoint>,
        pool: &[Arc<HitForFit>],
        result: &mut Vec<SegmentCandidate>,
    ) {
        if points.len() + pool.len() < self.max_found {
            return;
        }

        let mut found_something = false;
        for (i, hit) in pool.iter().enumerate() {
            if self.config.debug {
                log::debug!(
                    "trying {} with {} picked, {} left\n{}",
                    hit.wire(),
                    points.len(),
                    pool.len() - i,
                    render_pattern(points, hit, self.superlayer.cell().n_layers)
                );
            }

            let left = self.try_side(points, hit, CellSide::Left);
            let right = self.try_side(points, hit, CellSide::Right);
            if left.is_none() && right.is_none() {
                continue;
            }
            found_something = true;

            // Continue outward from the hit just fixed.
            let next: Vec<Arc<HitForFit>> = pool[i + 1..]
                .iter()
                .filter(|other| {
                    self.config
                        .compatibility
                        .is_compatible(other.wire(), hit.wire())
                })
                .rev()
                .cloned()
                .collect();

            let (left_ok, right_ok) =
                arbitrate(points.len(), left, right, self.config.lr_chi2_margin);
            for (side, ok) in [(CellSide::Left, left_ok), (CellSide::Right, right_ok)] {
                if ok {
                    points.push(AssociationPoint::new(Arc::clone(hit), side));
                    self.add_hits(points, &next, result);
                    points.pop();
                }
            }
        }

        if !found_something {
            self.store_leaf(points, result);
        }
    }

    fn try_side(
        &self,
        points: &mut Vec<AssociationPoint>,
        hit: &Arc<HitForFit>,
        side: CellSide,
    ) -> Option<f64> {
        points.push(AssociationPoint::new(Arc::clone(hit), side));
        let chi2 = self
            .gate
            .evaluate(
                self.superlayer.index(),
                points,
                self.updator,
                self.config.fit_model,
                false,
            )
            .map(|candidate| candidate.chi2());
        points.pop();
        chi2
    }

    fn store_leaf(&mut self, points: &[AssociationPoint], result: &mut Vec<SegmentCandidate>) {
        if points.len() < self.max_found {
            return;
        }

        let Some(candidate) = self.gate.evaluate(
            self.superlayer.index(),
            points,
            self.updator,
            self.config.fit_model,
            self.config.debug,
        ) else {
            return;
        };
        if !candidate.is_good(self.config.segment_chi2_max) {
            return;
        }

        self.max_found = self.max_found.max(points.len());
        if is_new_candidate(result, &candidate) {
            if self.config.debug {
                log::debug!("accepted {candidate}");
            }
            result.push(candidate);
        } else if self.config.debug {
            log::debug!("already stored {candidate}");
        }
    }
}

/// Decides which sides of a hit to explore.
///
/// With more than three points already fixed and both sides acceptable, a
/// side is dropped when the other is better by more than `margin`.
fn arbitrate(base: usize, left: Option<f64>, right: Option<f64>, margin: f64) -> (bool, bool) {
    match (left, right) {
        (Some(l), Some(r)) if base > MIN_SEGMENT_HITS => {
            if l < r - margin {
                (true, false)
            } else if r < l - margin {
                (false, true)
            } else {
                (true, true)
            }
        }
        _ => (left.is_some(), right.is_some()),
    }
}

/// Renders fixed points as `L`/`R` and the tried hit as `*`, one column per layer,
/// with the wire numbers underneath.
#[must_use]
pub fn render_pattern(points: &[AssociationPoint], hit: &HitForFit, n_layers: u8) -> String {
    let n = usize::from(n_layers);
    let mut marks = vec!['.'; n];
    let mut wires = vec![0u16; n];

    let columns = points
        .iter()
        .map(|p| (p.hit.wire(), p.side.tag()))
        .chain(std::iter::once((hit.wire(), '*')));
    for (wire, mark) in columns {
        let column = usize::from(wire.layer.saturating_sub(1));
        if column < n {
            marks[column] = mark;
            wires[column] = wire.wire;
        }
    }

    let mut out = String::new();
    for mark in &marks {
        out.push_str(&format!(" {mark} "));
    }
    out.push('\n');
    for wire in &wires {
        if *wire == 0 {
            out.push_str("   ");
        } else {
            out.push_str(&format!("{wire:>3}"));
        }
    }
    out
}
