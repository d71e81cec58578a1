//! Rejection of candidates that repeat or are dominated by stored ones.

use driftseg_core::SegmentCandidate;

/// Returns true if `candidate` should be added to `existing`.
///
/// A candidate is refused when a stored one has the same points and sides,
/// or when a stored one has at least as many hits, a strictly better
/// chi-square per degree of freedom and shares more than `n - 2` of its hits.
#[must_use]
pub fn is_new_candidate(existing: &[SegmentCandidate], candidate: &SegmentCandidate) -> bool {
    let n = candidate.n_hits();
    !existing.iter().any(|stored| {
        if stored == candidate {
            return true;
        }
        stored.n_hits() >= n
            && stored.chi2_ndof() < candidate.chi2_ndof()
            && stored.n_shared_hit_pairs(candidate) + 2 > n
    })
}
