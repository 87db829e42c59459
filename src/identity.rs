//! Percent identity between two aligned rows.

use crate::types::AlignedPair;

pub const GAP: u8 = b'-';

/// Naive identity: every column counts, a gap is just another character.
///
/// `100 * matching columns / alignment length`, 0.0 for empty rows. Rows of
/// unequal length are compared over the shorter one but divided by the
/// longer one.
pub fn get_identity(first: &str, second: &str) -> f64 {
    let total = first.len().max(second.len());
    if total == 0 {
        return 0.0;
    }
    let matches = first
        .bytes()
        .zip(second.bytes())
        .filter(|(a, b)| a == b)
        .count();
    100.0 * matches as f64 / total as f64
}

/// Gap-aware identity: columns holding a gap on either side are ignored.
///
/// `100 * matching columns / comparable columns`, 0.0 when nothing is comparable.
pub fn get_identity_gap_aware(first: &str, second: &str) -> f64 {
    let (matches, comparable) = first
        .bytes()
        .zip(second.bytes())
        .filter(|&(a, b)| a != GAP && b != GAP)
        .fold((0usize, 0usize), |(m, c), (a, b)| (m + usize::from(a == b), c + 1));
    if comparable == 0 {
        return 0.0;
    }
    100.0 * matches as f64 / comparable as f64
}

impl AlignedPair {
    /// Gap-aware identity of the two rows.
    pub fn identity(&self) -> f64 {
        get_identity_gap_aware(&self.first, &self.second)
    }
}
