//src/kmer.rs

use std::hash::Hash;

use ahash::{AHashMap, AHashSet};

/// K-mer -> ids of the indexed sequences containing it at least once.
pub type KmerIndex = AHashMap<String, AHashSet<usize>>;

/// How many mates `search_mates` keeps.
pub const BEST_MATES: usize = 2;

/// All overlapping k-mers of `sequence`, left to right.
///
/// Empty when `kmer_size` is 0 or larger than the sequence. The iterator is
/// `Clone`, so the same k-mers can be walked again.
pub fn cut_kmer(sequence: &str, kmer_size: usize) -> impl Iterator<Item = &str> + Clone + '_ {
    let windows = if kmer_size == 0 || kmer_size > sequence.len() {
        0
    } else {
        sequence.len() - kmer_size + 1
    };
    (0..windows).filter_map(move |start| sequence.get(start..start + kmer_size))
}

/// Record `sequence_id` under every distinct k-mer of `sequence`.
///
/// A k-mer repeated inside the sequence, or an id inserted twice, still
/// yields a single membership.
pub fn get_unique_kmer<'a>(
    kmer_index: &'a mut KmerIndex,
    sequence: &str,
    sequence_id: usize,
    kmer_size: usize,
) -> &'a mut KmerIndex {
    for kmer in cut_kmer(sequence, kmer_size) {
        match kmer_index.get_mut(kmer) {
            Some(ids) => {
                ids.insert(sequence_id);
            }
            None => {
                let mut ids = AHashSet::with_capacity(1);
                ids.insert(sequence_id);
                kmer_index.insert(kmer.to_string(), ids);
            }
        }
    }
    kmer_index
}

/// Every indexed id sharing at least one k-mer with `sequence`, by
/// decreasing number of shared distinct k-mers; ties go to the smaller id.
pub fn rank_mates(kmer_index: &KmerIndex, sequence: &str, kmer_size: usize) -> Vec<usize> {
    let mut shared: AHashMap<usize, usize> = AHashMap::new();
    for kmer in get_unique(cut_kmer(sequence, kmer_size)) {
        if let Some(ids) = kmer_index.get(kmer) {
            for &id in ids {
                *shared.entry(id).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(usize, usize)> = shared.into_iter().collect();
    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(id, _)| id).collect()
}

/// The (at most) two best mates of `sequence` among the indexed sequences.
pub fn search_mates(kmer_index: &KmerIndex, sequence: &str, kmer_size: usize) -> Vec<usize> {
    let mut mates = rank_mates(kmer_index, sequence, kmer_size);
    mates.truncate(BEST_MATES);
    mates
}

/// Distinct elements, in no particular order.
pub fn get_unique<T, I>(items: I) -> AHashSet<T>
where
    T: Eq + Hash,
    I: IntoIterator<Item = T>,
{
    items.into_iter().collect()
}

/// Elements of `first` also present in `second`, in `first`'s order.
pub fn common<T>(first: &[T], second: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let lookup: AHashSet<&T> = second.iter().collect();
    first
        .iter()
        .filter(|item| lookup.contains(item))
        .cloned()
        .collect()
}
