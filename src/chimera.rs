//src/chimera.rs

use std::vec;

use crate::align::GlobalAligner;
use crate::config::AgcConfig;
use crate::dereplication::dereplication_fulllength;
use crate::error::{AgcError, Result};
use crate::kmer::{get_unique_kmer, search_mates, KmerIndex};
use crate::types::{DereplicatedRecord, IdentityMatrix, IdentityRow};

/// Fewer chunks than this make the parent vote meaningless.
pub const MIN_CHUNKS: usize = 4;

/// What the filter does with a candidate it cannot cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkingFailurePolicy {
    /// Treat the candidate as non-chimeric and keep it.
    #[default]
    KeepCandidate,
    /// Yield the chunking error, which ends the run.
    Abort,
}

/// Tuning knobs of the chimera vote.
#[derive(Debug, Clone, PartialEq)]
pub struct ChimeraParams {
    /// Mean per-chunk standard deviation of the two identities must exceed this.
    pub std_threshold: f64,
    /// Chunks each parent must win for the sequence to count as a chimera.
    pub min_votes_per_parent: usize,
    pub chunking_failure: ChunkingFailurePolicy,
}

impl Default for ChimeraParams {
    fn default() -> Self {
        Self {
            std_threshold: 5.0,
            min_votes_per_parent: 1,
            chunking_failure: ChunkingFailurePolicy::default(),
        }
    }
}

/// Cut `sequence` into `len / chunk_size` pieces of exactly `chunk_size`.
///
/// The length has to be a multiple of `chunk_size` and give at least
/// `MIN_CHUNKS` pieces.
pub fn get_chunks(sequence: &str, chunk_size: usize) -> Result<Vec<&str>> {
    let len = sequence.len();
    let invalid = |reason| AgcError::InvalidChunking {
        len,
        chunk_size,
        reason,
    };

    if chunk_size == 0 {
        return Err(invalid("chunk size must be positive"));
    }
    if len % chunk_size != 0 {
        return Err(invalid("length is not a multiple of the chunk size"));
    }
    if len / chunk_size < MIN_CHUNKS {
        return Err(invalid("fewer than 4 chunks"));
    }

    (0..len)
        .step_by(chunk_size)
        .map(|start| {
            sequence
                .get(start..start + chunk_size)
                .ok_or_else(|| invalid("chunk boundary splits a character"))
        })
        .collect()
}

/// Sample standard deviation of the two values of a row.
#[inline]
fn row_std(row: &IdentityRow) -> f64 {
    (row[0] - row[1]).abs() / std::f64::consts::SQRT_2
}

/// Decide whether the chunk identities against two parents describe a chimera.
///
/// Two conditions must hold: the mean per-row standard deviation exceeds
/// `std_threshold`, and each parent is strictly best on at least
/// `min_votes_per_parent` chunks. A matrix where one parent wins every
/// chunk is never a chimera, whatever its spread.
pub fn detect_chimera(perc_identity_matrix: &[IdentityRow], params: &ChimeraParams) -> bool {
    if perc_identity_matrix.is_empty() {
        return false;
    }

    let mean_std = perc_identity_matrix.iter().map(row_std).sum::<f64>()
        / perc_identity_matrix.len() as f64;

    let votes_first = perc_identity_matrix.iter().filter(|r| r[0] > r[1]).count();
    let votes_second = perc_identity_matrix.iter().filter(|r| r[1] > r[0]).count();
    let min_votes = params.min_votes_per_parent.max(1);

    mean_std > params.std_threshold && votes_first >= min_votes && votes_second >= min_votes
}

/// Align every chunk of `candidate` with the same chunk of each parent and
/// collect the gap-aware identities, one row per chunk.
///
/// When chunk counts differ, only the leading common chunks are compared.
pub fn chunk_identity_matrix<A: GlobalAligner>(
    aligner: &A,
    candidate: &str,
    parents: [&str; 2],
    chunk_size: usize,
) -> Result<IdentityMatrix> {
    let chunks = get_chunks(candidate, chunk_size)?;
    let first = get_chunks(parents[0], chunk_size)?;
    let second = get_chunks(parents[1], chunk_size)?;

    chunks
        .iter()
        .zip(first.iter().zip(second.iter()))
        .map(|(chunk, (a, b))| {
            Ok([
                aligner.align(chunk, a)?.identity(),
                aligner.align(chunk, b)?.identity(),
            ])
        })
        .collect()
}

/// Abundance-ordered records with de novo chimeras removed.
///
/// Every record is checked against the two sequences, among those already
/// kept, that share the most k-mers with it. Survivors are yielded in input
/// order and join the k-mer index.
pub struct ChimeraFilter<I, A> {
    records: I,
    aligner: A,
    chunk_size: usize,
    kmer_size: usize,
    params: ChimeraParams,
    kmer_index: KmerIndex,
    accepted: Vec<String>,
    examined: usize,
    removed: usize,
    unchecked: usize,
}

impl<I, A> ChimeraFilter<I, A>
where
    I: Iterator<Item = DereplicatedRecord>,
    A: GlobalAligner,
{
    pub fn new<R>(records: R, aligner: A, chunk_size: usize, kmer_size: usize, params: ChimeraParams) -> Self
    where
        R: IntoIterator<IntoIter = I>,
    {
        Self {
            records: records.into_iter(),
            aligner,
            chunk_size,
            kmer_size,
            params,
            kmer_index: KmerIndex::new(),
            accepted: Vec::new(),
            examined: 0,
            removed: 0,
            unchecked: 0,
        }
    }

    /// Number of records pulled from the input so far.
    pub fn examined(&self) -> usize {
        self.examined
    }

    /// Number of chimeras dropped so far.
    pub fn removed(&self) -> usize {
        self.removed
    }

    /// Number of sequences kept without a chimera check because they
    /// could not be cut into chunks.
    pub fn unchecked(&self) -> usize {
        self.unchecked
    }

    /// Sequences kept so far; their positions are the ids in the k-mer index.
    pub fn accepted(&self) -> &[String] {
        &self.accepted
    }

    pub fn kmer_index(&self) -> &KmerIndex {
        &self.kmer_index
    }

    fn is_chimera(&mut self, sequence: &str) -> Result<bool> {
        let mates = search_mates(&self.kmer_index, sequence, self.kmer_size);
        if mates.len() < 2 {
            return Ok(false);
        }
        let parents = [
            self.accepted[mates[0]].as_str(),
            self.accepted[mates[1]].as_str(),
        ];

        match chunk_identity_matrix(&self.aligner, sequence, parents, self.chunk_size) {
            Ok(matrix) => {
                let chimera = detect_chimera(&matrix, &self.params);
                if chimera {
                    log::debug!("Chimera of mates {} and {}: {:?}", mates[0], mates[1], matrix);
                }
                Ok(chimera)
            }
            Err(e @ AgcError::InvalidChunking { .. }) => match self.params.chunking_failure {
                ChunkingFailurePolicy::KeepCandidate => {
                    log::debug!("Keeping sequence without chimera check: {}", e);
                    self.unchecked += 1;
                    Ok(false)
                }
                ChunkingFailurePolicy::Abort => Err(e),
            },
            Err(e) => Err(e),
        }
    }

    fn accept(&mut self, sequence: &str) {
        let id = self.accepted.len();
        get_unique_kmer(&mut self.kmer_index, sequence, id, self.kmer_size);
        self.accepted.push(sequence.to_string());
    }
}

impl<I, A> Iterator for ChimeraFilter<I, A>
where
    I: Iterator<Item = DereplicatedRecord>,
    A: GlobalAligner,
{
    type Item = Result<DereplicatedRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = self.records.next()?;
            self.examined += 1;
            match self.is_chimera(&record.sequence) {
                Ok(true) => self.removed += 1,
                Ok(false) => {
                    self.accept(&record.sequence);
                    return Some(Ok(record));
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Dereplicate the configured amplicon file and strip its chimeras.
pub fn chimera_removal<A: GlobalAligner>(
    config: &AgcConfig,
    aligner: A,
) -> Result<ChimeraFilter<vec::IntoIter<DereplicatedRecord>, A>> {
    let records = dereplication_fulllength(&config.amplicon_file, config.minseqlen, config.mincount)?;
    Ok(ChimeraFilter::new(
        records,
        aligner,
        config.chunk_size,
        config.kmer_size,
        config.chimera.clone(),
    ))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::align::NeedlemanWunsch;

    pub(crate) const S000387216: &str = "GGAGGCTCGTACCGCTGTCTTGTTAAGGACTGGTTTTTTACTGTCTATACAGACTCTTCATACTACTGGATATCCTGATATGCGTTCGGATCGATTGTTGCCGTACGCTGTGTCGATTAAAGGTAATCATAAGGGCTTTCGACTTACGACTC";
    pub(crate) const S000001688: &str = "AAGACGCTTGGGTTTCACTCCTGCGCTTCGGCCGGGCCCGGCACTCGCCACAGTCTCGAGCGTCGTCTTGATGTTCACATGTAACGATCGCTTCCAACCCATCCGGTGCTGTGTCGCCGGGCACGGCTTGGGAATTAACTATTCCCAAGTCT";
    pub(crate) const CHIMERA_AJ007403: &str = "AAGACGCTTGGGTTTCACTCCTGCGCTTCGGCCGGGCCCGGCACTCGCCACAGTCTCGAGCGTCGTCTTGATGTTCACATTGCGTTCGGATCGATTGTTGCCGTACGCCTGTGTCATTAAAGGTAATCATAAGGGCTTTCGACTTACGACTC";

    /// S000387216 with a single substitution at position 70.
    pub(crate) fn point_mutant() -> String {
        let mut bytes = S000387216.as_bytes().to_vec();
        bytes[70] = if bytes[70] == b'A' { b'C' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    fn records() -> Vec<DereplicatedRecord> {
        vec![
            DereplicatedRecord::new(S000387216, 10),
            DereplicatedRecord::new(S000001688, 8),
            DereplicatedRecord::new(CHIMERA_AJ007403, 5),
            DereplicatedRecord::new(point_mutant(), 4),
        ]
    }

    #[test]
    fn test_get_chunks() {
        let seq = format!("{}{}", S000387216, &S000001688[..48]);
        let seq = seq.as_str();
        assert_eq!(seq.len(), 200);
        assert!(matches!(get_chunks(seq, 80), Err(AgcError::InvalidChunking { .. })));
        let chunks = get_chunks(seq, 50).unwrap();
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0], &seq[0..50]);
        assert_eq!(chunks[1], &seq[50..100]);
        assert_eq!(chunks.concat(), seq);
        assert_eq!(get_chunks(seq, 25).unwrap().len(), 8);
    }

    #[test]
    fn test_get_chunks_needs_four_pieces() {
        let seq = "ACGTACGTACGT";
        assert!(get_chunks(seq, 4).is_err());
        assert!(get_chunks(seq, 3).is_ok());
        assert!(get_chunks(seq, 0).is_err());
        assert!(get_chunks("", 1).is_err());
    }

    #[test]
    fn test_detect_chimera() {
        let params = ChimeraParams::default();
        // second parent wins everywhere, spread is small
        assert!(!detect_chimera(
            &[[73.58, 73.79], [72.97, 77.06], [77.36, 80.58], [78.43, 78.43]],
            &params
        ));
        // large spread but a single winning parent
        assert!(!detect_chimera(
            &[[62.6, 94.17], [62.6, 94.17], [62.6, 94.17], [62.6, 94.17]],
            &params
        ));
        assert!(detect_chimera(
            &[[98.0, 60.0], [100.0, 65.0], [100.0, 63.0], [64.0, 100.0]],
            &params
        ));
    }

    #[test]
    fn test_detect_chimera_thresholds_are_tunable() {
        let matrix = [[98.0, 60.0], [100.0, 65.0], [100.0, 63.0], [64.0, 100.0]];
        let strict_spread = ChimeraParams {
            std_threshold: 40.0,
            ..ChimeraParams::default()
        };
        assert!(!detect_chimera(&matrix, &strict_spread));
        let two_votes = ChimeraParams {
            min_votes_per_parent: 2,
            ..ChimeraParams::default()
        };
        assert!(!detect_chimera(&matrix, &two_votes));
        assert!(!detect_chimera(&[], &ChimeraParams::default()));
    }

    #[test]
    fn test_detect_chimera_on_aligned_chunks() {
        let aligner = NeedlemanWunsch::default();
        let matrix = chunk_identity_matrix(
            &aligner,
            CHIMERA_AJ007403,
            [S000387216, S000001688],
            38,
        )
        .unwrap();
        assert_eq!(matrix.len(), 4);
        // the first half follows the second parent, the second half the first
        assert!(matrix[0][1] > matrix[0][0]);
        assert!(matrix[3][0] > matrix[3][1]);
        assert!(detect_chimera(&matrix, &ChimeraParams::default()));
    }

    #[test]
    fn test_filter_removes_chimera_and_keeps_order() {
        let mut filter = ChimeraFilter::new(records(), NeedlemanWunsch::default(), 38, 8, ChimeraParams::default());
        let kept: Vec<DereplicatedRecord> = filter.by_ref().collect::<Result<_>>().unwrap();
        let counts: Vec<usize> = kept.iter().map(|r| r.count).collect();
        assert_eq!(counts, vec![10, 8, 4]);
        assert_eq!(kept[0].sequence, S000387216);
        assert_eq!(kept[2].sequence, point_mutant());
        assert_eq!(filter.removed(), 1);
        assert_eq!(filter.examined(), 4);
        assert_eq!(filter.unchecked(), 0);
        assert_eq!(filter.accepted().len(), 3);
        assert!(filter.kmer_index().values().all(|ids| ids.iter().all(|&id| id < 3)));
    }

    #[test]
    fn test_filter_accepts_without_two_mates() {
        let records = vec![
            DereplicatedRecord::new("AAAAAAAAAAAAAAAA", 9),
            DereplicatedRecord::new("CCCCCCCCCCCCCCCC", 7),
            DereplicatedRecord::new("AAAAAAAACCCCCCCC", 5),
        ];
        // the third record has two mates but cannot be chunked by 5
        let kept: Vec<_> = ChimeraFilter::new(records, NeedlemanWunsch::default(), 5, 4, ChimeraParams::default())
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(kept.len(), 3);
    }

    #[test]
    fn test_filter_abort_policy_propagates_chunking_error() {
        let params = ChimeraParams {
            chunking_failure: ChunkingFailurePolicy::Abort,
            ..ChimeraParams::default()
        };
        let mut filter = ChimeraFilter::new(records(), NeedlemanWunsch::default(), 40, 8, params);
        assert!(filter.next().unwrap().is_ok());
        assert!(filter.next().unwrap().is_ok());
        assert!(matches!(filter.next(), Some(Err(AgcError::InvalidChunking { .. }))));
    }

    #[test]
    fn test_filter_keep_policy_keeps_unchunkable_records() {
        let mut filter = ChimeraFilter::new(records(), NeedlemanWunsch::default(), 40, 8, ChimeraParams::default());
        let kept: Vec<_> = filter.by_ref().collect::<Result<Vec<_>>>().unwrap();
        assert_eq!(kept.len(), 4);
        // the first two records have fewer than two mates and need no chunks
        assert_eq!(filter.unchecked(), 2);
        assert_eq!(filter.removed(), 0);
    }
}
