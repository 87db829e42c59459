//src/clustering.rs

use crate::align::GlobalAligner;
use crate::error::Result;
use crate::types::{DereplicatedRecord, Otu};

/// Greedy abundance clustering.
///
/// Records must arrive most abundant first. Each one is aligned, full length,
/// with the OTU representatives in the order they were created; the first one
/// reaching `identity_threshold` (gap-aware percent identity) absorbs it and
/// stays untouched. A record matching no OTU founds a new one with its own
/// count. Any error from the input or the aligner ends the run.
pub fn abundance_greedy_clustering<I, A>(
    records: I,
    aligner: &A,
    identity_threshold: f64,
) -> Result<Vec<Otu>>
where
    I: IntoIterator<Item = Result<DereplicatedRecord>>,
    A: GlobalAligner + ?Sized,
{
    let mut otu_list: Vec<Otu> = Vec::new();
    let mut absorbed = 0usize;

    for record in records {
        let record = record?;
        let mut is_otu = true;
        for otu in &otu_list {
            let identity = aligner.align(&record.sequence, &otu.sequence)?.identity();
            if identity >= identity_threshold {
                is_otu = false;
                break;
            }
        }

        if is_otu {
            otu_list.push(record);
        } else {
            absorbed += 1;
        }
    }

    log::info!(
        "Built {} OTUs, {} sequences absorbed at {}% identity",
        otu_list.len(),
        absorbed,
        identity_threshold
    );
    Ok(otu_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::NeedlemanWunsch;
    use crate::chimera::tests::{point_mutant, S000001688, S000387216};
    use crate::error::AgcError;
    use crate::types::AlignedPair;
    use std::cell::Cell;

    fn ok(records: Vec<DereplicatedRecord>) -> Vec<Result<DereplicatedRecord>> {
        records.into_iter().map(Ok).collect()
    }

    #[test]
    fn test_near_identical_sequence_is_absorbed() {
        let records = ok(vec![
            DereplicatedRecord::new(S000387216, 10),
            DereplicatedRecord::new(S000001688, 8),
            DereplicatedRecord::new(point_mutant(), 4),
        ]);
        let otus = abundance_greedy_clustering(records, &NeedlemanWunsch::default(), 97.0).unwrap();
        assert_eq!(
            otus,
            vec![
                DereplicatedRecord::new(S000387216, 10),
                DereplicatedRecord::new(S000001688, 8),
            ]
        );
    }

    #[test]
    fn test_no_two_otus_reach_the_threshold() {
        let records = ok(vec![
            DereplicatedRecord::new(S000387216, 10),
            DereplicatedRecord::new(point_mutant(), 6),
            DereplicatedRecord::new(S000001688, 5),
        ]);
        let aligner = NeedlemanWunsch::default();
        let otus = abundance_greedy_clustering(records, &aligner, 97.0).unwrap();
        for (i, a) in otus.iter().enumerate() {
            for b in &otus[i + 1..] {
                assert!(aligner.align(&a.sequence, &b.sequence).unwrap().identity() < 97.0);
            }
        }
        assert_eq!(otus.len(), 2);
    }

    /// Every sequence matches everything; counts how often it was asked.
    struct AlwaysIdentical {
        calls: Cell<usize>,
    }

    impl GlobalAligner for AlwaysIdentical {
        fn align(&self, first: &str, _second: &str) -> Result<AlignedPair> {
            self.calls.set(self.calls.get() + 1);
            Ok(AlignedPair::new(first, first))
        }
    }

    #[test]
    fn test_first_match_short_circuits() {
        let aligner = AlwaysIdentical { calls: Cell::new(0) };
        let records = ok(vec![
            DereplicatedRecord::new("AAAA", 3),
            DereplicatedRecord::new("CCCC", 2),
            DereplicatedRecord::new("GGGG", 1),
        ]);
        let otus = abundance_greedy_clustering(records, &aligner, 97.0).unwrap();
        assert_eq!(otus, vec![DereplicatedRecord::new("AAAA", 3)]);
        assert_eq!(aligner.calls.get(), 2);
    }

    #[test]
    fn test_empty_input_gives_no_otu() {
        let otus = abundance_greedy_clustering(Vec::new(), &NeedlemanWunsch::default(), 97.0).unwrap();
        assert!(otus.is_empty());
    }

    #[test]
    fn test_upstream_error_aborts() {
        let records = vec![
            Ok(DereplicatedRecord::new("AAAA", 3)),
            Err(AgcError::InvalidParameter("broken".to_string())),
        ];
        assert!(abundance_greedy_clustering(records, &NeedlemanWunsch::default(), 97.0).is_err());
    }
}
