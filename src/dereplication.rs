use std::path::Path;
use std::vec;

use ahash::AHashMap;

use crate::error::Result;
use crate::fasta::read_fasta;
use crate::types::DereplicatedRecord;

/// Collapse identical sequences into `(sequence, count)` records.
///
/// The whole input is buffered. Records with `count < mincount` never appear;
/// the rest come out by decreasing count, equal counts keeping the order in
/// which their sequence was first seen.
pub fn dereplicate<I>(sequences: I, mincount: usize) -> Result<vec::IntoIter<DereplicatedRecord>>
where
    I: IntoIterator<Item = Result<String>>,
{
    let mut first_seen: AHashMap<String, usize> = AHashMap::new();
    let mut records: Vec<DereplicatedRecord> = Vec::new();

    for seq in sequences {
        let seq = seq?;
        match first_seen.get(&seq) {
            Some(&slot) => records[slot].count += 1,
            None => {
                first_seen.insert(seq.clone(), records.len());
                records.push(DereplicatedRecord::new(seq, 1));
            }
        }
    }

    let distinct = records.len();
    records.retain(|r| r.count >= mincount);
    // stable: ties stay in first-seen order
    records.sort_by(|a, b| b.count.cmp(&a.count));

    log::info!(
        "Dereplicated {} distinct sequences, {} with at least {} copies",
        distinct,
        records.len(),
        mincount
    );

    Ok(records.into_iter())
}

/// Read `amplicon_file` and dereplicate the sequences of at least `minseqlen` residues.
pub fn dereplication_fulllength<P: AsRef<Path>>(
    amplicon_file: P,
    minseqlen: usize,
    mincount: usize,
) -> Result<vec::IntoIter<DereplicatedRecord>> {
    dereplicate(read_fasta(amplicon_file, minseqlen)?, mincount)
}
