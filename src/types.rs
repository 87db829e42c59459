//src/types.rs

/// One distinct sequence with the number of reads that carried it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DereplicatedRecord {
    pub sequence: String,
    pub count: usize,
}

impl DereplicatedRecord {
    pub fn new(sequence: impl Into<String>, count: usize) -> Self {
        Self {
            sequence: sequence.into(),
            count,
        }
    }
}

/// An OTU is represented by the first (most abundant) sequence that founded it.
/// Its count is the founder's own count; absorbed sequences never change it.
pub type Otu = DereplicatedRecord;

/// Percent identity of one chunk against (parent A, parent B).
pub type IdentityRow = [f64; 2];

/// One row per chunk index.
pub type IdentityMatrix = Vec<IdentityRow>;

/// Two rows of a global alignment, equal length, `-` as gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedPair {
    pub first: String,
    pub second: String,
}

impl AlignedPair {
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Self {
        Self {
            first: first.into(),
            second: second.into(),
        }
    }
}
