//src/align.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use ahash::AHashMap;
use bio::alignment::pairwise::Aligner;
use bio::alignment::AlignmentOperation;

use crate::error::{AgcError, Result};
use crate::identity::GAP;
use crate::types::AlignedPair;

/// Produces an optimal global alignment of two sequences.
pub trait GlobalAligner {
    fn align(&self, first: &str, second: &str) -> Result<AlignedPair>;
}

impl<A: GlobalAligner + ?Sized> GlobalAligner for &A {
    fn align(&self, first: &str, second: &str) -> Result<AlignedPair> {
        (**self).align(first, second)
    }
}

/// Residue-pair scores. Pairs missing from the table score as `mismatch`.
#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionMatrix {
    table: AHashMap<(u8, u8), i32>,
    matched: i32,
    mismatch: i32,
}

impl SubstitutionMatrix {
    /// Identity-style matrix: `matched` on the diagonal, `mismatch` elsewhere.
    pub fn match_mismatch(matched: i32, mismatch: i32) -> Self {
        Self {
            table: AHashMap::new(),
            matched,
            mismatch,
        }
    }

    /// Parse a whitespace-separated matrix: a header row of residues, then one
    /// row per residue starting with its letter. `#` starts a comment.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut columns: Option<Vec<u8>> = None;
        let mut table = AHashMap::new();

        for (line_no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();

            let Some(header) = columns.as_ref() else {
                columns = Some(
                    fields
                        .iter()
                        .map(|f| residue(f, line_no + 1))
                        .collect::<Result<_>>()?,
                );
                continue;
            };

            if fields.len() != header.len() + 1 {
                return Err(AgcError::MatrixFormat {
                    line: line_no + 1,
                    detail: format!("expected {} scores, found {}", header.len(), fields.len() - 1),
                });
            }
            let row = residue(fields[0], line_no + 1)?;
            for (&col, value) in header.iter().zip(&fields[1..]) {
                let score: i32 = value.parse().map_err(|_| AgcError::MatrixFormat {
                    line: line_no + 1,
                    detail: format!("'{value}' is not an integer score"),
                })?;
                table.insert((row, col), score);
            }
        }

        if table.is_empty() {
            return Err(AgcError::MatrixFormat {
                line: 0,
                detail: "no scores found".to_string(),
            });
        }
        let matched = table.values().copied().max().unwrap_or(0);
        let mismatch = table.values().copied().min().unwrap_or(0);
        log::debug!("Loaded substitution matrix with {} entries", table.len());

        Ok(Self {
            table,
            matched,
            mismatch,
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    #[inline]
    pub fn score(&self, a: u8, b: u8) -> i32 {
        let key = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
        match self.table.get(&key) {
            Some(&s) => s,
            None if self.table.is_empty() && key.0 == key.1 => self.matched,
            None => self.mismatch,
        }
    }
}

impl Default for SubstitutionMatrix {
    fn default() -> Self {
        Self::match_mismatch(1, -1)
    }
}

fn residue(field: &str, line: usize) -> Result<u8> {
    match field.as_bytes() {
        [b] => Ok(b.to_ascii_uppercase()),
        _ => Err(AgcError::MatrixFormat {
            line,
            detail: format!("'{field}' is not a single residue"),
        }),
    }
}

/// Gap penalties and substitution scores.
///
/// `gap_open` scores the first position of a gap, `gap_extend` every
/// following position.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringScheme {
    pub gap_open: i32,
    pub gap_extend: i32,
    pub matrix: SubstitutionMatrix,
}

pub const DEFAULT_GAP_OPEN: i32 = -1;
pub const DEFAULT_GAP_EXTEND: i32 = -1;

impl Default for ScoringScheme {
    fn default() -> Self {
        Self {
            gap_open: DEFAULT_GAP_OPEN,
            gap_extend: DEFAULT_GAP_EXTEND,
            matrix: SubstitutionMatrix::default(),
        }
    }
}

impl ScoringScheme {
    pub fn validate(&self) -> Result<()> {
        if self.gap_extend > 0 || self.gap_open > self.gap_extend {
            return Err(AgcError::InvalidParameter(format!(
                "gap penalties must satisfy gap_open <= gap_extend <= 0 (got {} / {})",
                self.gap_open, self.gap_extend
            )));
        }
        Ok(())
    }
}

/// Needleman-Wunsch global alignment backed by `bio`'s pairwise aligner.
#[derive(Debug, Clone, Default)]
pub struct NeedlemanWunsch {
    scoring: ScoringScheme,
}

impl NeedlemanWunsch {
    pub fn new(scoring: ScoringScheme) -> Result<Self> {
        scoring.validate()?;
        Ok(Self { scoring })
    }

    pub fn scoring(&self) -> &ScoringScheme {
        &self.scoring
    }
}

impl GlobalAligner for NeedlemanWunsch {
    fn align(&self, first: &str, second: &str) -> Result<AlignedPair> {
        let x = first.as_bytes();
        let y = second.as_bytes();
        let matrix = &self.scoring.matrix;
        // bio charges gap_open once plus gap_extend per position
        let mut aligner = Aligner::with_capacity(
            x.len(),
            y.len(),
            self.scoring.gap_open - self.scoring.gap_extend,
            self.scoring.gap_extend,
            |a: u8, b: u8| matrix.score(a, b),
        );
        let alignment = aligner.global(x, y);
        Ok(render(x, y, &alignment.operations))
    }
}

/// Spell out an operation list as two gapped rows.
fn render(x: &[u8], y: &[u8], operations: &[AlignmentOperation]) -> AlignedPair {
    let mut top = Vec::with_capacity(x.len() + y.len());
    let mut bottom = Vec::with_capacity(x.len() + y.len());
    let (mut i, mut j) = (0usize, 0usize);

    for op in operations {
        match *op {
            AlignmentOperation::Match | AlignmentOperation::Subst => {
                top.push(x[i]);
                bottom.push(y[j]);
                i += 1;
                j += 1;
            }
            AlignmentOperation::Del => {
                top.push(GAP);
                bottom.push(y[j]);
                j += 1;
            }
            AlignmentOperation::Ins => {
                top.push(x[i]);
                bottom.push(GAP);
                i += 1;
            }
            AlignmentOperation::Xclip(n) => {
                top.extend_from_slice(&x[i..i + n]);
                bottom.extend(std::iter::repeat(GAP).take(n));
                i += n;
            }
            AlignmentOperation::Yclip(n) => {
                top.extend(std::iter::repeat(GAP).take(n));
                bottom.extend_from_slice(&y[j..j + n]);
                j += n;
            }
        }
    }

    AlignedPair::new(
        String::from_utf8_lossy(&top).into_owned(),
        String::from_utf8_lossy(&bottom).into_owned(),
    )
}
