use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::error::Result;

/// Lazily assembled FASTA sequences.
///
/// Header lines (starting with `>`) delimit records; every other line up to
/// the next header is stripped and concatenated. Records shorter than
/// `minseqlen` are dropped, including the last one. The file handle is held
/// until the iterator is dropped or exhausted.
pub struct FastaSequences {
    reader: Option<Box<dyn BufRead>>,
    minseqlen: usize,
    line: String,
    current: Option<String>,
}

/// Leading bytes of every gzip member.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Open a FASTA file and return the sequences of at least `minseqlen`
/// residues. Gzip input is recognised by its magic bytes, whatever the
/// file is named; anything else is read as plain text.
pub fn read_fasta<P: AsRef<Path>>(amplicon_file: P, minseqlen: usize) -> Result<FastaSequences> {
    let mut f = BufReader::new(File::open(amplicon_file.as_ref())?);

    let is_gz = f.fill_buf()?.starts_with(&GZIP_MAGIC);

    let reader: Box<dyn BufRead> = if is_gz {
        Box::new(BufReader::new(MultiGzDecoder::new(f)))
    } else {
        Box::new(f)
    };

    Ok(FastaSequences::new(reader, minseqlen))
}

impl FastaSequences {
    pub fn new(reader: Box<dyn BufRead>, minseqlen: usize) -> Self {
        Self {
            reader: Some(reader),
            minseqlen,
            line: String::new(),
            current: None,
        }
    }

    /// Hand out the buffered record if it is long enough.
    fn take_current(&mut self) -> Option<String> {
        self.current
            .take()
            .filter(|seq| !seq.is_empty() && seq.len() >= self.minseqlen)
    }
}

impl Iterator for FastaSequences {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let reader = self.reader.as_mut()?;
            self.line.clear();
            let read = match reader.read_line(&mut self.line) {
                Ok(n) => n,
                Err(e) => {
                    self.reader = None;
                    return Some(Err(e.into()));
                }
            };

            if read == 0 {
                // EOF: release the file, then flush the last record
                self.reader = None;
                return self.take_current().map(Ok);
            }

            if self.line.trim_start().starts_with('>') {
                let finished = self.take_current();
                self.current = Some(String::new());
                if let Some(seq) = finished {
                    return Some(Ok(seq));
                }
            } else {
                self.current
                    .get_or_insert_with(String::new)
                    .push_str(self.line.trim());
            }
        }
    }
}
