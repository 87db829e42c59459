use std::fmt::Write as FmtWrite;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::types::Otu;

/// Residues per sequence line in the OTU file.
pub const LINE_WIDTH: usize = 80;

/// Render OTUs as FASTA: `>OTU_<rank> occurrence:<count>` followed by the
/// sequence wrapped at `LINE_WIDTH` columns. Ranks start at 1.
pub fn format_otus(otu_list: &[Otu]) -> String {
    let mut output = String::new();
    for (rank, otu) in otu_list.iter().enumerate() {
        writeln!(output, ">OTU_{} occurrence:{}", rank + 1, otu.count).unwrap();
        for line in otu.sequence.as_bytes().chunks(LINE_WIDTH) {
            output.push_str(&String::from_utf8_lossy(line));
            output.push('\n');
        }
    }
    output
}

/// Write the OTU list to `output_file`, replacing any previous content.
pub fn write_otu<P: AsRef<Path>>(otu_list: &[Otu], output_file: P) -> Result<()> {
    fs::write(output_file, format_otus(otu_list))?;
    Ok(())
}
