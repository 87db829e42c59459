// src/lib.rs
pub mod align;
pub mod chimera;
pub mod clustering;
pub mod config;
pub mod dereplication;
pub mod error;
pub mod fasta;
pub mod identity;
pub mod kmer;
pub mod otu;
pub mod types;

use crate::align::{NeedlemanWunsch, ScoringScheme};
use crate::chimera::chimera_removal;
use crate::clustering::abundance_greedy_clustering;
use crate::config::AgcConfig;
use crate::error::Result;
use crate::otu::{format_otus, write_otu};
use crate::types::Otu;

/// Counters gathered along one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusteringStats {
    /// Records that passed the length and count filters.
    pub dereplicated: usize,
    pub chimeras_removed: usize,
    /// Records kept without a chimera check because they could not be chunked.
    pub chimera_unchecked: usize,
    pub otus: usize,
}

/// Result of one clustering run. The FASTA text is generated on demand.
#[derive(Debug, Clone)]
pub struct ClusteringResults {
    /// OTU representatives, most abundant first.
    pub otus: Vec<Otu>,
    pub stats: ClusteringStats,
}

impl ClusteringResults {
    /// The OTU file content.
    pub fn get_otu_fasta(&self) -> String {
        format_otus(&self.otus)
    }

    /// Write the OTUs to `config.output_file`.
    pub fn write(&self, config: &AgcConfig) -> Result<()> {
        write_otu(&self.otus, &config.output_file)
    }
}

/// Dereplicate, remove chimeras and cluster the amplicons of `config`.
///
/// The configuration is validated first; an invalid one fails before the
/// input is opened.
pub fn cluster_amplicons(config: &AgcConfig) -> Result<ClusteringResults> {
    config.validate()?;
    let aligner = NeedlemanWunsch::new(config.scoring.clone())?;

    let mut chimera_free = chimera_removal(config, &aligner)?;
    let otus = abundance_greedy_clustering(
        chimera_free.by_ref(),
        &aligner,
        config.identity_threshold,
    )?;

    let stats = ClusteringStats {
        dereplicated: chimera_free.examined(),
        chimeras_removed: chimera_free.removed(),
        chimera_unchecked: chimera_free.unchecked(),
        otus: otus.len(),
    };
    if stats.chimera_unchecked > 0 {
        log::warn!(
            "{} sequences not checked for chimeras: not cut into chunks of {}",
            stats.chimera_unchecked,
            config.chunk_size
        );
    }
    log::info!(
        "{} dereplicated sequences, {} chimeras removed, {} OTUs",
        stats.dereplicated,
        stats.chimeras_removed,
        stats.otus
    );

    Ok(ClusteringResults { otus, stats })
}

/// Build the scoring scheme, optionally loading the substitution matrix from a file.
pub fn scoring_scheme(
    matrix_file: Option<&std::path::Path>,
    gap_open: i32,
    gap_extend: i32,
) -> Result<ScoringScheme> {
    let matrix = match matrix_file {
        Some(path) => align::SubstitutionMatrix::from_file(path)?,
        None => align::SubstitutionMatrix::default(),
    };
    let scoring = ScoringScheme {
        gap_open,
        gap_extend,
        matrix,
    };
    scoring.validate()?;
    Ok(scoring)
}
