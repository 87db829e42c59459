//src/config.rs

use std::path::PathBuf;

use crate::align::ScoringScheme;
use crate::chimera::ChimeraParams;
use crate::error::{AgcError, Result};

pub const DEFAULT_MINSEQLEN: usize = 400;
pub const DEFAULT_MINCOUNT: usize = 10;
pub const DEFAULT_CHUNK_SIZE: usize = 100;
pub const DEFAULT_KMER_SIZE: usize = 8;
pub const DEFAULT_IDENTITY_THRESHOLD: f64 = 97.0;
pub const DEFAULT_OUTPUT_FILE: &str = "OTU.fasta";

/// Everything one clustering run needs.
#[derive(Debug, Clone)]
pub struct AgcConfig {
    /// Gzip-compressed FASTA of amplicon reads.
    pub amplicon_file: PathBuf,
    /// Shorter sequences are ignored.
    pub minseqlen: usize,
    /// Sequences seen fewer times are ignored.
    pub mincount: usize,
    pub chunk_size: usize,
    pub kmer_size: usize,
    /// Percent identity at or above which a sequence joins an existing OTU.
    pub identity_threshold: f64,
    pub output_file: PathBuf,
    pub chimera: ChimeraParams,
    pub scoring: ScoringScheme,
}

impl Default for AgcConfig {
    fn default() -> Self {
        Self {
            amplicon_file: PathBuf::new(),
            minseqlen: DEFAULT_MINSEQLEN,
            mincount: DEFAULT_MINCOUNT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            kmer_size: DEFAULT_KMER_SIZE,
            identity_threshold: DEFAULT_IDENTITY_THRESHOLD,
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            chimera: ChimeraParams::default(),
            scoring: ScoringScheme::default(),
        }
    }
}

impl AgcConfig {
    pub fn new<P: Into<PathBuf>>(amplicon_file: P) -> Self {
        Self {
            amplicon_file: amplicon_file.into(),
            ..Self::default()
        }
    }

    /// Check the input path and the numeric parameters before any work starts.
    pub fn validate(&self) -> Result<()> {
        if !self.amplicon_file.is_file() {
            return Err(if self.amplicon_file.is_dir() {
                AgcError::InputIsDirectory(self.amplicon_file.clone())
            } else {
                AgcError::InputNotFound(self.amplicon_file.clone())
            });
        }

        let invalid = |msg: String| -> Result<()> { Err(AgcError::InvalidParameter(msg)) };
        if self.kmer_size == 0 {
            return invalid("k-mer size must be at least 1".to_string());
        }
        if self.chunk_size == 0 {
            return invalid("chunk size must be at least 1".to_string());
        }
        if self.mincount == 0 {
            return invalid("minimum count must be at least 1".to_string());
        }
        if !(self.identity_threshold > 0.0 && self.identity_threshold <= 100.0) {
            return invalid(format!(
                "identity threshold must be in (0, 100], got {}",
                self.identity_threshold
            ));
        }
        if self.chimera.min_votes_per_parent == 0 {
            return invalid("each parent needs at least one chunk vote".to_string());
        }
        self.scoring.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AgcConfig::new("reads.fasta.gz");
        assert_eq!(config.minseqlen, 400);
        assert_eq!(config.mincount, 10);
        assert_eq!(config.chunk_size, 100);
        assert_eq!(config.kmer_size, 8);
        assert_eq!(config.output_file, PathBuf::from("OTU.fasta"));
    }

    #[test]
    fn test_missing_input() {
        let dir = tempdir().unwrap();
        let config = AgcConfig::new(dir.path().join("absent.fasta.gz"));
        let err = config.validate().unwrap_err();
        assert!(matches!(err, AgcError::InputNotFound(_)));
        assert_eq!(err.to_string(), "absent.fasta.gz does not exist.");
    }

    #[test]
    fn test_directory_input() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("reads");
        std::fs::create_dir(&sub).unwrap();
        let err = AgcConfig::new(&sub).validate().unwrap_err();
        assert!(matches!(err, AgcError::InputIsDirectory(_)));
        assert_eq!(err.to_string(), "reads is a directory.");
    }

    #[test]
    fn test_bad_parameters() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("reads.fasta.gz");
        std::fs::write(&input, b"").unwrap();

        assert!(AgcConfig::new(&input).validate().is_ok());

        let mut config = AgcConfig::new(&input);
        config.kmer_size = 0;
        assert!(matches!(config.validate(), Err(AgcError::InvalidParameter(_))));

        let mut config = AgcConfig::new(&input);
        config.identity_threshold = 120.0;
        assert!(matches!(config.validate(), Err(AgcError::InvalidParameter(_))));

        let mut config = AgcConfig::new(&input);
        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }
}
