//! Chunking parameters shared by ingestion and the default splitter.

use serde::Serialize;

use crate::error::{RagError, Result};

/// Characters per chunk unless configured otherwise.
pub const DEFAULT_CHUNK_SIZE: usize = 1000;
/// Characters shared by neighbouring chunks unless configured otherwise.
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

/// Window used to cut documents into chunks.
///
/// Always satisfies `chunk_overlap < chunk_size`, so the splitter makes
/// progress on every window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RagConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl RagConfig {
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] when `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::ConfigError(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_a_thousand_by_a_hundred() {
        let config = RagConfig::default();
        assert_eq!((config.chunk_size(), config.chunk_overlap()), (1000, 100));
        assert_eq!(RagConfig::new(1000, 100).unwrap(), config);
    }

    #[test]
    fn overlap_must_stay_below_size() {
        let err = RagConfig::new(100, 100).unwrap_err();
        assert!(matches!(err, RagError::ConfigError(_)));
        assert!(RagConfig::new(0, 0).is_err());
        assert!(RagConfig::new(10, 0).is_ok());
    }
}
