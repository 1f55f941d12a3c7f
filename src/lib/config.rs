use std::num::NonZeroUsize;

/// Largest number of writes the store accepts in one atomic batch.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Member ids resolved per lookup while building a lobby report.
pub const DEFAULT_LOOKUP_BATCH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    pub chunk_size: NonZeroUsize,
    pub lookup_batch: NonZeroUsize,
}

impl PipelineConfig {
    pub fn with_chunk_size(self, chunk_size: NonZeroUsize) -> Self {
        Self { chunk_size, ..self }
    }

    pub fn with_lookup_batch(self, lookup_batch: NonZeroUsize) -> Self {
        Self {
            lookup_batch,
            ..self
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
            lookup_batch: NonZeroUsize::new(DEFAULT_LOOKUP_BATCH).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::PipelineConfig;

    #[test]
    fn defaults_match_store_limits() {
        let sut = PipelineConfig::default();
        assert_eq!(sut.chunk_size.get(), 500);
        assert_eq!(sut.lookup_batch.get(), 10);
    }

    #[test]
    fn builders_replace_single_settings() {
        let sut = PipelineConfig::default().with_chunk_size(NonZeroUsize::new(2).unwrap());
        assert_eq!(sut.chunk_size.get(), 2);
        assert_eq!(sut.lookup_batch.get(), 10);
    }
}
