//! Fixed-size character windows with a fixed overlap.

/// Chunking parameters, measured in chars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 600,
        }
    }
}

impl ChunkerConfig {
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] unless `overlap < chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self, ChunkError> {
        let config = Self {
            chunk_size,
            overlap,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] unless `overlap < chunk_size`.
    pub fn validate(&self) -> Result<(), ChunkError> {
        if self.overlap >= self.chunk_size {
            return Err(ChunkError::InvalidConfig {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.overlap
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("invalid chunking config: overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidConfig { chunk_size: usize, overlap: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Position in the chunk sequence.
    pub index: usize,
    /// Char offset of the first char in the source text.
    pub offset: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct TextSplitter {
    config: ChunkerConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`ChunkError::InvalidConfig`] if the config is invalid.
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> ChunkerConfig {
        self.config
    }

    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        split_windows(text, self.config)
    }
}

/// Split `text` into windows of at most `chunk_size` chars, each starting `overlap`
/// chars before the previous one ended.
///
/// Text no longer than `chunk_size` yields a single chunk; empty text yields none.
///
/// # Errors
///
/// Returns [`ChunkError::InvalidConfig`] unless `overlap < chunk_size`.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<Chunk>, ChunkError> {
    let config = ChunkerConfig::new(chunk_size, overlap)?;
    Ok(split_windows(text, config))
}

fn split_windows(text: &str, config: ChunkerConfig) -> Vec<Chunk> {
    // Byte offset of every char start, plus the end of the text.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = bounds.len() - 1;
    if char_count == 0 {
        return Vec::new();
    }

    let step = config.step();
    let mut chunks = Vec::with_capacity(char_count.div_ceil(step));
    let mut start = 0;

    loop {
        let end = (start + config.chunk_size).min(char_count);
        chunks.push(Chunk {
            index: chunks.len(),
            offset: start,
            text: text[bounds[start]..bounds[end]].to_owned(),
        });
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}
