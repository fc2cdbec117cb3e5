use crate::{CombineError, CombineResult};
use std::num::NonZeroUsize;

/// Rows held in memory per batch unless overridden.
pub const DEFAULT_CHUNK_SIZE: usize = 100_000;

/// Knobs for one merge run.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    chunk_size: NonZeroUsize,
    charset: &'static encoding_rs::Encoding,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            chunk_size: NonZeroUsize::new(DEFAULT_CHUNK_SIZE).unwrap_or(NonZeroUsize::MIN),
            charset: encoding_rs::UTF_8,
        }
    }
}

impl MergeOptions {
    /// Rejects a zero chunk size.
    pub fn new(chunk_size: usize) -> CombineResult<Self> {
        let chunk_size =
            NonZeroUsize::new(chunk_size).ok_or(CombineError::InvalidChunkSize(chunk_size))?;
        Ok(Self {
            chunk_size,
            ..Self::default()
        })
    }

    /// Input charset by WHATWG label, e.g. `latin1`, `windows-1252`, `utf-16le`.
    pub fn with_charset_label(mut self, label: &str) -> CombineResult<Self> {
        self.charset = encoding_rs::Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| CombineError::UnknownEncoding(label.to_string()))?;
        Ok(self)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size.get()
    }

    pub fn charset(&self) -> &'static encoding_rs::Encoding {
        self.charset
    }
}
