//! Streaming concatenation of CSV files with a source `filename` column.
//!
//! - Files are read one at a time, in caller order, in batches of at most
//!   `chunk_size` rows; each batch is serialized and emitted before the next
//!   one is read.
//! - The header line is written once, from the first non-empty batch.
//! - A file that cannot be opened or parsed is reported and skipped.
//!
//! Data shape:
//! - `Segment { data, rows, includes_header }`: one serialized batch
//! - `MergeReport { files_merged, files_skipped, rows_written, header_emitted }`
#![cfg_attr(docsrs, feature(doc_cfg))]
//
mod codec;
mod io;
mod layout;
pub mod logging;
mod merge;
mod options;
mod source;

pub use crate::io::{build_csv_reader, reader_from_path, InputFile};
pub use crate::layout::FILENAME_COLUMN;
pub use crate::merge::{Combiner, MergeReport, Segment};
pub use crate::options::{MergeOptions, DEFAULT_CHUNK_SIZE};

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWrite;

/// Why a single input file was skipped.
#[derive(Debug, Error)]
pub enum ReadCause {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv_async::Error),
    #[error("no columns to parse from file")]
    NoColumns,
    #[error("line {line}: expected at most {expected} fields, saw {found}")]
    TooManyFields {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("columns not present in the output header: {}", .0.join(", "))]
    UnknownColumns(Vec<String>),
}

/// A per-file failure. Recoverable: the file is skipped and the run goes on.
#[derive(Debug, Error)]
#[error("error reading file {}: {cause}", .path.display())]
pub struct FileReadError {
    pub path: PathBuf,
    #[source]
    pub cause: ReadCause,
}

impl FileReadError {
    pub fn new(path: &Path, cause: impl Into<ReadCause>) -> Self {
        Self {
            path: path.to_path_buf(),
            cause: cause.into(),
        }
    }
}

/// Error type returned by this crate when not using `anyhow`.
#[derive(Debug, Error)]
pub enum CombineError {
    #[error("no files to combine")]
    NoInput,
    #[error(transparent)]
    FileRead(#[from] FileReadError),
    #[error("chunk size must be a positive integer, got {0}")]
    InvalidChunkSize(usize),
    #[error("unknown input encoding: {0}")]
    UnknownEncoding(String),
    #[error("failed to write output: {0}")]
    Sink(#[source] std::io::Error),
}

impl CombineError {
    /// `NoInput` and `FileRead` are reported and the run continues; anything
    /// else ends it.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CombineError::NoInput | CombineError::FileRead(_))
    }
}

pub type CombineResult<T> = std::result::Result<T, CombineError>;

/// Merge `paths` into `out`, writing one line per skipped file to `diag`.
pub async fn merge_csv_files<I, P, W, D>(
    paths: I,
    options: MergeOptions,
    out: &mut W,
    diag: &mut D,
) -> CombineResult<MergeReport>
where
    I: IntoIterator<Item = P>,
    P: Into<PathBuf>,
    W: AsyncWrite + Unpin,
    D: AsyncWrite + Unpin,
{
    Combiner::new(paths, options).merge_into(out, diag).await
}
