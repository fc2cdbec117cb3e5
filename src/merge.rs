use crate::io::InputFile;
use crate::layout::{ColumnLayout, OutputHeader};
use crate::source::{RowBatch, SourceFile};
use crate::{CombineError, CombineResult, FileReadError, MergeOptions};
use bytes::Bytes;
use csv_async::{AsyncWriterBuilder, ByteRecord, Terminator};
use futures::Stream;
use std::path::PathBuf;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// One serialized batch: CSV text for up to `chunk_size` rows, preceded by
/// the header line if this is the first segment of the run.
#[derive(Debug, Clone)]
pub struct Segment {
    data: Bytes,
    rows: usize,
    includes_header: bool,
}

impl Segment {
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Data rows in this segment, header excluded.
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn includes_header(&self) -> bool {
        self.includes_header
    }
}

/// Counters for a finished (or interrupted) run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Files read to the end without error, including header-only ones.
    pub files_merged: usize,
    pub files_skipped: usize,
    pub rows_written: u64,
    pub header_emitted: bool,
}

/// The merge engine. Owns the run-scoped header state and at most one open
/// file at a time.
pub struct Combiner {
    pending: std::vec::IntoIter<InputFile>,
    options: MergeOptions,
    current: Option<SourceFile>,
    /// `None` until the first segment is emitted; the header goes out exactly then.
    header: Option<OutputHeader>,
    started: bool,
    report: MergeReport,
}

impl Combiner {
    pub fn new<I, P>(paths: I, options: MergeOptions) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let inputs: Vec<InputFile> = paths.into_iter().map(InputFile::new).collect();
        Self {
            pending: inputs.into_iter(),
            options,
            current: None,
            header: None,
            started: false,
            report: MergeReport::default(),
        }
    }

    pub fn report(&self) -> &MergeReport {
        &self.report
    }

    /// Pull the next segment.
    ///
    /// Recoverable failures (`NoInput`, `FileRead`) come back as `Err` items;
    /// the offending file is dropped and the following call moves on.
    /// `None` means every input has been consumed.
    pub async fn next_segment(&mut self) -> Option<CombineResult<Segment>> {
        if !self.started {
            self.started = true;
            if self.pending.len() == 0 {
                return Some(Err(CombineError::NoInput));
            }
        }

        loop {
            let mut file = match self.current.take() {
                Some(file) => file,
                None => {
                    let input = self.pending.next()?;
                    match SourceFile::open(input, &self.options).await {
                        Ok(file) => {
                            debug!(
                                path = %file.input.path().display(),
                                columns = file.headers.len(),
                                "opened input"
                            );
                            file
                        }
                        Err(err) => return Some(Err(self.skip(err))),
                    }
                }
            };

            match file.next_batch().await {
                Ok(Some(batch)) => {
                    return match encode(&mut self.header, &mut file, &batch).await {
                        Ok(segment) => {
                            self.report.rows_written += segment.rows as u64;
                            self.report.header_emitted |= segment.includes_header;
                            trace!(
                                file = file.input.name(),
                                rows = segment.rows,
                                bytes = segment.data.len(),
                                "segment ready"
                            );
                            self.current = Some(file);
                            Some(Ok(segment))
                        }
                        Err(CombineError::FileRead(err)) => Some(Err(self.skip(err))),
                        Err(err) => Some(Err(err)),
                    };
                }
                Ok(None) => {
                    debug!(file = file.input.name(), rows = file.rows_read(), "input drained");
                    self.report.files_merged += 1;
                }
                Err(err) => return Some(Err(self.skip(err))),
            }
        }
    }

    fn skip(&mut self, err: FileReadError) -> CombineError {
        debug!(path = %err.path.display(), cause = %err.cause, "skipping input");
        self.report.files_skipped += 1;
        CombineError::FileRead(err)
    }

    /// The run as a lazy, finite stream of segments and recoverable errors.
    pub fn segments(self) -> impl Stream<Item = CombineResult<Segment>> {
        futures::stream::unfold(self, |mut combiner| async move {
            let item = combiner.next_segment().await?;
            Some((item, combiner))
        })
    }

    /// Drive the run to completion: segments go to `out` (flushed one by one),
    /// recoverable errors go to `diag` as one line each.
    ///
    /// Only a write failure on either sink aborts the run.
    pub async fn merge_into<W, D>(mut self, out: &mut W, diag: &mut D) -> CombineResult<MergeReport>
    where
        W: AsyncWrite + Unpin,
        D: AsyncWrite + Unpin,
    {
        while let Some(item) = self.next_segment().await {
            match item {
                Ok(segment) => {
                    out.write_all(&segment.data).await.map_err(CombineError::Sink)?;
                    out.flush().await.map_err(CombineError::Sink)?;
                }
                Err(err) if err.is_recoverable() => {
                    let line = format!("{err}\n");
                    diag.write_all(line.as_bytes()).await.map_err(CombineError::Sink)?;
                    diag.flush().await.map_err(CombineError::Sink)?;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(self.report)
    }
}

/// Serialize `batch` with the `filename` column filled in. The first call of
/// a run fixes the output header from `file` and writes it ahead of the rows.
async fn encode(
    header: &mut Option<OutputHeader>,
    file: &mut SourceFile,
    batch: &RowBatch,
) -> CombineResult<Segment> {
    let includes_header = header.is_none();
    let header = header.get_or_insert_with(|| OutputHeader::from_source(&file.headers));

    let layout = match file.layout.take() {
        Some(layout) => layout,
        None => ColumnLayout::resolve(&file.headers, header)
            .map_err(|cause| FileReadError::new(file.input.path(), cause))?,
    };

    let mut buf = Vec::with_capacity(batch.len() * (header.len() + 1) * 8);
    {
        let mut wtr = AsyncWriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .create_writer(&mut buf);

        if includes_header {
            wtr.write_byte_record(header.columns()).await.map_err(sink_error)?;
        }
        let tag = file.input.name().as_bytes();
        let mut out = ByteRecord::with_capacity(0, header.len());
        for row in batch.rows() {
            layout.project(row, tag, &mut out);
            wtr.write_byte_record(&out).await.map_err(sink_error)?;
        }
        wtr.flush().await.map_err(CombineError::Sink)?;
    }
    file.layout = Some(layout);

    Ok(Segment {
        data: Bytes::from(buf),
        rows: batch.len(),
        includes_header,
    })
}

fn sink_error(err: csv_async::Error) -> CombineError {
    CombineError::Sink(std::io::Error::other(err))
}
