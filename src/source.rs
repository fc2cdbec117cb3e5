use crate::io::{reader_from_path, InputFile, READ_BUFFER_CAPACITY};
use crate::layout::ColumnLayout;
use crate::{FileReadError, MergeOptions, ReadCause};
use csv_async::{AsyncReader, AsyncReaderBuilder, ByteRecord};
use tokio::io::AsyncRead;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Upper bound on rows preallocated per batch, so a huge `chunk_size`
/// does not reserve memory a small file never uses.
const BATCH_PREALLOC: usize = 4096;

/// Up to `chunk_size` rows read from one file, in file order.
#[derive(Debug, Default)]
pub(crate) struct RowBatch {
    rows: Vec<ByteRecord>,
}

impl RowBatch {
    pub(crate) fn rows(&self) -> &[ByteRecord] {
        &self.rows
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }
}

/// An open input file being drained batch by batch.
pub(crate) struct SourceFile {
    pub(crate) input: InputFile,
    pub(crate) headers: ByteRecord,
    /// Resolved against the run header on this file's first batch.
    pub(crate) layout: Option<ColumnLayout>,
    reader: AsyncReader<Box<dyn AsyncRead + Unpin + Send>>,
    chunk_size: usize,
    rows_read: u64,
    exhausted: bool,
}

impl SourceFile {
    /// Open `input` and read its header row.
    pub(crate) async fn open(
        input: InputFile,
        options: &MergeOptions,
    ) -> Result<Self, FileReadError> {
        let raw = reader_from_path(input.path(), options.charset())
            .await
            .map_err(|e| FileReadError::new(input.path(), e))?;

        let mut reader = AsyncReaderBuilder::new()
            .has_headers(true)
            // ragged rows are checked against the header width below
            .flexible(true)
            .buffer_capacity(READ_BUFFER_CAPACITY)
            .create_reader(raw);

        let mut headers = reader
            .byte_headers()
            .await
            .map_err(|e| FileReadError::new(input.path(), e))?
            .clone();
        strip_bom(&mut headers);

        if headers.is_empty() || (headers.len() == 1 && headers.get(0) == Some(&b""[..])) {
            return Err(FileReadError::new(input.path(), ReadCause::NoColumns));
        }

        Ok(Self {
            input,
            headers,
            layout: None,
            reader,
            chunk_size: options.chunk_size(),
            rows_read: 0,
            exhausted: false,
        })
    }

    /// Next batch of at most `chunk_size` rows, or `None` once the file is drained.
    /// Never returns an empty batch.
    pub(crate) async fn next_batch(&mut self) -> Result<Option<RowBatch>, FileReadError> {
        if self.exhausted {
            return Ok(None);
        }

        let width = self.headers.len();
        let mut rows = Vec::with_capacity(self.chunk_size.min(BATCH_PREALLOC));
        let mut record = ByteRecord::new();
        while rows.len() < self.chunk_size {
            let more = self
                .reader
                .read_byte_record(&mut record)
                .await
                .map_err(|e| FileReadError::new(self.input.path(), e))?;
            if !more {
                self.exhausted = true;
                break;
            }
            self.rows_read += 1;

            if record.len() > width {
                // header is line 1
                let line = record
                    .position()
                    .map_or(self.rows_read + 1, |pos| pos.line());
                return Err(FileReadError::new(
                    self.input.path(),
                    ReadCause::TooManyFields {
                        line,
                        expected: width,
                        found: record.len(),
                    },
                ));
            }
            rows.push(record.clone());
        }

        if rows.is_empty() {
            return Ok(None);
        }
        Ok(Some(RowBatch { rows }))
    }

    pub(crate) fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

fn strip_bom(headers: &mut ByteRecord) {
    let first = match headers.get(0) {
        Some(field) if field.starts_with(UTF8_BOM) => field[UTF8_BOM.len()..].to_vec(),
        _ => return,
    };
    let mut fixed = ByteRecord::with_capacity(headers.as_slice().len(), headers.len());
    fixed.push_field(&first);
    for field in headers.iter().skip(1) {
        fixed.push_field(field);
    }
    *headers = fixed;
}
