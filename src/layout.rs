use crate::ReadCause;
use csv_async::ByteRecord;
use std::collections::{HashMap, VecDeque};

/// Name of the column holding each row's source file name.
pub const FILENAME_COLUMN: &str = "filename";

/// The header written once at the top of the merged output.
///
/// Built from the first file that yields a non-empty batch. If that file
/// already has a `filename` column it keeps its position, otherwise one is
/// appended.
#[derive(Debug, Clone)]
pub(crate) struct OutputHeader {
    columns: ByteRecord,
    tag_index: usize,
}

impl OutputHeader {
    pub(crate) fn from_source(source: &ByteRecord) -> Self {
        let existing = source
            .iter()
            .position(|name| name == FILENAME_COLUMN.as_bytes());
        let mut columns = source.clone();
        let tag_index = match existing {
            Some(idx) => idx,
            None => {
                columns.push_field(FILENAME_COLUMN.as_bytes());
                columns.len() - 1
            }
        };
        Self { columns, tag_index }
    }

    pub(crate) fn columns(&self) -> &ByteRecord {
        &self.columns
    }

    pub(crate) fn len(&self) -> usize {
        self.columns.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Source(usize),
    FileName,
    Empty,
}

/// Where each output column of one file's rows comes from.
#[derive(Debug, Clone)]
pub(crate) struct ColumnLayout {
    slots: Vec<Slot>,
}

impl ColumnLayout {
    /// Align `source` columns to `header` by name. The k-th occurrence of a
    /// name maps to the k-th occurrence in the header; header columns the
    /// source lacks stay empty. Source columns missing from the header are
    /// an error.
    pub(crate) fn resolve(source: &ByteRecord, header: &OutputHeader) -> Result<Self, ReadCause> {
        let mut positions: HashMap<&[u8], VecDeque<usize>> = HashMap::new();
        for (idx, name) in source.iter().enumerate() {
            // a source `filename` column is always overwritten
            if name == FILENAME_COLUMN.as_bytes() {
                continue;
            }
            positions.entry(name).or_default().push_back(idx);
        }

        let slots = header
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                if idx == header.tag_index {
                    return Slot::FileName;
                }
                positions
                    .get_mut(name)
                    .and_then(VecDeque::pop_front)
                    .map_or(Slot::Empty, Slot::Source)
            })
            .collect();

        let mut unknown: Vec<(usize, String)> = positions
            .into_iter()
            .flat_map(|(name, rest)| {
                rest.into_iter()
                    .map(move |idx| (idx, String::from_utf8_lossy(name).into_owned()))
            })
            .collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            return Err(ReadCause::UnknownColumns(
                unknown.into_iter().map(|(_, name)| name).collect(),
            ));
        }

        Ok(Self { slots })
    }

    /// Fill `out` with `row` rearranged into output order, tagged with `file_name`.
    /// Fields past the end of a short row come out empty.
    pub(crate) fn project(&self, row: &ByteRecord, file_name: &[u8], out: &mut ByteRecord) {
        out.clear();
        for slot in &self.slots {
            match *slot {
                Slot::Source(idx) => out.push_field(row.get(idx).unwrap_or_default()),
                Slot::FileName => out.push_field(file_name),
                Slot::Empty => out.push_field(b""),
            }
        }
    }
}
