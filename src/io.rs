use crate::codec::Transcoder;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;
use tokio_util::io::StreamReader;

/// Larger buffer for fewer syscalls (1 MiB).
pub(crate) const READ_BUFFER_CAPACITY: usize = 1 << 20;

/// A caller-supplied input path and the base name its rows are tagged with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    path: PathBuf,
    name: String,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        // paths like `..` have no file name; fall back to the whole path
        let name = path
            .file_name()
            .unwrap_or(path.as_os_str())
            .to_string_lossy()
            .into_owned();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value of the `filename` column for every row of this file.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// From a generic AsyncRead, wrap with buffering and, when `charset` is not
/// UTF-8, transcoding to UTF-8.
pub fn build_csv_reader<R>(
    raw: R,
    charset: &'static encoding_rs::Encoding,
) -> Box<dyn AsyncRead + Unpin + Send>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let buf = BufReader::with_capacity(READ_BUFFER_CAPACITY, raw);
    if charset == encoding_rs::UTF_8 {
        // No transcoding needed; pass through as bytes
        Box::new(buf)
    } else {
        let framed = FramedRead::new(buf, Transcoder::new(charset));
        Box::new(StreamReader::new(framed))
    }
}

/// Open a local file for CSV reading.
pub async fn reader_from_path(
    path: &Path,
    charset: &'static encoding_rs::Encoding,
) -> std::io::Result<Box<dyn AsyncRead + Unpin + Send>> {
    let file = File::open(path).await?;
    Ok(build_csv_reader(file, charset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_drops_directories() {
        let input = InputFile::new("/data/exports/2024/A.csv");
        assert_eq!(input.name(), "A.csv");
        assert_eq!(input.path(), Path::new("/data/exports/2024/A.csv"));
    }

    #[test]
    fn bare_name_is_its_own_base_name() {
        assert_eq!(InputFile::new("B.csv").name(), "B.csv");
    }
}
