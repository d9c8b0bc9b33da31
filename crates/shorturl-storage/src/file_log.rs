//! Append-only JSONL record log.
//!
//! Every record is one JSON document followed by `\n`. Replay only trusts
//! terminated lines, so a record torn by a crash mid-append is dropped
//! instead of poisoning the whole file.

use async_trait::async_trait;
use shorturl_core::backend::DurableLog;
use shorturl_core::error::Result;
use shorturl_core::Record;
use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, trace, warn};

/// File-backed [`DurableLog`].
///
/// The append handle is shared across calls. When a write fails, the partial
/// line is cut off and the handle dropped; the next append reopens the file
/// and starts on a fresh line, so one bad write costs only its own record.
#[derive(Debug)]
pub struct FileLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl FileLog {
    /// Opens (creating if missing) the log file at `path` for appending.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = open_append(&path).await?;
        debug!(path = %path.display(), "opened record log");

        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    /// Creates a log handle without touching the filesystem.
    ///
    /// The file is opened on the first append.
    pub fn lazy(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
        }
    }

    /// Returns the path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Opens `path` for appending, terminating any unfinished last line first.
///
/// A fragment left by an earlier failed write becomes its own malformed line
/// instead of swallowing the next record.
async fn open_append(path: &Path) -> std::io::Result<File> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .await?;

    let len = file.metadata().await?.len();
    if len > 0 {
        let mut last = [0u8; 1];
        file.seek(SeekFrom::Start(len - 1)).await?;
        file.read_exact(&mut last).await?;
        if last[0] != b'\n' {
            file.write_all(b"\n").await?;
            file.flush().await?;
            debug!(path = %path.display(), "terminated unfinished trailing line");
        }
    }

    Ok(file)
}

async fn write_line(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Cuts the file back to `len` bytes so the next append starts on a fresh line.
async fn truncate(path: &Path, len: u64) -> std::io::Result<()> {
    let file = OpenOptions::new().write(true).open(path).await?;
    file.set_len(len).await
}

/// Decodes every newline-terminated record in `bytes`.
///
/// Bytes after the last `\n` are an unfinished append and are ignored.
/// Malformed lines are skipped with a warning.
fn parse_records(path: &Path, bytes: &[u8]) -> Vec<Record> {
    let (complete, partial) = match bytes.iter().rposition(|b| *b == b'\n') {
        Some(end) => (&bytes[..end], &bytes[end + 1..]),
        None => (&bytes[..0], bytes),
    };

    if !partial.is_empty() {
        debug!(
            path = %path.display(),
            bytes = partial.len(),
            "ignoring unterminated trailing record"
        );
    }

    let mut records = Vec::new();
    for (index, line) in complete.split(|b| *b == b'\n').enumerate() {
        let line_number = index + 1;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let decoded = std::str::from_utf8(line)
            .map_err(|e| e.to_string())
            .and_then(|text| Record::from_json(text).map_err(|e| e.to_string()));

        match decoded {
            Ok(record) => records.push(record),
            Err(error) => warn!(
                path = %path.display(),
                line_number,
                error = %error,
                "skipping malformed record line"
            ),
        }
    }

    records
}

#[async_trait]
impl DurableLog for FileLog {
    async fn append(&self, record: &Record) -> Result<()> {
        let line = record.to_line()?;

        let mut guard = self.file.lock().await;
        let mut file = match guard.take() {
            Some(file) => file,
            None => open_append(&self.path).await?,
        };

        let start = file.metadata().await?.len();
        if let Err(err) = write_line(&mut file, &line).await {
            // Roll back whatever part of the line reached the file.
            if let Err(rollback) = file.set_len(start).await {
                warn!(
                    path = %self.path.display(),
                    error = %rollback,
                    "cannot roll back partial append"
                );
            }
            return Err(err.into());
        }
        *guard = Some(file);

        trace!(
            path = %self.path.display(),
            owner = %record.owner,
            code = %record.key,
            deleted = record.deleted,
            "appended record"
        );
        Ok(())
    }

    async fn replay_all(&self) -> Result<Vec<Record>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                open_append(&self.path).await?;
                debug!(path = %self.path.display(), "created empty record log");
                return Ok(Vec::new());
            }
            Err(err) => return Err(err.into()),
        };

        let records = parse_records(&self.path, &bytes);

        let terminated = bytes
            .iter()
            .rposition(|b| *b == b'\n')
            .map_or(0, |end| end + 1);
        if terminated < bytes.len() {
            if let Err(error) = truncate(&self.path, terminated as u64).await {
                warn!(
                    path = %self.path.display(),
                    error = %error,
                    "cannot drop unterminated trailing record"
                );
            }
        }

        debug!(
            path = %self.path.display(),
            records = records.len(),
            "replayed record log"
        );
        Ok(records)
    }
}
