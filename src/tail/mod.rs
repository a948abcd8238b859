//! Live view of a log file that another process is still appending to.
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};


/// Idle wait between polls when no new line is available.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Where a tailer starts reading when the file already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TailFrom {
    /// Only show lines appended after the tailer opened the file.
    #[default]
    End,
    /// Replay everything already in the file first.
    Start,
}

#[derive(Debug, Clone)]
pub struct LogTailer {
    path: PathBuf,
    poll_interval: Duration,
    from: TailFrom,
}

impl LogTailer {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            from: TailFrom::End,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub const fn starting_at(mut self, from: TailFrom) -> Self {
        self.from = from;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream appended lines into `sink` while `is_active` holds, then drain
    /// whatever is left once.
    ///
    /// The sink always receives the whole text seen so far, not just the new
    /// line. A missing or unreadable file is retried quietly and simply shows
    /// as an empty view. Returns the final accumulated text.
    pub async fn stream<A, S>(&self, is_active: A, mut sink: S) -> String
    where
        A: Fn() -> bool,
        S: FnMut(&str),
    {
        let mut text = String::new();
        let mut cursor: Option<BufReader<File>> = None;
        let mut first_open = true;
        // Bytes of the line being read; only complete lines are decoded.
        let mut line = Vec::new();

        while is_active() {
            if cursor.is_none() {
                cursor = self.open(first_open).await;
                first_open = false;
            }
            let Some(reader) = cursor.as_mut() else {
                tokio::time::sleep(self.poll_interval).await;
                continue;
            };
            match read_chunk(reader, &mut line).await {
                Ok(Chunk::Line) => {
                    text.push_str(&String::from_utf8_lossy(&line));
                    line.clear();
                    sink(&text);
                }
                Ok(Chunk::Partial | Chunk::Eof) => tokio::time::sleep(self.poll_interval).await,
                Err(err) => {
                    tracing::debug!("Transient read error on {}: {}", self.path.display(), err);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }

        if cursor.is_none() {
            cursor = self.open(first_open).await;
        }
        if let Some(reader) = cursor.as_mut() {
            let before = text.len();
            loop {
                match read_chunk(reader, &mut line).await {
                    Ok(Chunk::Line) => {
                        text.push_str(&String::from_utf8_lossy(&line));
                        line.clear();
                    }
                    Ok(Chunk::Partial) => {}
                    Ok(Chunk::Eof) => break,
                    Err(err) => {
                        tracing::debug!("Stopped draining {}: {}", self.path.display(), err);
                        break;
                    }
                }
            }
            // The worker is gone, so an unterminated last line is final.
            if !line.is_empty() {
                text.push_str(&String::from_utf8_lossy(&line));
            }
            if text.len() > before {
                sink(&text);
            }
        }

        text
    }

    async fn open(&self, first_open: bool) -> Option<BufReader<File>> {
        let mut file = match File::open(&self.path).await {
            Ok(file) => file,
            Err(err) => {
                tracing::debug!("Log {} not readable yet: {}", self.path.display(), err);
                return None;
            }
        };
        // A file that shows up after we started watching is all new output.
        if first_open && self.from == TailFrom::End {
            if let Err(err) = file.seek(SeekFrom::End(0)).await {
                tracing::debug!("Failed to seek {}: {}", self.path.display(), err);
                return None;
            }
        }
        Some(BufReader::new(file))
    }
}

enum Chunk {
    /// `buf` ends with a newline.
    Line,
    /// End of file reached mid-line; the bytes stay in `buf`.
    Partial,
    Eof,
}

/// Append the next line, or what exists of it so far, to `buf`.
async fn read_chunk(reader: &mut BufReader<File>, buf: &mut Vec<u8>) -> std::io::Result<Chunk> {
    let bytes = reader.read_until(b'\n', buf).await?;
    Ok(if bytes == 0 {
        Chunk::Eof
    } else if buf.ends_with(b"\n") {
        Chunk::Line
    } else {
        Chunk::Partial
    })
}
