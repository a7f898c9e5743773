//! Chunked feeding of file bytes into the container scanner.
//!
//! One scheduler run covers one file start to finish: sequential
//! single-flight window reads in ascending offset order, an optional
//! early stop when the scanner reports readiness, and a single
//! wall-clock timeout around the whole run. Dropping the run future on
//! timeout cancels the in-flight read; nothing keeps running past the
//! point of failure.

use std::io::SeekFrom;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use clipgate_scan::{Mp4Scanner, ScanError, ScanInfo, ScanProgress};

use crate::timeline::ProbeTimeline;

/// Default window size: 4 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;
/// Default wall-clock budget for one file.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(45);

/// A byte-addressable source of known total length.
#[async_trait]
pub trait ChunkSource: Send {
    /// Total length in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read up to `len` bytes starting at `offset`. A short or empty
    /// result means end of input.
    async fn read_at(&mut self, offset: u64, len: usize) -> std::io::Result<Bytes>;
}

/// [`ChunkSource`] over a file on disk.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub async fn open(path: &Path) -> std::io::Result<Self> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self { file, len })
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read_at(&mut self, offset: u64, len: usize) -> std::io::Result<Bytes> {
        self.file.seek(SeekFrom::Start(offset)).await?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.file.read(&mut buf[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(Bytes::from(buf))
    }
}

/// Why a file's probe failed.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("File read error")]
    Read(#[from] std::io::Error),

    #[error("Container parse error")]
    Parse(#[from] ScanError),

    #[error("Processing timeout")]
    Timeout,
}

/// Per-file progress bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    Reading,
    Ready,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct ParseState {
    /// Offset of the next window to request.
    pub offset: u64,
    /// Total bytes handed to the scanner so far.
    pub bytes_fed: u64,
    pub status: ParseStatus,
}

impl ParseState {
    fn new() -> Self {
        Self {
            offset: 0,
            bytes_fed: 0,
            status: ParseStatus::Reading,
        }
    }
}

/// Drives one file's bytes through the scanner in bounded windows.
#[derive(Debug, Clone)]
pub struct ChunkScheduler {
    pub chunk_size: usize,
    pub timeout: Duration,
}

impl Default for ChunkScheduler {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

fn to_mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

impl ChunkScheduler {
    pub fn new(chunk_size: usize, timeout: Duration) -> Self {
        Self {
            chunk_size,
            timeout,
        }
    }

    /// Probe a single source to a terminal outcome. The timeout covers
    /// the whole run, measured from the first window request.
    pub async fn probe_source<S: ChunkSource>(
        &self,
        name: &str,
        source: &mut S,
        timeline: &ProbeTimeline,
    ) -> Result<ScanInfo, ProbeError> {
        let mut state = ParseState::new();
        let run = self.feed(name, source, timeline, &mut state);
        let outcome = tokio::time::timeout(self.timeout, run).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                state.status = ParseStatus::TimedOut;
                timeline.push(format!(
                    "Timed out probing {} after {:?} ({:.1} MiB read)",
                    name,
                    self.timeout,
                    to_mib(state.bytes_fed)
                ));
                Err(ProbeError::Timeout)
            }
        }
    }

    async fn feed<S: ChunkSource>(
        &self,
        name: &str,
        source: &mut S,
        timeline: &ProbeTimeline,
        state: &mut ParseState,
    ) -> Result<ScanInfo, ProbeError> {
        let total = source.len();
        timeline.push(format!(
            "Chunked scan of {}: {:.1} MiB in {:.1} MiB windows",
            name,
            to_mib(total),
            to_mib(self.chunk_size as u64)
        ));

        let mut scanner = Mp4Scanner::new();
        let mut chunk_count = 0u64;

        while state.offset < total {
            let want = self
                .chunk_size
                .min((total - state.offset) as usize);
            let chunk = match source.read_at(state.offset, want).await {
                Ok(chunk) => chunk,
                Err(e) => {
                    state.status = ParseStatus::Failed;
                    timeline.push(format!("Read error on {} at offset {}: {}", name, state.offset, e));
                    return Err(ProbeError::Read(e));
                }
            };
            if chunk.is_empty() {
                // Source shorter than declared; let flush decide.
                break;
            }

            chunk_count += 1;
            let fed_to = state.offset + chunk.len() as u64;
            if chunk_count == 1 || fed_to >= total || chunk_count % 5 == 0 {
                timeline.push(format!(
                    "Read chunk {} ({:.1} of {:.1} MiB)",
                    chunk_count,
                    to_mib(fed_to.min(total)),
                    to_mib(total)
                ));
            }

            match scanner.push(state.offset, &chunk) {
                Ok(ScanProgress::Ready(info)) => {
                    state.bytes_fed += chunk.len() as u64;
                    state.status = ParseStatus::Ready;
                    timeline.push(format!(
                        "Metadata complete for {} after {:.1} MiB; skipping remaining {:.1} MiB",
                        name,
                        to_mib(state.bytes_fed),
                        to_mib(total.saturating_sub(fed_to))
                    ));
                    return Ok(info);
                }
                Ok(ScanProgress::NeedMore) => {}
                Err(e) => {
                    state.status = ParseStatus::Failed;
                    timeline.push(format!("Scan error on {}: {}", name, e));
                    return Err(ProbeError::Parse(e));
                }
            }

            state.offset = fed_to;
            state.bytes_fed += chunk.len() as u64;
        }

        // End of input: flush.
        match scanner.flush() {
            Ok(info) => {
                state.status = ParseStatus::Ready;
                timeline.push(format!("Scan of {} complete at end of input", name));
                Ok(info)
            }
            Err(e) => {
                state.status = ParseStatus::Failed;
                timeline.push(format!("Scan error on {}: {}", name, e));
                Err(ProbeError::Parse(e))
            }
        }
    }
}
