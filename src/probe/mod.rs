//! Batch orchestration.
//!
//! Files probe strictly sequentially, and every input yields exactly
//! one record in input order: scan success, extension bypass, read or
//! parse failure, and timeout all funnel into the classifier. A failed
//! file never aborts the batch.

use std::path::{Path, PathBuf};

use clipgate_scan::is_container_extension;

use crate::classify::{self, Policy};
use crate::record::FileRecord;
use crate::scheduler::{ChunkScheduler, ChunkSource, FileSource};
use crate::timeline::ProbeTimeline;

/// Runs a batch of files through scheduler, scanner and classifier.
pub struct BatchRunner {
    policy: Policy,
    scheduler: ChunkScheduler,
    timeline: ProbeTimeline,
}

impl BatchRunner {
    pub fn new(policy: Policy, scheduler: ChunkScheduler) -> Self {
        Self {
            policy,
            scheduler,
            timeline: ProbeTimeline::new(),
        }
    }

    /// Use an externally owned timeline (shared with the bridge).
    pub fn with_timeline(policy: Policy, scheduler: ChunkScheduler, timeline: ProbeTimeline) -> Self {
        Self {
            policy,
            scheduler,
            timeline,
        }
    }

    pub fn timeline(&self) -> &ProbeTimeline {
        &self.timeline
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Probe every input in order. Infallible: failures become error
    /// records.
    pub async fn run(&self, inputs: &[PathBuf]) -> Vec<FileRecord> {
        self.timeline.push(format!(
            "Selected {} file(s). Starting analysis...",
            inputs.len()
        ));

        let mut records = Vec::with_capacity(inputs.len());
        for (i, path) in inputs.iter().enumerate() {
            self.timeline
                .push(format!("Processing file {}: {}", i + 1, path.display()));
            records.push(self.probe_path(path).await);
        }

        self.timeline.push(format!(
            "Analysis complete. Prepared {} result(s).",
            records.len()
        ));
        records
    }

    /// Probe one file on disk.
    pub async fn probe_path(&self, path: &Path) -> FileRecord {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                self.timeline
                    .push(format!("Cannot stat {}: {}", name, e));
                return classify::record_for_error(&name, 0, "File read error", &self.policy);
            }
        };

        if let Some(record) = self.bypass_record(&name, size) {
            return record;
        }

        let mut source = match FileSource::open(path).await {
            Ok(source) => source,
            Err(e) => {
                self.timeline
                    .push(format!("Cannot open {}: {}", name, e));
                return classify::record_for_error(&name, size, "File read error", &self.policy);
            }
        };

        self.probe_container(&name, size, &mut source).await
    }

    /// Probe an already-open source. Applies the same extension bypass
    /// as the path entry point.
    pub async fn probe_source<S: ChunkSource>(&self, name: &str, source: &mut S) -> FileRecord {
        let size = source.len();
        if let Some(record) = self.bypass_record(name, size) {
            return record;
        }
        self.probe_container(name, size, source).await
    }

    /// Classify a `(format, videoCodec, audioCodec)` triple reported by
    /// an external prober. Drop-in alternative to the scanner path.
    pub fn record_from_triple(
        &self,
        name: &str,
        size: u64,
        format: &str,
        video_codec: Option<&str>,
        audio_codec: Option<&str>,
    ) -> FileRecord {
        classify::classify_triple(name, size, format, video_codec, audio_codec, &self.policy)
    }

    /// Extension short-circuit: unsupported families never reach the
    /// scanner and carry no timeout risk.
    fn bypass_record(&self, name: &str, size: u64) -> Option<FileRecord> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if is_container_extension(&ext) {
            return None;
        }
        self.timeline.push(format!(
            "Skipping {} (extension {:?}) - treated as non-container",
            name, ext
        ));
        Some(classify::record_for_unsupported(
            name,
            &ext,
            size,
            &self.policy,
        ))
    }

    async fn probe_container<S: ChunkSource>(
        &self,
        name: &str,
        size: u64,
        source: &mut S,
    ) -> FileRecord {
        match self
            .scheduler
            .probe_source(name, source, &self.timeline)
            .await
        {
            Ok(info) => {
                let record = classify::classify_scan(name, size, &info, &self.policy);
                self.timeline.push(format!(
                    "Parsed {} -> format: {}, video: {}, audio: {}",
                    name, record.format, record.video_codec, record.audio_codec
                ));
                record
            }
            Err(e) => {
                self.timeline.push(format!("Error on {}: {}", name, e));
                classify::record_for_error(name, size, &e.to_string(), &self.policy)
            }
        }
    }
}
