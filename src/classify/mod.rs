//! Metadata normalization and policy classification.
//!
//! Pure functions from raw container/codec identifiers to a
//! [`FileRecord`]: same inputs, same record, no I/O. Every path that
//! produces a record (scan success, extension bypass, error fallback,
//! external prober triple) funnels through [`Policy::evaluate`] so the
//! three rules are applied uniformly.

use serde::{Deserialize, Serialize};

use clipgate_scan::ScanInfo;

use crate::record::{FileRecord, Flag};

/// Codec value used when a video track is missing or unreadable.
pub const UNKNOWN_CODEC: &str = "unknown";
/// Audio value used when no audio track exists.
pub const NO_AUDIO: &str = "none";
/// Value used for files that bypass the scanner entirely.
pub const NOT_APPLICABLE: &str = "N/A";
/// Format/codec value used for error records.
pub const ERROR_VALUE: &str = "error";

/// Validation policy: three independent rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Policy {
    /// Allowed canonical container formats.
    #[serde(default = "default_allowed_formats")]
    pub allowed_formats: Vec<String>,

    /// Allowed canonical video codecs.
    #[serde(default = "default_allowed_video_codecs")]
    pub allowed_video_codecs: Vec<String>,

    /// Maximum file size in MiB, inclusive.
    #[serde(default = "default_max_size_mib")]
    pub max_size_mib: f64,
}

fn default_allowed_formats() -> Vec<String> {
    ["mp4", "mov"].map(String::from).to_vec()
}

fn default_allowed_video_codecs() -> Vec<String> {
    [
        "h264",
        "avc",
        "hevc",
        "h265",
        "mpeg1video",
        "mpeg2video",
        "mpeg1",
        "mpeg2",
    ]
    .map(String::from)
    .to_vec()
}

fn default_max_size_mib() -> f64 {
    200.0
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            allowed_formats: default_allowed_formats(),
            allowed_video_codecs: default_allowed_video_codecs(),
            max_size_mib: default_max_size_mib(),
        }
    }
}

impl Policy {
    /// Evaluate the three rules against canonicalized values.
    ///
    /// Each rule is independent; there is no combined flag. Comparison
    /// is case-insensitive. A size exactly at the limit passes.
    pub fn evaluate(&self, format: &str, video_codec: &str, size: u64) -> (Flag, Flag, Flag) {
        let format_ok = self
            .allowed_formats
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format));
        let codec_ok = self
            .allowed_video_codecs
            .iter()
            .any(|c| c.eq_ignore_ascii_case(video_codec));
        let size_mib = size as f64 / (1024.0 * 1024.0);
        let size_ok = size_mib <= self.max_size_mib;

        (
            Flag::from_bool(format_ok),
            Flag::from_bool(codec_ok),
            Flag::from_bool(size_ok),
        )
    }
}

/// Canonicalize a container brand.
///
/// QuickTime family markers map to "mov", MP4/ISO family markers to
/// "mp4"; anything else passes through lower-cased.
pub fn normalize_format(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("qt") {
        "mov".to_string()
    } else if lower.contains("mp4") || lower.contains("isom") {
        "mp4".to_string()
    } else {
        lower
    }
}

/// Canonicalize a video codec identifier; absent tracks become
/// [`UNKNOWN_CODEC`].
pub fn normalize_video_codec(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(r) if !r.is_empty() => r,
        _ => return UNKNOWN_CODEC.to_string(),
    };
    let lower = raw.to_lowercase();
    if lower.contains("avc") || lower.contains("h264") {
        "h264".to_string()
    } else if lower.contains("hvc") || lower.contains("hev") || lower.contains("h265") {
        "hevc".to_string()
    } else {
        raw.to_string()
    }
}

/// Canonicalize an audio codec identifier; absent tracks become
/// [`NO_AUDIO`].
pub fn normalize_audio_codec(raw: Option<&str>) -> String {
    let raw = match raw {
        Some(r) if !r.is_empty() => r,
        Some(_) => return UNKNOWN_CODEC.to_string(),
        None => return NO_AUDIO.to_string(),
    };
    if raw.to_lowercase().contains("mp4a") {
        "aac".to_string()
    } else {
        raw.to_string()
    }
}

/// Build the record for a successfully scanned container.
pub fn classify_scan(name: &str, size: u64, info: &ScanInfo, policy: &Policy) -> FileRecord {
    let brand = if info.major_brand.is_empty() {
        "mp4"
    } else {
        info.major_brand.as_str()
    };
    classify_triple(
        name,
        size,
        brand,
        info.video_codec.as_deref(),
        info.audio_codec.as_deref(),
        policy,
    )
}

/// Build a record from a raw `(format, videoCodec, audioCodec)` triple.
///
/// This is the shared entry point for the scanner path and for external
/// probers that report the same triple.
pub fn classify_triple(
    name: &str,
    size: u64,
    raw_format: &str,
    raw_video: Option<&str>,
    raw_audio: Option<&str>,
    policy: &Policy,
) -> FileRecord {
    let format = normalize_format(raw_format);
    let video_codec = normalize_video_codec(raw_video);
    let audio_codec = normalize_audio_codec(raw_audio);
    let (format_flag, codec_flag, size_flag) = policy.evaluate(&format, &video_codec, size);

    FileRecord {
        name: name.to_string(),
        size,
        format,
        video_codec,
        audio_codec,
        format_flag,
        codec_flag,
        size_flag,
    }
}

/// Record for a file whose extension is outside the supported container
/// family. No parse is attempted; format is the extension itself and
/// the codec slots carry [`NOT_APPLICABLE`].
pub fn record_for_unsupported(name: &str, ext: &str, size: u64, policy: &Policy) -> FileRecord {
    let format = ext.to_lowercase();
    let (format_flag, codec_flag, size_flag) = policy.evaluate(&format, NOT_APPLICABLE, size);

    FileRecord {
        name: name.to_string(),
        size,
        format,
        video_codec: NOT_APPLICABLE.to_string(),
        audio_codec: NOT_APPLICABLE.to_string(),
        format_flag,
        codec_flag,
        size_flag,
    }
}

/// Record for a file whose probe failed. The reason string occupies the
/// audio-codec slot by convention; the size rule still evaluates
/// normally.
pub fn record_for_error(name: &str, size: u64, reason: &str, policy: &Policy) -> FileRecord {
    let (format_flag, codec_flag, size_flag) = policy.evaluate(ERROR_VALUE, ERROR_VALUE, size);

    FileRecord {
        name: name.to_string(),
        size,
        format: ERROR_VALUE.to_string(),
        video_codec: ERROR_VALUE.to_string(),
        audio_codec: reason.to_string(),
        format_flag,
        codec_flag,
        size_flag,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    #[test]
    fn brand_normalization() {
        assert_eq!(normalize_format("qt  "), "mov");
        assert_eq!(normalize_format("isom"), "mp4");
        assert_eq!(normalize_format("mp42"), "mp4");
        assert_eq!(normalize_format("3gp4"), "3gp4");
        assert_eq!(normalize_format("AVIF"), "avif");
    }

    #[test]
    fn video_codec_normalization() {
        assert_eq!(normalize_video_codec(Some("avc1")), "h264");
        assert_eq!(normalize_video_codec(Some("hvc1")), "hevc");
        assert_eq!(normalize_video_codec(Some("hev1")), "hevc");
        assert_eq!(normalize_video_codec(Some("vp09")), "vp09");
        assert_eq!(normalize_video_codec(Some("")), UNKNOWN_CODEC);
        assert_eq!(normalize_video_codec(None), UNKNOWN_CODEC);
    }

    #[test]
    fn audio_codec_normalization() {
        assert_eq!(normalize_audio_codec(Some("mp4a")), "aac");
        assert_eq!(normalize_audio_codec(Some("opus")), "opus");
        assert_eq!(normalize_audio_codec(None), NO_AUDIO);
    }

    #[test]
    fn size_boundary_is_inclusive() {
        let policy = Policy::default();
        let at_limit = classify_triple("a.mp4", 200 * MIB, "isom", Some("avc1"), None, &policy);
        assert_eq!(at_limit.size_flag, Flag::Pass);

        let over = classify_triple("b.mp4", 200 * MIB + 1, "isom", Some("avc1"), None, &policy);
        assert_eq!(over.size_flag, Flag::Fail);
    }

    #[test]
    fn scenario_three_files() {
        let policy = Policy::default();

        let mp4 = classify_triple("clip.mp4", 50 * MIB, "isom", Some("avc1"), Some("mp4a"), &policy);
        assert_eq!(mp4.format, "mp4");
        assert_eq!(mp4.video_codec, "h264");
        assert_eq!(mp4.format_flag, Flag::Pass);
        assert_eq!(mp4.codec_flag, Flag::Pass);
        assert_eq!(mp4.size_flag, Flag::Pass);

        let mov = classify_triple("clip.mov", 250 * MIB, "qt  ", Some("hvc1"), None, &policy);
        assert_eq!(mov.format, "mov");
        assert_eq!(mov.video_codec, "hevc");
        assert_eq!(mov.format_flag, Flag::Pass);
        assert_eq!(mov.codec_flag, Flag::Pass);
        assert_eq!(mov.size_flag, Flag::Fail);

        let avi = record_for_unsupported("clip.avi", "avi", 10 * MIB, &policy);
        assert_eq!(avi.format, "avi");
        assert_eq!(avi.format_flag, Flag::Fail);
        assert_eq!(avi.codec_flag, Flag::Fail);
        assert_eq!(avi.size_flag, Flag::Pass);
    }

    #[test]
    fn missing_video_track_fails_codec_rule() {
        let policy = Policy::default();
        let record = classify_triple("audio.mp4", MIB, "isom", None, Some("mp4a"), &policy);
        assert_eq!(record.video_codec, UNKNOWN_CODEC);
        assert_eq!(record.codec_flag, Flag::Fail);
        assert_eq!(record.format_flag, Flag::Pass);
    }

    #[test]
    fn error_record_carries_reason_in_audio_slot() {
        let policy = Policy::default();
        let record = record_for_error("broken.mp4", 5 * MIB, "Processing timeout", &policy);
        assert_eq!(record.format, ERROR_VALUE);
        assert_eq!(record.video_codec, ERROR_VALUE);
        assert_eq!(record.audio_codec, "Processing timeout");
        assert_eq!(record.format_flag, Flag::Fail);
        assert_eq!(record.codec_flag, Flag::Fail);
        assert_eq!(record.size_flag, Flag::Pass);
    }

    #[test]
    fn classification_is_idempotent() {
        let policy = Policy::default();
        let a = classify_triple("x.mp4", 42 * MIB, "isom", Some("avc1"), Some("mp4a"), &policy);
        let b = classify_triple("x.mp4", 42 * MIB, "isom", Some("avc1"), Some("mp4a"), &policy);
        assert_eq!(a, b);
    }

    #[test]
    fn policy_comparison_is_case_insensitive() {
        let policy = Policy {
            allowed_formats: vec!["MP4".into()],
            allowed_video_codecs: vec!["H264".into()],
            max_size_mib: 200.0,
        };
        let record = classify_triple("x.mp4", MIB, "isom", Some("avc1"), None, &policy);
        assert_eq!(record.format_flag, Flag::Pass);
        assert_eq!(record.codec_flag, Flag::Pass);
    }
}
