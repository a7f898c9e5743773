//! Per-file validation records.

use serde::{Deserialize, Serialize};

/// Outcome of one policy rule.
///
/// Serializes with the wire strings the host payload has always
/// carried, identical to the rendered cell labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    #[serde(rename = "good to go")]
    Pass,
    #[default]
    #[serde(rename = "error")]
    Fail,
}

impl Flag {
    pub fn is_pass(self) -> bool {
        matches!(self, Flag::Pass)
    }

    /// Cell label used in rendered tables and the spreadsheet export.
    pub fn label(self) -> &'static str {
        match self {
            Flag::Pass => "good to go",
            Flag::Fail => "error",
        }
    }

    pub fn from_bool(pass: bool) -> Self {
        if pass {
            Flag::Pass
        } else {
            Flag::Fail
        }
    }
}

/// One file's validation result.
///
/// Created exactly once per input file at the end of its probe and
/// immutable afterwards. Serializes with the wire field names used by
/// the host payload (`fileName`, `videoCodec`, ...). The flags default
/// on deserialize so that legacy payloads carrying only the raw values
/// still decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    #[serde(rename = "fileName")]
    pub name: String,
    /// File size in bytes.
    pub size: u64,
    /// Canonical or raw container format (e.g. "mp4", "avi", "error").
    pub format: String,
    /// Canonical or raw video codec; "unknown" when no video track.
    pub video_codec: String,
    /// Canonical or raw audio codec; "none" when absent. Error records
    /// carry the failure reason here by convention.
    pub audio_codec: String,
    #[serde(default)]
    pub format_flag: Flag,
    #[serde(default)]
    pub codec_flag: Flag,
    #[serde(default)]
    pub size_flag: Flag,
}

impl FileRecord {
    /// File size in MiB.
    pub fn size_mib(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }

    /// The composite codecs column used by the report.
    pub fn codecs_summary(&self) -> String {
        format!("Video: {}, Audio: {}", self.video_codec, self.audio_codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_labels() {
        assert_eq!(Flag::Pass.label(), "good to go");
        assert_eq!(Flag::Fail.label(), "error");
        assert!(Flag::Pass.is_pass());
        assert!(!Flag::Fail.is_pass());
    }

    #[test]
    fn wire_field_names() {
        let record = FileRecord {
            name: "clip.mp4".into(),
            size: 1024,
            format: "mp4".into(),
            video_codec: "h264".into(),
            audio_codec: "aac".into(),
            format_flag: Flag::Pass,
            codec_flag: Flag::Pass,
            size_flag: Flag::Pass,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["fileName"], "clip.mp4");
        assert_eq!(json["videoCodec"], "h264");
        assert_eq!(json["audioCodec"], "aac");
        assert_eq!(json["formatFlag"], "good to go");
    }

    #[test]
    fn flags_use_the_wire_labels_both_ways() {
        assert_eq!(serde_json::to_value(Flag::Pass).unwrap(), "good to go");
        assert_eq!(serde_json::to_value(Flag::Fail).unwrap(), "error");
        let pass: Flag = serde_json::from_value(serde_json::json!("good to go")).unwrap();
        assert_eq!(pass, Flag::Pass);
        let fail: Flag = serde_json::from_value(serde_json::json!("error")).unwrap();
        assert_eq!(fail, Flag::Fail);
    }

    #[test]
    fn legacy_payload_without_flags_decodes() {
        let json = r#"{"fileName":"a.mov","size":7,"format":"mov","videoCodec":"hevc","audioCodec":"none"}"#;
        let record: FileRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "a.mov");
        assert_eq!(record.format_flag, Flag::Fail);
    }
}
