//! Result types for container scanning

/// Identifiers extracted from a container's structural metadata.
///
/// All values are raw, as declared by the file. Normalization to
/// policy-facing tags is the caller's concern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanInfo {
    /// Major brand from the `ftyp` box (e.g. `"isom"`, `"qt"`).
    /// Empty if the file carried no `ftyp`.
    pub major_brand: String,
    /// Compatible brands from the `ftyp` box.
    pub compatible_brands: Vec<String>,
    /// Sample-entry fourcc of the first video track (e.g. `"avc1"`,
    /// `"hvc1"`), if any.
    pub video_codec: Option<String>,
    /// Sample-entry fourcc of the first audio track (e.g. `"mp4a"`),
    /// if any.
    pub audio_codec: Option<String>,
}
