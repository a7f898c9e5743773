//! Error types for clipgate-scan

/// Errors produced while scanning a container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// A window arrived out of order relative to what the scanner has
    /// already consumed. This is a caller error: windows must be supplied
    /// in file order with no gaps.
    #[error("window at offset {got} leaves a gap (expected offset {expected})")]
    OffsetGap { expected: u64, got: u64 },

    /// The box structure is malformed.
    #[error("invalid container structure: {0}")]
    Invalid(String),

    /// End of input was signalled before the structural metadata
    /// (`moov`) was complete.
    #[error("container truncated before metadata was complete")]
    Truncated,
}
