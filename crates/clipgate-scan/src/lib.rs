//! # clipgate-scan
//!
//! Incremental MP4/MOV container scanning.
//!
//! This crate walks the box/atom structure of an ISO-BMFF style container
//! from byte windows supplied in file order, without requiring the whole
//! file in memory. It extracts only the identifiers needed for policy
//! validation: the `ftyp` brand and the first video/audio sample-entry
//! fourcc from `moov`. Payload boxes (`mdat` in particular) are skipped
//! by offset and never buffered.
//!
//! ## Example
//!
//! ```no_run
//! use clipgate_scan::{Mp4Scanner, ScanProgress};
//!
//! let mut scanner = Mp4Scanner::new();
//! let mut offset = 0u64;
//! for window in windows_of_the_file() {
//!     match scanner.push(offset, &window).unwrap() {
//!         ScanProgress::Ready(info) => {
//!             println!("brand: {}", info.major_brand);
//!             break;
//!         }
//!         ScanProgress::NeedMore => offset += window.len() as u64,
//!     }
//! }
//! # fn windows_of_the_file() -> Vec<Vec<u8>> { vec![] }
//! ```

pub mod error;
pub mod fixtures;
pub mod scanner;
pub mod types;

pub use error::ScanError;
pub use scanner::{Mp4Scanner, ScanProgress};
pub use types::ScanInfo;

/// File extensions handled by [`Mp4Scanner`].
///
/// Anything else should bypass the scanner entirely; callers classify
/// those files from the extension alone.
pub const CONTAINER_EXTENSIONS: &[&str] = &["mp4", "mov", "m4v"];

/// Whether a lower-cased file extension belongs to the MP4/MOV family.
pub fn is_container_extension(ext: &str) -> bool {
    CONTAINER_EXTENSIONS
        .iter()
        .any(|e| e.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_family_membership() {
        assert!(is_container_extension("mp4"));
        assert!(is_container_extension("MOV"));
        assert!(is_container_extension("m4v"));
        assert!(!is_container_extension("avi"));
        assert!(!is_container_extension("mkv"));
        assert!(!is_container_extension(""));
    }
}
