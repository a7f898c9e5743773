//! Incremental box/atom walker for MP4/MOV containers.
//!
//! The scanner consumes byte windows tagged with their absolute file
//! offset and walks the box tree as bytes become available. Structural
//! boxes (`ftyp`, `moov` and its descendants) are buffered until whole;
//! everything else is skipped by offset so payload never accumulates in
//! memory. The walk finishes as soon as `moov` is complete, which for
//! well-muxed files is long before end of input.

use crate::error::ScanError;
use crate::types::ScanInfo;

/// Progress reported after feeding a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanProgress {
    /// More bytes are needed before a terminal outcome is known.
    NeedMore,
    /// Structural metadata is complete; further windows are unnecessary.
    Ready(ScanInfo),
}

/// Upper bound on any structural box the scanner is willing to buffer.
/// `ftyp`, `hdlr` and `stsd` are all far below this in practice; a
/// larger declared size means a corrupt or hostile file.
const MAX_METADATA_BOX: u64 = 1 << 20;

const FTYP: [u8; 4] = *b"ftyp";
const MOOV: [u8; 4] = *b"moov";
const TRAK: [u8; 4] = *b"trak";
const MDIA: [u8; 4] = *b"mdia";
const MINF: [u8; 4] = *b"minf";
const STBL: [u8; 4] = *b"stbl";
const HDLR: [u8; 4] = *b"hdlr";
const STSD: [u8; 4] = *b"stsd";
const HANDLER_VIDEO: [u8; 4] = *b"vide";
const HANDLER_AUDIO: [u8; 4] = *b"soun";

fn is_container(name: [u8; 4]) -> bool {
    matches!(name, MOOV | TRAK | MDIA | MINF | STBL)
}

fn is_metadata_leaf(name: [u8; 4]) -> bool {
    matches!(name, FTYP | HDLR | STSD)
}

fn fourcc_str(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

/// Streaming MP4/MOV structural scanner.
///
/// Feed windows with [`push`](Self::push) in file order, then call
/// [`flush`](Self::flush) at end of input if readiness was never
/// reported.
#[derive(Debug, Default)]
pub struct Mp4Scanner {
    /// Absolute offset of `buf[0]`.
    buf_start: u64,
    buf: Vec<u8>,
    /// Absolute offset of the next box header to consume.
    cursor: u64,
    /// Open container boxes, innermost last: (fourcc, end offset).
    stack: Vec<([u8; 4], u64)>,
    info: ScanInfo,
    /// Handler type of the trak currently being walked.
    handler: Option<[u8; 4]>,
    /// Sample-entry fourcc of the trak currently being walked.
    codec: Option<String>,
    done: Option<ScanInfo>,
    /// Set when a size-0 top-level box extends to end of input; all
    /// remaining bytes are payload.
    trailing_skip: bool,
}

impl Mp4Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next window. `offset` is the absolute file offset of
    /// `data[0]`; windows must arrive in file order and may overlap
    /// bytes already consumed, but must not leave a gap.
    pub fn push(&mut self, offset: u64, data: &[u8]) -> Result<ScanProgress, ScanError> {
        if let Some(info) = &self.done {
            return Ok(ScanProgress::Ready(info.clone()));
        }
        if self.trailing_skip {
            return Ok(ScanProgress::NeedMore);
        }

        let expected = self.buf_start + self.buf.len() as u64;
        if offset > expected {
            return Err(ScanError::OffsetGap {
                expected,
                got: offset,
            });
        }

        // Drop any prefix the scanner has already consumed or skipped.
        let skip = (expected - offset) as usize;
        if skip < data.len() {
            self.buf.extend_from_slice(&data[skip..]);
        }

        self.walk()
    }

    /// Signal end of input. Succeeds only if readiness was reached.
    pub fn flush(&mut self) -> Result<ScanInfo, ScanError> {
        match &self.done {
            Some(info) => Ok(info.clone()),
            None => Err(ScanError::Truncated),
        }
    }

    /// Bytes currently held. Bounded by one window plus the largest
    /// structural box being awaited.
    pub fn bytes_buffered(&self) -> usize {
        self.buf.len()
    }

    fn walk(&mut self) -> Result<ScanProgress, ScanError> {
        loop {
            // Close any containers the cursor has reached the end of.
            while let Some(&(name, end)) = self.stack.last() {
                if self.cursor < end {
                    break;
                }
                if self.cursor > end {
                    return Err(ScanError::Invalid(format!(
                        "cursor overran {} box end",
                        fourcc_str(&name)
                    )));
                }
                self.stack.pop();
                self.close_container(name);
                if let Some(info) = &self.done {
                    let info = info.clone();
                    self.buf.clear();
                    self.buf_start = self.cursor;
                    return Ok(ScanProgress::Ready(info));
                }
            }

            let buffered_end = self.buf_start + self.buf.len() as u64;
            if buffered_end < self.cursor.saturating_add(8) {
                self.discard_consumed();
                return Ok(ScanProgress::NeedMore);
            }
            let rel = (self.cursor - self.buf_start) as usize;
            let avail = &self.buf[rel..];
            let size32 = u32::from_be_bytes([avail[0], avail[1], avail[2], avail[3]]);
            let name = [avail[4], avail[5], avail[6], avail[7]];

            let (header_len, size): (u64, u64) = match size32 {
                0 => match self.stack.last() {
                    // Box runs to the end of its parent.
                    Some(&(_, parent_end)) => (8, parent_end - self.cursor),
                    // Box runs to end of file. Only ever payload in
                    // practice; a structural box without a bound is
                    // unwalkable.
                    None => {
                        if is_container(name) || is_metadata_leaf(name) {
                            return Err(ScanError::Invalid(format!(
                                "unbounded {} box",
                                fourcc_str(&name)
                            )));
                        }
                        self.trailing_skip = true;
                        self.buf.clear();
                        self.buf_start = self.cursor;
                        return Ok(ScanProgress::NeedMore);
                    }
                },
                1 => {
                    if avail.len() < 16 {
                        self.discard_consumed();
                        return Ok(ScanProgress::NeedMore);
                    }
                    let large = u64::from_be_bytes([
                        avail[8], avail[9], avail[10], avail[11], avail[12], avail[13], avail[14],
                        avail[15],
                    ]);
                    if large < 16 {
                        return Err(ScanError::Invalid(format!(
                            "largesize {} below header length",
                            large
                        )));
                    }
                    (16, large)
                }
                s if s < 8 => {
                    return Err(ScanError::Invalid(format!("box size {} below header", s)));
                }
                s => (8, s as u64),
            };

            let box_end = self
                .cursor
                .checked_add(size)
                .ok_or_else(|| ScanError::Invalid("box size overflows file offset".into()))?;
            if let Some(&(parent, parent_end)) = self.stack.last() {
                if box_end > parent_end {
                    return Err(ScanError::Invalid(format!(
                        "{} box overruns enclosing {}",
                        fourcc_str(&name),
                        fourcc_str(&parent)
                    )));
                }
            }

            if is_container(name) {
                if name == TRAK {
                    self.handler = None;
                    self.codec = None;
                }
                self.stack.push((name, box_end));
                self.cursor += header_len;
                continue;
            }

            if is_metadata_leaf(name) {
                if size > MAX_METADATA_BOX {
                    return Err(ScanError::Invalid(format!(
                        "{} box declares {} bytes",
                        fourcc_str(&name),
                        size
                    )));
                }
                if (avail.len() as u64) < size {
                    // Wait for the whole box.
                    self.discard_consumed();
                    return Ok(ScanProgress::NeedMore);
                }
                let payload = &avail[header_len as usize..size as usize];
                Self::parse_leaf(&mut self.info, &mut self.handler, &mut self.codec, name, payload)?;
                self.cursor = box_end;
                continue;
            }

            // Payload or irrelevant box: advance without buffering and
            // loop, so the close pass runs next. A container whose last
            // child is skipped must still close, even when the skipped
            // box ends exactly at the end of buffered input.
            self.cursor = box_end;
        }
    }

    fn close_container(&mut self, name: [u8; 4]) {
        match name {
            TRAK => {
                let codec = self.codec.take();
                match self.handler.take() {
                    Some(HANDLER_VIDEO) => {
                        if self.info.video_codec.is_none() {
                            self.info.video_codec = codec;
                        }
                    }
                    Some(HANDLER_AUDIO) => {
                        if self.info.audio_codec.is_none() {
                            self.info.audio_codec = codec;
                        }
                    }
                    _ => {}
                }
            }
            MOOV => {
                self.done = Some(self.info.clone());
            }
            _ => {}
        }
    }

    fn parse_leaf(
        info: &mut ScanInfo,
        handler: &mut Option<[u8; 4]>,
        codec: &mut Option<String>,
        name: [u8; 4],
        payload: &[u8],
    ) -> Result<(), ScanError> {
        match name {
            FTYP => {
                if payload.len() < 8 {
                    return Err(ScanError::Invalid("ftyp payload too short".into()));
                }
                info.major_brand = fourcc_str(&payload[0..4]);
                info.compatible_brands = payload[8..]
                    .chunks_exact(4)
                    .map(fourcc_str)
                    .filter(|b| !b.is_empty())
                    .collect();
            }
            HDLR => {
                if payload.len() < 12 {
                    return Err(ScanError::Invalid("hdlr payload too short".into()));
                }
                *handler = Some([payload[8], payload[9], payload[10], payload[11]]);
            }
            STSD => {
                if payload.len() < 8 {
                    return Err(ScanError::Invalid("stsd payload too short".into()));
                }
                let entry_count =
                    u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]);
                if entry_count > 0 {
                    if payload.len() < 16 {
                        return Err(ScanError::Invalid(
                            "stsd declares entries but holds none".into(),
                        ));
                    }
                    let entry_size =
                        u32::from_be_bytes([payload[8], payload[9], payload[10], payload[11]]);
                    if entry_size < 8 {
                        return Err(ScanError::Invalid(format!(
                            "sample entry size {} below header",
                            entry_size
                        )));
                    }
                    *codec = Some(fourcc_str(&payload[12..16]));
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn discard_consumed(&mut self) {
        // The cursor may sit past the end of the buffer after a skip.
        if self.cursor >= self.buf_start + self.buf.len() as u64 {
            self.buf.clear();
            self.buf_start = self.cursor;
            return;
        }
        let consumed = (self.cursor - self.buf_start) as usize;
        if consumed > 0 {
            self.buf.drain(..consumed);
            self.buf_start = self.cursor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn scan_whole(data: &[u8]) -> Result<ScanInfo, ScanError> {
        let mut scanner = Mp4Scanner::new();
        match scanner.push(0, data)? {
            ScanProgress::Ready(info) => Ok(info),
            ScanProgress::NeedMore => scanner.flush(),
        }
    }

    #[test]
    fn parses_simple_mp4_in_one_window() {
        let data = fixtures::simple_mp4("isom", Some("avc1"), Some("mp4a"));
        let info = scan_whole(&data).unwrap();
        assert_eq!(info.major_brand, "isom");
        assert_eq!(info.video_codec.as_deref(), Some("avc1"));
        assert_eq!(info.audio_codec.as_deref(), Some("mp4a"));
    }

    #[test]
    fn quicktime_brand_is_trimmed() {
        let data = fixtures::simple_mp4("qt  ", Some("hvc1"), None);
        let info = scan_whole(&data).unwrap();
        assert_eq!(info.major_brand, "qt");
        assert_eq!(info.video_codec.as_deref(), Some("hvc1"));
        assert_eq!(info.audio_codec, None);
    }

    #[test]
    fn byte_at_a_time_windows_reach_the_same_outcome() {
        let data = fixtures::simple_mp4("isom", Some("avc1"), Some("mp4a"));
        let mut scanner = Mp4Scanner::new();
        let mut ready = None;
        for (i, b) in data.iter().enumerate() {
            if let ScanProgress::Ready(info) = scanner.push(i as u64, &[*b]).unwrap() {
                ready = Some(info);
                break;
            }
        }
        let info = ready.expect("scanner should reach readiness");
        assert_eq!(info.major_brand, "isom");
        assert_eq!(info.video_codec.as_deref(), Some("avc1"));
    }

    #[test]
    fn ready_fires_before_trailing_payload() {
        let mut data = fixtures::simple_mp4("isom", Some("avc1"), None);
        let metadata_len = data.len();
        data.extend_from_slice(&fixtures::mdat(64 * 1024));

        let mut scanner = Mp4Scanner::new();
        let progress = scanner.push(0, &data[..metadata_len]).unwrap();
        assert!(matches!(progress, ScanProgress::Ready(_)));
    }

    #[test]
    fn leading_mdat_is_skipped_without_buffering() {
        // mdat declares 8 MiB but we only feed its header plus the moov
        // that follows, as a seeking reader would.
        let mdat_len = 8 * 1024 * 1024u64;
        let mut file = fixtures::ftyp("isom", &["iso2", "avc1"]);
        file.extend_from_slice(&fixtures::box_header(8 + mdat_len as u32, b"mdat"));
        let mdat_end = file.len() as u64 + mdat_len;
        let moov = fixtures::moov(&[fixtures::trak(b"vide", "avc1")]);

        let mut scanner = Mp4Scanner::new();
        assert_eq!(
            scanner.push(0, &file).unwrap(),
            ScanProgress::NeedMore
        );
        // Payload was not retained.
        assert_eq!(scanner.bytes_buffered(), 0);

        let progress = scanner.push(mdat_end, &moov).unwrap();
        match progress {
            ScanProgress::Ready(info) => {
                assert_eq!(info.major_brand, "isom");
                assert_eq!(info.video_codec.as_deref(), Some("avc1"));
            }
            other => panic!("expected readiness, got {:?}", other),
        }
    }

    #[test]
    fn largesize_boxes_are_honored() {
        let mut file = fixtures::ftyp("isom", &[]);
        file.extend_from_slice(&fixtures::largesize_header(b"free", 1024));
        let skip_end = file.len() as u64 + 1024;
        let moov = fixtures::moov(&[fixtures::trak(b"soun", "mp4a")]);

        let mut scanner = Mp4Scanner::new();
        // The 1024 payload bytes are never fed; the scanner skips to the
        // declared box end and resumes there.
        assert_eq!(scanner.push(0, &file).unwrap(), ScanProgress::NeedMore);
        let info = match scanner.push(skip_end, &moov).unwrap() {
            ScanProgress::Ready(info) => info,
            other => panic!("expected readiness, got {:?}", other),
        };
        assert_eq!(info.audio_codec.as_deref(), Some("mp4a"));
        assert_eq!(info.video_codec, None);
    }

    #[test]
    fn moov_ending_in_skipped_box_completes_at_end_of_input() {
        // QuickTime muxers commonly leave a free/udta box as the last
        // child of moov; with no trailing mdat the skipped box is also
        // the last byte of the file.
        let moov = fixtures::container(
            b"moov",
            &[
                fixtures::full_box(b"mvhd", &[0u8; 100]),
                fixtures::trak(b"vide", "avc1"),
                fixtures::full_box(b"free", &[0u8; 32]),
            ],
        );
        let mut data = fixtures::ftyp("qt  ", &[]);
        data.extend_from_slice(&moov);

        let mut scanner = Mp4Scanner::new();
        let progress = scanner.push(0, &data).unwrap();
        match progress {
            ScanProgress::Ready(info) => {
                assert_eq!(info.major_brand, "qt");
                assert_eq!(info.video_codec.as_deref(), Some("avc1"));
            }
            other => panic!("expected readiness, got {:?}", other),
        }
    }

    #[test]
    fn skipped_box_at_window_boundary_does_not_stall_container_close() {
        // Same layout fed in two windows split exactly at the end of
        // the free box, then flushed with no further input.
        let moov = fixtures::container(
            b"moov",
            &[
                fixtures::full_box(b"mvhd", &[0u8; 100]),
                fixtures::trak(b"soun", "mp4a"),
                fixtures::full_box(b"free", &[0u8; 16]),
            ],
        );
        let mut data = fixtures::ftyp("isom", &[]);
        data.extend_from_slice(&moov);
        let split = data.len() - 24; // start of the free box

        let mut scanner = Mp4Scanner::new();
        scanner.push(0, &data[..split]).unwrap();
        match scanner.push(split as u64, &data[split..]).unwrap() {
            ScanProgress::Ready(info) => {
                assert_eq!(info.audio_codec.as_deref(), Some("mp4a"))
            }
            ScanProgress::NeedMore => {
                let info = scanner.flush().expect("moov is complete at end of input");
                assert_eq!(info.audio_codec.as_deref(), Some("mp4a"));
            }
        }
    }

    #[test]
    fn gap_in_windows_is_a_caller_error() {
        let mut scanner = Mp4Scanner::new();
        scanner.push(0, &fixtures::ftyp("isom", &[])).unwrap();
        let err = scanner.push(4096, &[0u8; 16]).unwrap_err();
        assert!(matches!(err, ScanError::OffsetGap { got: 4096, .. }));
    }

    #[test]
    fn flush_before_moov_is_truncated() {
        let mut scanner = Mp4Scanner::new();
        scanner.push(0, &fixtures::ftyp("isom", &[])).unwrap();
        assert_eq!(scanner.flush().unwrap_err(), ScanError::Truncated);
    }

    #[test]
    fn undersized_box_is_invalid() {
        let mut scanner = Mp4Scanner::new();
        let mut data = 4u32.to_be_bytes().to_vec();
        data.extend_from_slice(b"junk");
        let err = scanner.push(0, &data).unwrap_err();
        assert!(matches!(err, ScanError::Invalid(_)));
    }

    #[test]
    fn trak_without_stsd_yields_no_codec() {
        let trak = fixtures::trak_without_stsd(b"vide");
        let mut data = fixtures::ftyp("mp42", &[]);
        data.extend_from_slice(&fixtures::moov(&[trak]));
        let info = scan_whole(&data).unwrap();
        assert_eq!(info.major_brand, "mp42");
        assert_eq!(info.video_codec, None);
    }

    #[test]
    fn first_track_of_each_kind_wins() {
        let data = fixtures::mp4_with_traks(
            "isom",
            &[
                fixtures::trak(b"vide", "avc1"),
                fixtures::trak(b"vide", "hvc1"),
                fixtures::trak(b"soun", "mp4a"),
            ],
        );
        let info = scan_whole(&data).unwrap();
        assert_eq!(info.video_codec.as_deref(), Some("avc1"));
        assert_eq!(info.audio_codec.as_deref(), Some("mp4a"));
    }

    #[test]
    fn push_after_ready_keeps_reporting_ready() {
        let data = fixtures::simple_mp4("isom", Some("avc1"), None);
        let mut scanner = Mp4Scanner::new();
        let first = scanner.push(0, &data).unwrap();
        assert!(matches!(first, ScanProgress::Ready(_)));
        let again = scanner.push(data.len() as u64, &[0u8; 32]).unwrap();
        assert!(matches!(again, ScanProgress::Ready(_)));
    }
}
