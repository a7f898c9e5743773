//! Synthetic container fixtures.
//!
//! Builders for minimal but structurally valid MP4/MOV byte sequences,
//! used by unit tests, integration tests and benches.

fn fourcc(name: &str) -> [u8; 4] {
    let mut out = [b' '; 4];
    for (i, b) in name.bytes().take(4).enumerate() {
        out[i] = b;
    }
    out
}

/// An 8-byte box header with an explicit 32-bit size.
pub fn box_header(size: u32, name: &[u8; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&size.to_be_bytes());
    out.extend_from_slice(name);
    out
}

/// A 16-byte largesize header declaring `16 + payload_len` total bytes.
/// The payload itself is not produced; skip tests feed around it.
pub fn largesize_header(name: &[u8; 4], payload_len: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(16);
    out.extend_from_slice(&1u32.to_be_bytes());
    out.extend_from_slice(name);
    out.extend_from_slice(&(16 + payload_len).to_be_bytes());
    out
}

/// A complete box: header plus payload.
pub fn full_box(name: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = box_header((8 + payload.len()) as u32, name);
    out.extend_from_slice(payload);
    out
}

/// A container box wrapping the given children.
pub fn container(name: &[u8; 4], children: &[Vec<u8>]) -> Vec<u8> {
    let inner: usize = children.iter().map(Vec::len).sum();
    let mut out = box_header((8 + inner) as u32, name);
    for child in children {
        out.extend_from_slice(child);
    }
    out
}

/// An `ftyp` box with the given major and compatible brands.
pub fn ftyp(major: &str, compatible: &[&str]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&fourcc(major));
    payload.extend_from_slice(&0u32.to_be_bytes()); // minor version
    for brand in compatible {
        payload.extend_from_slice(&fourcc(brand));
    }
    full_box(b"ftyp", &payload)
}

/// An `hdlr` box declaring the given handler type.
pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut payload = vec![0u8; 8]; // version/flags + pre_defined
    payload.extend_from_slice(handler);
    payload.extend_from_slice(&[0u8; 12]); // reserved
    payload.push(0); // empty name
    full_box(b"hdlr", &payload)
}

/// An `stsd` box with a single sample entry of the given fourcc.
pub fn stsd(codec: &str) -> Vec<u8> {
    let mut payload = vec![0u8; 4]; // version/flags
    payload.extend_from_slice(&1u32.to_be_bytes()); // entry count
    payload.extend_from_slice(&16u32.to_be_bytes()); // entry size
    payload.extend_from_slice(&fourcc(codec));
    payload.extend_from_slice(&[0u8; 8]); // entry reserved bytes
    full_box(b"stsd", &payload)
}

/// A `trak` with the usual `mdia`/`minf`/`stbl` nesting.
pub fn trak(handler: &[u8; 4], codec: &str) -> Vec<u8> {
    let stbl = container(b"stbl", &[stsd(codec)]);
    let minf = container(b"minf", &[stbl]);
    let mdia = container(b"mdia", &[hdlr(handler), minf]);
    container(b"trak", &[mdia])
}

/// A `trak` whose stbl carries no sample description.
pub fn trak_without_stsd(handler: &[u8; 4]) -> Vec<u8> {
    let stbl = container(b"stbl", &[]);
    let minf = container(b"minf", &[stbl]);
    let mdia = container(b"mdia", &[hdlr(handler), minf]);
    container(b"trak", &[mdia])
}

/// A `moov` holding a placeholder `mvhd` plus the given traks.
pub fn moov(traks: &[Vec<u8>]) -> Vec<u8> {
    let mut children = vec![full_box(b"mvhd", &[0u8; 100])];
    children.extend_from_slice(traks);
    container(b"moov", &children)
}

/// An `mdat` box with `len` zero payload bytes.
pub fn mdat(len: usize) -> Vec<u8> {
    full_box(b"mdat", &vec![0u8; len])
}

/// A complete small file: ftyp, moov with up to one video and one audio
/// trak, and a token mdat.
pub fn simple_mp4(major: &str, video: Option<&str>, audio: Option<&str>) -> Vec<u8> {
    let mut traks = Vec::new();
    if let Some(codec) = video {
        traks.push(trak(b"vide", codec));
    }
    if let Some(codec) = audio {
        traks.push(trak(b"soun", codec));
    }
    mp4_with_traks(major, &traks)
}

/// A complete small file with caller-supplied traks.
pub fn mp4_with_traks(major: &str, traks: &[Vec<u8>]) -> Vec<u8> {
    let mut out = ftyp(major, &["iso2", "mp41"]);
    out.extend_from_slice(&moov(traks));
    out.extend_from_slice(&mdat(256));
    out
}
