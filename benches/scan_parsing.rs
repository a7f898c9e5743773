//! Benchmarks for incremental container scanning.
//!
//! Measures whole-file scans, chunked feeding, and the media-skip path
//! where moov trails a large mdat.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use clipgate_scan::fixtures;
use clipgate_scan::{Mp4Scanner, ScanProgress};

fn scan_all(bytes: &[u8]) -> ScanProgress {
    let mut scanner = Mp4Scanner::new();
    scanner.push(0, bytes).unwrap()
}

fn bench_simple_scan(c: &mut Criterion) {
    let file = fixtures::simple_mp4("isom", Some("avc1"), Some("mp4a"));

    let mut group = c.benchmark_group("scan_simple");
    group.throughput(Throughput::Bytes(file.len() as u64));
    group.bench_function("single_push", |b| {
        b.iter(|| scan_all(black_box(&file)));
    });
    group.finish();
}

fn bench_many_tracks(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_tracks");
    for track_count in [2usize, 8, 32] {
        let traks: Vec<Vec<u8>> = (0..track_count)
            .map(|i| {
                if i % 2 == 0 {
                    fixtures::trak(b"vide", "avc1")
                } else {
                    fixtures::trak(b"soun", "mp4a")
                }
            })
            .collect();
        let file = fixtures::mp4_with_traks("isom", &traks);

        group.throughput(Throughput::Bytes(file.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(track_count),
            &file,
            |b, file| b.iter(|| scan_all(black_box(file))),
        );
    }
    group.finish();
}

fn bench_chunked_feed(c: &mut Criterion) {
    let mut file = fixtures::ftyp("isom", &["iso2"]);
    file.extend_from_slice(&fixtures::mdat(512 * 1024));
    file.extend_from_slice(&fixtures::moov(&[fixtures::trak(b"vide", "avc1")]));

    let mut group = c.benchmark_group("scan_chunked");
    group.throughput(Throughput::Bytes(file.len() as u64));
    for chunk_size in [4 * 1024usize, 64 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut scanner = Mp4Scanner::new();
                    let mut offset = 0usize;
                    while offset < file.len() {
                        let end = (offset + chunk_size).min(file.len());
                        match scanner.push(offset as u64, &file[offset..end]).unwrap() {
                            ScanProgress::Ready(info) => return black_box(Some(info)),
                            ScanProgress::NeedMore => {}
                        }
                        offset = end;
                    }
                    black_box(None)
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_simple_scan, bench_many_tracks, bench_chunked_feed);
criterion_main!(benches);
