use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{criterion_group, criterion_main, Criterion};
use dupsweep::duplicates::finder::group_records;
use dupsweep::scanner::{crc32_file, md5_file, DigestKind, FileRecord};
use tempfile::TempDir;

fn bench_hashers(c: &mut Criterion) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("payload.bin");
    let mut f = File::create(&path).unwrap();
    f.write_all(&vec![0xA5u8; 4 * 1024 * 1024]).unwrap();
    drop(f);

    c.bench_function("crc32_4mb", |b| b.iter(|| crc32_file(&path).unwrap()));
    c.bench_function("md5_4mb", |b| b.iter(|| md5_file(&path).unwrap()));
}

fn bench_grouping(c: &mut Criterion) {
    // 10k hashed records: half in pairs, half unique.
    let records: Vec<(usize, FileRecord)> = (0..10_000)
        .map(|i| {
            let digest = if i % 2 == 0 {
                format!("pair-{}", i / 4)
            } else {
                format!("unique-{i}")
            };
            let record = FileRecord {
                path: PathBuf::from(format!("/bench/f{i}.bin")),
                size: 1024,
                digest: Some(digest),
                digest_kind: Some(DigestKind::Md5),
            };
            (i, record)
        })
        .collect();

    c.bench_function("group_records_10k", |b| {
        b.iter(|| group_records(records.clone()))
    });
}

criterion_group!(benches, bench_hashers, bench_grouping);
criterion_main!(benches);
