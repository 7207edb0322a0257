//! Hashing throughput for typical protected source files

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hashlock_core::hasher::{hash_bytes, normalize_line_endings};
use hashlock_core::{FormatKind, ManifestEngine, ProtectedFiles, VerifyStrategy};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn source_text(line_ending: &str) -> String {
    (0..2_000)
        .map(|i| format!("    let value_{i} = compute({i});{line_ending}"))
        .collect()
}

fn bench_hash_bytes(c: &mut Criterion) {
    let lf = source_text("\n");
    let crlf = source_text("\r\n");

    c.bench_function("hash_bytes_lf", |b| b.iter(|| hash_bytes(black_box(lf.as_bytes()))));
    c.bench_function("hash_bytes_crlf", |b| {
        b.iter(|| hash_bytes(black_box(crlf.as_bytes())))
    });
    c.bench_function("normalize_crlf", |b| {
        b.iter(|| normalize_line_endings(black_box(crlf.as_bytes())).len())
    });
}

fn bench_verify(c: &mut Criterion) {
    let temp_dir = TempDir::new().unwrap();
    let paths: Vec<String> = (0..24).map(|i| format!("src/file_{i}.rs")).collect();
    fs::create_dir_all(temp_dir.path().join("src")).unwrap();
    for path in &paths {
        fs::write(temp_dir.path().join(path), source_text("\r\n")).unwrap();
    }

    let engine = ManifestEngine::new(
        temp_dir.path(),
        ProtectedFiles::new(paths.iter().cloned()).unwrap(),
        FormatKind::Rust,
        Path::new("src/integrity.rs"),
    );
    engine.generate().unwrap();

    c.bench_function("verify_24_files", |b| {
        b.iter(|| engine.verify(VerifyStrategy::Structured).unwrap().passed())
    });
}

criterion_group!(benches, bench_hash_bytes, bench_verify);
criterion_main!(benches);
