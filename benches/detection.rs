//! Detection and end-to-end normalization throughput on synthetic exports.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use tabular_normalizer::detection::{detect_encoding, sniff_dialect, DEFAULT_SAMPLE_LINES};
use tabular_normalizer::ingestion::{normalize_bytes, NormalizeOptions, SourceFormat};

/// Latin-1 bank export: two metadata lines, then `rows` semicolon-separated records.
fn latin1_export(rows: usize) -> Vec<u8> {
    let mut out = b"Export des op\xe9rations\nCompte : 0042\nDate;Libell\xe9;Montant;Devise\n".to_vec();
    for i in 0..rows {
        out.extend_from_slice(format!("{:02}/01/2024;", i % 28 + 1).as_bytes());
        out.extend_from_slice(b"Pr\xe9l\xe8vement \xab abonnement \xbb;");
        out.extend_from_slice(format!("-{}.{:02};EUR\n", i % 500, i % 100).as_bytes());
    }
    out
}

fn bench_detectors(c: &mut Criterion) {
    let data = latin1_export(10_000);

    let mut group = c.benchmark_group("detectors");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("detect_encoding", |b| {
        b.iter(|| detect_encoding(black_box(&data)).unwrap())
    });

    let text: String = data.iter().map(|&b| b as char).collect();
    group.bench_function("sniff_dialect", |b| {
        b.iter(|| sniff_dialect(black_box(&text), DEFAULT_SAMPLE_LINES).unwrap())
    });

    group.finish();
}

fn bench_normalize(c: &mut Criterion) {
    let options = NormalizeOptions::default();

    let mut group = c.benchmark_group("normalize_csv");
    group.sample_size(20);
    for rows in [1_000, 50_000] {
        let data = latin1_export(rows);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_function(format!("{rows}_rows"), |b| {
            b.iter(|| normalize_bytes(black_box(&data), SourceFormat::Csv, &options).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_detectors, bench_normalize);
criterion_main!(benches);
