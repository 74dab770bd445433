//! Criterion microbenches for annotation parsing, rename planning and splitting.
//!
//! Run with: `cargo bench`
//!
//! These benchmarks measure the performance of:
//! - VOC annotation parsing (parse_annotation_str)
//! - Rename planning for a gappy image directory (RenamePlan::compute)
//! - Seeded train/test splitting and CSV writing (split_rows, to_table_csv_string)

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use std::hint::black_box;
use std::path::Path;

use annoprep::annotation::{annotation_to_records, parse_annotation_str, AnnotationRecord, Label};
use annoprep::sequence::RenamePlan;
use annoprep::split::{split_rows, to_table_csv_string, SplitOptions};

const VOC_FIXTURE: &str = r#"<annotation>
  <folder>images</folder>
  <filename>f3a9-17.jpg</filename>
  <size><width>1280</width><height>720</height><depth>3</depth></size>
  <object>
    <name>Positive</name>
    <bndbox><xmin>100</xmin><ymin>120</ymin><xmax>340</xmax><ymax>400</ymax></bndbox>
  </object>
  <object>
    <name>Negative</name>
    <bndbox><xmin>500.4</xmin><ymin>80</ymin><xmax>720</xmax><ymax>310.6</ymax></bndbox>
  </object>
</annotation>
"#;

/// Benchmark VOC parsing plus conversion to table rows.
fn bench_voc_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("voc_parse");
    group.throughput(Throughput::Bytes(VOC_FIXTURE.len() as u64));

    group.bench_function("parse_annotation_str", |b| {
        b.iter(|| {
            let parsed =
                parse_annotation_str(black_box(VOC_FIXTURE), Path::new("bench.xml")).unwrap();
            black_box(annotation_to_records(&parsed))
        })
    });

    group.finish();
}

/// Benchmark planning renames for 10k files where every third number is missing.
fn bench_rename_plan(c: &mut Criterion) {
    let names: Vec<String> = (1..=15_000u64)
        .filter(|n| n % 3 != 0)
        .map(|n| format!("{n}.jpg"))
        .collect();

    let mut group = c.benchmark_group("rename_plan");
    group.throughput(Throughput::Elements(names.len() as u64));

    group.bench_function("compute", |b| {
        b.iter(|| {
            let plan = RenamePlan::compute(Path::new("images"), black_box(&names), 1, "jpg")
                .unwrap();
            black_box(plan)
        })
    });

    group.finish();
}

/// Benchmark splitting and serializing a 10k-row table.
fn bench_split(c: &mut Criterion) {
    let rows: Vec<AnnotationRecord> = (0..10_000i64)
        .map(|i| AnnotationRecord {
            label: Label::Code((i % 2 + 1) as u8),
            filename: format!("{}.jpg", i / 3 + 1),
            width: 1280,
            height: 720,
            depth: 3,
            xmin: i % 600,
            ymin: i % 400,
            xmax: i % 600 + 50,
            ymax: i % 400 + 50,
        })
        .collect();

    let mut group = c.benchmark_group("split");
    group.throughput(Throughput::Elements(rows.len() as u64));

    group.bench_function("split_rows", |b| {
        b.iter(|| {
            let split = split_rows(black_box(&rows), &SplitOptions::default()).unwrap();
            black_box(split)
        })
    });

    group.bench_function("to_table_csv_string", |b| {
        b.iter(|| {
            let csv = to_table_csv_string(black_box(&rows)).unwrap();
            black_box(csv)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_voc_parse, bench_rename_plan, bench_split);
criterion_main!(benches);
