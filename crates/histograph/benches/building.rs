//! Benchmarks for per-commit graph building.
//!
//! These benchmarks measure the performance of:
//! - Parsing a generated project
//! - Building its call graph at different worker counts
//! - Correlating a diff against the built graph

// Benchmark code - performance of the benchmark setup is not critical
#![allow(missing_docs)]
#![allow(clippy::format_push_string)]

use std::fmt::Write as _;
use std::fs;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use histograph::{
    CallGraph, DiffCorrelator, FsSnapshotLocator, GraphBuilder, JavaParser, ParsedUnits,
    SnapshotLocator, SourceParser,
};
use tempfile::TempDir;

/// Generate a Java class that calls into the next class of the project.
fn generate_java_file(index: usize, classes: usize, methods: usize) -> String {
    let next = (index + 1) % classes;
    let mut code = format!(
        "package bench.m{index};\n\nimport bench.m{next}.Service{next};\n\npublic class Service{index} {{\n\
             private Service{next} next;\n\n"
    );

    for m in 0..methods {
        code.push_str(&format!(
            "    public int op{m}(int input) {{\n\
                     int result = input * 2;\n\
                     if (next != null) {{\n\
                         result += next.op{m}(input - 1);\n\
                     }}\n\
                     return helper{m}(result);\n\
                 }}\n\n\
                 private int helper{m}(int value) {{\n\
                     return value + {m};\n\
                 }}\n\n"
        ));
    }

    code.push_str("}\n");
    code
}

fn create_project(classes: usize, methods: usize) -> TempDir {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    for i in 0..classes {
        let path = dir.path().join(format!("src/bench/m{i}/Service{i}.java"));
        fs::create_dir_all(path.parent().expect("file has a parent"))
            .expect("failed to create parent dirs");
        fs::write(&path, generate_java_file(i, classes, methods)).expect("failed to write file");
    }
    dir
}

fn parse_project(dir: &TempDir) -> ParsedUnits {
    let snapshot = FsSnapshotLocator::new()
        .locate(dir.path(), &[], None)
        .expect("locate should succeed");
    JavaParser::new(dir.path())
        .parse(
            &snapshot.classpath,
            &snapshot.source_roots,
            &snapshot.source_files,
        )
        .expect("parse should succeed")
        .units
}

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    for classes in [10, 100] {
        let dir = create_project(classes, 10);
        group.throughput(Throughput::Elements(classes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(classes), &dir, |b, dir| {
            b.iter(|| black_box(parse_project(dir)));
        });
    }

    group.finish();
}

fn bench_building(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    let dir = create_project(200, 10);
    let units = parse_project(&dir);

    for threads in [1, 2, 4, 8] {
        let builder = GraphBuilder::with_threads(threads).expect("thread count is valid");
        group.bench_with_input(BenchmarkId::new("threads", threads), &units, |b, units| {
            b.iter(|| {
                let graph = CallGraph::untagged();
                black_box(builder.build(units, &graph).expect("build should succeed"));
                graph
            });
        });
    }

    group.finish();
}

fn bench_correlation(c: &mut Criterion) {
    let dir = create_project(200, 10);
    let units = parse_project(&dir);
    let graph = CallGraph::untagged();
    GraphBuilder::new()
        .build(&units, &graph)
        .expect("build should succeed");

    let mut diff = String::new();
    for i in 0..200 {
        let path = format!("src/bench/m{i}/Service{i}.java");
        let _ = writeln!(diff, "diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}");
        for line in (10..100).step_by(15) {
            let _ = writeln!(diff, "@@ -{line} +{line},2 @@");
        }
    }

    c.bench_function("correlate", |b| {
        b.iter(|| black_box(DiffCorrelator::new().correlate(&diff, &graph)));
    });
}

criterion_group!(benches, bench_parsing, bench_building, bench_correlation);
criterion_main!(benches);
