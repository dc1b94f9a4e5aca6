//! Benchmarks for record reassembly and pipeline execution.

use chunkflow::core::Chunk;
use chunkflow::pipeline::PipelineBuilder;
use chunkflow::stages::{LineSplitter, RecordTransform};
use chunkflow::testing::{RecordingConsumer, ScriptedProducer};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn line_split_benchmark(c: &mut Criterion) {
    let payload = "the quick brown fox jumps over the lazy dog\n".repeat(256);
    let chunk = Chunk::text(&payload);

    let mut group = c.benchmark_group("line_split");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("256_lines", |b| {
        b.iter(|| {
            let mut splitter = LineSplitter::lines();
            let records = splitter.write(black_box(&chunk)).unwrap();
            black_box(records)
        });
    });
    group.finish();
}

fn pipeline_benchmark(c: &mut Criterion) {
    c.bench_function("pipeline_100_records", |b| {
        b.iter(|| {
            let texts: String = (0..100).map(|i| format!("record-{i}\n")).collect();
            let (pipeline, _handle) = PipelineBuilder::new("bench")
                .source("chunks", ScriptedProducer::from_texts(&[texts.as_str()]))
                .transform("lines", LineSplitter::lines())
                .sink("store", RecordingConsumer::new())
                .build()
                .unwrap();
            let report = tokio_test::block_on(pipeline.run()).unwrap();
            black_box(report)
        });
    });
}

criterion_group!(benches, line_split_benchmark, pipeline_benchmark);
criterion_main!(benches);
