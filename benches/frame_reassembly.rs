//! Benchmarks for the ingest hot path
//!
//! Measures how fast a telemetry byte stream becomes parsed messages:
//! - Reassembly alone, with the stream split into radio-sized chunks
//! - Reassembly followed by checksum validation and field decoding
//! - Resynchronisation cost when the stream carries line noise

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use gcslink::protocol::{FrameReassembler, parse};
use gcslink::test_utils::{VehicleFrames, chunked};
use std::hint::black_box;

const BURST_FRAMES: usize = 400;

fn bench_reassembly(c: &mut Criterion) {
    let stream = VehicleFrames::default().telemetry_burst(BURST_FRAMES);

    let mut group = c.benchmark_group("reassembly");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    for chunk_size in [16usize, 64, 512] {
        let chunks = chunked(&stream, chunk_size);
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunks, |b, chunks| {
            b.iter(|| {
                let mut reassembler = FrameReassembler::default();
                let mut frames = 0;
                for chunk in chunks {
                    frames += reassembler.push(black_box(chunk)).len();
                }
                black_box(frames)
            })
        });
    }

    group.finish();
}

fn bench_reassemble_and_parse(c: &mut Criterion) {
    let stream = VehicleFrames::default().telemetry_burst(BURST_FRAMES);
    let chunks = chunked(&stream, 64);

    let mut group = c.benchmark_group("reassemble_and_parse");
    group.throughput(Throughput::Elements(BURST_FRAMES as u64));

    group.bench_function("telemetry_burst", |b| {
        b.iter(|| {
            let mut reassembler = FrameReassembler::default();
            let mut parsed = 0;
            for chunk in &chunks {
                for frame in reassembler.push(chunk) {
                    if parse(&frame).is_ok() {
                        parsed += 1;
                    }
                }
            }
            assert_eq!(parsed, BURST_FRAMES);
            black_box(parsed)
        })
    });

    group.finish();
}

fn bench_noisy_stream(c: &mut Criterion) {
    let vehicle = VehicleFrames::default();
    let mut stream = Vec::new();
    for i in 0..BURST_FRAMES / 4 {
        stream.extend((0..13u8).map(|n| n.wrapping_mul(i as u8)));
        stream.extend(vehicle.telemetry_burst(4));
    }
    let chunks = chunked(&stream, 64);

    let mut group = c.benchmark_group("noisy_stream");
    group.throughput(Throughput::Bytes(stream.len() as u64));

    group.bench_function("resync", |b| {
        b.iter(|| {
            let mut reassembler = FrameReassembler::default();
            let mut valid = 0;
            for chunk in &chunks {
                valid += reassembler.push(chunk).iter().filter(|f| parse(f).is_ok()).count();
            }
            black_box(valid)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_reassembly, bench_reassemble_and_parse, bench_noisy_stream);
criterion_main!(benches);
