//! Engine comparison benchmark
//!
//! Measures, for the fixture record with a member of every wire category:
//! - Plan lookup after first compilation
//! - Compiled vs reflective serialize and deserialize
//! - serde_json as an external baseline
//!
//! Payloads are written into a reused buffer so allocation of the output
//! does not dominate.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use compact_serde::{CompactCodec, CompiledCodec, ReflectiveCodec, compile};
use std::hint::black_box as bb;

#[path = "../tests/common/mod.rs"]
mod common;

use common::Entity;

fn bench_plan_lookup(c: &mut Criterion) {
    compile::<Entity>().expect("entity compiles");
    c.bench_function("plan_lookup", |b| {
        b.iter(|| compile::<Entity>().expect("cached plan"));
    });
}

fn bench_serialize(c: &mut Criterion) {
    let entity = common::sample();
    let compiled = CompiledCodec::<Entity>::new().expect("compiled codec");
    let reflective = ReflectiveCodec::<Entity>::new().expect("reflective codec");

    let mut size = Vec::new();
    compiled.serialize(&entity, &mut size).expect("serialize");

    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Bytes(size.len() as u64));

    let mut buf = Vec::with_capacity(size.len());
    group.bench_function("compiled", |b| {
        b.iter(|| {
            buf.clear();
            compiled.serialize(bb(&entity), &mut buf).expect("serialize");
        });
    });
    group.bench_function("reflective", |b| {
        b.iter(|| {
            buf.clear();
            reflective.serialize(bb(&entity), &mut buf).expect("serialize");
        });
    });
    group.bench_function("serde_json", |b| {
        b.iter(|| {
            buf.clear();
            serde_json::to_writer(&mut buf, bb(&entity)).expect("serialize");
        });
    });

    group.finish();
}

fn bench_deserialize(c: &mut Criterion) {
    let entity = common::sample();
    let compiled = CompiledCodec::<Entity>::new().expect("compiled codec");
    let reflective = ReflectiveCodec::<Entity>::new().expect("reflective codec");

    let mut bytes = Vec::new();
    compiled.serialize(&entity, &mut bytes).expect("serialize");
    let json = serde_json::to_vec(&entity).expect("serialize");

    let mut group = c.benchmark_group("deserialize");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    group.bench_function("compiled", |b| {
        b.iter(|| compiled.deserialize(&mut bb(&bytes[..])).expect("deserialize"));
    });
    group.bench_function("reflective", |b| {
        b.iter(|| reflective.deserialize(&mut bb(&bytes[..])).expect("deserialize"));
    });
    group.bench_function("serde_json", |b| {
        b.iter(|| serde_json::from_slice::<Entity>(bb(&json)).expect("deserialize"));
    });

    group.finish();
}

criterion_group!(benches, bench_plan_lookup, bench_serialize, bench_deserialize);
criterion_main!(benches);
