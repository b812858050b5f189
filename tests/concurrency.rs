mod common;

use common::{Entity, sample};
use compact_serde::{
    CompactCodec, CompiledCodec, ReflectiveCodec, compile, descriptors, is_compiled, record,
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Barrier};
use std::thread;

const THREADS: usize = 16;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

record! {
    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Fresh {
        id: u64,
        label: Option<String>,
        window: VecDeque<f64>,
    }
}

#[test]
fn test_concurrent_first_use_compiles_once() {
    init_tracing();
    assert!(!is_compiled::<Fresh>());

    let value = Fresh {
        id: 99,
        label: Some("racing".into()),
        window: [0.5, 1.5].into_iter().collect(),
    };
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = barrier.clone();
            let value = value.clone();
            thread::spawn(move || {
                barrier.wait();
                let plan = compile::<Fresh>().unwrap();
                let mut buf = Vec::new();
                CompiledCodec::<Fresh>::new()
                    .unwrap()
                    .serialize(&value, &mut buf)
                    .unwrap();
                (plan, buf)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let (first_plan, first_bytes) = &results[0];
    for (plan, bytes) in &results {
        assert!(Arc::ptr_eq(plan, first_plan));
        assert_eq!(bytes, first_bytes);
    }
    assert!(is_compiled::<Fresh>());
    assert_eq!(first_plan.members().len(), 3);
    assert_eq!(first_plan.members()[2].name, "window");
}

#[test]
fn test_engines_agree_across_threads() {
    init_tracing();
    let expected = {
        let mut buf = Vec::new();
        ReflectiveCodec::<Entity>::new()
            .unwrap()
            .serialize(&sample(), &mut buf)
            .unwrap();
        buf
    };

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                let entity = sample();
                let mut buf = Vec::new();
                if i % 2 == 0 {
                    CompiledCodec::<Entity>::new()
                        .unwrap()
                        .serialize(&entity, &mut buf)
                        .unwrap();
                } else {
                    ReflectiveCodec::<Entity>::new()
                        .unwrap()
                        .serialize(&entity, &mut buf)
                        .unwrap();
                }
                let decoded = CompiledCodec::<Entity>::new()
                    .unwrap()
                    .deserialize(&mut &buf[..])
                    .unwrap();
                assert_eq!(decoded, entity);
                buf
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn test_shared_codec_with_random_values() {
    let codec = Arc::new(CompiledCodec::<Entity>::new().unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let codec = codec.clone();
            thread::spawn(move || {
                let entity = common::random();
                let mut buf = Vec::new();
                codec.serialize(&entity, &mut buf).unwrap();
                assert_eq!(codec.deserialize(&mut &buf[..]).unwrap(), entity);
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_descriptors_are_shared() {
    let first = descriptors::<Entity>().unwrap();
    let second = descriptors::<Entity>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first[0].name, "id");
    assert_eq!(first.len(), 34);
}
