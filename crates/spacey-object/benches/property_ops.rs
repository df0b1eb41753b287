// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Property Operation Benchmarks
//!
//! Adds, lookups through the table threshold and the prototype chain, and
//! a full collection.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use spacey_object::{OBJECT_CLASS, PropertyId, Runtime, RuntimeOptions, Value};
use std::hint::black_box;

fn ids(n: usize) -> Vec<PropertyId> {
    (0..n).map(|i| PropertyId::atom(&format!("prop{}", i))).collect()
}

fn bench_add_properties(c: &mut Criterion) {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let mut group = c.benchmark_group("add_properties");
    for n in [4usize, 16, 64] {
        let ids = ids(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            b.iter(|| {
                let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
                for (i, id) in ids.iter().enumerate() {
                    cx.set_property(obj, id, Value::Number(i as f64)).unwrap();
                }
                black_box(obj)
            });
            cx.gc().unwrap();
        });
    }
    group.finish();
}

fn bench_get_own(c: &mut Criterion) {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let mut group = c.benchmark_group("get_own");
    // below and above the scope hash threshold
    for n in [4usize, 32] {
        let ids = ids(n);
        let obj = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.add_root(obj);
        for (i, id) in ids.iter().enumerate() {
            cx.set_property(obj, id, Value::Number(i as f64)).unwrap();
        }
        group.bench_with_input(BenchmarkId::from_parameter(n), &ids, |b, ids| {
            b.iter(|| {
                let mut sum = 0.0;
                for id in ids {
                    sum += cx.get_property(obj, id).unwrap().to_number();
                }
                black_box(sum)
            });
        });
    }
    group.finish();
}

fn bench_get_inherited(c: &mut Criterion) {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let base = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.set_property(base, &"deep".into(), 1.into()).unwrap();
    let mut obj = base;
    for _ in 0..8 {
        obj = cx.new_object(&OBJECT_CLASS, Some(obj), None).unwrap();
    }
    cx.add_root(obj);
    let id = PropertyId::atom("deep");

    c.bench_function("get_inherited_depth_8", |b| {
        b.iter(|| black_box(cx.get_property(obj, &id).unwrap()));
    });
}

fn bench_gc(c: &mut Criterion) {
    let rt = Runtime::new(RuntimeOptions::default());
    let mut cx = rt.new_context();
    let root = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
    cx.add_root(root);
    for id in ids(1000) {
        let child = cx.new_object(&OBJECT_CLASS, None, None).unwrap();
        cx.set_property(root, &id, child.into()).unwrap();
    }

    c.bench_function("gc_1000_reachable", |b| {
        b.iter(|| black_box(cx.gc().unwrap()));
    });
}

criterion_group!(benches, bench_add_properties, bench_get_own, bench_get_inherited, bench_gc);
criterion_main!(benches);
