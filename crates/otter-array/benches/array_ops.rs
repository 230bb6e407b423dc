//! Array operation benchmarks
//!
//! Compares dense fast paths with the generic paths taken by slow arrays.
//!
//! Run with: cargo bench -p otter-array

use criterion::{Criterion, criterion_group, criterion_main};
use otter_array::array::{mode, mutators, sort};
use otter_array::{NativeContext, Value, new_array, new_array_from_values};
use std::hint::black_box;

fn numbers(ncx: &mut NativeContext, count: usize) -> Value {
    let values = (0..count)
        .map(|i| Value::number(((i * 7919) % count) as f64))
        .collect();
    Value::object(new_array_from_values(ncx, values).expect("array"))
}

/// Benchmark: push into a dense array vs. a slow one
fn bench_push(c: &mut Criterion) {
    c.bench_function("push_dense_1000", |b| {
        let mut ncx = NativeContext::new();
        b.iter(|| {
            let array = Value::object(new_array(&ncx));
            for i in 0..1000 {
                mutators::push(&mut ncx, &array, &[Value::number(i as f64)]).expect("push");
            }
            black_box(array)
        });
    });

    c.bench_function("push_slow_1000", |b| {
        let mut ncx = NativeContext::new();
        b.iter(|| {
            let array = new_array(&ncx);
            mode::make_slow(&array).expect("convert");
            let array = Value::object(array);
            for i in 0..1000 {
                mutators::push(&mut ncx, &array, &[Value::number(i as f64)]).expect("push");
            }
            black_box(array)
        });
    });
}

/// Benchmark: shift/unshift block moves
fn bench_shift_unshift(c: &mut Criterion) {
    c.bench_function("unshift_shift_dense_1000", |b| {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, 1000);
        b.iter(|| {
            mutators::unshift(&mut ncx, &array, &[Value::number(1.0)]).expect("unshift");
            black_box(mutators::shift(&mut ncx, &array, &[]).expect("shift"))
        });
    });
}

/// Benchmark: default and comparator sort
fn bench_sort(c: &mut Criterion) {
    c.bench_function("sort_default_1000", |b| {
        let mut ncx = NativeContext::new();
        b.iter(|| {
            let array = numbers(&mut ncx, 1000);
            black_box(sort::sort(&mut ncx, &array, &[]).expect("sort"))
        });
    });

    c.bench_function("sort_comparator_1000", |b| {
        let mut ncx = NativeContext::new();
        let compare = ncx.create_function("compare", 2, |_ncx, _this, args| {
            let x = args[0].as_number().unwrap_or(0.0);
            let y = args[1].as_number().unwrap_or(0.0);
            Ok(Value::number(x - y))
        });
        b.iter(|| {
            let array = numbers(&mut ncx, 1000);
            black_box(sort::sort(&mut ncx, &array, &[compare.clone()]).expect("sort"))
        });
    });
}

/// Benchmark: splice in the middle and slice copies
fn bench_splice_slice(c: &mut Criterion) {
    c.bench_function("splice_middle_1000", |b| {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, 1000);
        b.iter(|| {
            let removed = mutators::splice(
                &mut ncx,
                &array,
                &[Value::number(500.0), Value::number(1.0), Value::number(0.0)],
            )
            .expect("splice");
            black_box(removed)
        });
    });

    c.bench_function("slice_dense_1000", |b| {
        let mut ncx = NativeContext::new();
        let array = numbers(&mut ncx, 1000);
        b.iter(|| black_box(mutators::slice(&mut ncx, &array, &[]).expect("slice")));
    });
}

criterion_group!(
    benches,
    bench_push,
    bench_shift_unshift,
    bench_sort,
    bench_splice_slice
);
criterion_main!(benches);
