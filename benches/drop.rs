use burrow::Handle;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};

fn chain(depth: usize) -> Handle<u64> {
    let root = Handle::new(0_u64).ok().unwrap();
    let mut current_payload = root.payload();
    for i in 1..depth {
        let next = Handle::new(i as u64).ok().unwrap();
        unsafe {
            burrow::raw::ref_(current_payload, next.payload());
        }
        current_payload = next.payload();
    }
    root
}

/// A root with `width` direct children, each of which itself has `width`
/// children of its own: `width^2 + width + 1` burrows total, all reachable
/// only through the root.
fn wide_tree(width: usize) -> Handle<u64> {
    let root = Handle::new(0_u64).ok().unwrap();
    for i in 0..width {
        let branch = Handle::new_child(&root, i as u64).ok().unwrap();
        for j in 0..width {
            Handle::new_child(&branch, j as u64).ok().unwrap();
        }
    }
    root
}

fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("free a single rootless burrow", |b| {
        b.iter_batched(|| Handle::new(0_u64).ok().unwrap(), Handle::free, BatchSize::SmallInput)
    });

    let mut group = c.benchmark_group("free a chain");
    for depth in [10, 20, 30, 40, 50, 100] {
        group.bench_with_input(format!("depth {depth}"), &depth, |b, &depth| {
            b.iter_batched(|| chain(black_box(depth)), Handle::free, BatchSize::LargeInput)
        });
    }
    group.finish();

    let mut group = c.benchmark_group("free a wide tree");
    for width in [4, 8, 16, 32] {
        group.bench_with_input(format!("width {width}"), &width, |b, &width| {
            b.iter_batched(|| wide_tree(black_box(width)), Handle::free, BatchSize::LargeInput)
        });
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
