use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memlist::{MemoryBlock, Sequence};

fn filled(size: usize) -> Sequence {
    (0..size).map(|i| MemoryBlock::new(i * 16, 16)).collect()
}

fn benchmark_end_operations(c: &mut Criterion) {
    let mut sequence = filled(1000);

    c.bench_function("add_last then remove first", |b| {
        b.iter(|| {
            sequence.add_last(black_box(MemoryBlock::new(0, 16)));
            sequence.remove_at(0).unwrap();
        });
    });
}

fn benchmark_positional_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_at_middle");

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let sequence = filled(size);
            b.iter(|| {
                sequence.block_at(black_box(size / 2)).unwrap();
            });
        });
    }
    group.finish();
}

fn benchmark_value_removal(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_block_tail");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut sequence = filled(size);
            let tail = MemoryBlock::new((size - 1) * 16, 16);
            b.iter(|| {
                sequence.remove_block(black_box(&tail)).unwrap();
                sequence.add_last(tail);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_end_operations,
    benchmark_positional_lookup,
    benchmark_value_removal
);
criterion_main!(benches);
