extern crate malscope;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use malscope::prelude::*;
use std::hint::black_box;

const HELLO_WORLD: &[u8] =
    b"(=<`#9]~6ZY32Vx/4Rs+0No-&Jk)\"Fh}|Bcy?`=*z]Kw%oG4UUS0/@-ejc(:'8dc";

/// Benchmark loading: validation of the image plus filling the remaining memory.
fn bench_load(c: &mut Criterion) {
    let image = ProgramImage::from_mem(HELLO_WORLD.to_vec()).unwrap();

    c.bench_function("vm_load", |b| {
        b.iter(|| {
            let state = VmState::load(black_box(&image)).unwrap();
            black_box(state)
        });
    });
}

/// Benchmark a silent run to `Hlt`, with and without recording.
fn bench_execute(c: &mut Criterion) {
    let image = ProgramImage::from_mem(HELLO_WORLD.to_vec()).unwrap();
    let initial = VmState::load(&image).unwrap();
    let interrupt = Interrupt::new();

    let mut group = c.benchmark_group("execute");
    group.throughput(Throughput::Elements(40));
    group.bench_function("silent", |b| {
        b.iter(|| {
            let mut state = initial.clone();
            let run = execute(
                &mut state,
                &mut Channel::silent(),
                &StopCondition::unbounded(),
                Recording::Off,
                &interrupt,
            );
            black_box(run)
        });
    });
    group.bench_function("recorded", |b| {
        let mut facts = AccessFacts::new().unwrap();
        b.iter(|| {
            let mut state = initial.clone();
            let run = execute(
                &mut state,
                &mut Channel::silent(),
                &StopCondition::unbounded(),
                Recording::Record(&mut facts),
                &interrupt,
            );
            black_box(run)
        });
    });
    group.finish();
}

criterion_group!(benches, bench_load, bench_execute);
criterion_main!(benches);
