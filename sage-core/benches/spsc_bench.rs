//! SPSC ring microbenchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sage_core::core::message::Envelope;
use sage_core::ring::spsc;

fn bench_push_pop(c: &mut Criterion) {
    let (mut tx, mut rx) = spsc::channel::<u64, 1024>();

    c.bench_function("spsc_push_pop_u64", |b| {
        let mut out = 0u64;
        b.iter(|| {
            tx.try_push(black_box(42));
            rx.try_pop(&mut out);
            black_box(out)
        })
    });
}

fn bench_push_pop_envelope(c: &mut Criterion) {
    let (mut tx, mut rx) = spsc::channel::<Envelope, 1024>();
    let msg = Envelope::heartbeat(1, 1, 1);

    c.bench_function("spsc_push_pop_envelope", |b| {
        let mut out = Envelope::invalid();
        b.iter(|| {
            tx.try_push(black_box(msg));
            rx.try_pop(&mut out);
            black_box(out.sequence_id)
        })
    });
}

fn bench_batch_pop(c: &mut Criterion) {
    let (mut tx, mut rx) = spsc::channel::<u64, 1024>();

    c.bench_function("spsc_batch_pop_16", |b| {
        let mut buf = [0u64; 16];
        b.iter(|| {
            for i in 0..16u64 {
                tx.try_push(i);
            }
            black_box(rx.try_pop_batch(&mut buf))
        })
    });
}

criterion_group!(benches, bench_push_pop, bench_push_pop_envelope, bench_batch_pop);
criterion_main!(benches);
