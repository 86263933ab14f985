//! SPSC ring FIFO and boundary behavior

use sage_core::core::message::{Envelope, MarketTick, FLAG_TRADE};
use sage_core::core::FixedPoint;
use sage_core::ring::spsc;

#[test]
fn fifo_fill_reject_refill_drain() {
    let (mut tx, mut rx) = spsc::channel::<u64, 16>();

    // Fill to capacity.
    for i in 0..16u64 {
        assert!(tx.try_push(i), "push {} into empty slots", i);
    }
    // 17th push fails without blocking.
    assert!(!tx.try_push(16));

    // Pop four, push four more.
    let mut out = 0u64;
    for expected in 0..4u64 {
        assert!(rx.try_pop(&mut out));
        assert_eq!(out, expected);
    }
    for v in 30..34u64 {
        assert!(tx.try_push(v));
    }

    // Drain: exactly 4..16 then 30..34, in order.
    let mut drained = Vec::new();
    while rx.try_pop(&mut out) {
        drained.push(out);
    }
    let expected: Vec<u64> = (4..16).chain(30..34).collect();
    assert_eq!(drained, expected);
}

#[test]
fn full_capacity_roundtrip_preserves_order() {
    let (mut tx, mut rx) = spsc::channel::<u32, 64>();
    for i in 0..64u32 {
        assert!(tx.try_push(i));
    }
    assert!(tx.full_approx());

    let mut out = 0u32;
    let mut count = 0;
    while rx.try_pop(&mut out) {
        assert_eq!(out, count);
        count += 1;
    }
    assert_eq!(count, 64, "count equals capacity");
    assert!(rx.empty_approx());
}

#[test]
fn batch_pop_returns_min_of_batch_and_available() {
    let (mut tx, mut rx) = spsc::channel::<u64, 32>();
    for i in 0..7u64 {
        tx.try_push(i);
    }

    // k < m
    let mut buf = [0u64; 3];
    assert_eq!(rx.try_pop_batch(&mut buf), 3);
    assert_eq!(buf, [0, 1, 2]);

    // k > m
    let mut big = [0u64; 10];
    assert_eq!(rx.try_pop_batch(&mut big), 4);
    assert_eq!(&big[..4], &[3, 4, 5, 6]);
}

#[test]
fn empty_ring_pop_and_peek_leave_out_untouched() {
    let (_tx, mut rx) = spsc::channel::<u64, 16>();
    let mut out = 0xDEAD_BEEFu64;
    assert!(!rx.try_pop(&mut out));
    assert_eq!(out, 0xDEAD_BEEF);
    assert!(!rx.try_peek(&mut out));
    assert_eq!(out, 0xDEAD_BEEF);
}

#[test]
fn envelopes_move_through_the_ring_intact() {
    let (mut tx, mut rx) = spsc::channel::<Envelope, 16>();

    let tick = MarketTick::new(
        FixedPoint::from_f64(50_000.5),
        FixedPoint::from_f64(0.25),
        42,
        FLAG_TRADE,
        1,
    );
    assert!(tx.try_push(Envelope::market_tick(123, 7, tick)));

    let mut out = Envelope::invalid();
    assert!(rx.try_pop(&mut out));
    assert!(out.is_valid());
    assert_eq!(out.timestamp_ns, 123);
    assert_eq!(out.sequence_id, 7);
    let t = out.as_market_tick().expect("tick payload");
    assert_eq!(t.symbol_id, 42);
    assert_eq!(t.price, FixedPoint::from_f64(50_000.5));
}

#[test]
fn size_approx_bounded_by_capacity_under_concurrency() {
    use std::thread;

    let (mut tx, mut rx) = spsc::channel::<u64, 64>();

    let producer = thread::spawn(move || {
        for i in 0..100_000u64 {
            tx.push_blocking(i);
            assert!(tx.size_approx() <= 64);
        }
    });
    let consumer = thread::spawn(move || {
        let mut out = 0u64;
        for expected in 0..100_000u64 {
            rx.pop_blocking(&mut out);
            assert_eq!(out, expected);
            assert!(rx.size_approx() <= 64);
        }
    });

    producer.join().unwrap();
    consumer.join().unwrap();
}
