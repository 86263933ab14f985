//! Risk-engine admission behavior against configured limits

use std::time::Duration;

use sage_core::core::message::{Envelope, SignalData};
use sage_core::core::FixedPoint;
use sage_core::perf::clock::{self, TscCalibrator};
use sage_core::risk::{BreakerReason, RiskEngine, RiskLimits};

fn engine(limits: RiskLimits) -> RiskEngine {
    RiskEngine::with_calibrator(limits, TscCalibrator::with_period(Duration::from_millis(5)))
}

fn signal(symbol: u64, confidence: i64, direction: i8) -> Envelope {
    let sig = SignalData::new(symbol, FixedPoint::from_raw(confidence), direction, 1);
    Envelope::signal(clock::monotonic_ns(), 1, sig)
}

/// Position limit 1,000,000 with 900,000 held: a +200,000 order must be
/// rejected, the store unchanged, and the reject counter exactly 1.
#[test]
fn position_limit_rejection_leaves_store_unchanged() {
    let mut eng = engine(RiskLimits {
        max_position_per_symbol: 1_000_000,
        max_total_exposure: 100_000_000,
        max_daily_loss: 10_000_000,
        max_order_size: 10_000_000,
    });
    eng.book_mut().update_position(7, 900_000, 0);
    let exposure_before = eng.book().total_exposure();

    let out = eng.on_message(&signal(7, 200_000, 1));

    assert!(out.is_none());
    assert_eq!(eng.book().position(7), 900_000);
    assert_eq!(eng.book().total_exposure(), exposure_before);
    let snap = eng.metrics().snapshot();
    assert_eq!(snap.orders_rejected, 1);
    assert_eq!(snap.orders_approved, 0);
}

/// The same order on a fresh symbol passes and updates the book.
#[test]
fn approval_updates_position_and_emits_order() {
    let mut eng = engine(RiskLimits {
        max_position_per_symbol: 1_000_000,
        max_total_exposure: 100_000_000,
        max_daily_loss: 10_000_000,
        max_order_size: 10_000_000,
    });

    let out = eng.on_message(&signal(7, 200_000, 1)).expect("approved");
    let order = out.as_order().expect("order payload");
    assert_eq!(order.symbol_id, 7);
    assert_eq!(order.side, 1);
    assert_eq!(order.quantity.raw(), 200_000);
    assert!(order.price.is_zero(), "market orders carry no limit price");

    assert_eq!(eng.book().position(7), 200_000);
    assert_eq!(eng.book().total_exposure(), 200_000);
    assert_eq!(eng.metrics().snapshot().orders_approved, 1);
}

/// Short side symmetry: a -200,000 order against -900,000 held.
#[test]
fn short_position_limit_symmetric() {
    let mut eng = engine(RiskLimits {
        max_position_per_symbol: 1_000_000,
        max_total_exposure: 100_000_000,
        max_daily_loss: 10_000_000,
        max_order_size: 10_000_000,
    });
    eng.book_mut().update_position(7, -900_000, 0);

    assert!(eng.on_message(&signal(7, 200_000, -1)).is_none());
    assert_eq!(eng.book().position(7), -900_000);
    // Reducing the short passes.
    assert!(eng.on_message(&signal(7, 200_000, 1)).is_some());
    assert_eq!(eng.book().position(7), -700_000);
}

/// A tripped breaker short-circuits every decision to reject.
#[test]
fn tripped_breaker_rejects_everything() {
    let mut eng = engine(RiskLimits::default());
    assert!(eng.on_message(&signal(1, 100, 1)).is_some());

    eng.breaker().trip(BreakerReason::ManualHalt);
    for i in 0..10 {
        assert!(eng.on_message(&signal(i, 100, 1)).is_none());
    }
    let snap = eng.metrics().snapshot();
    assert_eq!(snap.orders_approved, 1);
    assert_eq!(snap.orders_rejected, 10);

    // Reset restores admission.
    eng.breaker().reset();
    assert!(eng.on_message(&signal(1, 100, 1)).is_some());
}

/// Daily-loss breach trips the breaker via the monitoring check, and
/// subsequent orders are rejected without touching the limits.
#[test]
fn daily_loss_breach_trips_breaker() {
    let eng = engine(RiskLimits {
        max_daily_loss: 100_000,
        ..RiskLimits::default()
    });

    eng.book().record_pnl(-100_001);
    eng.check_breaker_conditions();

    assert!(eng.breaker().is_tripped());
    assert_eq!(eng.breaker().reason(), BreakerReason::DailyLossBreach);
}

/// Aggregates are visible to observer threads with acquire loads.
#[test]
fn aggregates_visible_cross_thread() {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    let mut eng = engine(RiskLimits::default());
    eng.on_message(&signal(1, 10_000, 1));

    let breaker = eng.breaker();
    let done = Arc::new(AtomicBool::new(false));
    let done2 = Arc::clone(&done);

    let observer = std::thread::spawn(move || {
        // Breaker state is the cross-worker fast path.
        while !done2.load(Ordering::Acquire) {
            assert!(!breaker.is_tripped());
            std::hint::spin_loop();
        }
    });

    std::thread::sleep(Duration::from_millis(10));
    done.store(true, Ordering::Release);
    observer.join().unwrap();

    assert_eq!(eng.book().total_exposure(), 10_000);
}

/// Decision metrics accumulate across a burst of mixed outcomes.
#[test]
fn metrics_account_for_every_signal() {
    let mut eng = engine(RiskLimits {
        max_order_size: 1_000,
        ..RiskLimits::default()
    });

    for i in 0..20 {
        let confidence = if i % 2 == 0 { 500 } else { 5_000 };
        eng.on_message(&signal(1, confidence, 1));
    }
    let snap = eng.metrics().snapshot();
    assert_eq!(snap.signals_received, 20);
    assert_eq!(snap.orders_approved, 10);
    assert_eq!(snap.orders_rejected, 10);
}
