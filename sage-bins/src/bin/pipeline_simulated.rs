//! Full four-stage pipeline over pinned threads with a synthetic feed
//!
//! Feed -> ring -> analytics -> ring -> risk -> ring -> execution, plus a
//! heartbeat thread for periodic stats and the breaker condition check,
//! and the audit sync daemon for durability. The decision stage between
//! analytics and risk is a pass-through, so those two workers share a ring
//! directly.
//!
//! The feed is a random-walk price series; the run is bounded by `--ticks`
//! and shuts down cooperatively once every stage has drained.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rand::Rng;

use sage_bins::common::{init_logging, setup_worker, CommonArgs};
use sage_core::prelude::*;

fn main() -> Result<()> {
    let args = CommonArgs::parse();
    init_logging(&args.log_level)?;

    let cfg = PipelineConfig::from_env();
    tracing::info!(
        ticks = args.ticks,
        symbols = args.symbols,
        audit = %cfg.audit.path.display(),
        "starting simulated pipeline"
    );

    let symbols = args.symbols.clamp(1, MAX_SYMBOLS as u64);

    // Rings between the stages, allocated once up front.
    let (mut feed_tx, mut ade_rx) = spsc::channel::<Envelope, PIPELINE_RING_CAPACITY>();
    let (mut ade_tx, mut rme_rx) = spsc::channel::<Envelope, PIPELINE_RING_CAPACITY>();
    let (mut rme_tx, mut poe_rx) = spsc::channel::<Envelope, PIPELINE_RING_CAPACITY>();

    let shutdown = ShutdownFlag::new();

    // Engines. Construction calibrates each worker's TSC converter.
    let mut ade = AnalyticsEngine::new(cfg.ade.clone());
    let ade_metrics = ade.metrics();
    let mut rme = RiskEngine::new(cfg.limits);
    let rme_metrics = rme.metrics();
    let breaker = rme.breaker();
    let book_aggregates = rme.aggregates();

    let audit = Arc::new(AuditLog::open(&cfg.audit.path)?);
    let sync_daemon = AuditSyncDaemon::spawn(Arc::clone(&audit), cfg.audit.sync_interval());
    let mut poe = ExecutionEngine::new(Arc::clone(&audit), CountingSender::new());
    let poe_metrics = poe.metrics();

    let realtime = args.realtime;
    let feed_core = args.cpu_core_base;
    let ade_core = args.cpu_core_base.map(|b| b + 1);
    let rme_core = args.cpu_core_base.map(|b| b + 2);
    let poe_core = args.cpu_core_base.map(|b| b + 3);

    // Feed: synthetic random-walk ticks.
    let feed_flag = shutdown.clone();
    let ticks = args.ticks;
    let feeder = thread::Builder::new().name("feed".into()).spawn(move || {
        setup_worker("feed", feed_core, realtime);
        let mut rng = rand::thread_rng();
        let mut prices = vec![100.0f64; symbols as usize];
        let mut dropped = 0u64;

        for i in 0..ticks {
            if feed_flag.is_requested() {
                break;
            }
            let sym = (i % symbols) as usize;
            prices[sym] += rng.gen_range(-0.05..0.05);
            prices[sym] = prices[sym].max(1.0);

            let tick = MarketTick::new(
                FixedPoint::from_f64(prices[sym]),
                FixedPoint::from_f64(rng.gen_range(0.1..2.0)),
                sym as u64,
                sage_core::core::message::FLAG_TRADE,
                1,
            );
            let msg = Envelope::market_tick(clock::monotonic_ns(), i, tick);
            if !feed_tx.try_push(msg) {
                // Full ring: drop at the producer rather than block.
                dropped += 1;
            }
        }
        tracing::info!(dropped, "feed finished");
    })?;

    // Analytics worker: batch dequeue, signal emission.
    let ade_flag = shutdown.clone();
    let ade_worker = thread::Builder::new().name("ade".into()).spawn(move || {
        setup_worker("ade", ade_core, realtime);
        let metrics = ade.metrics();
        let mut batch = [Envelope::invalid(); ADE_BATCH_SIZE];
        loop {
            let n = ade_rx.try_pop_batch(&mut batch);
            if n == 0 {
                if ade_flag.is_requested() {
                    break;
                }
                std::hint::spin_loop();
                continue;
            }
            for msg in &batch[..n] {
                if let Some(signal) = ade.on_message(msg) {
                    if !ade_tx.try_push(signal) {
                        metrics
                            .signals_dropped
                            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                }
            }
        }
        tracing::info!(summary = ?ade.latency_summary(), "analytics worker stopped");
    })?;

    // Risk worker.
    let rme_flag = shutdown.clone();
    let rme_worker = thread::Builder::new().name("rme".into()).spawn(move || {
        setup_worker("rme", rme_core, realtime);
        let metrics = rme.metrics();
        let mut msg = Envelope::invalid();
        loop {
            if rme_rx.try_pop(&mut msg) {
                if let Some(order) = rme.on_message(&msg) {
                    if !rme_tx.try_push(order) {
                        metrics
                            .orders_dropped
                            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    }
                }
            } else if rme_flag.is_requested() {
                break;
            } else {
                std::hint::spin_loop();
            }
        }
        tracing::info!(
            exposure = rme.book().total_exposure(),
            daily_pnl = rme.book().daily_pnl(),
            "risk worker stopped"
        );
    })?;

    // Execution worker.
    let poe_flag = shutdown.clone();
    let poe_worker = thread::Builder::new().name("poe".into()).spawn(move || {
        setup_worker("poe", poe_core, realtime);
        let mut msg = Envelope::invalid();
        loop {
            if poe_rx.try_pop(&mut msg) {
                poe.on_message(&msg);
            } else if poe_flag.is_requested() {
                break;
            } else {
                std::hint::spin_loop();
            }
        }
        tracing::info!("execution worker stopped");
    })?;

    // Heartbeat: periodic stats and the breaker condition check.
    let hb_flag = shutdown.clone();
    let hb_ade = Arc::clone(&ade_metrics);
    let hb_rme = Arc::clone(&rme_metrics);
    let hb_poe = Arc::clone(&poe_metrics);
    let hb_audit = Arc::clone(&audit);
    let hb_breaker = Arc::clone(&breaker);
    let hb_limits = cfg.limits;
    let heartbeat = thread::Builder::new().name("heartbeat".into()).spawn(move || {
        while !hb_flag.is_requested() {
            thread::sleep(Duration::from_secs(1));

            // Breaker condition check: the monitoring loop, not the hot
            // path, watches the daily loss.
            if book_aggregates.daily_pnl() < -hb_limits.max_daily_loss {
                hb_breaker.trip(sage_core::risk::BreakerReason::DailyLossBreach);
            }

            let a = hb_ade.snapshot();
            let r = hb_rme.snapshot();
            let p = hb_poe.snapshot();
            tracing::info!(
                processed = a.messages_processed,
                signals = a.signals_generated,
                gated = a.signals_gated,
                outliers = a.outliers_capped,
                approved = r.orders_approved,
                rejected = r.orders_rejected,
                sent = p.orders_sent,
                failed = p.orders_failed,
                exposure = book_aggregates.total_exposure(),
                daily_pnl = book_aggregates.daily_pnl(),
                audit_entries = hb_audit.entries_logged(),
                breaker_tripped = hb_breaker.is_tripped(),
                "pipeline stats"
            );
        }
    })?;

    // Wait for the feed, let the stages drain, then stop everyone.
    feeder.join().expect("feed thread");
    let deadline = std::time::Instant::now() + Duration::from_secs(10);
    while std::time::Instant::now() < deadline {
        let a = ade_metrics.snapshot();
        let r = rme_metrics.snapshot();
        let p = poe_metrics.snapshot();
        let drained = a.signals_generated - a.signals_dropped == r.signals_received
            && r.orders_approved == p.orders_sent + p.orders_failed + r.orders_dropped;
        if drained && a.messages_processed > 0 {
            break;
        }
        thread::sleep(Duration::from_millis(10));
    }
    shutdown.request();

    ade_worker.join().expect("ade thread");
    rme_worker.join().expect("rme thread");
    poe_worker.join().expect("poe thread");
    heartbeat.join().expect("heartbeat thread");

    // Final durability checkpoint before reporting.
    sync_daemon.stop();

    let a = ade_metrics.snapshot();
    let r = rme_metrics.snapshot();
    let p = poe_metrics.snapshot();
    tracing::info!("=== final statistics ===");
    tracing::info!(
        processed = a.messages_processed,
        signals = a.signals_generated,
        gated = a.signals_gated,
        outliers = a.outliers_capped,
        dropped = a.signals_dropped,
        "analytics"
    );
    tracing::info!(
        received = r.signals_received,
        approved = r.orders_approved,
        rejected = r.orders_rejected,
        avg_decision_ns = r.avg_decision_ns(),
        "risk"
    );
    tracing::info!(
        sent = p.orders_sent,
        failed = p.orders_failed,
        bytes = p.bytes_sent,
        audit_entries = audit.entries_logged(),
        audit_syncs = audit.sync_count(),
        truncations = audit.truncation_count(),
        "execution"
    );

    Ok(())
}
