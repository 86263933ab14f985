//! Analytics engine: the per-tick hot path
//!
//! One pre-allocated, cache-aligned state slot per symbol, looked up by
//! `symbol_id & (MAX_SYMBOLS - 1)`. The ingress boundary guarantees
//! `symbol_id < MAX_SYMBOLS`; the mask here is a cheap index, not a
//! validator, and distinct symbols aliasing into one slot would be a
//! data-integrity defect upstream.
//!
//! Per tick: update rolling + EWMA statistics, compute winsorized z-scores
//! from both, classify the volatility regime, and emit a mean-reversion
//! signal when the deviation is large enough and the regime gate allows.
//! Outlier capping and regime gating are counted, silent, expected
//! behavior -- not errors.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Deserialize;

use super::ewma::EwmaStats;
use super::latency::{LatencySummary, LatencyTracker};
use super::normalize;
use super::rolling::RollingStats;
use super::ticks::TickBuffer;
use super::winsor::ZScoreCapper;
use super::VolRegimeDetector;
use crate::config::MAX_SYMBOLS;
use crate::core::fixed::{FixedPoint, SCALE};
use crate::core::message::{Envelope, Payload, SignalData};
use crate::perf::clock::{self, TscCalibrator};

/// Rolling window for per-symbol price/volume statistics.
const STATS_WINDOW: usize = 64;
/// Recent ticks retained per symbol.
const TICK_DEPTH: usize = 256;

/// Volatility regime classification, evaluated every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MarketRegime {
    Unknown = 0,
    /// Calm market; mean reversion most reliable.
    LowVol = 1,
    Normal = 2,
    /// Elevated volatility.
    HighVol = 3,
    /// Volatility structure just broke; signals unreliable.
    RegimeChange = 4,
}

/// Analytics configuration. Embedded defaults, overridable from the
/// environment through [`crate::config`].
#[derive(Debug, Clone, Deserialize)]
pub struct AdeConfig {
    /// EWMA half-life in ticks.
    pub ewma_half_life: u32,
    /// Regime-detector half-life in ticks (vol-of-vol uses double).
    pub regime_half_life: u32,
    /// Winsorization bound for z-scores, scaled by `SCALE`.
    pub max_zscore: i64,
    /// Minimum |z| (scaled) before a signal is emitted.
    pub signal_threshold: i64,
    /// Strategy id stamped on outgoing signals.
    pub strategy_id: u8,
}

impl Default for AdeConfig {
    fn default() -> Self {
        Self {
            ewma_half_life: 50,
            regime_half_life: 100,
            max_zscore: 3 * SCALE,
            signal_threshold: SCALE / 2,
            strategy_id: 1,
        }
    }
}

/// Per-symbol analytics state.
///
/// Cache-aligned so neighboring symbols never share a line. Created once at
/// init, mutated only by the analytics worker, never destroyed.
#[repr(align(64))]
pub struct SymbolState {
    ticks: TickBuffer<TICK_DEPTH>,
    price_stats: RollingStats<STATS_WINDOW>,
    volume_stats: RollingStats<STATS_WINDOW>,
    price_ewma: EwmaStats,
    volume_ewma: EwmaStats,
    regime: VolRegimeDetector,
    last_update_ns: u64,
    message_count: u64,
}

impl SymbolState {
    fn new(cfg: &AdeConfig) -> Self {
        Self {
            ticks: TickBuffer::new(),
            price_stats: RollingStats::new(),
            volume_stats: RollingStats::new(),
            price_ewma: EwmaStats::new(cfg.ewma_half_life),
            volume_ewma: EwmaStats::new(cfg.ewma_half_life),
            regime: VolRegimeDetector::new(cfg.regime_half_life),
            last_update_ns: 0,
            message_count: 0,
        }
    }

    pub fn ticks(&self) -> &TickBuffer<TICK_DEPTH> {
        &self.ticks
    }

    pub fn price_stats(&self) -> &RollingStats<STATS_WINDOW> {
        &self.price_stats
    }

    pub fn volume_stats(&self) -> &RollingStats<STATS_WINDOW> {
        &self.volume_stats
    }

    pub fn price_ewma(&self) -> &EwmaStats {
        &self.price_ewma
    }

    pub fn volume_ewma(&self) -> &EwmaStats {
        &self.volume_ewma
    }

    pub fn regime_detector(&self) -> &VolRegimeDetector {
        &self.regime
    }

    pub fn last_update_ns(&self) -> u64 {
        self.last_update_ns
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }
}

/// Cache-padded analytics counters, readable from any thread.
#[repr(C, align(64))]
pub struct AdeMetrics {
    /// Market ticks processed.
    pub messages_processed: AtomicU64,
    _pad1: [u8; 56],
    /// Signals emitted downstream.
    pub signals_generated: AtomicU64,
    _pad2: [u8; 56],
    /// Signals suppressed by the regime gate.
    pub signals_gated: AtomicU64,
    _pad3: [u8; 56],
    /// Z-scores clamped by winsorization.
    pub outliers_capped: AtomicU64,
    _pad4: [u8; 56],
    /// Signals lost to a full downstream ring.
    pub signals_dropped: AtomicU64,
    _pad5: [u8; 56],
}

impl AdeMetrics {
    pub const fn new() -> Self {
        Self {
            messages_processed: AtomicU64::new(0),
            _pad1: [0; 56],
            signals_generated: AtomicU64::new(0),
            _pad2: [0; 56],
            signals_gated: AtomicU64::new(0),
            _pad3: [0; 56],
            outliers_capped: AtomicU64::new(0),
            _pad4: [0; 56],
            signals_dropped: AtomicU64::new(0),
            _pad5: [0; 56],
        }
    }

    pub fn snapshot(&self) -> AdeMetricsSnapshot {
        AdeMetricsSnapshot {
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            signals_generated: self.signals_generated.load(Ordering::Relaxed),
            signals_gated: self.signals_gated.load(Ordering::Relaxed),
            outliers_capped: self.outliers_capped.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for AdeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`AdeMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdeMetricsSnapshot {
    pub messages_processed: u64,
    pub signals_generated: u64,
    pub signals_gated: u64,
    pub outliers_capped: u64,
    pub signals_dropped: u64,
}

/// The analytics worker core.
pub struct AnalyticsEngine {
    symbols: Box<[SymbolState]>,
    capper: ZScoreCapper,
    latency: LatencyTracker,
    metrics: Arc<AdeMetrics>,
    sequence: u64,
    cfg: AdeConfig,
}

impl AnalyticsEngine {
    /// Build with a freshly calibrated TSC converter (sleeps ~50 ms).
    pub fn new(cfg: AdeConfig) -> Self {
        Self::with_calibrator(cfg, TscCalibrator::new())
    }

    /// Build with a caller-supplied calibrator (tests use a short one).
    pub fn with_calibrator(cfg: AdeConfig, calibrator: TscCalibrator) -> Self {
        let symbols = (0..MAX_SYMBOLS)
            .map(|_| SymbolState::new(&cfg))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            symbols,
            capper: ZScoreCapper::new(cfg.max_zscore),
            latency: LatencyTracker::new(calibrator),
            metrics: Arc::new(AdeMetrics::new()),
            sequence: 0,
            cfg,
        }
    }

    /// Dispatch one incoming envelope.
    ///
    /// Market ticks run the analytics path and may produce a signal;
    /// heartbeats are forwarded unchanged; anything else is ignored.
    #[inline]
    pub fn on_message(&mut self, msg: &Envelope) -> Option<Envelope> {
        match &msg.payload {
            Payload::MarketTick(_) => self.process_tick(msg),
            Payload::Heartbeat(_) => Some(*msg),
            _ => None,
        }
    }

    fn process_tick(&mut self, msg: &Envelope) -> Option<Envelope> {
        let start_tsc = clock::rdtsc();

        let tick = match msg.as_market_tick() {
            Some(t) => *t,
            None => return None,
        };

        let idx = (tick.symbol_id as usize) & (MAX_SYMBOLS - 1);
        let state = &mut self.symbols[idx];

        // All statistics update in O(1).
        state.ticks.push(tick.price, tick.quantity);
        state.price_stats.update(tick.price.raw());
        state.volume_stats.update(tick.quantity.raw());
        state.price_ewma.update(tick.price.raw());
        state.volume_ewma.update(tick.quantity.raw());
        state.last_update_ns = msg.timestamp_ns;
        state.message_count += 1;

        // Rolling z-score (stable), winsorized.
        let mut z = normalize::z_score(
            tick.price.raw(),
            state.price_stats.mean(),
            state.price_stats.stddev_approx(),
        );
        if self.capper.is_outlier(z) {
            self.metrics.outliers_capped.fetch_add(1, Ordering::Relaxed);
            z = self.capper.cap(z);
        }

        // EWMA z-score (responsive), capped the same way.
        let _z_ewma = self.capper.cap(normalize::z_score(
            tick.price.raw(),
            state.price_ewma.mean(),
            state.price_ewma.stddev_approx(),
        ));

        // Regime classification from the rolling variance.
        let fired = state.regime.update(state.price_stats.variance());
        let regime = if fired {
            MarketRegime::RegimeChange
        } else if state.regime.current_vol() > 2 * SCALE {
            MarketRegime::HighVol
        } else if state.regime.current_vol() < SCALE / 2 {
            MarketRegime::LowVol
        } else {
            MarketRegime::Normal
        };

        // Mean reversion: trade against the deviation, gated during regime
        // breaks.
        let wants_signal = z.abs() > self.cfg.signal_threshold;
        let out = if wants_signal && regime != MarketRegime::RegimeChange {
            self.sequence += 1;
            let direction: i8 = if z > 0 { -1 } else { 1 };
            let signal = SignalData::new(
                tick.symbol_id,
                FixedPoint::from_raw(z.abs()),
                direction,
                self.cfg.strategy_id,
            );
            self.metrics.signals_generated.fetch_add(1, Ordering::Relaxed);
            Some(Envelope::signal(clock::monotonic_ns(), self.sequence, signal))
        } else {
            if wants_signal {
                self.metrics.signals_gated.fetch_add(1, Ordering::Relaxed);
            }
            None
        };

        // One latency measurement per tick.
        self.latency.record_processing(start_tsc, clock::rdtsc());
        self.latency.record_e2e(msg.timestamp_ns, clock::monotonic_ns());
        self.metrics.messages_processed.fetch_add(1, Ordering::Relaxed);

        out
    }

    /// Regime classification for a symbol as of its last tick.
    pub fn regime(&self, symbol_id: u64) -> MarketRegime {
        let state = &self.symbols[(symbol_id as usize) & (MAX_SYMBOLS - 1)];
        if state.message_count == 0 {
            return MarketRegime::Unknown;
        }
        if state.regime.is_regime_change() {
            MarketRegime::RegimeChange
        } else if state.regime.current_vol() > 2 * SCALE {
            MarketRegime::HighVol
        } else if state.regime.current_vol() < SCALE / 2 {
            MarketRegime::LowVol
        } else {
            MarketRegime::Normal
        }
    }

    pub fn symbol(&self, symbol_id: u64) -> &SymbolState {
        &self.symbols[(symbol_id as usize) & (MAX_SYMBOLS - 1)]
    }

    /// Shared counter handle for heartbeat threads.
    pub fn metrics(&self) -> Arc<AdeMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn latency_summary(&self) -> LatencySummary {
        self.latency.summary()
    }

    pub fn config(&self) -> &AdeConfig {
        &self.cfg
    }
}
