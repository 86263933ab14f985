//! Latency histograms and the end-to-end tracker
//!
//! Fixed-bucket histograms: 128 buckets of 100 ns each plus an overflow
//! bucket, O(1) record and O(buckets) percentile query. The tracker runs
//! three of them -- exchange-to-decision, processing (TSC deltas through
//! the calibrator), and queue wait -- and summarizes tail percentiles for
//! the heartbeat output.

use crate::perf::clock::TscCalibrator;

/// Fixed-width latency histogram, 100 ns buckets up to 12.8 us + overflow.
#[derive(Debug, Clone)]
pub struct LatencyHistogram {
    buckets: [u64; Self::NUM_BUCKETS],
    total_count: u64,
    total_ns: u64,
    min_ns: u64,
    max_ns: u64,
}

impl LatencyHistogram {
    pub const BUCKET_WIDTH_NS: u64 = 100;
    pub const NUM_BUCKETS: usize = 128;
    const OVERFLOW_BUCKET: usize = Self::NUM_BUCKETS - 1;

    pub fn new() -> Self {
        Self {
            buckets: [0; Self::NUM_BUCKETS],
            total_count: 0,
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
        }
    }

    /// O(1) sample record.
    #[inline]
    pub fn record(&mut self, latency_ns: u64) {
        let bucket =
            ((latency_ns / Self::BUCKET_WIDTH_NS) as usize).min(Self::OVERFLOW_BUCKET);
        self.buckets[bucket] += 1;
        self.total_count += 1;
        self.total_ns += latency_ns;
        self.min_ns = self.min_ns.min(latency_ns);
        self.max_ns = self.max_ns.max(latency_ns);
    }

    /// Percentile in nanoseconds (`pct` in 0..=100).
    ///
    /// Walks buckets until the cumulative count reaches `count * pct / 100`
    /// and returns the bucket's upper bound; extreme percentiles beyond the
    /// walk return the max observed value.
    pub fn percentile(&self, pct: f64) -> u64 {
        if self.total_count == 0 {
            return 0;
        }
        let target = (self.total_count as f64 * pct / 100.0) as u64;
        let mut cumulative = 0u64;
        for (i, &count) in self.buckets.iter().enumerate() {
            cumulative += count;
            if cumulative >= target {
                return (i as u64 + 1) * Self::BUCKET_WIDTH_NS;
            }
        }
        self.max_ns
    }

    pub fn p50(&self) -> u64 {
        self.percentile(50.0)
    }

    pub fn p90(&self) -> u64 {
        self.percentile(90.0)
    }

    pub fn p99(&self) -> u64 {
        self.percentile(99.0)
    }

    pub fn p999(&self) -> u64 {
        self.percentile(99.9)
    }

    pub fn mean(&self) -> u64 {
        if self.total_count == 0 {
            return 0;
        }
        self.total_ns / self.total_count
    }

    pub fn min(&self) -> u64 {
        self.min_ns
    }

    pub fn max(&self) -> u64 {
        self.max_ns
    }

    pub fn count(&self) -> u64 {
        self.total_count
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for LatencyHistogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Summary for the operator heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencySummary {
    pub e2e_p50: u64,
    pub e2e_p99: u64,
    pub e2e_p999: u64,
    pub processing_mean: u64,
    pub queue_mean: u64,
    pub total_samples: u64,
}

/// End-to-end latency tracker across pipeline stages.
pub struct LatencyTracker {
    calibrator: TscCalibrator,
    /// Exchange timestamp -> decision.
    e2e: LatencyHistogram,
    /// Worker-internal processing (TSC deltas).
    processing: LatencyHistogram,
    /// Ring enqueue -> dequeue.
    queue: LatencyHistogram,
}

impl LatencyTracker {
    pub fn new(calibrator: TscCalibrator) -> Self {
        Self {
            calibrator,
            e2e: LatencyHistogram::new(),
            processing: LatencyHistogram::new(),
            queue: LatencyHistogram::new(),
        }
    }

    /// Exchange timestamp to decision timestamp, both in nanoseconds.
    #[inline]
    pub fn record_e2e(&mut self, exchange_ts_ns: u64, decision_ts_ns: u64) {
        if decision_ts_ns > exchange_ts_ns {
            self.e2e.record(decision_ts_ns - exchange_ts_ns);
        }
    }

    /// Internal processing time from a TSC pair.
    #[inline]
    pub fn record_processing(&mut self, start_tsc: u64, end_tsc: u64) {
        let ns = self.calibrator.tsc_to_ns(end_tsc.wrapping_sub(start_tsc));
        self.processing.record(ns);
    }

    /// Queue wait from enqueue/dequeue timestamps.
    #[inline]
    pub fn record_queue_wait(&mut self, enqueue_ns: u64, dequeue_ns: u64) {
        if dequeue_ns > enqueue_ns {
            self.queue.record(dequeue_ns - enqueue_ns);
        }
    }

    pub fn e2e(&self) -> &LatencyHistogram {
        &self.e2e
    }

    pub fn processing(&self) -> &LatencyHistogram {
        &self.processing
    }

    pub fn queue(&self) -> &LatencyHistogram {
        &self.queue
    }

    pub fn summary(&self) -> LatencySummary {
        LatencySummary {
            e2e_p50: self.e2e.p50(),
            e2e_p99: self.e2e.p99(),
            e2e_p999: self.e2e.p999(),
            processing_mean: self.processing.mean(),
            queue_mean: self.queue.mean(),
            total_samples: self.e2e.count(),
        }
    }

    pub fn reset(&mut self) {
        self.e2e.reset();
        self.processing.reset();
        self.queue.reset();
    }
}
