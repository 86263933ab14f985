//! Analytics core: per-symbol statistics and signal generation
//!
//! Two families of estimators run side by side for every symbol: rolling
//! windows (stable, interpretable) and EWMAs (fast regime response). On top
//! of them sit the volatility-regime detector, z-score winsorization, the
//! adaptive window, and the latency histograms. [`engine`] ties it all into
//! the per-tick hot path.

pub mod adaptive;
pub mod engine;
pub mod ewma;
pub mod latency;
pub mod normalize;
pub mod rolling;
pub mod ticks;
pub mod winsor;

pub use adaptive::AdaptiveWindow;
pub use engine::{AdeConfig, AdeMetrics, AnalyticsEngine, MarketRegime};
pub use ewma::{EwmaStats, VolRegimeDetector};
pub use latency::{LatencyHistogram, LatencySummary, LatencyTracker};
pub use rolling::RollingStats;
pub use ticks::TickBuffer;
pub use winsor::{WinsorizedStats, ZScoreCapper};

/// Newton-Raphson integer square root.
///
/// Initial estimate is the value itself; iterate `y = (x + n/x) / 2` until
/// it stops decreasing. Non-positive inputs return 0 (numerical guard, not
/// an error).
#[inline]
pub(crate) fn isqrt(n: i64) -> i64 {
    if n <= 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) / 2;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}
