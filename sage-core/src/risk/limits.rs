//! Risk limit configuration and branchless predicate checks
//!
//! The predicates return plain bools and are combined with the
//! non-short-circuiting `&` so the check executes the same instruction
//! sequence whether an order passes or fails.

use serde::Deserialize;

/// Risk limit configuration, fixed-point notional units throughout.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RiskLimits {
    /// Max absolute position per symbol.
    pub max_position_per_symbol: i64,
    /// Max total absolute exposure across symbols.
    pub max_total_exposure: i64,
    /// Max daily loss (positive number).
    pub max_daily_loss: i64,
    /// Max single order notional.
    pub max_order_size: i64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            max_position_per_symbol: 1_000_000,
            max_total_exposure: 10_000_000,
            max_daily_loss: 100_000,
            max_order_size: 50_000,
        }
    }
}

/// `|position| <= limit`.
#[inline(always)]
pub fn position_ok(position: i64, limit: i64) -> bool {
    (position >= -limit) & (position <= limit)
}

/// `|order| <= limit`.
#[inline(always)]
pub fn order_size_ok(order_value: i64, limit: i64) -> bool {
    let mask = order_value >> 63;
    ((order_value + mask) ^ mask) <= limit
}

/// `exposure <= limit`.
#[inline(always)]
pub fn exposure_ok(exposure: i64, limit: i64) -> bool {
    exposure <= limit
}

/// PnL may be negative but must stay above `-max_loss`.
#[inline(always)]
pub fn pnl_ok(pnl: i64, max_loss: i64) -> bool {
    pnl > -max_loss
}

/// All four limit predicates, combined without branches.
#[inline(always)]
#[allow(clippy::too_many_arguments)]
pub fn all_checks_pass(
    new_position: i64,
    position_limit: i64,
    order_value: i64,
    order_limit: i64,
    total_exposure: i64,
    exposure_limit: i64,
    daily_pnl: i64,
    loss_limit: i64,
) -> bool {
    position_ok(new_position, position_limit)
        & order_size_ok(order_value, order_limit)
        & exposure_ok(total_exposure, exposure_limit)
        & pnl_ok(daily_pnl, loss_limit)
}
