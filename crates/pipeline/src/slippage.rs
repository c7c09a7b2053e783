//! Order-book slippage and liquidity metrics.
//!
//! Per snapshot: mid price, resting liquidity across both ladders, and for
//! each notional tier the volume-weighted average fill price walking the
//! ask ladder, expressed as a slippage ratio against mid. Per day and coin:
//! medians of the per-snapshot metrics plus the mean mid price. The
//! two-stage reduction exists because slippage and liquidity are not
//! linearly combinable across snapshots.

use std::collections::BTreeMap;

use crate::models::{BookLevel, OrderBookSnapshot};

/// Notional sizes (quote currency) measured per snapshot.
pub const NOTIONAL_TIERS: [f64; 6] = [0.01, 1000.0, 3000.0, 10_000.0, 30_000.0, 100_000.0];

/// Cache column suffixes matching `NOTIONAL_TIERS` position by position.
pub const TIER_COLUMNS: [&str; 6] = [
    "median_slippage_0",
    "median_slippage_1000",
    "median_slippage_3000",
    "median_slippage_10000",
    "median_slippage_30000",
    "median_slippage_100000",
];

/// Sentinel recorded when the ladder cannot supply the target notional.
pub const UNFILLED_SLIPPAGE: f64 = 1.0;

/// Metrics computed from a single order-book snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotMetrics {
    pub coin: String,
    pub mid: f64,
    pub liquidity: f64,
    pub slippage: [f64; 6],
}

/// Per-(date, coin) reduction of all snapshot metrics for one day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBookAggregate {
    pub coin: String,
    pub median_liquidity: f64,
    pub median_slippage: [f64; 6],
    pub mean_mid: f64,
}

/// Walks the ask ladder until `notional` is filled, averaging the level
/// prices by the fraction of the target each level supplies. Returns the
/// sentinel when the ladder is exhausted first.
#[must_use]
pub fn slippage_for_notional(mid: f64, asks: &[BookLevel], notional: f64) -> f64 {
    let mut filled = 0.0;
    let mut avg_fill_px = 0.0;

    for level in asks {
        let level_notional = level.px * level.sz;
        if filled + level_notional >= notional {
            let remaining = notional - filled;
            avg_fill_px += (remaining / notional) * level.px;
            filled = notional;
            break;
        }
        filled += level_notional;
        avg_fill_px += (level_notional / notional) * level.px;
    }

    if filled >= notional {
        (avg_fill_px / mid - 1.0).abs()
    } else {
        UNFILLED_SLIPPAGE
    }
}

/// Computes the per-snapshot metrics, or `None` when either ladder is empty
/// (no mid price exists); such snapshots are skipped.
#[must_use]
pub fn snapshot_metrics(snapshot: &OrderBookSnapshot) -> Option<SnapshotMetrics> {
    let best_bid = snapshot.bids.first()?.px;
    let best_ask = snapshot.asks.first()?.px;
    let mid = (best_bid + best_ask) / 2.0;

    let liquidity: f64 = snapshot
        .bids
        .iter()
        .chain(&snapshot.asks)
        .map(|level| level.px * level.sz)
        .sum();

    let mut slippage = [0.0; 6];
    for (slot, notional) in slippage.iter_mut().zip(NOTIONAL_TIERS) {
        *slot = slippage_for_notional(mid, &snapshot.asks, notional);
    }

    Some(SnapshotMetrics {
        coin: snapshot.coin.clone(),
        mid,
        liquidity,
        slippage,
    })
}

/// Median with midpoint interpolation for even counts. Callers never pass
/// an empty slice.
fn median(values: &mut Vec<f64>) -> f64 {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    }
}

/// Folds every shard's snapshot metrics into one aggregate per coin,
/// ordered by coin name.
#[must_use]
pub fn reduce_day(metrics: Vec<SnapshotMetrics>) -> Vec<DayBookAggregate> {
    let mut by_coin: BTreeMap<String, Vec<SnapshotMetrics>> = BTreeMap::new();
    for metric in metrics {
        by_coin.entry(metric.coin.clone()).or_default().push(metric);
    }

    by_coin
        .into_iter()
        .map(|(coin, group)| {
            let mut liquidity: Vec<f64> = group.iter().map(|m| m.liquidity).collect();
            let mean_mid = group.iter().map(|m| m.mid).sum::<f64>() / group.len() as f64;

            let mut median_slippage = [0.0; 6];
            for (tier, slot) in median_slippage.iter_mut().enumerate() {
                let mut values: Vec<f64> = group.iter().map(|m| m.slippage[tier]).collect();
                *slot = median(&mut values);
            }

            DayBookAggregate {
                coin,
                median_liquidity: median(&mut liquidity),
                median_slippage,
                mean_mid,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(px: f64, sz: f64) -> BookLevel {
        BookLevel { px, sz }
    }

    fn snapshot(coin: &str, bids: Vec<BookLevel>, asks: Vec<BookLevel>) -> OrderBookSnapshot {
        OrderBookSnapshot {
            coin: coin.to_string(),
            bids,
            asks,
        }
    }

    #[test]
    fn insufficient_depth_yields_the_sentinel() {
        // 100 * 5 = 500 notional resting, target 1000
        let asks = vec![level(100.0, 5.0)];
        assert_eq!(slippage_for_notional(100.0, &asks, 1000.0), 1.0);
    }

    #[test]
    fn exact_depth_consumes_the_full_ladder() {
        // depth == notional: defined, non-sentinel result
        let asks = vec![level(100.0, 5.0), level(110.0, 50.0)];
        let notional = 100.0 * 5.0 + 110.0 * 50.0;
        let slippage = slippage_for_notional(100.0, &asks, notional);
        assert!(slippage < 1.0);
        // VWAP = (500/6000)*100 + (5500/6000)*110
        let expected_avg: f64 = 500.0 / 6000.0 * 100.0 + 5500.0 / 6000.0 * 110.0;
        assert!((slippage - (expected_avg / 100.0 - 1.0).abs()).abs() < 1e-12);
    }

    #[test]
    fn single_level_fill_measures_pure_spread() {
        // mid 100, ask 101 with ample size: slippage = 1%
        let asks = vec![level(101.0, 1000.0)];
        let slippage = slippage_for_notional(100.0, &asks, 1000.0);
        assert!((slippage - 0.01).abs() < 1e-12);
    }

    #[test]
    fn snapshot_metrics_computes_mid_and_liquidity() {
        let snap = snapshot(
            "BTC",
            vec![level(99.0, 2.0)],
            vec![level(101.0, 1.0)],
        );
        let metrics = snapshot_metrics(&snap).unwrap();
        assert!((metrics.mid - 100.0).abs() < 1e-12);
        // both ladders count toward resting liquidity
        assert!((metrics.liquidity - (99.0 * 2.0 + 101.0 * 1.0)).abs() < 1e-12);
        // 0.01 notional fills at the best ask
        assert!((metrics.slippage[0] - 0.01).abs() < 1e-12);
    }

    #[test]
    fn empty_ladder_snapshot_is_skipped() {
        let snap = snapshot("BTC", vec![], vec![level(101.0, 1.0)]);
        assert!(snapshot_metrics(&snap).is_none());
    }

    #[test]
    fn day_reduction_takes_medians_per_coin() {
        let mut metrics = Vec::new();
        for liquidity in [10.0, 20.0, 30.0] {
            metrics.push(SnapshotMetrics {
                coin: "BTC".to_string(),
                mid: 100.0,
                liquidity,
                slippage: [0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            });
        }
        metrics.push(SnapshotMetrics {
            coin: "ETH".to_string(),
            mid: 50.0,
            liquidity: 5.0,
            slippage: [1.0; 6],
        });

        let aggregates = reduce_day(metrics);
        assert_eq!(aggregates.len(), 2);
        assert_eq!(aggregates[0].coin, "BTC");
        assert_eq!(aggregates[0].median_liquidity, 20.0);
        assert_eq!(aggregates[0].mean_mid, 100.0);
        assert_eq!(aggregates[1].coin, "ETH");
        assert_eq!(aggregates[1].median_slippage, [1.0; 6]);
    }

    #[test]
    fn even_count_median_interpolates() {
        let mut values = vec![4.0, 1.0, 3.0, 2.0];
        assert_eq!(median(&mut values), 2.5);
    }
}
