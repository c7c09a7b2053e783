//! Per-source aggregation strategies.
//!
//! Each module turns one date's decoded raw rows into that date's cache
//! row set. Cache rows are a function of the date's rows only; no
//! cross-date state exists, which is what makes replace-by-date writes
//! idempotent. Grouped strategies accumulate into a `BTreeMap` so output
//! order is deterministic across reruns.

pub mod account_values;
pub mod asset_ctxs;
pub mod fees;
pub mod funding;
pub mod hlp_positions;
pub mod ledger_updates;
pub mod liquidations;
pub mod market_data;
pub mod trades;

/// Mean over optional samples, skipping absent ones. `None` when every
/// sample is absent.
pub(crate) fn mean_opt(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0u64;
    for value in values.flatten() {
        sum += value;
        count += 1;
    }
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_opt_skips_missing_samples() {
        let values = [Some(1.0), None, Some(3.0)];
        assert_eq!(mean_opt(values.into_iter()), Some(2.0));
        assert_eq!(mean_opt([None, None].into_iter()), None);
    }
}
