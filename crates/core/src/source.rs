//! The enumerated data sources and their static registry.
//!
//! Each source maps to an object-store key prefix, an optional append-only
//! base table, and a derived cache table. The mapping is fixed configuration;
//! nothing about it is inferred from file names at runtime.

use std::fmt;

/// One upstream dump family. Every source produces one partition per
/// calendar date, except `MarketData`, which shards each date into
/// 24 hours x N instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Trades,
    LedgerUpdates,
    Liquidations,
    Funding,
    AccountValues,
    AssetCtxs,
    MarketData,
    TotalAccruedFees,
    HlpPositions,
}

impl Source {
    pub const ALL: [Source; 9] = [
        Source::Trades,
        Source::LedgerUpdates,
        Source::Liquidations,
        Source::Funding,
        Source::AccountValues,
        Source::AssetCtxs,
        Source::MarketData,
        Source::TotalAccruedFees,
        Source::HlpPositions,
    ];

    /// Resolves a configured source name to its registry entry.
    #[must_use]
    pub fn parse(name: &str) -> Option<Source> {
        match name {
            "non_mm_trades" => Some(Source::Trades),
            "non_mm_ledger_updates" => Some(Source::LedgerUpdates),
            "liquidations" => Some(Source::Liquidations),
            "funding" => Some(Source::Funding),
            "account_values" => Some(Source::AccountValues),
            "asset_ctxs" => Some(Source::AssetCtxs),
            "market_data" => Some(Source::MarketData),
            "total_accrued_fees" => Some(Source::TotalAccruedFees),
            "hlp_positions" => Some(Source::HlpPositions),
            _ => None,
        }
    }

    /// Canonical name, as used in configuration and alert messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Source::Trades => "non_mm_trades",
            Source::LedgerUpdates => "non_mm_ledger_updates",
            Source::Liquidations => "liquidations",
            Source::Funding => "funding",
            Source::AccountValues => "account_values",
            Source::AssetCtxs => "asset_ctxs",
            Source::MarketData => "market_data",
            Source::TotalAccruedFees => "total_accrued_fees",
            Source::HlpPositions => "hlp_positions",
        }
    }

    /// Object-store key prefix for this source's partitions.
    ///
    /// The ledger dump is published under `ledger_updates/` even though its
    /// tables carry the `non_mm_` prefix.
    #[must_use]
    pub fn key_prefix(self) -> &'static str {
        match self {
            Source::Trades => "non_mm_trades",
            Source::LedgerUpdates => "ledger_updates",
            Source::Liquidations => "liquidations",
            Source::Funding => "funding",
            Source::AccountValues => "account_values",
            Source::AssetCtxs => "asset_ctxs",
            Source::MarketData => "market_data",
            Source::TotalAccruedFees => "total_accrued_fees",
            Source::HlpPositions => "hlp_positions",
        }
    }

    /// Append-only base table, if the source has one. Market data is
    /// cache-only by design.
    #[must_use]
    pub fn base_table(self) -> Option<&'static str> {
        match self {
            Source::MarketData => None,
            other => Some(other.name()),
        }
    }

    /// Derived cache table holding one row-group per date.
    #[must_use]
    pub fn cache_table(self) -> &'static str {
        match self {
            Source::Trades => "non_mm_trades_cache",
            Source::LedgerUpdates => "non_mm_ledger_updates_cache",
            Source::Liquidations => "liquidations_cache",
            Source::Funding => "funding_cache",
            Source::AccountValues => "account_values_cache",
            Source::AssetCtxs => "asset_ctxs_cache",
            Source::MarketData => "market_data_cache",
            Source::TotalAccruedFees => "total_accrued_fees_cache",
            Source::HlpPositions => "hlp_positions_cache",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrips_every_registry_name() {
        for source in Source::ALL {
            assert_eq!(Source::parse(source.name()), Some(source));
        }
        assert_eq!(Source::parse("order_statuses"), None);
    }

    #[test]
    fn ledger_updates_prefix_differs_from_table_name() {
        assert_eq!(Source::LedgerUpdates.key_prefix(), "ledger_updates");
        assert_eq!(
            Source::LedgerUpdates.base_table(),
            Some("non_mm_ledger_updates")
        );
        assert_eq!(
            Source::LedgerUpdates.cache_table(),
            "non_mm_ledger_updates_cache"
        );
    }

    #[test]
    fn market_data_has_no_base_table() {
        assert_eq!(Source::MarketData.base_table(), None);
        assert_eq!(Source::MarketData.cache_table(), "market_data_cache");
    }
}
