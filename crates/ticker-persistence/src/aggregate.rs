//! Market statistics over stored trades.
//!
//! Trades are grouped by `(base_asset_id, counter_asset_id)`. Within a window,
//! open is the price of the earliest trade, close the price of the latest,
//! and change is `close - open`.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, HashMap};
use ticker_core::{AssetRecord, MarketRow, PartialMarketRow, StoredTrade};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct WindowStats {
    base_volume: f64,
    counter_volume: f64,
    trade_count: i64,
    open: f64,
    low: f64,
    high: f64,
    close: f64,
    change: f64,
}

/// Statistics over trades already sorted by close time.
fn window_stats<'a>(trades: impl IntoIterator<Item = &'a StoredTrade>) -> Option<WindowStats> {
    let mut iter = trades.into_iter();
    let first = iter.next()?;

    let mut stats = WindowStats {
        base_volume: first.base_amount,
        counter_volume: first.counter_amount,
        trade_count: 1,
        open: first.price,
        low: first.price,
        high: first.price,
        close: first.price,
        change: 0.0,
    };
    for trade in iter {
        stats.base_volume += trade.base_amount;
        stats.counter_volume += trade.counter_amount;
        stats.trade_count += 1;
        stats.low = stats.low.min(trade.price);
        stats.high = stats.high.max(trade.price);
        stats.close = trade.price;
    }
    stats.change = stats.close - stats.open;
    Some(stats)
}

fn group_by_pair<'a>(
    trades: impl IntoIterator<Item = &'a StoredTrade>,
) -> BTreeMap<(i32, i32), Vec<&'a StoredTrade>> {
    let mut groups: BTreeMap<(i32, i32), Vec<&StoredTrade>> = BTreeMap::new();
    for trade in trades {
        groups
            .entry((trade.base_asset_id, trade.counter_asset_id))
            .or_default()
            .push(trade);
    }
    for group in groups.values_mut() {
        group.sort_by(|a, b| a.ledger_order().cmp(&b.ledger_order()));
    }
    groups
}

pub fn pair_name(base: &AssetRecord, counter: &AssetRecord) -> String {
    format!("{}_{}", base.code, counter.code)
}

/// Rolling 24h and 7d statistics for every pair traded in the last 7 days.
pub fn market_rows(assets: &[AssetRecord], trades: &[StoredTrade], now: DateTime<Utc>) -> Vec<MarketRow> {
    let by_id: HashMap<i32, &AssetRecord> = assets.iter().map(|a| (a.id, a)).collect();
    let since_7d = now - Duration::days(7);
    let since_24h = now - Duration::hours(24);

    let recent = trades
        .iter()
        .filter(|t| t.ledger_close_time > since_7d && t.ledger_close_time <= now);

    let mut rows = Vec::new();
    for ((base_id, counter_id), group) in group_by_pair(recent) {
        let (Some(base), Some(counter)) = (by_id.get(&base_id), by_id.get(&counter_id)) else {
            continue;
        };
        let Some(week) = window_stats(group.iter().copied()) else {
            continue;
        };
        let day = window_stats(
            group
                .iter()
                .copied()
                .filter(|t| t.ledger_close_time > since_24h),
        )
        .unwrap_or_default();
        let last_close_time = group.last().map(|t| t.ledger_close_time);

        rows.push(MarketRow {
            trade_pair: pair_name(base, counter),
            base_volume_24h: day.base_volume,
            counter_volume_24h: day.counter_volume,
            trade_count_24h: day.trade_count,
            open_price_24h: day.open,
            lowest_price_24h: day.low,
            highest_price_24h: day.high,
            price_change_24h: day.change,
            base_volume_7d: week.base_volume,
            counter_volume_7d: week.counter_volume,
            trade_count_7d: week.trade_count,
            open_price_7d: week.open,
            lowest_price_7d: week.low,
            highest_price_7d: week.high,
            price_change_7d: week.change,
            last_price: week.close,
            last_price_close_time: last_close_time,
            ..Default::default()
        });
    }

    rows.sort_by(|a, b| a.trade_pair.cmp(&b.trade_pair));
    rows
}

/// Statistics over the last `hours` for pairs with a leg issued by `issuer`.
pub fn partial_markets(
    assets: &[AssetRecord],
    trades: &[StoredTrade],
    issuer: &str,
    hours: i64,
    now: DateTime<Utc>,
) -> Vec<PartialMarketRow> {
    let by_id: HashMap<i32, &AssetRecord> = assets.iter().map(|a| (a.id, a)).collect();
    let since = now - Duration::hours(hours);

    let involves_issuer = |id: &i32| {
        by_id
            .get(id)
            .map(|a| a.issuer_account == issuer)
            .unwrap_or(false)
    };
    let window = trades.iter().filter(|t| {
        t.ledger_close_time > since
            && t.ledger_close_time <= now
            && (involves_issuer(&t.base_asset_id) || involves_issuer(&t.counter_asset_id))
    });

    let mut rows = Vec::new();
    for ((base_id, counter_id), group) in group_by_pair(window) {
        let (Some(base), Some(counter)) = (by_id.get(&base_id), by_id.get(&counter_id)) else {
            continue;
        };
        let Some(stats) = window_stats(group.iter().copied()) else {
            continue;
        };

        rows.push(PartialMarketRow {
            trade_pair: pair_name(base, counter),
            base_asset_id: base.id,
            base_asset_code: base.code.clone(),
            base_asset_issuer: base.issuer_account.clone(),
            base_asset_type: base.asset_type.as_str().to_string(),
            counter_asset_id: counter.id,
            counter_asset_code: counter.code.clone(),
            counter_asset_issuer: counter.issuer_account.clone(),
            counter_asset_type: counter.asset_type.as_str().to_string(),
            base_volume: stats.base_volume,
            counter_volume: stats.counter_volume,
            trade_count: stats.trade_count,
            open: stats.open,
            low: stats.low,
            high: stats.high,
            change: stats.change,
            close: stats.close,
            ..Default::default()
        });
    }

    rows.sort_by(|a, b| a.trade_pair.cmp(&b.trade_pair));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ticker_core::AssetType;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn asset(id: i32, code: &str, issuer: &str) -> AssetRecord {
        AssetRecord {
            id,
            code: code.to_string(),
            issuer_account: issuer.to_string(),
            asset_type: if issuer == "native" {
                AssetType::Native
            } else {
                AssetType::CreditAlphanum4
            },
            ..Default::default()
        }
    }

    fn trade(id: &str, hours_ago: i64, base: i32, counter: i32, price: f64) -> StoredTrade {
        StoredTrade {
            horizon_id: id.to_string(),
            ledger_close_time: now() - Duration::hours(hours_ago),
            offer_id: String::new(),
            base_offer_id: String::new(),
            base_account: String::new(),
            base_amount: 10.0,
            base_asset_id: base,
            counter_offer_id: String::new(),
            counter_account: String::new(),
            counter_amount: 10.0 * price,
            counter_asset_id: counter,
            base_is_seller: true,
            price,
        }
    }

    #[test]
    fn test_market_rows_windows() {
        let assets = vec![asset(1, "XLM", "native"), asset(2, "USD", "GUSD")];
        let trades = vec![
            trade("a", 100, 1, 2, 0.10),
            trade("b", 30, 1, 2, 0.08),
            trade("c", 10, 1, 2, 0.12),
            trade("d", 2, 1, 2, 0.11),
            trade("old", 24 * 8, 1, 2, 5.0),
        ];

        let rows = market_rows(&assets, &trades, now());
        assert_eq!(rows.len(), 1);
        let row = &rows[0];

        assert_eq!(row.trade_pair, "XLM_USD");
        assert_eq!(row.trade_count_7d, 4);
        assert_eq!(row.trade_count_24h, 2);
        assert_eq!(row.open_price_7d, 0.10);
        assert_eq!(row.lowest_price_7d, 0.08);
        assert_eq!(row.highest_price_7d, 0.12);
        assert_eq!(row.open_price_24h, 0.12);
        assert_eq!(row.last_price, 0.11);
        assert!((row.price_change_24h - (0.11 - 0.12)).abs() < 1e-12);
        assert_eq!(row.base_volume_24h, 20.0);
        assert_eq!(row.last_price_close_time, Some(now() - Duration::hours(2)));
        assert_eq!(row.num_bids, 0);
    }

    #[test]
    fn test_same_ledger_trades_ordered_by_index() {
        let assets = vec![asset(1, "XLM", "native"), asset(2, "USD", "GUSD")];
        let trades = vec![
            trade("700-10", 1, 1, 2, 0.30),
            trade("700-2", 1, 1, 2, 0.10),
            trade("700-9", 1, 1, 2, 0.20),
        ];

        let row = &market_rows(&assets, &trades, now())[0];
        assert_eq!(row.open_price_24h, 0.10);
        assert_eq!(row.last_price, 0.30);
    }

    #[test]
    fn test_market_rows_skip_stale_pairs() {
        let assets = vec![asset(1, "XLM", "native"), asset(2, "USD", "GUSD")];
        let trades = vec![trade("old", 24 * 9, 1, 2, 1.0)];
        assert!(market_rows(&assets, &trades, now()).is_empty());
    }

    #[test]
    fn test_partial_markets_filter_by_issuer() {
        let assets = vec![
            asset(1, "XLM", "native"),
            asset(2, "USD", "GUSD"),
            asset(3, "EUR", "GEUR"),
        ];
        let trades = vec![
            trade("a", 1, 1, 2, 0.1),
            trade("b", 1, 1, 3, 0.09),
            trade("c", 30, 1, 2, 0.2),
        ];

        let rows = partial_markets(&assets, &trades, "GUSD", 24, now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trade_pair, "XLM_USD");
        assert_eq!(rows[0].counter_asset_issuer, "GUSD");
        assert_eq!(rows[0].base_asset_type, "native");
        assert_eq!(rows[0].trade_count, 1);
        assert_eq!(rows[0].close, 0.1);
    }
}
