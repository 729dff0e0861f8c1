//! Per-(buyer, item) demand metrics for the current and lookback periods.
use crate::core::stats::{median, round4};
use crate::core::transaction::{ItemId, TransactionRecord};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Demand, price and profit figures for one buyer-item pair.
///
/// Current-period prices are `None` when no row carried a defined sell
/// price. Historical fields are zero, never absent, when the pair has no
/// lookback rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandMetrics {
    pub buyer: String,
    pub item: ItemId,
    pub reqs: u64,
    pub total_sell_value: f64,
    pub sell_p50: Option<f64>,
    pub sell_pavg: Option<f64>,
    pub last_price: Option<f64>,
    pub sales: f64,
    pub profit: f64,
    pub reqs_hist: u64,
    pub total_sell_value_hist: f64,
    pub sell_p50_hist: f64,
    pub sell_pavg_hist: f64,
    pub sales_hist: f64,
    pub profit_hist: f64,
}

impl DemandMetrics {
    /// An empty row for `buyer` and `item`, mostly useful as a base for
    /// struct-update syntax.
    pub fn empty(buyer: &str, item: ItemId) -> Self {
        DemandMetrics {
            buyer: buyer.to_string(),
            item,
            reqs: 0,
            total_sell_value: 0.0,
            sell_p50: None,
            sell_pavg: None,
            last_price: None,
            sales: 0.0,
            profit: 0.0,
            reqs_hist: 0,
            total_sell_value_hist: 0.0,
            sell_p50_hist: 0.0,
            sell_pavg_hist: 0.0,
            sales_hist: 0.0,
            profit_hist: 0.0,
        }
    }
}

type GroupKey<'a> = (&'a str, &'a ItemId);

#[derive(Default)]
struct Accumulator {
    reqs: u64,
    sell_prices: Vec<f64>,
    last: Option<(NaiveDateTime, f64)>,
    sales: f64,
    profit: f64,
}

impl Accumulator {
    fn add(&mut self, record: &TransactionRecord) {
        self.reqs += 1;
        if let Some(price) = record.sell_price.filter(|p| p.is_finite()) {
            self.sell_prices.push(price);
            // Ties on timestamp resolve to the later row.
            if self.last.is_none_or(|(ts, _)| record.timestamp >= ts) {
                self.last = Some((record.timestamp, price));
            }
        }
        self.sales += record.quantity;
        self.profit += record.profit;
    }

    fn total_sell_value(&self) -> f64 {
        round4(self.sell_prices.iter().sum())
    }

    fn sell_p50(&self) -> Option<f64> {
        median(&self.sell_prices).map(round4)
    }

    fn sell_pavg(&self) -> Option<f64> {
        if self.sell_prices.is_empty() {
            return None;
        }
        Some(round4(
            self.sell_prices.iter().sum::<f64>() / self.sell_prices.len() as f64,
        ))
    }
}

fn group(records: &[TransactionRecord]) -> BTreeMap<GroupKey<'_>, Accumulator> {
    let mut groups: BTreeMap<GroupKey<'_>, Accumulator> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.buyer.as_str(), &record.item))
            .or_default()
            .add(record);
    }
    groups
}

/// Aggregates both windows and left-joins the lookback figures onto the
/// current-period groups. Pairs seen only in the lookback window are not
/// part of the result. Output is ordered by buyer, then item.
pub fn aggregate_demand(
    current: &[TransactionRecord],
    lookback: &[TransactionRecord],
) -> Vec<DemandMetrics> {
    let current_groups = group(current);
    let lookback_groups: HashMap<GroupKey<'_>, Accumulator> =
        group(lookback).into_iter().collect();

    let metrics: Vec<DemandMetrics> = current_groups
        .iter()
        .map(|(&(buyer, item), acc)| {
            let mut row = DemandMetrics {
                reqs: acc.reqs,
                total_sell_value: acc.total_sell_value(),
                sell_p50: acc.sell_p50(),
                sell_pavg: acc.sell_pavg(),
                last_price: acc.last.map(|(_, price)| round4(price)),
                sales: round4(acc.sales),
                profit: round4(acc.profit),
                ..DemandMetrics::empty(buyer, item.clone())
            };
            if let Some(hist) = lookback_groups.get(&(buyer, item)) {
                row.reqs_hist = hist.reqs;
                row.total_sell_value_hist = hist.total_sell_value();
                row.sell_p50_hist = hist.sell_p50().unwrap_or(0.0);
                row.sell_pavg_hist = hist.sell_pavg().unwrap_or(0.0);
                row.sales_hist = round4(hist.sales);
                row.profit_hist = round4(hist.profit);
            }
            row
        })
        .collect();

    debug!(
        pairs = metrics.len(),
        lookback_pairs = lookback_groups.len(),
        "Aggregated demand metrics"
    );
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn tx(buyer: &str, day: u32, hour: u32, sell: Option<f64>, qty: f64) -> TransactionRecord {
        TransactionRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 6, day)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            buyer: buyer.to_string(),
            supplier: "Supplier_01".to_string(),
            item: ItemId::new("US", "SMS"),
            sell_price: sell,
            buy_price: Some(0.03),
            quantity: qty,
            profit: qty * 0.01,
        }
    }

    #[test]
    fn test_current_window_aggregation() {
        let current = vec![
            tx("alpha", 10, 9, Some(0.05), 2.0),
            tx("alpha", 12, 9, Some(0.07), 0.0),
            tx("alpha", 11, 9, Some(0.06), 1.0),
            tx("alpha", 13, 9, None, 4.0),
        ];
        let metrics = aggregate_demand(&current, &[]);
        assert_eq!(metrics.len(), 1);

        let row = &metrics[0];
        assert_eq!(row.buyer, "alpha");
        assert_eq!(row.reqs, 4);
        assert_eq!(row.total_sell_value, 0.18);
        assert_eq!(row.sell_p50, Some(0.06));
        assert_eq!(row.sell_pavg, Some(0.06));
        // Chronologically last row with a defined price, not input order.
        assert_eq!(row.last_price, Some(0.07));
        assert_eq!(row.sales, 7.0);
        assert_eq!(row.profit, 0.07);
    }

    #[test]
    fn test_missing_history_is_zero_filled() {
        let current = vec![tx("alpha", 10, 9, Some(0.05), 1.0)];
        let lookback = vec![tx("beta", 1, 9, Some(0.04), 3.0)];
        let metrics = aggregate_demand(&current, &lookback);

        assert_eq!(metrics.len(), 1);
        let row = &metrics[0];
        assert_eq!(row.reqs_hist, 0);
        assert_eq!(row.sales_hist, 0.0);
        assert_eq!(row.sell_p50_hist, 0.0);
        assert_eq!(row.sell_pavg_hist, 0.0);
        assert_eq!(row.total_sell_value_hist, 0.0);
        assert_eq!(row.profit_hist, 0.0);
    }

    #[test]
    fn test_history_is_joined_per_buyer_item() {
        let current = vec![
            tx("alpha", 10, 9, Some(0.05), 1.0),
            tx("beta", 10, 9, Some(0.05), 0.0),
        ];
        let lookback = vec![
            tx("alpha", 1, 9, Some(0.02), 3.0),
            tx("alpha", 2, 9, Some(0.04), 1.0),
        ];
        let metrics = aggregate_demand(&current, &lookback);
        assert_eq!(metrics.len(), 2);

        let alpha = &metrics[0];
        assert_eq!(alpha.buyer, "alpha");
        assert_eq!(alpha.reqs_hist, 2);
        assert_eq!(alpha.sales_hist, 4.0);
        assert_eq!(alpha.sell_p50_hist, 0.03);
        assert_eq!(alpha.total_sell_value_hist, 0.06);

        let beta = &metrics[1];
        assert_eq!(beta.buyer, "beta");
        assert_eq!(beta.reqs_hist, 0);
    }

    #[test]
    fn test_rows_without_sell_price_leave_prices_undefined() {
        let current = vec![tx("alpha", 10, 9, None, 0.0)];
        let row = &aggregate_demand(&current, &[])[0];
        assert_eq!(row.reqs, 1);
        assert_eq!(row.sell_p50, None);
        assert_eq!(row.sell_pavg, None);
        assert_eq!(row.last_price, None);
        assert_eq!(row.total_sell_value, 0.0);
    }

    #[test]
    fn test_empty_current_window() {
        let lookback = vec![tx("alpha", 1, 9, Some(0.02), 3.0)];
        assert!(aggregate_demand(&[], &lookback).is_empty());
    }
}
