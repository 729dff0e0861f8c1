//! Per-item purchase cost baselines derived from the lookback window.
use crate::core::stats::{percentile_sorted, round4};
use crate::core::transaction::{ItemId, TransactionRecord};
use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Robust estimate of what suppliers charge for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBaseline {
    pub item: ItemId,
    pub cost_p50: f64,
    pub cost_p10: f64,
    pub cost_p90: f64,
    pub quotes_count: usize,
}

/// Read-only lookup of cost baselines, at most one per item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostBaselineTable {
    rows: HashMap<ItemId, CostBaseline>,
}

impl CostBaselineTable {
    /// Builds the table, rejecting any item that appears more than once.
    pub fn from_rows(rows: impl IntoIterator<Item = CostBaseline>) -> Result<Self> {
        let mut table = HashMap::new();
        for row in rows {
            if table.contains_key(&row.item) {
                bail!("Duplicate cost baseline for item {}", row.item);
            }
            table.insert(row.item.clone(), row);
        }
        Ok(Self { rows: table })
    }

    pub fn get(&self, item: &ItemId) -> Option<&CostBaseline> {
        self.rows.get(item)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Groups lookback records by item and summarises their buy prices.
///
/// Items without a single defined buy price get no baseline at all. Values
/// are rounded to 4 decimals.
pub fn estimate_cost_baselines(lookback: &[TransactionRecord]) -> Result<CostBaselineTable> {
    // BTreeMap keeps construction order stable across runs.
    let mut quotes: BTreeMap<&ItemId, Vec<f64>> = BTreeMap::new();
    for record in lookback {
        let entry = quotes.entry(&record.item).or_default();
        if let Some(price) = record.buy_price.filter(|p| p.is_finite()) {
            entry.push(price);
        }
    }

    let mut rows = Vec::with_capacity(quotes.len());
    for (item, mut prices) in quotes {
        prices.sort_by(f64::total_cmp);
        let (Some(p50), Some(p10), Some(p90)) = (
            percentile_sorted(&prices, 0.5),
            percentile_sorted(&prices, 0.1),
            percentile_sorted(&prices, 0.9),
        ) else {
            debug!(%item, "No buy price observations, skipping baseline");
            continue;
        };
        rows.push(CostBaseline {
            item: item.clone(),
            cost_p50: round4(p50),
            cost_p10: round4(p10),
            cost_p90: round4(p90),
            quotes_count: prices.len(),
        });
    }

    debug!(items = rows.len(), "Estimated cost baselines");
    CostBaselineTable::from_rows(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn quote(country: &str, buy_price: Option<f64>) -> TransactionRecord {
        TransactionRecord {
            timestamp: NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
            buyer: "Consumer_01".to_string(),
            supplier: "Supplier_01".to_string(),
            item: ItemId::new(country, "sms"),
            sell_price: Some(0.1),
            buy_price,
            quantity: 1.0,
            profit: 0.0,
        }
    }

    #[test]
    fn test_estimate_cost_baselines() {
        let lookback = vec![
            quote("us", Some(0.02)),
            quote("us", Some(0.06)),
            quote("us", Some(0.04)),
            quote("uk", Some(0.10)),
        ];
        let table = estimate_cost_baselines(&lookback).unwrap();
        assert_eq!(table.len(), 2);

        let us = table.get(&ItemId::new("US", "SMS")).unwrap();
        assert_eq!(us.cost_p50, 0.04);
        assert_eq!(us.cost_p10, 0.024);
        assert_eq!(us.cost_p90, 0.056);
        assert_eq!(us.quotes_count, 3);

        let uk = table.get(&ItemId::new("UK", "SMS")).unwrap();
        assert_eq!(uk.cost_p50, 0.1);
        assert_eq!(uk.cost_p10, 0.1);
        assert_eq!(uk.quotes_count, 1);
    }

    #[test]
    fn test_items_without_buy_prices_have_no_baseline() {
        let lookback = vec![quote("de", None), quote("de", Some(f64::NAN))];
        let table = estimate_cost_baselines(&lookback).unwrap();
        assert!(table.get(&ItemId::new("DE", "SMS")).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn test_empty_lookback_yields_empty_table() {
        assert!(estimate_cost_baselines(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_estimation_is_idempotent() {
        let lookback = vec![
            quote("fr", Some(0.03)),
            quote("fr", Some(0.01)),
            quote("ca", Some(0.07)),
        ];
        assert_eq!(
            estimate_cost_baselines(&lookback).unwrap(),
            estimate_cost_baselines(&lookback).unwrap()
        );
    }

    #[test]
    fn test_duplicate_items_are_rejected() {
        let row = CostBaseline {
            item: ItemId::new("US", "SMS"),
            cost_p50: 0.04,
            cost_p10: 0.02,
            cost_p90: 0.06,
            quotes_count: 3,
        };
        let err = CostBaselineTable::from_rows(vec![row.clone(), row]).unwrap_err();
        assert!(err.to_string().contains("Duplicate cost baseline"));
    }
}
