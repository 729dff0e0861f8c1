//! Descriptive overview of a loaded transaction history.
use crate::core::stats::mean;
use crate::core::transaction::{ITEM_SEPARATOR, ItemId, TransactionRecord};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ItemActivity {
    pub requests: u64,
    pub sales: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub date_range: Option<(NaiveDateTime, NaiveDateTime)>,
    pub unique_buyers: usize,
    pub unique_suppliers: usize,
    pub unique_items: usize,
    pub unique_countries: usize,
    pub unique_services: usize,
    pub total_profit: f64,
    pub avg_sell_price: f64,
    pub avg_buy_price: f64,
    pub items: BTreeMap<ItemId, ItemActivity>,
}

impl DatasetSummary {
    pub fn from_records(records: &[TransactionRecord]) -> Self {
        let mut buyers = HashSet::new();
        let mut suppliers = HashSet::new();
        let mut countries = HashSet::new();
        let mut services = HashSet::new();
        let mut items: BTreeMap<ItemId, ItemActivity> = BTreeMap::new();
        let mut sell_prices = Vec::new();
        let mut buy_prices = Vec::new();
        let mut date_range: Option<(NaiveDateTime, NaiveDateTime)> = None;

        for record in records {
            buyers.insert(record.buyer.as_str());
            suppliers.insert(record.supplier.as_str());
            if let Some((country, service)) = record.item.as_str().split_once(ITEM_SEPARATOR) {
                countries.insert(country);
                services.insert(service);
            }
            sell_prices.extend(record.sell_price);
            buy_prices.extend(record.buy_price);

            let activity = items.entry(record.item.clone()).or_default();
            activity.requests += 1;
            activity.sales += record.quantity;
            activity.profit += record.profit;

            date_range = Some(match date_range {
                None => (record.timestamp, record.timestamp),
                Some((lo, hi)) => (lo.min(record.timestamp), hi.max(record.timestamp)),
            });
        }

        DatasetSummary {
            total_rows: records.len(),
            date_range,
            unique_buyers: buyers.len(),
            unique_suppliers: suppliers.len(),
            unique_items: items.len(),
            unique_countries: countries.len(),
            unique_services: services.len(),
            total_profit: records.iter().map(|r| r.profit).sum(),
            avg_sell_price: mean(&sell_prices).unwrap_or(0.0),
            avg_buy_price: mean(&buy_prices).unwrap_or(0.0),
            items,
        }
    }

    /// Items ordered by total profit, highest first.
    pub fn top_items_by_profit(&self, n: usize) -> Vec<(&ItemId, &ItemActivity)> {
        let mut ranked: Vec<(&ItemId, &ItemActivity)> = self.items.iter().collect();
        ranked.sort_by(|a, b| b.1.profit.total_cmp(&a.1.profit));
        ranked.truncate(n);
        ranked
    }
}
