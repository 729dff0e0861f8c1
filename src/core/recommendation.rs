//! Runs the full pipeline over a pair of transaction windows and assembles
//! the recommendation table with its summary statistics.
use crate::core::baseline::{CostBaselineTable, estimate_cost_baselines};
use crate::core::config::PricingConfig;
use crate::core::conversion::ConversionRates;
use crate::core::decision::{PriceDecisionEngine, Reason};
use crate::core::metrics::aggregate_demand;
use crate::core::stats::{mean, round4};
use crate::core::transaction::{ItemId, TransactionRecord};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// One row of the output table. Field order is the persisted column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "buyer_id")]
    pub buyer: String,
    #[serde(rename = "item_id")]
    pub item: ItemId,
    pub enabled: bool,
    pub price_rec: Option<f64>,
    pub baseline_cost: Option<f64>,
    pub target_margin: Option<f64>,
    pub reason: Reason,
    pub reqs: u64,
    pub sales: f64,
    pub reqs_hist: u64,
    pub sales_hist: f64,
    pub conversion_rate: f64,
    pub conversion_rate_hist: f64,
    pub profit: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub total_items: usize,
    pub enabled_items: usize,
    pub disabled_items: usize,
    pub avg_recommended_price: f64,
    pub avg_target_margin: f64,
    pub total_profit: f64,
}

impl SummaryStats {
    /// Averages cover enabled rows only and fall back to 0 when there are
    /// none; profit is summed over every row.
    pub fn from_recommendations(recommendations: &[Recommendation]) -> Self {
        let enabled: Vec<&Recommendation> = recommendations.iter().filter(|r| r.enabled).collect();
        let prices: Vec<f64> = enabled.iter().filter_map(|r| r.price_rec).collect();
        let margins: Vec<f64> = enabled.iter().filter_map(|r| r.target_margin).collect();

        SummaryStats {
            total_items: recommendations.len(),
            enabled_items: enabled.len(),
            disabled_items: recommendations.len() - enabled.len(),
            avg_recommended_price: mean(&prices).map_or(0.0, round4),
            avg_target_margin: mean(&margins).map_or(0.0, round4),
            total_profit: recommendations.iter().map(|r| r.profit).sum(),
        }
    }

    /// Number of disabled rows per reason, most frequent first.
    pub fn disabled_by_reason(recommendations: &[Recommendation]) -> Vec<(Reason, usize)> {
        let mut counts: BTreeMap<Reason, usize> = BTreeMap::new();
        for rec in recommendations.iter().filter(|r| !r.enabled) {
            *counts.entry(rec.reason).or_insert(0) += 1;
        }
        let mut counts: Vec<(Reason, usize)> = counts.into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        counts
    }
}

/// The terminal output of one run.
#[derive(Debug, Clone)]
pub struct RecommendationRun {
    pub recommendations: Vec<Recommendation>,
    pub summary: SummaryStats,
    pub baselines: CostBaselineTable,
}

impl RecommendationRun {
    /// Enabled recommendations with the highest prices, at most `n`.
    pub fn top_by_price(&self, n: usize) -> Vec<&Recommendation> {
        top_by_price(&self.recommendations, n)
    }
}

pub fn top_by_price(recommendations: &[Recommendation], n: usize) -> Vec<&Recommendation> {
    let mut enabled: Vec<&Recommendation> = recommendations.iter().filter(|r| r.enabled).collect();
    enabled.sort_by(|a, b| {
        b.price_rec
            .unwrap_or(0.0)
            .total_cmp(&a.price_rec.unwrap_or(0.0))
    });
    enabled.truncate(n);
    enabled
}

pub struct RecommendationSetBuilder {
    engine: PriceDecisionEngine,
}

impl RecommendationSetBuilder {
    pub fn new(config: PricingConfig) -> Self {
        Self {
            engine: PriceDecisionEngine::new(config),
        }
    }

    /// Scores every buyer-item pair present in `current`. The cost baselines
    /// are computed once from `lookback` before any row is evaluated.
    pub fn build(
        &self,
        current: &[TransactionRecord],
        lookback: &[TransactionRecord],
    ) -> Result<RecommendationRun> {
        let baselines = estimate_cost_baselines(lookback)?;
        info!(items = baselines.len(), "Computed supplier cost baselines");

        let metrics = aggregate_demand(current, lookback);
        info!(pairs = metrics.len(), "Computed buyer-item metrics");

        let recommendations: Vec<Recommendation> = metrics
            .into_iter()
            .map(|m| {
                let rates = ConversionRates::from_metrics(&m);
                let verdict = self.engine.evaluate(&m, &rates, baselines.get(&m.item));
                Recommendation {
                    enabled: verdict.enabled,
                    price_rec: verdict.price_rec,
                    baseline_cost: verdict.baseline_cost,
                    target_margin: verdict.target_margin,
                    reason: verdict.reason,
                    reqs: m.reqs,
                    sales: m.sales,
                    reqs_hist: m.reqs_hist,
                    sales_hist: m.sales_hist,
                    conversion_rate: rates.current,
                    conversion_rate_hist: rates.historical,
                    profit: m.profit,
                    buyer: m.buyer,
                    item: m.item,
                }
            })
            .collect();

        let summary = SummaryStats::from_recommendations(&recommendations);
        info!(
            total = summary.total_items,
            enabled = summary.enabled_items,
            disabled = summary.disabled_items,
            "Generated recommendations"
        );

        Ok(RecommendationRun {
            recommendations,
            summary,
            baselines,
        })
    }
}
