//! Rule-based enable/disable and price decision for a single buyer-item row.
//!
//! Every row is evaluated independently from its own metrics and the cost
//! baseline of its item; the engine keeps no state between rows.

use crate::core::baseline::CostBaseline;
use crate::core::config::PricingConfig;
use crate::core::conversion::ConversionRates;
use crate::core::metrics::DemandMetrics;
use crate::core::stats::round4;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Lower bound for the margin denominator.
const COST_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Ok,
    NoSupplierCost,
    InvalidCost,
    NoSalesTwoWeeks,
}

impl Reason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Reason::Ok => "ok",
            Reason::NoSupplierCost => "no_supplier_cost",
            Reason::InvalidCost => "invalid_cost",
            Reason::NoSalesTwoWeeks => "no_sales_two_weeks",
        }
    }
}

impl Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Reason {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "ok" => Ok(Reason::Ok),
            "no_supplier_cost" => Ok(Reason::NoSupplierCost),
            "invalid_cost" => Ok(Reason::InvalidCost),
            "no_sales_two_weeks" => Ok(Reason::NoSalesTwoWeeks),
            _ => Err(anyhow!("Invalid reason code: {}", s)),
        }
    }
}

/// Which rule produced the baseline price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginBranch {
    /// Sold this period: margin taken from the median sell price, clamped.
    HistoricalMargin,
    /// Requested but unsold: step down from the last quoted price.
    StepDownFromLast,
    /// No activity: default margin over cost.
    DefaultMargin,
}

/// Conversion-driven correction applied after the baseline price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    None,
    StepUp,
    StepDown,
}

/// Outcome for one buyer-item row. Prices and margins are rounded to 4
/// decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub enabled: bool,
    pub reason: Reason,
    pub price_rec: Option<f64>,
    pub baseline_cost: Option<f64>,
    pub target_margin: Option<f64>,
    pub branch: Option<MarginBranch>,
    pub adjustment: Adjustment,
}

impl Verdict {
    fn rejected(reason: Reason, baseline_cost: Option<f64>) -> Self {
        Verdict {
            enabled: false,
            reason,
            price_rec: None,
            baseline_cost,
            target_margin: None,
            branch: None,
            adjustment: Adjustment::None,
        }
    }
}

pub struct PriceDecisionEngine {
    config: PricingConfig,
}

impl PriceDecisionEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    pub fn evaluate(
        &self,
        metrics: &DemandMetrics,
        rates: &ConversionRates,
        baseline: Option<&CostBaseline>,
    ) -> Verdict {
        let Some(baseline) = baseline else {
            return Verdict::rejected(Reason::NoSupplierCost, None);
        };

        let cost = baseline.cost_p50;
        if !cost.is_finite() {
            return Verdict::rejected(Reason::InvalidCost, None);
        }
        if cost <= 0.0 {
            return Verdict::rejected(Reason::InvalidCost, Some(round4(cost)));
        }

        let (branch, mut price, margin) = self.baseline_price(metrics, cost);

        let total_reqs = metrics.reqs + metrics.reqs_hist;
        if metrics.sales == 0.0
            && metrics.sales_hist == 0.0
            && total_reqs < self.config.min_reqs_to_keep
        {
            return Verdict {
                enabled: false,
                reason: Reason::NoSalesTwoWeeks,
                price_rec: Some(round4(price)),
                baseline_cost: Some(round4(cost)),
                target_margin: Some(round4(margin)),
                branch: Some(branch),
                adjustment: Adjustment::None,
            };
        }

        let adjustment = self.adjustment(metrics, rates);
        match adjustment {
            Adjustment::StepUp => price *= 1.0 + self.config.step_up_pct,
            Adjustment::StepDown => price *= 1.0 - self.config.step_down_pct,
            Adjustment::None => {}
        }

        Verdict {
            enabled: true,
            reason: Reason::Ok,
            price_rec: Some(round4(price)),
            baseline_cost: Some(round4(cost)),
            target_margin: Some(round4(margin)),
            branch: Some(branch),
            adjustment,
        }
    }

    /// Returns the branch taken, the baseline price and the target margin.
    fn baseline_price(&self, metrics: &DemandMetrics, cost: f64) -> (MarginBranch, f64, f64) {
        let cfg = &self.config;
        let denominator = cost.max(COST_EPSILON);

        if let Some(sell_p50) = metrics.sell_p50.filter(|_| metrics.sales > 0.0) {
            let margin =
                ((sell_p50 - cost) / denominator).clamp(cfg.min_margin, cfg.max_margin);
            return (MarginBranch::HistoricalMargin, cost * (1.0 + margin), margin);
        }

        if metrics.reqs > 0 && metrics.sales == 0.0 {
            if let Some(last_price) = metrics.last_price {
                let price = last_price * (1.0 - cfg.step_down_pct);
                // Not clamped: an underwater last price yields a negative margin.
                let margin = (price - cost) / denominator;
                return (MarginBranch::StepDownFromLast, price, margin);
            }
        }

        let margin = cfg.default_margin;
        (MarginBranch::DefaultMargin, cost * (1.0 + margin), margin)
    }

    fn adjustment(&self, metrics: &DemandMetrics, rates: &ConversionRates) -> Adjustment {
        let cfg = &self.config;
        if rates.current > cfg.high_conversion_threshold {
            Adjustment::StepUp
        } else if rates.current < cfg.low_conversion_threshold
            && metrics.reqs > cfg.low_conversion_min_reqs
        {
            Adjustment::StepDown
        } else {
            Adjustment::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transaction::ItemId;

    fn engine() -> PriceDecisionEngine {
        PriceDecisionEngine::new(PricingConfig::default())
    }

    fn baseline(cost_p50: f64) -> CostBaseline {
        CostBaseline {
            item: ItemId::new("US", "SMS"),
            cost_p50,
            cost_p10: cost_p50,
            cost_p90: cost_p50,
            quotes_count: 3,
        }
    }

    fn metrics() -> DemandMetrics {
        DemandMetrics::empty("Consumer_01", ItemId::new("US", "SMS"))
    }

    fn decide(m: &DemandMetrics, cost: Option<f64>) -> Verdict {
        let b = cost.map(baseline);
        engine().evaluate(m, &ConversionRates::from_metrics(m), b.as_ref())
    }

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("value should be present");
        assert!(
            (actual - expected).abs() <= 1e-4,
            "expected ~{expected}, got {actual}"
        );
    }

    #[test]
    fn test_sold_item_uses_clamped_historical_margin_and_steps_up() {
        let m = DemandMetrics {
            reqs: 5,
            sales: 5.0,
            sell_p50: Some(0.06),
            last_price: Some(0.06),
            ..metrics()
        };
        let verdict = decide(&m, Some(0.04));

        assert!(verdict.enabled);
        assert_eq!(verdict.reason, Reason::Ok);
        assert_eq!(verdict.branch, Some(MarginBranch::HistoricalMargin));
        assert_eq!(verdict.adjustment, Adjustment::StepUp);
        assert_eq!(verdict.target_margin, Some(0.45));
        assert_eq!(verdict.baseline_cost, Some(0.04));
        assert_close(verdict.price_rec, 0.05974);
    }

    #[test]
    fn test_missing_baseline_is_no_supplier_cost() {
        let m = DemandMetrics {
            reqs: 50,
            sales: 10.0,
            sell_p50: Some(0.1),
            ..metrics()
        };
        let verdict = decide(&m, None);
        assert!(!verdict.enabled);
        assert_eq!(verdict.reason, Reason::NoSupplierCost);
        assert_eq!(verdict.price_rec, None);
        assert_eq!(verdict.baseline_cost, None);
        assert_eq!(verdict.target_margin, None);
    }

    #[test]
    fn test_non_positive_cost_is_invalid() {
        let m = DemandMetrics {
            reqs: 50,
            sales: 10.0,
            sell_p50: Some(0.1),
            ..metrics()
        };
        for cost in [0.0, -0.02] {
            let verdict = decide(&m, Some(cost));
            assert_eq!(verdict.reason, Reason::InvalidCost);
            assert!(!verdict.enabled);
            assert_eq!(verdict.price_rec, None);
            assert_eq!(verdict.baseline_cost, Some(cost));
        }
        let verdict = decide(&m, Some(f64::NAN));
        assert_eq!(verdict.reason, Reason::InvalidCost);
        assert_eq!(verdict.baseline_cost, None);
    }

    #[test]
    fn test_low_total_demand_without_sales_is_disabled() {
        let m = DemandMetrics {
            reqs: 0,
            reqs_hist: 3,
            ..metrics()
        };
        let verdict = decide(&m, Some(0.04));
        assert!(!verdict.enabled);
        assert_eq!(verdict.reason, Reason::NoSalesTwoWeeks);
        assert_eq!(verdict.branch, Some(MarginBranch::DefaultMargin));
        assert_eq!(verdict.adjustment, Adjustment::None);
        // Step-one values are still reported for diagnostics.
        assert_eq!(verdict.target_margin, Some(0.15));
        assert_close(verdict.price_rec, 0.046);
    }

    #[test]
    fn test_disable_check_applies_to_step_down_branch() {
        let m = DemandMetrics {
            reqs: 4,
            reqs_hist: 5,
            last_price: Some(0.08),
            sell_p50: Some(0.08),
            ..metrics()
        };
        let verdict = decide(&m, Some(0.04));
        assert_eq!(verdict.reason, Reason::NoSalesTwoWeeks);
        assert_eq!(verdict.branch, Some(MarginBranch::StepDownFromLast));
    }

    #[test]
    fn test_enough_requests_keep_unsold_item_enabled() {
        let m = DemandMetrics {
            reqs: 4,
            reqs_hist: 6,
            last_price: Some(0.08),
            ..metrics()
        };
        let verdict = decide(&m, Some(0.04));
        assert!(verdict.enabled);
        assert_eq!(verdict.adjustment, Adjustment::None);
        assert_close(verdict.price_rec, 0.076);
    }

    #[test]
    fn test_historical_sales_keep_item_enabled() {
        let m = DemandMetrics {
            reqs: 1,
            sales_hist: 2.0,
            ..metrics()
        };
        assert_eq!(decide(&m, Some(0.04)).reason, Reason::Ok);
    }

    #[test]
    fn test_requests_without_sales_step_down_twice() {
        let m = DemandMetrics {
            reqs: 25,
            last_price: Some(0.10),
            sell_p50: Some(0.10),
            ..metrics()
        };
        let verdict = decide(&m, Some(0.05));

        assert!(verdict.enabled);
        assert_eq!(verdict.branch, Some(MarginBranch::StepDownFromLast));
        assert_eq!(verdict.adjustment, Adjustment::StepDown);
        assert_close(verdict.price_rec, 0.09025);
        // (0.095 - 0.05) / 0.05
        assert_close(verdict.target_margin, 0.9);
    }

    #[test]
    fn test_step_down_margin_is_not_clamped() {
        let m = DemandMetrics {
            reqs: 12,
            last_price: Some(0.03),
            ..metrics()
        };
        let verdict = decide(&m, Some(0.05));
        assert!(verdict.enabled);
        // (0.0285 - 0.05) / 0.05
        assert_close(verdict.target_margin, -0.43);
    }

    #[test]
    fn test_low_margin_is_clamped_to_minimum() {
        let m = DemandMetrics {
            reqs: 100,
            sales: 10.0,
            sell_p50: Some(0.041),
            ..metrics()
        };
        let verdict = decide(&m, Some(0.04));
        assert_eq!(verdict.target_margin, Some(0.1));
        assert_eq!(verdict.adjustment, Adjustment::None);
        assert_close(verdict.price_rec, 0.044);
    }

    #[test]
    fn test_low_conversion_needs_enough_requests() {
        let base = DemandMetrics {
            sales: 1.0,
            sell_p50: Some(0.05),
            ..metrics()
        };
        let few = DemandMetrics {
            reqs: 20,
            ..base.clone()
        };
        assert_eq!(decide(&few, Some(0.04)).adjustment, Adjustment::None);

        let many = DemandMetrics { reqs: 21, ..base };
        assert_eq!(decide(&many, Some(0.04)).adjustment, Adjustment::StepDown);
    }

    #[test]
    fn test_margin_clamp_and_adjustment_exclusivity_hold_across_inputs() {
        let cfg = PricingConfig::default();
        for reqs in [1u64, 5, 21, 40, 200] {
            for sales in [1.0, 2.0, 10.0, 50.0] {
                for sell in [0.001, 0.03, 0.05, 0.2, 5.0] {
                    let m = DemandMetrics {
                        reqs,
                        sales,
                        sell_p50: Some(sell),
                        ..metrics()
                    };
                    let verdict = decide(&m, Some(0.04));
                    let margin = verdict.target_margin.unwrap();
                    assert!(margin >= cfg.min_margin && margin <= cfg.max_margin);
                    let rate = sales / reqs as f64;
                    match verdict.adjustment {
                        Adjustment::StepUp => assert!(rate > cfg.high_conversion_threshold),
                        Adjustment::StepDown => assert!(rate < cfg.low_conversion_threshold),
                        Adjustment::None => {}
                    }
                }
            }
        }
    }

    #[test]
    fn test_custom_thresholds_are_respected() {
        let engine = PriceDecisionEngine::new(PricingConfig {
            default_margin: 0.30,
            min_reqs_to_keep: 1,
            ..PricingConfig::default()
        });
        let m = DemandMetrics {
            reqs: 1,
            ..metrics()
        };
        let verdict =
            engine.evaluate(&m, &ConversionRates::from_metrics(&m), Some(&baseline(0.1)));
        assert!(verdict.enabled);
        assert_eq!(verdict.branch, Some(MarginBranch::DefaultMargin));
        assert_eq!(verdict.target_margin, Some(0.3));
        assert_close(verdict.price_rec, 0.13);
        assert_eq!(engine.config().default_margin, 0.30);
    }

    #[test]
    fn test_reason_round_trips_through_str() {
        for reason in [
            Reason::Ok,
            Reason::NoSupplierCost,
            Reason::InvalidCost,
            Reason::NoSalesTwoWeeks,
        ] {
            assert_eq!(reason.to_string().parse::<Reason>().unwrap(), reason);
        }
        assert!("bogus".parse::<Reason>().is_err());
    }
}
