use crate::core::metrics::DemandMetrics;
use serde::Serialize;

/// Sales-to-requests ratios for the current and lookback periods.
///
/// `sales` sums unit quantities while `reqs` counts rows, so a rate above
/// 1.0 is possible and is not clamped.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ConversionRates {
    pub current: f64,
    pub historical: f64,
}

impl ConversionRates {
    pub fn from_metrics(metrics: &DemandMetrics) -> Self {
        ConversionRates {
            current: ratio(metrics.sales, metrics.reqs),
            historical: ratio(metrics.sales_hist, metrics.reqs_hist),
        }
    }
}

fn ratio(sales: f64, reqs: u64) -> f64 {
    if reqs > 0 { sales / reqs as f64 } else { 0.0 }
}
