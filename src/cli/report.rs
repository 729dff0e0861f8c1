use super::ui;
use crate::core::config::AppConfig;
use crate::core::recommendation::{Recommendation, SummaryStats, top_by_price};
use crate::core::stats::{mean, median};
use crate::store::disk::DiskStore;
use anyhow::{Context, Result, bail};
use chrono::Local;
use comfy_table::Cell;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const REPORT_PREFIX: &str = "summary_report_";

/// Price statistics over enabled rows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceStats {
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

/// Aggregates shown by the `report` command for a saved table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportStats {
    pub summary: SummaryStats,
    pub prices: Option<PriceStats>,
    pub margin_mean: Option<f64>,
    pub margin_median: Option<f64>,
    pub enabled_profit: f64,
}

impl ReportStats {
    pub fn from_recommendations(recommendations: &[Recommendation]) -> Self {
        let enabled: Vec<&Recommendation> = recommendations.iter().filter(|r| r.enabled).collect();
        let prices: Vec<f64> = enabled.iter().filter_map(|r| r.price_rec).collect();
        let margins: Vec<f64> = enabled.iter().filter_map(|r| r.target_margin).collect();

        let price_stats = match (mean(&prices), median(&prices)) {
            (Some(mean), Some(median)) => Some(PriceStats {
                mean,
                median,
                min: prices.iter().copied().fold(f64::INFINITY, f64::min),
                max: prices.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            }),
            _ => None,
        };

        ReportStats {
            summary: SummaryStats::from_recommendations(recommendations),
            prices: price_stats,
            margin_mean: mean(&margins),
            margin_median: median(&margins),
            enabled_profit: enabled.iter().map(|r| r.profit).sum(),
        }
    }

    fn share(&self, count: usize) -> f64 {
        if self.summary.total_items == 0 {
            0.0
        } else {
            count as f64 / self.summary.total_items as f64 * 100.0
        }
    }
}

/// Summarizes a saved recommendation table: `file`, or the newest table in
/// the output folder.
pub fn run(config: &AppConfig, file: Option<&Path>, top: usize, save: bool) -> Result<()> {
    let path = match file {
        Some(path) => path.to_path_buf(),
        None => {
            let store = DiskStore::new(&config.output_folder, &config.backup_folder);
            match store.latest_output()? {
                Some(path) => path,
                None => bail!(
                    "No recommendation files found in {}; run `repricer recommend` first",
                    config.output_folder.display()
                ),
            }
        }
    };

    let recommendations = DiskStore::load(&path)?;
    let stats = ReportStats::from_recommendations(&recommendations);

    println!(
        "{}\n{}\n",
        ui::style_text("Recommendation report", ui::StyleType::Title),
        ui::style_text(&path.display().to_string(), ui::StyleType::Subtle)
    );
    println!("{}", display_stats(&stats, &recommendations, top));

    if save {
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let report = render_text(&stats, &recommendations, top);
        let saved = save_report(&config.output_folder, &stamp, &report)?;
        println!(
            "\nReport saved to: {}",
            ui::style_text(&saved.display().to_string(), ui::StyleType::TotalLabel)
        );
    }
    Ok(())
}

fn display_stats(stats: &ReportStats, recommendations: &[Recommendation], top: usize) -> String {
    let summary = &stats.summary;
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![Cell::new("Total items"), ui::number_cell(summary.total_items)]);
    table.add_row(vec![
        Cell::new("Enabled"),
        ui::number_cell(format!(
            "{} ({:.1}%)",
            summary.enabled_items,
            stats.share(summary.enabled_items)
        )),
    ]);
    table.add_row(vec![
        Cell::new("Disabled"),
        ui::number_cell(format!(
            "{} ({:.1}%)",
            summary.disabled_items,
            stats.share(summary.disabled_items)
        )),
    ]);
    let price = |value: Option<f64>| ui::format_optional_cell(value, |p| format!("{p:.4}"));
    table.add_row(vec![Cell::new("Price mean"), price(stats.prices.map(|p| p.mean))]);
    table.add_row(vec![Cell::new("Price median"), price(stats.prices.map(|p| p.median))]);
    table.add_row(vec![Cell::new("Price min"), price(stats.prices.map(|p| p.min))]);
    table.add_row(vec![Cell::new("Price max"), price(stats.prices.map(|p| p.max))]);
    table.add_row(vec![Cell::new("Margin mean"), ui::margin_cell(stats.margin_mean)]);
    table.add_row(vec![Cell::new("Margin median"), ui::margin_cell(stats.margin_median)]);
    table.add_row(vec![
        Cell::new("Enabled profit"),
        ui::number_cell(format!("{:.2}", stats.enabled_profit)),
    ]);

    let mut output = table.to_string();

    let reasons = SummaryStats::disabled_by_reason(recommendations);
    if !reasons.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Reason"), ui::header_cell("Items")]);
        for (reason, count) in reasons {
            table.add_row(vec![Cell::new(reason), ui::number_cell(count)]);
        }
        output.push_str(&format!(
            "\n\n{}\n\n{table}",
            ui::style_text("Disabled reasons", ui::StyleType::Title)
        ));
    }

    let best = top_by_price(recommendations, top);
    if !best.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Buyer"),
            ui::header_cell("Item"),
            ui::header_cell("Price"),
            ui::header_cell("Margin"),
        ]);
        for rec in best {
            table.add_row(vec![
                Cell::new(&rec.buyer),
                Cell::new(rec.item.as_str()),
                ui::format_optional_cell(rec.price_rec, |p| format!("{p:.4}")),
                ui::margin_cell(rec.target_margin),
            ]);
        }
        output.push_str(&format!(
            "\n\n{}\n\n{table}",
            ui::style_text(&format!("Top {top} by price"), ui::StyleType::Title)
        ));
    }
    output
}

/// Plain-text rendering of the report, free of terminal styling.
pub fn render_text(stats: &ReportStats, recommendations: &[Recommendation], top: usize) -> String {
    let summary = &stats.summary;
    let mut out = format!(
        "WEEKLY PRICING RECOMMENDATIONS REPORT\n{}\n",
        "=".repeat(40)
    );
    out.push_str(&format!("Total items:    {}\n", summary.total_items));
    out.push_str(&format!(
        "Enabled items:  {} ({:.1}%)\n",
        summary.enabled_items,
        stats.share(summary.enabled_items)
    ));
    out.push_str(&format!(
        "Disabled items: {} ({:.1}%)\n",
        summary.disabled_items,
        stats.share(summary.disabled_items)
    ));

    if let Some(prices) = &stats.prices {
        out.push_str("\nPrice statistics (enabled items)\n");
        out.push_str(&format!("  Mean:   {:.4}\n", prices.mean));
        out.push_str(&format!("  Median: {:.4}\n", prices.median));
        out.push_str(&format!("  Min:    {:.4}\n", prices.min));
        out.push_str(&format!("  Max:    {:.4}\n", prices.max));
    }
    if let (Some(mean), Some(median)) = (stats.margin_mean, stats.margin_median) {
        out.push_str(&format!(
            "\nMargin statistics (enabled items)\n  Mean:   {:.1}%\n  Median: {:.1}%\n",
            mean * 100.0,
            median * 100.0
        ));
    }
    out.push_str(&format!("\nEnabled profit: {:.2}\n", stats.enabled_profit));

    let reasons = SummaryStats::disabled_by_reason(recommendations);
    if !reasons.is_empty() {
        out.push_str("\nDisabled reasons\n");
        for (reason, count) in reasons {
            out.push_str(&format!("  {reason}: {count}\n"));
        }
    }

    let best = top_by_price(recommendations, top);
    if !best.is_empty() {
        out.push_str(&format!("\nTop {top} by price\n"));
        for (rank, rec) in best.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {} / {}: {:.4}\n",
                rank + 1,
                rec.buyer,
                rec.item,
                rec.price_rec.unwrap_or(0.0)
            ));
        }
    }
    out
}

/// Writes `report` as `summary_report_<stamp>.txt` into `folder`.
pub fn save_report(folder: &Path, stamp: &str, report: &str) -> Result<PathBuf> {
    fs::create_dir_all(folder)
        .with_context(|| format!("Failed to create directory: {}", folder.display()))?;
    let path = folder.join(format!("{REPORT_PREFIX}{stamp}.txt"));
    fs::write(&path, report)
        .with_context(|| format!("Failed to write file: {}", path.display()))?;
    info!(path = %path.display(), "Saved summary report");
    Ok(path)
}
