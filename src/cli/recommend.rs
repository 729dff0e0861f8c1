use super::{data, ui};
use crate::core::config::AppConfig;
use crate::core::dataset::DatasetSummary;
use crate::core::recommendation::{RecommendationRun, RecommendationSetBuilder, SummaryStats};
use crate::core::transaction::{TransactionRecord, TransactionSource};
use crate::core::window::{Windows, split_windows};
use crate::sources::{CsvTransactionSource, util::find_input_file};
use crate::store::{RecommendationStore, SavedRun};
use anyhow::Result;
use chrono::Local;
use comfy_table::Cell;
use std::path::Path;
use tracing::{info, warn};

const TOP_RECOMMENDATIONS: usize = 5;

/// Loads the transaction export, scores the current period and saves the
/// resulting table through `store`.
pub fn run(
    config: &AppConfig,
    input: Option<&Path>,
    store: &dyn RecommendationStore,
) -> Result<Option<SavedRun>> {
    let input = match input {
        Some(path) => path.to_path_buf(),
        None => find_input_file(&config.data_folder)?,
    };

    let pb = ui::new_spinner("Loading transactions...");
    let records = CsvTransactionSource::new(&input, config.columns.clone()).load();
    pb.finish_and_clear();
    let records = records?;

    println!(
        "Source: {}\n",
        ui::style_text(&input.display().to_string(), ui::StyleType::Subtle)
    );
    println!("{}", data::dataset_table(&DatasetSummary::from_records(&records)));

    let Some(run) = generate(config, &records)? else {
        println!(
            "\n{}",
            ui::style_text("No transactions in the current period.", ui::StyleType::Error)
        );
        return Ok(None);
    };

    ui::print_separator();
    println!("{}", display_run(&run));

    let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let saved = store.save(&run, &stamp)?;
    println!(
        "\nResults saved to: {}",
        ui::style_text(&saved.output.display().to_string(), ui::StyleType::TotalLabel)
    );
    if let Some(backup) = &saved.backup {
        println!("Backup copy: {}", backup.display());
    }
    Ok(Some(saved))
}

/// Splits `records` into windows and runs the recommendation pipeline.
/// Returns `None` when the current period holds no transactions.
pub fn generate(
    config: &AppConfig,
    records: &[TransactionRecord],
) -> Result<Option<RecommendationRun>> {
    let Windows {
        current,
        lookback,
        current_period,
        lookback_period,
    } = split_windows(records, &config.windows)?;

    if current.is_empty() {
        warn!("No transactions in the current period");
        return Ok(None);
    }
    if let (Some(cur), Some(hist)) = (current_period, lookback_period) {
        info!(
            current_from = %cur.start,
            current_to = %cur.end,
            lookback_from = %hist.start,
            current_rows = current.len(),
            lookback_rows = lookback.len(),
            "Scoring current period"
        );
    }

    let builder = RecommendationSetBuilder::new(config.pricing.clone());
    builder.build(&current, &lookback).map(Some)
}

/// Renders the summary statistics, the top recommendations and the
/// disabled-reason breakdown.
pub fn display_run(run: &RecommendationRun) -> String {
    let mut output = format!(
        "{}\n\n{}",
        ui::style_text("Recommendation summary", ui::StyleType::Title),
        summary_table(&run.summary)
    );

    let top = run.top_by_price(TOP_RECOMMENDATIONS);
    if !top.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Buyer"),
            ui::header_cell("Item"),
            ui::header_cell("Price"),
            ui::header_cell("Cost"),
            ui::header_cell("Margin"),
            ui::header_cell("Conversion"),
        ]);
        for rec in top {
            table.add_row(vec![
                Cell::new(&rec.buyer),
                Cell::new(rec.item.as_str()),
                ui::format_optional_cell(rec.price_rec, |p| format!("{p:.4}")),
                ui::format_optional_cell(rec.baseline_cost, |c| format!("{c:.4}")),
                ui::margin_cell(rec.target_margin),
                ui::number_cell(format!("{:.1}%", rec.conversion_rate * 100.0)),
            ]);
        }
        output.push_str(&format!(
            "\n\n{}\n\n{table}",
            ui::style_text(
                &format!("Top {TOP_RECOMMENDATIONS} recommendations"),
                ui::StyleType::Title
            )
        ));
    }

    let reasons = SummaryStats::disabled_by_reason(&run.recommendations);
    if !reasons.is_empty() {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Reason"), ui::header_cell("Items")]);
        for (reason, count) in reasons {
            table.add_row(vec![Cell::new(reason), ui::number_cell(count)]);
        }
        output.push_str(&format!(
            "\n\n{} ({})\n\n{table}",
            ui::style_text("Items to disable", ui::StyleType::Title),
            run.summary.disabled_items
        ));
    }

    output
}

pub fn summary_table(summary: &SummaryStats) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Metric"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("Total items"),
        ui::number_cell(summary.total_items),
    ]);
    table.add_row(vec![
        Cell::new("Enabled"),
        ui::number_cell(summary.enabled_items),
    ]);
    table.add_row(vec![
        Cell::new("Disabled"),
        ui::number_cell(summary.disabled_items),
    ]);
    table.add_row(vec![
        Cell::new("Avg recommended price"),
        ui::number_cell(format!("{:.4}", summary.avg_recommended_price)),
    ]);
    table.add_row(vec![
        Cell::new("Avg target margin"),
        ui::margin_cell(Some(summary.avg_target_margin)),
    ]);
    table.add_row(vec![
        Cell::new("Total profit"),
        ui::number_cell(format!("{:.2}", summary.total_profit)),
    ]);
    table
}
