use super::ui;
use crate::core::config::AppConfig;
use crate::core::dataset::DatasetSummary;
use crate::core::transaction::TransactionSource;
use crate::sources::{CsvTransactionSource, util::find_input_file};
use anyhow::Result;
use comfy_table::{Cell, Table};
use std::path::Path;

const TOP_ITEMS: usize = 10;

/// Prints an overview of the transaction export without scoring it.
pub fn run(config: &AppConfig, input: Option<&Path>) -> Result<()> {
    let input = match input {
        Some(path) => path.to_path_buf(),
        None => find_input_file(&config.data_folder)?,
    };

    let pb = ui::new_spinner("Loading transactions...");
    let records = CsvTransactionSource::new(&input, config.columns.clone()).load();
    pb.finish_and_clear();
    let summary = DatasetSummary::from_records(&records?);

    println!(
        "{}\n{}\n",
        ui::style_text("Data summary", ui::StyleType::Title),
        ui::style_text(&input.display().to_string(), ui::StyleType::Subtle)
    );
    println!("{}", dataset_table(&summary));

    if !summary.items.is_empty() {
        println!(
            "\n{}\n\n{}",
            ui::style_text(&format!("Top {TOP_ITEMS} items by profit"), ui::StyleType::Title),
            top_items_table(&summary)
        );
    }
    Ok(())
}

pub fn dataset_table(summary: &DatasetSummary) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Dataset"), ui::header_cell("Value")]);

    let range = summary.date_range.map_or_else(
        || "N/A".to_string(),
        |(lo, hi)| format!("{} to {}", lo.date(), hi.date()),
    );
    table.add_row(vec![Cell::new("Total rows"), ui::number_cell(summary.total_rows)]);
    table.add_row(vec![Cell::new("Date range"), ui::number_cell(range)]);
    table.add_row(vec![Cell::new("Buyers"), ui::number_cell(summary.unique_buyers)]);
    table.add_row(vec![Cell::new("Suppliers"), ui::number_cell(summary.unique_suppliers)]);
    table.add_row(vec![Cell::new("Items"), ui::number_cell(summary.unique_items)]);
    table.add_row(vec![Cell::new("Countries"), ui::number_cell(summary.unique_countries)]);
    table.add_row(vec![Cell::new("Services"), ui::number_cell(summary.unique_services)]);
    table.add_row(vec![
        Cell::new("Total profit"),
        ui::number_cell(format!("{:.2}", summary.total_profit)),
    ]);
    table.add_row(vec![
        Cell::new("Avg sell price"),
        ui::number_cell(format!("{:.4}", summary.avg_sell_price)),
    ]);
    table.add_row(vec![
        Cell::new("Avg buy price"),
        ui::number_cell(format!("{:.4}", summary.avg_buy_price)),
    ]);
    table
}

fn top_items_table(summary: &DatasetSummary) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Item"),
        ui::header_cell("Requests"),
        ui::header_cell("Sales"),
        ui::header_cell("Profit"),
    ]);
    for (item, activity) in summary.top_items_by_profit(TOP_ITEMS) {
        table.add_row(vec![
            Cell::new(item.as_str()),
            ui::number_cell(activity.requests),
            ui::number_cell(format!("{:.0}", activity.sales)),
            ui::number_cell(format!("{:.2}", activity.profit)),
        ]);
    }
    table
}
