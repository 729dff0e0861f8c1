use crate::core::config::ColumnMapping;
use crate::core::transaction::{ItemId, TransactionRecord, TransactionSource};
use anyhow::{Context, Result, bail};
use chrono::{NaiveDate, NaiveDateTime};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DATETIME_FORMATS: [&str; 3] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reads transaction exports from a CSV file, renaming columns through a
/// [`ColumnMapping`].
pub struct CsvTransactionSource {
    path: PathBuf,
    columns: ColumnMapping,
}

impl CsvTransactionSource {
    pub fn new(path: impl AsRef<Path>, columns: ColumnMapping) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            columns,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TransactionSource for CsvTransactionSource {
    fn load(&self) -> Result<Vec<TransactionRecord>> {
        info!(path = %self.path.display(), "Loading transactions");
        let file = std::fs::File::open(&self.path)
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;
        let parsed = parse_transactions(file, &self.columns)
            .with_context(|| format!("Failed to read CSV file: {}", self.path.display()))?;
        info!(rows = parsed.records.len(), "Loaded transactions");
        Ok(parsed.records)
    }
}

#[derive(Debug, Default)]
pub struct ParsedTransactions {
    pub records: Vec<TransactionRecord>,
    pub dropped: usize,
}

/// Header positions of every mapped column. Optional columns may be absent.
struct ColumnIndex {
    date: usize,
    buyer: usize,
    country: usize,
    service: usize,
    supplier: Option<usize>,
    sell_price: Option<usize>,
    buy_price: Option<usize>,
    quantity: Option<usize>,
    profit: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, columns: &ColumnMapping) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);

        let required = [
            &columns.date,
            &columns.buyer,
            &columns.country,
            &columns.service,
        ];
        let missing: Vec<&str> = required
            .iter()
            .filter(|name| find(name.as_str()).is_none())
            .map(|name| name.as_str())
            .collect();
        if !missing.is_empty() {
            let available: Vec<&str> = headers.iter().collect();
            bail!(
                "Missing required columns {:?}; available columns: {:?}",
                missing,
                available
            );
        }

        let optional = |name: &str| {
            let idx = find(name);
            if idx.is_none() {
                warn!(column = name, "Optional column missing, values treated as absent");
            }
            idx
        };

        Ok(ColumnIndex {
            date: find(&columns.date).unwrap_or_default(),
            buyer: find(&columns.buyer).unwrap_or_default(),
            country: find(&columns.country).unwrap_or_default(),
            service: find(&columns.service).unwrap_or_default(),
            supplier: optional(&columns.supplier),
            sell_price: optional(&columns.sell_price),
            buy_price: optional(&columns.buy_price),
            quantity: optional(&columns.quantity),
            profit: optional(&columns.profit),
        })
    }
}

/// Parses CSV rows into normalized records.
///
/// Rows with an unparseable date, or missing either the country or the
/// service, are dropped and counted. Unparseable numbers become absent values.
pub fn parse_transactions<R: Read>(
    reader: R,
    columns: &ColumnMapping,
) -> Result<ParsedTransactions> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().context("Failed to read CSV header")?.clone();
    let index = ColumnIndex::resolve(&headers, columns)?;

    let mut parsed = ParsedTransactions::default();
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("Malformed CSV row {}", line + 2))?;
        let field = |idx: usize| row.get(idx).unwrap_or("");
        let optional_field = |idx: Option<usize>| idx.and_then(|i| row.get(i)).unwrap_or("");

        let Some(timestamp) = parse_timestamp(field(index.date)) else {
            debug!(line = line + 2, value = field(index.date), "Dropping row with invalid date");
            parsed.dropped += 1;
            continue;
        };

        let country = field(index.country);
        let service = field(index.service);
        if country.is_empty() || service.is_empty() {
            debug!(line = line + 2, "Dropping row without a complete item key");
            parsed.dropped += 1;
            continue;
        }

        parsed.records.push(TransactionRecord {
            timestamp,
            buyer: field(index.buyer).to_string(),
            supplier: optional_field(index.supplier).to_string(),
            item: ItemId::new(country, service),
            sell_price: parse_number(optional_field(index.sell_price)),
            buy_price: parse_number(optional_field(index.buy_price)),
            quantity: parse_number(optional_field(index.quantity)).unwrap_or(0.0),
            profit: parse_number(optional_field(index.profit)).unwrap_or(0.0),
        });
    }

    if parsed.dropped > 0 {
        warn!(
            dropped = parsed.dropped,
            kept = parsed.records.len(),
            "Dropped rows with invalid data"
        );
    }
    Ok(parsed)
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_number(value: &str) -> Option<f64> {
    value.parse::<f64>().ok().filter(|v| v.is_finite())
}
