use super::{RecommendationStore, SavedRun};
use crate::core::recommendation::{Recommendation, RecommendationRun};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const OUTPUT_PREFIX: &str = "weekly_pricing_recos_";
pub const BACKUP_PREFIX: &str = "backup_";
pub const SUMMARY_PREFIX: &str = "weekly_pricing_summary_";

/// Writes each run as a CSV table into the output folder, plus an identical
/// copy into the backup folder and the summary statistics as JSON.
pub struct DiskStore {
    output_folder: PathBuf,
    backup_folder: PathBuf,
}

impl DiskStore {
    pub fn new(output_folder: impl Into<PathBuf>, backup_folder: impl Into<PathBuf>) -> Self {
        Self {
            output_folder: output_folder.into(),
            backup_folder: backup_folder.into(),
        }
    }

    pub fn output_folder(&self) -> &Path {
        &self.output_folder
    }

    /// Reads a recommendation table previously written by this store.
    pub fn load(path: &Path) -> Result<Vec<Recommendation>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open recommendations file: {}", path.display()))?;
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<Recommendation>, csv::Error>>()
            .with_context(|| format!("Failed to parse recommendations file: {}", path.display()))?;
        debug!(rows = rows.len(), path = %path.display(), "Loaded recommendations");
        Ok(rows)
    }

    /// Path of the newest output table, by file name.
    pub fn latest_output(&self) -> Result<Option<PathBuf>> {
        if !self.output_folder.exists() {
            return Ok(None);
        }
        let entries = fs::read_dir(&self.output_folder).with_context(|| {
            format!(
                "Failed to read output folder: {}",
                self.output_folder.display()
            )
        })?;

        let mut latest: Option<PathBuf> = None;
        for entry in entries {
            let path = entry?.path();
            let is_output = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(OUTPUT_PREFIX) && n.ends_with(".csv"));
            if is_output && latest.as_ref().is_none_or(|l| path > *l) {
                latest = Some(path);
            }
        }
        Ok(latest)
    }

    fn write_table(path: &Path, rows: &[Recommendation]) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create file: {}", path.display()))?;
        if rows.is_empty() {
            writer.write_record(COLUMNS)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(())
    }
}

/// Column order of the persisted table.
pub const COLUMNS: [&str; 14] = [
    "buyer_id",
    "item_id",
    "enabled",
    "price_rec",
    "baseline_cost",
    "target_margin",
    "reason",
    "reqs",
    "sales",
    "reqs_hist",
    "sales_hist",
    "conversion_rate",
    "conversion_rate_hist",
    "profit",
];

impl RecommendationStore for DiskStore {
    fn save(&self, run: &RecommendationRun, stamp: &str) -> Result<SavedRun> {
        for folder in [&self.output_folder, &self.backup_folder] {
            fs::create_dir_all(folder)
                .with_context(|| format!("Failed to create directory: {}", folder.display()))?;
        }

        let output = self.output_folder.join(format!("{OUTPUT_PREFIX}{stamp}.csv"));
        Self::write_table(&output, &run.recommendations)?;

        let backup = self.backup_folder.join(format!("{BACKUP_PREFIX}{stamp}.csv"));
        Self::write_table(&backup, &run.recommendations)?;

        let summary = self.output_folder.join(format!("{SUMMARY_PREFIX}{stamp}.json"));
        let file = fs::File::create(&summary)
            .with_context(|| format!("Failed to create file: {}", summary.display()))?;
        serde_json::to_writer_pretty(file, &run.summary)
            .with_context(|| format!("Failed to write file: {}", summary.display()))?;

        info!(output = %output.display(), backup = %backup.display(), "Saved recommendations");
        Ok(SavedRun {
            output,
            backup: Some(backup),
            summary: Some(summary),
        })
    }

    fn load_latest(&self) -> Result<Option<Vec<Recommendation>>> {
        match self.latest_output()? {
            Some(path) => Ok(Some(Self::load(&path)?)),
            None => Ok(None),
        }
    }
}
