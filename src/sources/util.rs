use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lists `*.csv` files directly inside `folder`, sorted by file name.
pub fn list_csv_files(folder: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("Failed to read data folder: {}", folder.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to list data folder: {}", folder.display()))?
            .path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();
    debug!(count = files.len(), folder = %folder.display(), "Found CSV files");
    Ok(files)
}

/// Picks the input file for a run: the first CSV file in `folder`.
pub fn find_input_file(folder: &Path) -> Result<PathBuf> {
    match list_csv_files(folder)?.into_iter().next() {
        Some(path) => Ok(path),
        None => bail!(
            "No CSV files found in {}. Put transaction exports there and run again.",
            folder.display()
        ),
    }
}
