//! Persistence of recommendation tables.

pub mod disk;
pub mod memory;

use crate::core::recommendation::{Recommendation, RecommendationRun};
use anyhow::Result;
use std::path::PathBuf;

/// Where a saved run ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRun {
    pub output: PathBuf,
    pub backup: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

/// Durable storage for the recommendation table of a run.
pub trait RecommendationStore {
    /// Persists `run` under the run `stamp` (e.g. `20240131_235959`).
    fn save(&self, run: &RecommendationRun, stamp: &str) -> Result<SavedRun>;

    /// Loads the most recently saved table, if any.
    fn load_latest(&self) -> Result<Option<Vec<Recommendation>>>;
}
