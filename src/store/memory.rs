use super::{RecommendationStore, SavedRun};
use crate::core::recommendation::{Recommendation, RecommendationRun};
use anyhow::{Result, anyhow};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::debug;

/// In-memory store keyed by run stamp.
#[derive(Default)]
pub struct MemoryStore {
    runs: Mutex<BTreeMap<String, Vec<Recommendation>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.runs.lock().map(|runs| runs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecommendationStore for MemoryStore {
    fn save(&self, run: &RecommendationRun, stamp: &str) -> Result<SavedRun> {
        let mut runs = self
            .runs
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        debug!(stamp, rows = run.recommendations.len(), "Storing run in memory");
        runs.insert(stamp.to_string(), run.recommendations.clone());
        Ok(SavedRun {
            output: PathBuf::from(format!("memory://{stamp}")),
            backup: None,
            summary: None,
        })
    }

    fn load_latest(&self) -> Result<Option<Vec<Recommendation>>> {
        let runs = self
            .runs
            .lock()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;
        Ok(runs.values().next_back().cloned())
    }
}
