//! Splits a transaction history into the current and lookback periods.

use crate::core::config::WindowConfig;
use crate::core::transaction::TransactionRecord;
use anyhow::{Result, bail};
use chrono::{Duration, NaiveDateTime, NaiveTime};
use tracing::debug;

/// Half-open `[start, end)` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Period {
    pub fn contains(&self, ts: &NaiveDateTime) -> bool {
        *ts >= self.start && *ts < self.end
    }
}

#[derive(Debug, Clone, Default)]
pub struct Windows {
    pub current: Vec<TransactionRecord>,
    pub lookback: Vec<TransactionRecord>,
    pub current_period: Option<Period>,
    pub lookback_period: Option<Period>,
}

/// Partitions `records` relative to midnight of the latest record's day.
/// That day is only partially observed and belongs to neither period. The
/// lookback period ends where the current period starts, so the two never
/// overlap.
pub fn split_windows(records: &[TransactionRecord], config: &WindowConfig) -> Result<Windows> {
    let Some(latest) = records.iter().map(|r| r.timestamp).max() else {
        return Ok(Windows::default());
    };

    let anchor = latest.date().and_time(NaiveTime::MIN);
    let Some(current_start) =
        anchor.checked_sub_signed(Duration::days(i64::from(config.current_days)))
    else {
        bail!(
            "Current window of {} days is out of range",
            config.current_days
        );
    };
    let Some(lookback_start) =
        current_start.checked_sub_signed(Duration::weeks(i64::from(config.lookback_weeks)))
    else {
        bail!(
            "Lookback window of {} weeks is out of range",
            config.lookback_weeks
        );
    };

    let current_period = Period {
        start: current_start,
        end: anchor,
    };
    let lookback_period = Period {
        start: lookback_start,
        end: current_start,
    };

    let mut windows = Windows {
        current_period: Some(current_period),
        lookback_period: Some(lookback_period),
        ..Windows::default()
    };
    for record in records {
        if current_period.contains(&record.timestamp) {
            windows.current.push(record.clone());
        } else if lookback_period.contains(&record.timestamp) {
            windows.lookback.push(record.clone());
        }
    }

    debug!(
        current_rows = windows.current.len(),
        lookback_rows = windows.lookback.len(),
        current_start = %current_period.start,
        lookback_start = %lookback_period.start,
        "Split transaction windows"
    );
    Ok(windows)
}
