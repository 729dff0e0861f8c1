//! Core pricing logic and abstractions

pub mod baseline;
pub mod config;
pub mod conversion;
pub mod dataset;
pub mod decision;
pub mod log;
pub mod metrics;
pub mod recommendation;
pub mod stats;
pub mod transaction;
pub mod window;

// Re-export main types for cleaner imports
pub use baseline::{CostBaseline, CostBaselineTable};
pub use decision::{PriceDecisionEngine, Reason, Verdict};
pub use recommendation::{Recommendation, RecommendationRun, RecommendationSetBuilder, SummaryStats};
pub use transaction::{ItemId, TransactionRecord, TransactionSource};
