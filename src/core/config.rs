use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Thresholds consumed by the price decision engine.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct PricingConfig {
    pub min_margin: f64,
    pub max_margin: f64,
    pub default_margin: f64,
    pub step_down_pct: f64,
    pub step_up_pct: f64,
    pub min_reqs_to_keep: u64,
    pub high_conversion_threshold: f64,
    pub low_conversion_threshold: f64,
    /// A low conversion rate only triggers a price cut above this many requests.
    pub low_conversion_min_reqs: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            min_margin: 0.10,
            max_margin: 0.45,
            default_margin: 0.15,
            step_down_pct: 0.05,
            step_up_pct: 0.03,
            min_reqs_to_keep: 10,
            high_conversion_threshold: 0.15,
            low_conversion_threshold: 0.05,
            low_conversion_min_reqs: 20,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub current_days: u32,
    pub lookback_weeks: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            current_days: 7,
            lookback_weeks: 8,
        }
    }
}

/// Raw CSV header names for each normalized transaction field.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ColumnMapping {
    pub date: String,
    pub buyer: String,
    pub supplier: String,
    pub country: String,
    pub service: String,
    pub sell_price: String,
    pub buy_price: String,
    pub quantity: String,
    pub profit: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        ColumnMapping {
            date: "dates".to_string(),
            buyer: "consumerName".to_string(),
            supplier: "producerName".to_string(),
            country: "countryName".to_string(),
            service: "webserviceName".to_string(),
            sell_price: "consumerAmount".to_string(),
            buy_price: "producerAmount".to_string(),
            quantity: "all_orders".to_string(),
            profit: "Profit".to_string(),
        }
    }
}

fn default_data_folder() -> PathBuf {
    PathBuf::from("data")
}

fn default_output_folder() -> PathBuf {
    PathBuf::from("output")
}

fn default_backup_folder() -> PathBuf {
    PathBuf::from("backup")
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_data_folder")]
    pub data_folder: PathBuf,
    #[serde(default = "default_output_folder")]
    pub output_folder: PathBuf,
    #[serde(default = "default_backup_folder")]
    pub backup_folder: PathBuf,
    #[serde(default)]
    pub windows: WindowConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub columns: ColumnMapping,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            data_folder: default_data_folder(),
            output_folder: default_output_folder(),
            backup_folder: default_backup_folder(),
            windows: WindowConfig::default(),
            pricing: PricingConfig::default(),
            columns: ColumnMapping::default(),
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, falling back to the
    /// built-in defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(path = %config_path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "repricer", "repricer")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
data_folder: "/srv/pricing/data"
output_folder: "/srv/pricing/out"
windows:
  current_days: 14
pricing:
  max_margin: 0.5
  min_reqs_to_keep: 25
columns:
  buyer: "client"
  profit: "margin_usd"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.data_folder, PathBuf::from("/srv/pricing/data"));
        assert_eq!(config.output_folder, PathBuf::from("/srv/pricing/out"));
        assert_eq!(config.backup_folder, PathBuf::from("backup"));

        assert_eq!(config.windows.current_days, 14);
        assert_eq!(config.windows.lookback_weeks, 8);

        assert_eq!(config.pricing.max_margin, 0.5);
        assert_eq!(config.pricing.min_reqs_to_keep, 25);
        assert_eq!(config.pricing.min_margin, 0.10);
        assert_eq!(config.pricing.step_down_pct, 0.05);

        assert_eq!(config.columns.buyer, "client");
        assert_eq!(config.columns.profit, "margin_usd");
        assert_eq!(config.columns.date, "dates");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pricing.high_conversion_threshold, 0.15);
        assert_eq!(config.pricing.low_conversion_threshold, 0.05);
        assert_eq!(config.pricing.default_margin, 0.15);
        assert_eq!(config.pricing.step_up_pct, 0.03);
        assert_eq!(config.pricing.low_conversion_min_reqs, 20);
    }

    #[test]
    fn test_load_from_missing_path_fails_with_context() {
        let err = AppConfig::load_from_path("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
