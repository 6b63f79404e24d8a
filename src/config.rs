//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs. Every
//! section except the bundle list has defaults, and per-platform fee tables
//! only need the fields being overridden.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

use crate::pricing::{PlatformFeesOverride, PlatformRegistry, ProfitSettings};
use crate::types::{BundleDefinition, HunterError, Platform};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub hunter: HunterConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub profit: ProfitConfig,
    /// Per-platform fee overrides, keyed by platform key.
    #[serde(default)]
    pub fees: HashMap<Platform, PlatformFeesOverride>,
    /// Per-platform resale multiplier overrides.
    #[serde(default)]
    pub multipliers: HashMap<Platform, Decimal>,
    #[serde(default)]
    pub bundles: Vec<BundleDefinition>,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HunterConfig {
    pub name: String,
}

impl Default for HunterConfig {
    fn default() -> Self {
        Self {
            name: "bundle-hunter".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Listings above this price are dropped before analysis.
    pub max_price_per_item: Decimal,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_price_per_item: dec!(25),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProfitConfig {
    pub min_profit_margin: Decimal,
    pub target_profit_margin: Decimal,
    pub include_shipping_cost: bool,
    pub estimated_shipping_cost: Decimal,
    pub bundle_viability_fraction: Decimal,
}

impl Default for ProfitConfig {
    fn default() -> Self {
        let s = ProfitSettings::default();
        Self {
            min_profit_margin: s.min_profit_margin,
            target_profit_margin: s.target_profit_margin,
            include_shipping_cost: s.include_shipping_cost,
            estimated_shipping_cost: s.estimated_shipping_cost,
            bundle_viability_fraction: s.bundle_viability_fraction,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON inventory handed over by the acquisition side.
    pub inventory_path: String,
    /// JSON snapshot of the per-day stats ledger.
    pub stats_path: String,
    /// JSON store of analyses and bundle opportunities across runs.
    pub results_path: String,
    /// Stats rows and stored results older than this many days are pruned on save.
    pub max_history_days: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            inventory_path: "inventory.json".to_string(),
            stats_path: "hunter_stats.json".to_string(),
            results_path: "hunter_results.json".to_string(),
            max_history_days: 90,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertsConfig {
    pub log_alerts: bool,
    /// Day the weekly rollup is sent, 0 = Sunday through 6 = Saturday.
    pub weekly_report_day: u32,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            log_alerts: true,
            weekly_report_day: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse and validate configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<(), HunterError> {
        if self.search.max_price_per_item <= Decimal::ZERO {
            return Err(HunterError::Config(
                "search.max_price_per_item must be positive".to_string(),
            ));
        }
        if self.profit.estimated_shipping_cost < Decimal::ZERO {
            return Err(HunterError::Config(
                "profit.estimated_shipping_cost must not be negative".to_string(),
            ));
        }
        if self.profit.bundle_viability_fraction < Decimal::ZERO {
            return Err(HunterError::Config(
                "profit.bundle_viability_fraction must not be negative".to_string(),
            ));
        }
        if self.alerts.weekly_report_day > 6 {
            return Err(HunterError::Config(
                "alerts.weekly_report_day must be 0 (Sunday) to 6 (Saturday)".to_string(),
            ));
        }
        for bundle in &self.bundles {
            if bundle.items.is_empty() {
                return Err(HunterError::Config(format!(
                    "bundle '{}' has no items",
                    bundle.name
                )));
            }
        }
        Ok(())
    }

    pub fn profit_settings(&self) -> ProfitSettings {
        ProfitSettings {
            min_profit_margin: self.profit.min_profit_margin,
            target_profit_margin: self.profit.target_profit_margin,
            include_shipping_cost: self.profit.include_shipping_cost,
            estimated_shipping_cost: self.profit.estimated_shipping_cost,
            bundle_viability_fraction: self.profit.bundle_viability_fraction,
        }
    }

    pub fn platform_registry(&self) -> PlatformRegistry {
        PlatformRegistry::with_overrides(&self.fees, &self.multipliers)
    }
}
