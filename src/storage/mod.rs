//! Persistence layer.
//!
//! Reads the inventory handed over by the search side, saves/loads the
//! per-day stats ledger as a JSON snapshot, and upserts run results into a
//! keyed JSON store.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::engine::accountant::StatsLedger;
use crate::engine::hunter::HuntReport;
use crate::types::{BundleOpportunity, ClassifiedListing, HunterError, Inventory, PeriodStats};

/// Snapshot format written by this build.
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StatsSnapshot {
    version: u32,
    rows: Vec<PeriodStats>,
}

/// Save every ledger row to a JSON file, oldest first.
pub fn save_ledger(ledger: &StatsLedger, path: &str) -> Result<()> {
    let snapshot = StatsSnapshot {
        version: SNAPSHOT_VERSION,
        rows: ledger.rows(),
    };
    let json = serde_json::to_string_pretty(&snapshot)
        .context("Failed to serialise stats ledger")?;

    std::fs::write(path, &json)
        .context(format!("Failed to write stats to {path}"))?;

    debug!(path, rows = snapshot.rows.len(), "Stats saved");
    Ok(())
}

/// Load the stats ledger from a JSON file.
/// Returns None if the file doesn't exist (first run).
pub fn load_ledger(path: &str) -> Result<Option<StatsLedger>> {
    if !Path::new(path).exists() {
        info!(path, "No saved stats found, starting fresh");
        return Ok(None);
    }

    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read stats from {path}"))?;

    let snapshot: StatsSnapshot = serde_json::from_str(&json)
        .context(format!("Failed to parse stats from {path}"))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(HunterError::Storage(format!(
            "{path}: unsupported snapshot version {}",
            snapshot.version
        ))
        .into());
    }

    let rows = snapshot.rows.len();
    let ledger = StatsLedger::from_rows(snapshot.rows);
    if ledger.len() != rows {
        warn!(path, rows, kept = ledger.len(), "Duplicate days in snapshot were merged");
    }

    info!(path, days = ledger.len(), "Stats loaded from disk");
    Ok(Some(ledger))
}

/// Load one search pass worth of listings.
pub fn load_inventory(path: &str) -> Result<Inventory> {
    let json = std::fs::read_to_string(path)
        .context(format!("Failed to read inventory from {path}"))?;

    let inventory: Inventory = serde_json::from_str(&json)
        .context(format!("Failed to parse inventory from {path}"))?;

    info!(
        path,
        listings = inventory.listings.len(),
        searches = inventory.search_count(),
        "Inventory loaded"
    );
    Ok(inventory)
}

/// Stored analyses keyed by listing natural key, and bundle
/// opportunities keyed by id.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStore {
    pub analyses: BTreeMap<String, ClassifiedListing>,
    pub bundles: BTreeMap<String, BundleOpportunity>,
}

/// Upsert a run's analyses and complete bundles into the results file,
/// dropping entries observed before `cutoff`. Re-saving the same report
/// leaves the file unchanged.
pub fn save_results(
    report: &HuntReport,
    path: &str,
    cutoff: DateTime<Utc>,
) -> Result<ResultStore> {
    let mut store = if Path::new(path).exists() {
        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read results from {path}"))?;
        serde_json::from_str(&json)
            .context(format!("Failed to parse results from {path}"))?
    } else {
        ResultStore::default()
    };

    for c in &report.classified {
        store.analyses.insert(c.listing.natural_key(), c.clone());
    }
    for b in &report.bundles {
        store.bundles.insert(b.id.to_string(), b.clone());
    }

    let before = store.analyses.len() + store.bundles.len();
    store.analyses.retain(|_, c| c.listing.timestamp >= cutoff);
    store.bundles.retain(|_, b| b.found_at >= cutoff);
    let pruned = before - store.analyses.len() - store.bundles.len();
    if pruned > 0 {
        info!(path, pruned, cutoff = %cutoff, "Pruned old results");
    }

    let json = serde_json::to_string_pretty(&store)
        .context("Failed to serialise results")?;
    std::fs::write(path, &json)
        .context(format!("Failed to write results to {path}"))?;

    debug!(
        path,
        analyses = store.analyses.len(),
        bundles = store.bundles.len(),
        "Results saved"
    );
    Ok(store)
}

/// Delete a stored file (for testing or reset).
pub fn delete_file(path: &str) -> Result<()> {
    if Path::new(path).exists() {
        std::fs::remove_file(path)
            .context(format!("Failed to delete {path}"))?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RunStats;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn temp_path(stem: &str) -> String {
        let mut p = std::env::temp_dir();
        p.push(format!("hunter_test_{stem}_{}.json", uuid::Uuid::new_v4()));
        p.to_string_lossy().to_string()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn test_save_and_load_ledger() {
        let path = temp_path("stats");
        let ledger = StatsLedger::new();
        ledger.record(
            day(8),
            &RunStats {
                searches: 16,
                items_found: 40,
                profitable_deals: 2,
                total_potential_profit: dec!(18.40),
                ..Default::default()
            },
        );
        let mut sale = RunStats::default();
        sale.record_sale(dec!(12.50));
        ledger.record(day(9), &sale);

        save_ledger(&ledger, &path).unwrap();
        let loaded = load_ledger(&path).unwrap().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.rows(), ledger.rows());
        assert_eq!(loaded.get(day(8)).unwrap().totals.total_potential_profit, dec!(18.40));
        assert_eq!(loaded.get(day(9)).unwrap().totals.actual_profit, dec!(12.50));

        delete_file(&path).unwrap();
    }

    #[test]
    fn test_load_nonexistent() {
        let loaded = load_ledger("/tmp/hunter_nonexistent_stats_12345.json").unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn test_unsupported_version_rejected() {
        let path = temp_path("version");
        std::fs::write(&path, r#"{"version": 99, "rows": []}"#).unwrap();
        let err = load_ledger(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported snapshot version 99"));
        delete_file(&path).unwrap();
    }

    #[test]
    fn test_load_inventory() {
        let path = temp_path("inventory");
        std::fs::write(
            &path,
            r#"{
                "searches": 4,
                "listings": [
                    {
                        "title": "GE Sonic Plush",
                        "price": "$19.99",
                        "platform": "eBay",
                        "url": "https://example.com/1",
                        "searchTerm": "sonic plush"
                    },
                    {
                        "title": "GE Tails Plush",
                        "priceNumeric": 18.0,
                        "platform": "Mercari",
                        "url": "https://example.com/2"
                    }
                ]
            }"#,
        )
        .unwrap();

        let inventory = load_inventory(&path).unwrap();
        assert_eq!(inventory.search_count(), 4);
        assert_eq!(inventory.listings.len(), 2);
        assert_eq!(inventory.listings[0].buy_price(), Some(dec!(19.99)));
        assert_eq!(inventory.listings[1].buy_price(), Some(dec!(18)));

        delete_file(&path).unwrap();
    }

    #[test]
    fn test_load_inventory_missing_is_error() {
        assert!(load_inventory("/tmp/hunter_no_inventory_xyz.json").is_err());
    }

    fn hero_report() -> HuntReport {
        use crate::engine::hunter::Hunter;
        use crate::pricing::{PlatformRegistry, ProfitSettings};
        use crate::types::{BundleDefinition, Listing};

        let hunter = Hunter::new(
            PlatformRegistry::default(),
            ProfitSettings::default(),
            vec![BundleDefinition {
                name: "Hero Team Plush Pack".to_string(),
                items: vec!["GE Sonic Plush".to_string(), "GE Tails Plush".to_string()],
                target_cost: dec!(60),
                resale_value: dec!(120),
                min_margin: dec!(50),
            }],
        );
        hunter.run(Inventory {
            searches: Some(1),
            listings: vec![
                Listing::sample("GE Sonic Plush", "eBay", dec!(20)),
                Listing::sample("GE Tails Plush", "eBay", dec!(18)),
            ],
        })
    }

    fn days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - chrono::Duration::days(days)
    }

    #[test]
    fn test_save_results_upserts_by_key() {
        let path = temp_path("results");
        let report = hero_report();

        let first = save_results(&report, &path, days_ago(90)).unwrap();
        assert_eq!(first.analyses.len(), 2);
        assert_eq!(first.bundles.len(), 1);
        let again = save_results(&report, &path, days_ago(90)).unwrap();
        assert_eq!(again.analyses.len(), 2);
        assert_eq!(again.bundles.len(), 1);

        delete_file(&path).unwrap();
    }

    #[test]
    fn test_save_results_prunes_past_retention() {
        let path = temp_path("results_prune");

        let mut old = hero_report();
        for c in &mut old.classified {
            c.listing.timestamp = days_ago(120);
        }
        for b in &mut old.bundles {
            b.found_at = days_ago(120);
        }
        save_results(&old, &path, days_ago(365)).unwrap();

        // A later run gets a fresh bundle id every time; old entries go.
        let store = save_results(&hero_report(), &path, days_ago(90)).unwrap();
        assert_eq!(store.analyses.len(), 2);
        assert_eq!(store.bundles.len(), 1);
        assert!(store.bundles.values().all(|b| b.found_at >= days_ago(90)));
        assert!(store
            .analyses
            .values()
            .all(|c| c.listing.timestamp >= days_ago(90)));

        delete_file(&path).unwrap();
    }

    #[test]
    fn test_delete_nonexistent_ok() {
        assert!(delete_file("/tmp/hunter_does_not_exist_xyz.json").is_ok());
    }
}
