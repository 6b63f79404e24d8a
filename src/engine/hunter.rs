//! Hunt run orchestration.
//!
//! One run takes the complete inventory from a search pass, classifies every
//! listing, then (and only then) matches bundles against the full set. The
//! result carries everything the persistence, notification, and reporting
//! collaborators need.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

use crate::engine::matcher::BundleMatcher;
use crate::notify::Alert;
use crate::pricing::profit::{summarize, BulkSummary, ProfitCalculator};
use crate::pricing::{PlatformRegistry, ProfitSettings};
use crate::types::{
    round_cents, BundleDefinition, BundleOpportunity, ClassifiedListing, Inventory, Platform,
    RunStats,
};

/// Per-platform counts for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformBreakdown {
    pub platform: Platform,
    pub item_count: usize,
    pub profitable_count: usize,
    pub avg_net_profit: Decimal,
}

/// Everything produced by one run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntReport {
    /// Every listing with its analysis, in inventory order.
    pub classified: Vec<ClassifiedListing>,
    /// Bundles whose every slot was filled, in definition order.
    pub bundles: Vec<BundleOpportunity>,
    /// Delta for the run aggregator.
    pub stats: RunStats,
    pub finished_at: DateTime<Utc>,
}

impl HuntReport {
    pub fn profitable(&self) -> impl Iterator<Item = &ClassifiedListing> {
        self.classified.iter().filter(|c| c.analysis.profitable)
    }

    pub fn viable_bundles(&self) -> impl Iterator<Item = &BundleOpportunity> {
        self.bundles.iter().filter(|b| b.viable)
    }

    /// Alerts for the notification side: profitable deals, then viable bundles.
    pub fn alerts(&self) -> Vec<Alert> {
        self.profitable()
            .map(|c| Alert::Deal(c.clone()))
            .chain(self.viable_bundles().map(|b| Alert::Bundle(b.clone())))
            .collect()
    }

    pub fn summary(&self) -> BulkSummary {
        summarize(&self.classified)
    }

    /// Item and profit counts per platform, busiest platform first.
    pub fn platform_breakdown(&self) -> Vec<PlatformBreakdown> {
        let mut groups: BTreeMap<Platform, Vec<&ClassifiedListing>> = BTreeMap::new();
        for c in &self.classified {
            groups.entry(c.listing.platform_kind()).or_default().push(c);
        }

        let mut breakdown: Vec<PlatformBreakdown> = groups
            .into_iter()
            .map(|(platform, items)| {
                let total: Decimal = items.iter().map(|c| c.analysis.net_profit).sum();
                PlatformBreakdown {
                    platform,
                    item_count: items.len(),
                    profitable_count: items.iter().filter(|c| c.analysis.profitable).count(),
                    avg_net_profit: round_cents(total / Decimal::from(items.len())),
                }
            })
            .collect();
        breakdown.sort_by(|a, b| b.item_count.cmp(&a.item_count));
        breakdown
    }
}

/// Runs the classify → match pipeline over a complete inventory.
#[derive(Debug, Clone)]
pub struct Hunter {
    calculator: ProfitCalculator,
    matcher: BundleMatcher,
    bundles: Vec<BundleDefinition>,
}

impl Hunter {
    pub fn new(
        registry: PlatformRegistry,
        settings: ProfitSettings,
        bundles: Vec<BundleDefinition>,
    ) -> Self {
        let calculator = ProfitCalculator::new(registry, settings);
        let matcher = BundleMatcher::new(calculator.fee_model().clone());
        Self {
            calculator,
            matcher,
            bundles,
        }
    }

    pub fn calculator(&self) -> &ProfitCalculator {
        &self.calculator
    }

    pub fn bundles(&self) -> &[BundleDefinition] {
        &self.bundles
    }

    /// Process one complete inventory.
    pub fn run(&self, inventory: Inventory) -> HuntReport {
        let mut stats = RunStats {
            searches: inventory.search_count(),
            ..Default::default()
        };

        let classified: Vec<ClassifiedListing> = inventory
            .listings
            .into_iter()
            .map(|listing| self.calculator.classify_listing(listing))
            .collect();
        for c in &classified {
            stats.record_analysis(&c.analysis);
        }

        let listings: Vec<_> = classified.iter().map(|c| c.listing.clone()).collect();
        let bundles = self.matcher.match_bundles(&self.bundles, &listings);

        info!(
            searches = stats.searches,
            items = stats.items_found,
            profitable = stats.profitable_deals,
            potential = format!("${:.2}", stats.total_potential_profit),
            bundles = bundles.len(),
            viable_bundles = bundles.iter().filter(|b| b.viable).count(),
            "Hunt complete"
        );

        HuntReport {
            classified,
            bundles,
            stats,
            finished_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
