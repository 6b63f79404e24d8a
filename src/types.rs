//! Shared types for the bundle hunter.
//!
//! These types form the data model used across all modules. Listings come
//! in from the acquisition side already normalized; everything else here is
//! derived from them and never mutates the listing it was derived from.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Marketplaces with a known fee and resale profile.
///
/// Anything that does not normalize to one of the named channels falls back
/// to `Other`, which carries the default profile.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ebay,
    Mercari,
    OfferUp,
    Facebook,
    Poshmark,
    Depop,
    Etsy,
    ShopGoodwill,
    #[serde(rename = "default")]
    #[default]
    Other,
}

impl Platform {
    /// Number of registry entries, including the default.
    pub const COUNT: usize = 9;

    /// All registry entries, in normalization order.
    pub const ALL: [Platform; Platform::COUNT] = [
        Platform::Ebay,
        Platform::Mercari,
        Platform::OfferUp,
        Platform::Facebook,
        Platform::Poshmark,
        Platform::Depop,
        Platform::Etsy,
        Platform::ShopGoodwill,
        Platform::Other,
    ];

    /// Normalize a free-text platform name ("eBay", "Facebook Marketplace",
    /// "shopgoodwill.com") by case-insensitive substring match.
    pub fn from_name(name: &str) -> Self {
        let name = name.to_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.needle().is_some_and(|needle| name.contains(needle)))
            .unwrap_or(Platform::Other)
    }

    /// Substring that identifies this platform in a raw name.
    fn needle(&self) -> Option<&'static str> {
        match self {
            Platform::Ebay => Some("ebay"),
            Platform::Mercari => Some("mercari"),
            Platform::OfferUp => Some("offer"),
            Platform::Facebook => Some("facebook"),
            Platform::Poshmark => Some("poshmark"),
            Platform::Depop => Some("depop"),
            Platform::Etsy => Some("etsy"),
            Platform::ShopGoodwill => Some("goodwill"),
            Platform::Other => None,
        }
    }

    /// Config key for this platform.
    pub fn key(&self) -> &'static str {
        match self {
            Platform::Ebay => "ebay",
            Platform::Mercari => "mercari",
            Platform::OfferUp => "offerup",
            Platform::Facebook => "facebook",
            Platform::Poshmark => "poshmark",
            Platform::Depop => "depop",
            Platform::Etsy => "etsy",
            Platform::ShopGoodwill => "shopgoodwill",
            Platform::Other => "default",
        }
    }

    /// Position in [`Platform::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Ebay => write!(f, "eBay"),
            Platform::Mercari => write!(f, "Mercari"),
            Platform::OfferUp => write!(f, "OfferUp"),
            Platform::Facebook => write!(f, "Facebook"),
            Platform::Poshmark => write!(f, "Poshmark"),
            Platform::Depop => write!(f, "Depop"),
            Platform::Etsy => write!(f, "Etsy"),
            Platform::ShopGoodwill => write!(f, "ShopGoodwill"),
            Platform::Other => write!(f, "Other"),
        }
    }
}

/// Exact (case-insensitive) config key lookup. Unlike [`Platform::from_name`]
/// this rejects unknown keys so typos in config surface as errors.
impl FromStr for Platform {
    type Err = HunterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.key() == key)
            .ok_or_else(|| HunterError::UnknownPlatform(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// One observed marketplace item, as handed over by the acquisition side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub title: String,
    /// Display price as scraped ("$19.99", "US $20.00").
    #[serde(default)]
    pub price: Option<String>,
    /// Parsed numeric price. Takes precedence over `price` when present.
    #[serde(default)]
    pub price_numeric: Option<Decimal>,
    /// Raw platform name as reported by the scraper.
    pub platform: String,
    pub url: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub search_term: String,
    /// When the listing was observed. Defaults to ingest time.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.buy_price() {
            Some(price) => write!(f, "[{}] {} (${:.2})", self.platform, self.title, price),
            None => write!(f, "[{}] {} (no price)", self.platform, self.title),
        }
    }
}

impl Listing {
    /// Normalized platform.
    pub fn platform_kind(&self) -> Platform {
        Platform::from_name(&self.platform)
    }

    /// Purchase price: the numeric field if set, otherwise the parsed
    /// display price. `None` when neither yields a number.
    pub fn buy_price(&self) -> Option<Decimal> {
        if let Some(price) = self.price_numeric {
            return Some(price);
        }
        self.price.as_deref().and_then(|text| parse_price(text).ok())
    }

    /// Whether the listing falls inside the searchable price band (0, max].
    pub fn within_price_band(&self, max_price: Decimal) -> bool {
        self.buy_price()
            .is_some_and(|price| price > Decimal::ZERO && price <= max_price)
    }

    /// Natural uniqueness key used by persistence: title + platform + price + timestamp.
    pub fn natural_key(&self) -> String {
        let price = self
            .buy_price()
            .map(|p| p.normalize().to_string())
            .unwrap_or_default();
        format!(
            "{}|{}|{}|{}",
            self.title,
            self.platform,
            price,
            self.timestamp.to_rfc3339()
        )
    }

    /// Helper to build a test listing with sensible defaults.
    #[cfg(test)]
    pub fn sample(title: &str, platform: &str, price: Decimal) -> Self {
        Listing {
            title: title.to_string(),
            price: Some(format!("${price:.2}")),
            price_numeric: Some(price),
            platform: platform.to_string(),
            url: format!("https://example.com/{}", title.to_lowercase().replace(' ', "-")),
            image: None,
            condition: None,
            search_term: title.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Parse a display price by stripping everything except digits and the
/// decimal point ("US $1,299.00" → 1299.00).
pub fn parse_price(text: &str) -> Result<Decimal, HunterError> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    Decimal::from_str(&cleaned).map_err(|_| HunterError::PriceParse(text.to_string()))
}

/// Round half away from zero to two places, the way prices are shown.
pub fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A batch of listings from one full search pass across all platforms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    /// Searches performed to collect this batch. When absent, the number of
    /// distinct (platform, search term) pairs is used instead.
    #[serde(default)]
    pub searches: Option<u64>,
    pub listings: Vec<Listing>,
}

impl Inventory {
    pub fn search_count(&self) -> u64 {
        self.searches.unwrap_or_else(|| {
            self.listings
                .iter()
                .map(|l| (l.platform_kind(), l.search_term.to_lowercase()))
                .collect::<HashSet<_>>()
                .len() as u64
        })
    }
}

// ---------------------------------------------------------------------------
// Fees and profit analysis
// ---------------------------------------------------------------------------

/// Itemized marketplace costs for selling at a given price.
///
/// Components are unrounded; `total` is their exact sum. Use [`rounded`]
/// only for display.
///
/// [`rounded`]: FeeBreakdown::rounded
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeBreakdown {
    pub platform: Platform,
    /// Percentage rate applied to the sale price (e.g. 13 for 13%).
    pub rate: Decimal,
    pub percentage_fee: Decimal,
    pub fixed_fee: Decimal,
    pub shipping_fee: Decimal,
    pub listing_fee: Decimal,
    pub platform_flat_fee: Decimal,
    pub total: Decimal,
}

impl FeeBreakdown {
    /// Recompute `total` from the components.
    pub fn recompute_total(&mut self) {
        self.total = self
            .percentage_fee
            .saturating_add(self.fixed_fee)
            .saturating_add(self.shipping_fee)
            .saturating_add(self.listing_fee)
            .saturating_add(self.platform_flat_fee);
    }

    /// Copy with every amount rounded to cents.
    pub fn rounded(&self) -> Self {
        Self {
            platform: self.platform,
            rate: self.rate,
            percentage_fee: round_cents(self.percentage_fee),
            fixed_fee: round_cents(self.fixed_fee),
            shipping_fee: round_cents(self.shipping_fee),
            listing_fee: round_cents(self.listing_fee),
            platform_flat_fee: round_cents(self.platform_flat_fee),
            total: round_cents(self.total),
        }
    }
}

impl fmt::Display for FeeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.rounded();
        write!(
            f,
            "{} fees ${} ({}%: ${} | fixed ${} | ship ${} | listing ${} | flat ${})",
            r.platform,
            r.total,
            r.rate.normalize(),
            r.percentage_fee,
            r.fixed_fee,
            r.shipping_fee,
            r.listing_fee,
            r.platform_flat_fee,
        )
    }
}

/// Profitability verdict for one listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitAnalysis {
    pub buy_price: Decimal,
    pub suggested_price: Decimal,
    pub gross_profit: Decimal,
    pub fees: FeeBreakdown,
    pub net_profit: Decimal,
    /// Net profit over buy price, in percent. Zero when buy price is zero.
    pub margin_percent: Decimal,
    pub profitable: bool,
    pub meets_minimum_margin: bool,
    pub meets_target_margin: bool,
}

impl ProfitAnalysis {
    /// Analysis for a listing whose price could not be determined.
    pub fn unpriced(platform: Platform) -> Self {
        Self {
            buy_price: Decimal::ZERO,
            suggested_price: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            fees: FeeBreakdown {
                platform,
                ..Default::default()
            },
            net_profit: Decimal::ZERO,
            margin_percent: Decimal::ZERO,
            profitable: false,
            meets_minimum_margin: false,
            meets_target_margin: false,
        }
    }
}

impl fmt::Display for ProfitAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "buy ${:.2} → sell ${:.2} | net ${:.2} ({:.1}%) | {}",
            self.buy_price,
            self.suggested_price,
            self.net_profit,
            self.margin_percent,
            if self.profitable { "PROFITABLE" } else { "pass" },
        )
    }
}

/// A listing together with its analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedListing {
    pub listing: Listing,
    pub analysis: ProfitAnalysis,
}

// ---------------------------------------------------------------------------
// Bundles
// ---------------------------------------------------------------------------

/// A named set of item slots sold together, from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleDefinition {
    pub name: String,
    /// Free-text match targets, one per slot, in slot order.
    pub items: Vec<String>,
    /// Ceiling on the summed purchase cost.
    pub target_cost: Decimal,
    /// Expected sale price of the complete bundle.
    pub resale_value: Decimal,
    /// Minimum net margin in percent.
    #[serde(default)]
    pub min_margin: Decimal,
}

/// A bundle for which every slot found at least one listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleOpportunity {
    pub id: Uuid,
    pub bundle_name: String,
    /// One listing per slot, in slot order.
    pub matched_items: Vec<Listing>,
    pub total_cost: Decimal,
    pub resale_value: Decimal,
    pub gross_profit: Decimal,
    /// Fees on the aggregate resale value.
    pub fees: FeeBreakdown,
    pub net_profit: Decimal,
    pub margin_percent: Decimal,
    pub net_margin_percent: Decimal,
    pub viable: bool,
    /// Net margin at or above the bundle's own `min_margin`. Informational.
    pub meets_min_margin: bool,
    pub found_at: DateTime<Utc>,
}

impl fmt::Display for BundleOpportunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: cost ${:.2} → ${:.2} | net ${:.2} ({:.1}%) | {}",
            self.bundle_name,
            self.total_cost,
            self.resale_value,
            self.net_profit,
            self.net_margin_percent,
            if self.viable { "VIABLE" } else { "TOO EXPENSIVE" },
        )
    }
}

// ---------------------------------------------------------------------------
// Run statistics
// ---------------------------------------------------------------------------

/// Counters accumulated over one run (or summed over a period).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunStats {
    pub searches: u64,
    pub items_found: u64,
    pub profitable_deals: u64,
    pub total_potential_profit: Decimal,
    pub purchases: u64,
    pub sales: u64,
    pub actual_profit: Decimal,
}

impl RunStats {
    /// Count one classified listing.
    pub fn record_analysis(&mut self, analysis: &ProfitAnalysis) {
        self.items_found += 1;
        if analysis.profitable {
            self.profitable_deals += 1;
            self.total_potential_profit += analysis.net_profit;
        }
    }

    pub fn record_purchase(&mut self) {
        self.purchases += 1;
    }

    pub fn record_sale(&mut self, net_profit: Decimal) {
        self.sales += 1;
        self.actual_profit += net_profit;
    }
}

impl AddAssign<&RunStats> for RunStats {
    fn add_assign(&mut self, rhs: &RunStats) {
        self.searches += rhs.searches;
        self.items_found += rhs.items_found;
        self.profitable_deals += rhs.profitable_deals;
        self.total_potential_profit += rhs.total_potential_profit;
        self.purchases += rhs.purchases;
        self.sales += rhs.sales;
        self.actual_profit += rhs.actual_profit;
    }
}

impl Add for RunStats {
    type Output = RunStats;

    fn add(mut self, rhs: RunStats) -> RunStats {
        self += &rhs;
        self
    }
}

impl<'a> Sum<&'a RunStats> for RunStats {
    fn sum<I: Iterator<Item = &'a RunStats>>(iter: I) -> Self {
        iter.fold(RunStats::default(), |mut acc, s| {
            acc += s;
            acc
        })
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "searches={} items={} profitable={} potential=${:.2} purchases={} sales={} actual=${:.2}",
            self.searches,
            self.items_found,
            self.profitable_deals,
            self.total_potential_profit,
            self.purchases,
            self.sales,
            self.actual_profit,
        )
    }
}

/// The stored row for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStats {
    pub date: NaiveDate,
    pub totals: RunStats,
}

/// Totals over a window of days, summed from the per-day rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// Days in the window that had a stored row.
    pub days_recorded: usize,
    pub totals: RunStats,
}

impl PeriodSummary {
    /// Average net profit per profitable deal over the window.
    pub fn avg_profit_per_deal(&self) -> Decimal {
        if self.totals.profitable_deals == 0 {
            return Decimal::ZERO;
        }
        self.totals.total_potential_profit / Decimal::from(self.totals.profitable_deals)
    }

    /// Share of found items that were profitable, in percent.
    pub fn hit_rate_percent(&self) -> Decimal {
        if self.totals.items_found == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.totals.profitable_deals) / Decimal::from(self.totals.items_found)
            * dec!(100)
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types.
#[derive(Debug, thiserror::Error)]
pub enum HunterError {
    #[error("Unparseable price: {0:?}")]
    PriceParse(String),

    #[error("Unknown platform key: {0}")]
    UnknownPlatform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
