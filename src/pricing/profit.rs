//! Profitability classifier.
//!
//! Combines the fee model and the resale estimator into one verdict per
//! listing. Classification never fails: listings without a usable price
//! come back as non-profitable.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::pricing::fees::FeeModel;
use crate::pricing::resale::ResaleEstimator;
use crate::pricing::{PlatformRegistry, ProfitSettings};
use crate::types::{round_cents, ClassifiedListing, Listing, Platform, ProfitAnalysis};

/// Cushion over break-even used for the quick "worth listing at" price.
const BREAK_EVEN_CUSHION: Decimal = dec!(1.2);

/// Minimum resale price needed to cover purchase and fees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakEven {
    pub break_even_price: Decimal,
    pub fees_total: Decimal,
    /// Break-even plus a 20% cushion.
    pub target_price: Decimal,
}

/// Ranked view over a batch of classified listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSummary {
    pub total_items: usize,
    pub profitable_count: usize,
    /// Profitable listings, highest net profit first.
    pub by_profit: Vec<ClassifiedListing>,
    /// Profitable listings, highest margin first.
    pub by_margin: Vec<ClassifiedListing>,
    pub total_potential_profit: Decimal,
    /// Mean margin of the profitable listings; zero when there are none.
    pub avg_margin: Decimal,
}

#[derive(Debug, Clone)]
pub struct ProfitCalculator {
    fees: FeeModel,
    resale: ResaleEstimator,
}

impl ProfitCalculator {
    pub fn new(registry: PlatformRegistry, settings: ProfitSettings) -> Self {
        Self {
            resale: ResaleEstimator::new(registry.clone()),
            fees: FeeModel::new(registry, settings),
        }
    }

    pub fn fee_model(&self) -> &FeeModel {
        &self.fees
    }

    pub fn settings(&self) -> &ProfitSettings {
        self.fees.settings()
    }

    /// Classify one listing.
    pub fn classify(&self, listing: &Listing) -> ProfitAnalysis {
        let platform = listing.platform_kind();
        let Some(buy_price) = listing.buy_price() else {
            warn!(
                title = %listing.title,
                price = ?listing.price,
                platform = %listing.platform,
                "Listing has no usable price, skipping analysis"
            );
            return ProfitAnalysis::unpriced(platform);
        };

        let settings = self.settings();
        let fees = self.fees.fees_for(platform, buy_price);
        let Some((suggested_price, gross_profit, net_profit, margin_percent)) =
            self.economics(&listing.title, platform, buy_price, fees.total)
        else {
            warn!(
                title = %listing.title,
                price = %buy_price,
                platform = %listing.platform,
                "Listing price outside computable range, skipping analysis"
            );
            return ProfitAnalysis::unpriced(platform);
        };

        let priced = buy_price > Decimal::ZERO;
        let meets_minimum_margin = priced && margin_percent >= settings.min_profit_margin;
        let meets_target_margin = priced && margin_percent >= settings.target_profit_margin;
        let profitable = priced && net_profit > Decimal::ZERO && meets_minimum_margin;

        let analysis = ProfitAnalysis {
            buy_price,
            suggested_price,
            gross_profit,
            fees,
            net_profit,
            margin_percent,
            profitable,
            meets_minimum_margin,
            meets_target_margin,
        };

        debug!(
            target: "bundle_hunter::profit",
            title = %listing.title,
            platform = %platform,
            buy = %buy_price,
            suggested = %suggested_price,
            fees = %round_cents(analysis.fees.total),
            net = %round_cents(net_profit),
            margin = %margin_percent.round_dp(1),
            profitable,
            "Profit analysis"
        );

        if profitable {
            info!(
                target: "bundle_hunter::profit",
                title = %listing.title,
                platform = %platform,
                net = format!("${:.2}", net_profit),
                margin = format!("{:.1}%", margin_percent),
                "Profitable deal"
            );
        }

        analysis
    }

    /// Suggested price, gross, net and margin for a buy price. `None` when
    /// any step leaves the representable range.
    fn economics(
        &self,
        title: &str,
        platform: Platform,
        buy_price: Decimal,
        fees_total: Decimal,
    ) -> Option<(Decimal, Decimal, Decimal, Decimal)> {
        let suggested_price = self.resale.checked_estimate(title, platform, buy_price)?;
        let gross_profit = suggested_price.checked_sub(buy_price)?;
        let net_profit = gross_profit.checked_sub(fees_total)?;
        let margin_percent = if buy_price > Decimal::ZERO {
            net_profit.checked_div(buy_price)?.checked_mul(dec!(100))?
        } else {
            Decimal::ZERO
        };
        Some((suggested_price, gross_profit, net_profit, margin_percent))
    }

    /// Classify a listing and keep the pair together.
    pub fn classify_listing(&self, listing: Listing) -> ClassifiedListing {
        let analysis = self.classify(&listing);
        ClassifiedListing { listing, analysis }
    }

    /// Resale price needed to break even on a listing at its own price.
    pub fn break_even(&self, listing: &Listing) -> BreakEven {
        let buy_price = listing.buy_price().unwrap_or(Decimal::ZERO);
        let fees = self.fees.fees_for(listing.platform_kind(), buy_price);
        let break_even_price = buy_price.saturating_add(fees.total);
        BreakEven {
            break_even_price: round_cents(break_even_price),
            fees_total: round_cents(fees.total),
            target_price: round_cents(break_even_price.saturating_mul(BREAK_EVEN_CUSHION)),
        }
    }
}

impl Default for ProfitCalculator {
    fn default() -> Self {
        Self::new(PlatformRegistry::default(), ProfitSettings::default())
    }
}

/// Rank the profitable listings in a batch by net profit and by margin.
/// Ties keep input order.
pub fn summarize(classified: &[ClassifiedListing]) -> BulkSummary {
    let mut by_profit: Vec<ClassifiedListing> = classified
        .iter()
        .filter(|c| c.analysis.profitable)
        .cloned()
        .collect();
    by_profit.sort_by(|a, b| b.analysis.net_profit.cmp(&a.analysis.net_profit));

    let mut by_margin = by_profit.clone();
    by_margin.sort_by(|a, b| b.analysis.margin_percent.cmp(&a.analysis.margin_percent));

    let total_potential_profit: Decimal = by_profit.iter().map(|c| c.analysis.net_profit).sum();
    let avg_margin = if by_profit.is_empty() {
        Decimal::ZERO
    } else {
        by_profit.iter().map(|c| c.analysis.margin_percent).sum::<Decimal>()
            / Decimal::from(by_profit.len())
    };

    BulkSummary {
        total_items: classified.len(),
        profitable_count: by_profit.len(),
        by_profit,
        by_margin,
        total_potential_profit,
        avg_margin,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
