//! Fee model.
//!
//! Maps (platform, sale price) to an itemized fee breakdown. Unknown
//! platforms never fail; they get the default 10% profile.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::pricing::{PlatformRegistry, ProfitSettings};
use crate::types::{FeeBreakdown, Platform};

/// Platform used for the aggregate resale of a bundle.
pub const BUNDLE_RESALE_PLATFORM: Platform = Platform::Ebay;

#[derive(Debug, Clone)]
pub struct FeeModel {
    registry: PlatformRegistry,
    settings: ProfitSettings,
}

impl FeeModel {
    pub fn new(registry: PlatformRegistry, settings: ProfitSettings) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &ProfitSettings {
        &self.settings
    }

    /// Fees for selling at `price` on a platform given by raw name.
    pub fn compute_fees(&self, platform: &str, price: Decimal) -> FeeBreakdown {
        self.fees_for(Platform::from_name(platform), price)
    }

    /// Fees for selling at `price` on a normalized platform.
    pub fn fees_for(&self, platform: Platform, price: Decimal) -> FeeBreakdown {
        let schedule = &self.registry.profile(platform).fees;

        let percentage_fee = percent_of(price, schedule.percentage);

        let shipping_fee = if schedule.shipping_included && self.settings.include_shipping_cost {
            self.settings.estimated_shipping_cost
        } else if let Some(pct) = schedule.shipping_percentage {
            percent_of(price, pct)
        } else {
            Decimal::ZERO
        };

        let platform_flat_fee = match schedule.flat_fee {
            Some(flat) if price < flat.below => flat.amount,
            _ => Decimal::ZERO,
        };

        let mut fees = FeeBreakdown {
            platform,
            rate: schedule.percentage,
            percentage_fee,
            fixed_fee: schedule.fixed,
            shipping_fee,
            listing_fee: schedule.listing_fee,
            platform_flat_fee,
            total: Decimal::ZERO,
        };
        fees.recompute_total();
        fees
    }

    /// Fees for reselling a whole bundle at `resale_value`.
    ///
    /// Bundles go out through [`BUNDLE_RESALE_PLATFORM`] and always pay the
    /// estimated shipping cost, whatever the platform's shipping flags say.
    pub fn bundle_fees(&self, resale_value: Decimal) -> FeeBreakdown {
        let mut fees = self.fees_for(BUNDLE_RESALE_PLATFORM, resale_value);
        fees.shipping_fee = self.settings.estimated_shipping_cost;
        fees.recompute_total();
        fees
    }
}

/// `pct` percent of `amount`, saturating at the edges of the range.
fn percent_of(amount: Decimal, pct: Decimal) -> Decimal {
    match amount.checked_mul(pct) {
        Some(scaled) => scaled / dec!(100),
        None => (amount / dec!(100)).saturating_mul(pct),
    }
}

impl Default for FeeModel {
    fn default() -> Self {
        Self::new(PlatformRegistry::default(), ProfitSettings::default())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
