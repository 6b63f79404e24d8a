//! Pricing engine — fee model, resale estimation, and profitability.
//!
//! Every platform-dependent number lives in one [`PlatformRegistry`]: a
//! fixed table from [`Platform`] to a fee schedule and a resale multiplier.
//! Config can override individual fields; the table is immutable after that.

pub mod fees;
pub mod profit;
pub mod resale;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::HashMap;

use crate::types::Platform;

// ---------------------------------------------------------------------------
// Platform profiles
// ---------------------------------------------------------------------------

/// Flat marketplace fee charged only on low-priced sales.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatFee {
    pub amount: Decimal,
    /// Applies when the sale price is strictly below this.
    pub below: Decimal,
}

/// Seller-side fee schedule for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformFees {
    /// Percent of the sale price (13 means 13%).
    pub percentage: Decimal,
    /// Per-order fixed fee.
    pub fixed: Decimal,
    /// Seller covers shipping; charged as the estimated shipping cost.
    pub shipping_included: bool,
    /// Percent of the sale price charged against shipping/processing.
    pub shipping_percentage: Option<Decimal>,
    /// Per-listing fee.
    pub listing_fee: Decimal,
    pub flat_fee: Option<FlatFee>,
}

impl PlatformFees {
    /// A plain percentage + fixed schedule.
    pub fn simple(percentage: Decimal, fixed: Decimal) -> Self {
        Self {
            percentage,
            fixed,
            shipping_included: false,
            shipping_percentage: None,
            listing_fee: Decimal::ZERO,
            flat_fee: None,
        }
    }
}

/// Everything the pricing engine knows about one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformProfile {
    pub platform: Platform,
    pub fees: PlatformFees,
    /// Typical realized markup when reselling on this channel.
    pub resale_multiplier: Decimal,
}

impl PlatformProfile {
    /// Built-in profile for a platform.
    pub fn default_for(platform: Platform) -> Self {
        let (fees, resale_multiplier) = match platform {
            Platform::Ebay => (PlatformFees::simple(dec!(13), dec!(0.30)), dec!(1.6)),
            Platform::Mercari => (
                PlatformFees {
                    shipping_included: true,
                    ..PlatformFees::simple(dec!(10), dec!(0.50))
                },
                dec!(1.4),
            ),
            Platform::OfferUp => (PlatformFees::simple(dec!(12.9), Decimal::ZERO), dec!(1.3)),
            Platform::Facebook => (PlatformFees::simple(dec!(5), Decimal::ZERO), dec!(1.5)),
            Platform::Poshmark => (
                PlatformFees {
                    flat_fee: Some(FlatFee {
                        amount: dec!(2.95),
                        below: dec!(15),
                    }),
                    ..PlatformFees::simple(dec!(20), Decimal::ZERO)
                },
                dec!(1.4),
            ),
            Platform::Depop => (
                PlatformFees {
                    shipping_percentage: Some(dec!(3.3)),
                    ..PlatformFees::simple(dec!(10), Decimal::ZERO)
                },
                dec!(1.35),
            ),
            Platform::Etsy => (
                PlatformFees {
                    listing_fee: dec!(0.20),
                    ..PlatformFees::simple(dec!(6.5), dec!(0.25))
                },
                dec!(1.5),
            ),
            Platform::ShopGoodwill => (
                PlatformFees {
                    shipping_included: true,
                    ..PlatformFees::simple(dec!(10), Decimal::ZERO)
                },
                dec!(1.8),
            ),
            Platform::Other => (PlatformFees::simple(dec!(10), Decimal::ZERO), dec!(1.5)),
        };
        Self {
            platform,
            fees,
            resale_multiplier,
        }
    }
}

/// Per-field fee overrides from config. Unset fields keep the built-in value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformFeesOverride {
    pub percentage: Option<Decimal>,
    pub fixed: Option<Decimal>,
    pub shipping_included: Option<bool>,
    pub shipping_percentage: Option<Decimal>,
    pub listing_fee: Option<Decimal>,
    pub flat_fee: Option<Decimal>,
    pub flat_fee_below: Option<Decimal>,
}

impl PlatformFeesOverride {
    fn apply(&self, fees: &mut PlatformFees) {
        if let Some(v) = self.percentage {
            fees.percentage = v;
        }
        if let Some(v) = self.fixed {
            fees.fixed = v;
        }
        if let Some(v) = self.shipping_included {
            fees.shipping_included = v;
        }
        if let Some(v) = self.shipping_percentage {
            fees.shipping_percentage = Some(v);
        }
        if let Some(v) = self.listing_fee {
            fees.listing_fee = v;
        }
        match (self.flat_fee, self.flat_fee_below, fees.flat_fee) {
            (Some(amount), Some(below), _) => fees.flat_fee = Some(FlatFee { amount, below }),
            (Some(amount), None, Some(existing)) => {
                fees.flat_fee = Some(FlatFee { amount, ..existing })
            }
            (None, Some(below), Some(existing)) => {
                fees.flat_fee = Some(FlatFee { below, ..existing })
            }
            _ => {}
        }
    }
}

/// Immutable table of platform profiles, one per [`Platform`] variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformRegistry {
    profiles: [PlatformProfile; Platform::COUNT],
}

impl Default for PlatformRegistry {
    fn default() -> Self {
        Self {
            profiles: Platform::ALL.map(PlatformProfile::default_for),
        }
    }
}

impl PlatformRegistry {
    /// Built-in profiles with config overrides layered on top.
    pub fn with_overrides(
        fees: &HashMap<Platform, PlatformFeesOverride>,
        multipliers: &HashMap<Platform, Decimal>,
    ) -> Self {
        let mut registry = Self::default();
        for profile in registry.profiles.iter_mut() {
            if let Some(ov) = fees.get(&profile.platform) {
                ov.apply(&mut profile.fees);
            }
            if let Some(m) = multipliers.get(&profile.platform) {
                profile.resale_multiplier = *m;
            }
        }
        registry
    }

    pub fn profile(&self, platform: Platform) -> &PlatformProfile {
        &self.profiles[platform.index()]
    }

    /// Profile for a raw platform name, normalized by substring match.
    pub fn lookup(&self, name: &str) -> &PlatformProfile {
        self.profile(Platform::from_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlatformProfile> {
        self.profiles.iter()
    }
}

// ---------------------------------------------------------------------------
// Profit settings
// ---------------------------------------------------------------------------

/// Global thresholds shared by the classifier and the bundle matcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfitSettings {
    /// Minimum net margin (percent) for a listing to count as profitable.
    pub min_profit_margin: Decimal,
    /// Margin (percent) that marks a deal as hitting target.
    pub target_profit_margin: Decimal,
    /// Charge estimated shipping on platforms where the seller pays it.
    pub include_shipping_cost: bool,
    pub estimated_shipping_cost: Decimal,
    /// A bundle is viable only if net profit ≥ total cost × this fraction.
    pub bundle_viability_fraction: Decimal,
}

impl Default for ProfitSettings {
    fn default() -> Self {
        Self {
            min_profit_margin: dec!(30),
            target_profit_margin: dec!(50),
            include_shipping_cost: true,
            estimated_shipping_cost: dec!(8),
            bundle_viability_fraction: dec!(0.3),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
