//! Resale price estimation.
//!
//! Suggested price = buy price × (platform multiplier + keyword adjustments),
//! charm-priced to the next whole dollar minus a cent, with a minimum
//! absolute markup over the buy price.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::pricing::PlatformRegistry;
use crate::types::{round_cents, Listing, Platform};

/// Additive multiplier adjustments keyed on title keywords. Every matching
/// group applies once.
pub const KEYWORD_ADJUSTMENTS: &[(&[&str], Decimal)] = &[
    (&["rare", "limited", "exclusive"], dec!(0.3)),
    (&["bundle", "lot"], dec!(0.2)),
    (&["vintage", "retro"], dec!(0.25)),
    (&["sealed", "new", "mint"], dec!(0.2)),
    (&["damaged", "broken", "missing"], dec!(-0.4)),
];

/// Suggested price never sits closer than this to the buy price.
pub const MIN_MARKUP: Decimal = dec!(5);

const CHARM_OFFSET: Decimal = dec!(0.01);

#[derive(Debug, Clone, Default)]
pub struct ResaleEstimator {
    registry: PlatformRegistry,
}

impl ResaleEstimator {
    pub fn new(registry: PlatformRegistry) -> Self {
        Self { registry }
    }

    /// Suggested resale price for a listing at its own buy price.
    /// Unpriced listings estimate from zero.
    pub fn estimate_resale_price(&self, listing: &Listing) -> Decimal {
        let buy_price = listing.buy_price().unwrap_or(Decimal::ZERO);
        self.estimate(&listing.title, listing.platform_kind(), buy_price)
    }

    /// Suggested resale price for a title on a platform at `buy_price`.
    /// A price too large to scale is estimated at the buy price itself.
    pub fn estimate(&self, title: &str, platform: Platform, buy_price: Decimal) -> Decimal {
        self.checked_estimate(title, platform, buy_price)
            .unwrap_or(buy_price)
    }

    /// As [`estimate`](Self::estimate), but `None` when the arithmetic
    /// leaves the representable range.
    pub fn checked_estimate(
        &self,
        title: &str,
        platform: Platform,
        buy_price: Decimal,
    ) -> Option<Decimal> {
        let multiplier = self.multiplier(title, platform);
        let charm = buy_price
            .checked_mul(multiplier)?
            .ceil()
            .checked_sub(CHARM_OFFSET)?;
        let floor = buy_price.checked_add(MIN_MARKUP)?;
        Some(round_cents(charm.max(floor)))
    }

    /// Final multiplier: platform base plus every matching keyword group,
    /// clamped at zero.
    pub fn multiplier(&self, title: &str, platform: Platform) -> Decimal {
        let base = self.registry.profile(platform).resale_multiplier;
        (base + keyword_adjustment(title)).max(Decimal::ZERO)
    }
}

/// Sum of keyword adjustments that apply to `title` (case-insensitive
/// substring match).
pub fn keyword_adjustment(title: &str) -> Decimal {
    let title = title.to_lowercase();
    KEYWORD_ADJUSTMENTS
        .iter()
        .filter(|(words, _)| words.iter().any(|w| title.contains(w)))
        .map(|(_, delta)| *delta)
        .sum()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> ResaleEstimator {
        ResaleEstimator::default()
    }

    #[test]
    fn test_ebay_plain_title() {
        let listing = Listing::sample("GE Sonic Plush", "eBay", dec!(20));
        assert_eq!(estimator().multiplier("GE Sonic Plush", Platform::Ebay), dec!(1.6));
        assert_eq!(estimator().estimate_resale_price(&listing), dec!(31.99));
    }

    #[test]
    fn test_charm_price_below_floor_is_forced_up() {
        // 10 × 1.5 = 15 → 14.99, which is under 10 + 5
        let listing = Listing::sample("Sonic Plush", "Craigslist", dec!(10));
        assert_eq!(estimator().estimate_resale_price(&listing), dec!(15.00));
    }

    #[test]
    fn test_charm_rounds_up_fractional() {
        // 17 × 1.6 = 27.2 → 28 − 0.01
        let est = estimator().estimate("Shadow figure", Platform::Ebay, dec!(17));
        assert_eq!(est, dec!(27.99));
    }

    #[test]
    fn test_keywords_are_cumulative() {
        // 1.4 + 0.3 (rare) + 0.25 (vintage) + 0.2 (lot) = 2.15
        let title = "Rare Vintage Sonic lot";
        assert_eq!(estimator().multiplier(title, Platform::Mercari), dec!(2.15));
        assert_eq!(estimator().estimate(title, Platform::Mercari, dec!(10)), dec!(21.99));
    }

    #[test]
    fn test_keyword_group_applies_once() {
        assert_eq!(keyword_adjustment("RARE LIMITED EXCLUSIVE"), dec!(0.3));
        assert_eq!(keyword_adjustment("Sealed mint"), dec!(0.2));
        assert_eq!(keyword_adjustment("Shadow plush"), Decimal::ZERO);
    }

    #[test]
    fn test_damaged_lowers_multiplier_and_floor_holds() {
        // 1.6 − 0.4 = 1.2 → 24 → 23.99, floor is 25
        let est = estimator().estimate("Broken Sonic figure", Platform::Ebay, dec!(20));
        assert_eq!(est, dec!(25));
    }

    #[test]
    fn test_shopgoodwill_premium() {
        let est = estimator().estimate("Knuckles plush", Platform::ShopGoodwill, dec!(12));
        // 12 × 1.8 = 21.6 → 21.99
        assert_eq!(est, dec!(21.99));
    }

    #[test]
    fn test_monotonic_in_buy_price() {
        let est = estimator();
        let titles = ["GE Sonic Plush", "damaged lot", "rare sealed vintage bundle"];
        for platform in Platform::ALL {
            for title in titles {
                let mut prev = est.estimate(title, platform, Decimal::ZERO);
                let mut price = Decimal::ZERO;
                while price <= dec!(40) {
                    let next = est.estimate(title, platform, price);
                    assert!(next >= prev, "{title} on {platform} dropped at {price}");
                    prev = next;
                    price += dec!(0.37);
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let listing = Listing::sample("Limited GE Shadow Plush", "Poshmark", dec!(14.50));
        let a = estimator().estimate_resale_price(&listing);
        let b = estimator().estimate_resale_price(&listing);
        assert_eq!(a, b);
    }

    #[test]
    fn test_unpriced_listing_estimates_from_zero() {
        let mut listing = Listing::sample("GE Sonic Plush", "eBay", dec!(20));
        listing.price_numeric = None;
        listing.price = None;
        assert_eq!(estimator().estimate_resale_price(&listing), MIN_MARKUP);
    }

    #[test]
    fn test_extreme_prices_do_not_panic() {
        let est = estimator();
        assert_eq!(est.checked_estimate("GE Sonic Plush", Platform::Ebay, Decimal::MAX), None);
        assert_eq!(est.estimate("GE Sonic Plush", Platform::Ebay, Decimal::MAX), Decimal::MAX);

        let tiny = Decimal::new(1, 28);
        assert_eq!(est.estimate("GE Sonic Plush", Platform::Ebay, tiny), dec!(5));
    }
}
