//! Bundle matcher.
//!
//! For each bundle definition, picks the cheapest inventory listing for
//! every slot and prices the bundle as a whole. Selection is greedy per
//! bundle: the same listing can fill slots in several bundles at once, and
//! callers that need exclusive allocation have to post-process the result.
//!
//! Matching is deliberately loose. A listing fills a slot when its title
//! contains both of the first two words of the slot's target name. A slot
//! named with a single word matches nothing.

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::pricing::fees::FeeModel;
use crate::types::{BundleDefinition, BundleOpportunity, Listing};

#[derive(Debug, Clone, Default)]
pub struct BundleMatcher {
    fees: FeeModel,
}

impl BundleMatcher {
    pub fn new(fees: FeeModel) -> Self {
        Self { fees }
    }

    /// Match every bundle against the complete inventory for a run.
    ///
    /// Bundles with an unfilled slot are left out of the result entirely.
    pub fn match_bundles(
        &self,
        bundles: &[BundleDefinition],
        inventory: &[Listing],
    ) -> Vec<BundleOpportunity> {
        let opportunities: Vec<BundleOpportunity> = bundles
            .iter()
            .filter_map(|bundle| self.match_bundle(bundle, inventory))
            .collect();

        info!(
            bundles = bundles.len(),
            inventory = inventory.len(),
            complete = opportunities.len(),
            viable = opportunities.iter().filter(|o| o.viable).count(),
            "Bundle matching complete"
        );

        opportunities
    }

    /// Match a single bundle. `None` when any slot has no candidate.
    pub fn match_bundle(
        &self,
        bundle: &BundleDefinition,
        inventory: &[Listing],
    ) -> Option<BundleOpportunity> {
        if bundle.items.is_empty() {
            debug!(bundle = %bundle.name, "Bundle has no slots");
            return None;
        }

        let mut matched: Vec<(Listing, Decimal)> = Vec::with_capacity(bundle.items.len());
        for slot in &bundle.items {
            match cheapest_match(slot, inventory) {
                Some((listing, price)) => {
                    debug!(
                        bundle = %bundle.name,
                        slot = %slot,
                        title = %listing.title,
                        price = %price,
                        platform = %listing.platform,
                        "Slot filled"
                    );
                    matched.push((listing.clone(), price));
                }
                None => {
                    debug!(bundle = %bundle.name, slot = %slot, "Slot missing");
                    return None;
                }
            }
        }

        let Some(total_cost) = matched
            .iter()
            .try_fold(Decimal::ZERO, |acc, (_, price)| acc.checked_add(*price))
        else {
            warn!(bundle = %bundle.name, "Bundle cost outside computable range, skipping");
            return None;
        };
        let fees = self.fees.bundle_fees(bundle.resale_value);
        let gross_profit = bundle.resale_value.saturating_sub(total_cost);
        let net_profit = gross_profit.saturating_sub(fees.total);

        let margins = if total_cost > Decimal::ZERO {
            percent_of_cost(gross_profit, total_cost).zip(percent_of_cost(net_profit, total_cost))
        } else {
            Some((Decimal::ZERO, Decimal::ZERO))
        };

        let fraction = self.fees.settings().bundle_viability_fraction;
        let (margin_percent, net_margin_percent, viable, meets_min_margin) = match margins {
            Some((margin, net_margin)) => {
                let required = total_cost.checked_mul(fraction);
                let viable = total_cost <= bundle.target_cost
                    && required.is_some_and(|required| net_profit >= required);
                (margin, net_margin, viable, net_margin >= bundle.min_margin)
            }
            None => {
                warn!(
                    bundle = %bundle.name,
                    total_cost = %total_cost,
                    "Bundle margin outside computable range, marking not viable"
                );
                (Decimal::ZERO, Decimal::ZERO, false, false)
            }
        };

        info!(
            bundle = %bundle.name,
            total_cost = format!("${:.2}", total_cost),
            net_profit = format!("${:.2}", net_profit),
            net_margin = format!("{:.1}%", net_margin_percent),
            viable,
            "Bundle priced"
        );

        Some(BundleOpportunity {
            id: Uuid::new_v4(),
            bundle_name: bundle.name.clone(),
            matched_items: matched.into_iter().map(|(listing, _)| listing).collect(),
            total_cost,
            resale_value: bundle.resale_value,
            gross_profit,
            fees,
            net_profit,
            margin_percent,
            net_margin_percent,
            viable,
            meets_min_margin,
            found_at: Utc::now(),
        })
    }
}

/// `amount` as a percentage of `cost`, `None` on overflow.
fn percent_of_cost(amount: Decimal, cost: Decimal) -> Option<Decimal> {
    amount.checked_div(cost)?.checked_mul(dec!(100))
}

/// Lower-cased first two whitespace-separated words of a slot name.
pub fn slot_tokens(slot: &str) -> Vec<String> {
    slot.split_whitespace()
        .take(2)
        .map(str::to_lowercase)
        .collect()
}

/// Whether a title satisfies a slot.
pub fn slot_matches(tokens: &[String], title: &str) -> bool {
    if tokens.len() < 2 {
        return false;
    }
    let title = title.to_lowercase();
    tokens.iter().all(|t| title.contains(t.as_str()))
}

/// Cheapest listing filling `slot`, earliest in inventory order on ties.
/// Listings without a positive price are never candidates.
pub fn cheapest_match<'a>(slot: &str, inventory: &'a [Listing]) -> Option<(&'a Listing, Decimal)> {
    let tokens = slot_tokens(slot);
    let mut best: Option<(&Listing, Decimal)> = None;

    for listing in inventory {
        if !slot_matches(&tokens, &listing.title) {
            continue;
        }
        let Some(price) = listing.buy_price().filter(|p| *p > Decimal::ZERO) else {
            continue;
        };
        match best {
            Some((_, best_price)) if price >= best_price => {}
            _ => best = Some((listing, price)),
        }
    }

    best
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
