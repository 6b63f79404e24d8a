//! Outbound alerts.
//!
//! The engine produces [`Alert`]s; delivery (chat, email, spreadsheets)
//! belongs to [`AlertSink`] implementations. A sink failure is logged and
//! counted, never allowed to fail the run.

pub mod log;

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use std::fmt::Write as _;
use tracing::{debug, warn};

use crate::engine::hunter::PlatformBreakdown;
use crate::types::{round_cents, BundleOpportunity, ClassifiedListing, PeriodStats, PeriodSummary};

/// Something worth telling a human about.
#[derive(Debug, Clone)]
pub enum Alert {
    /// A profitable listing.
    Deal(ClassifiedListing),
    /// A viable bundle.
    Bundle(BundleOpportunity),
    DailySummary {
        row: PeriodStats,
        platforms: Vec<PlatformBreakdown>,
    },
    WeeklySummary(PeriodSummary),
}

impl Alert {
    /// Short kind tag for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Alert::Deal(_) => "deal",
            Alert::Bundle(_) => "bundle",
            Alert::DailySummary { .. } => "daily",
            Alert::WeeklySummary(_) => "weekly",
        }
    }

    /// Human-readable message body.
    pub fn render(&self) -> String {
        match self {
            Alert::Deal(c) => render_deal(c),
            Alert::Bundle(b) => render_bundle(b),
            Alert::DailySummary { row, platforms } => render_daily(row, platforms),
            Alert::WeeklySummary(s) => render_weekly(s),
        }
    }
}

/// Percent to one place, half away from zero.
fn round_percent(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
}

fn margin_badge(margin: Decimal) -> &'static str {
    if margin >= dec!(50) {
        "🔥"
    } else if margin >= dec!(30) {
        "💰"
    } else {
        "💵"
    }
}

fn render_deal(c: &ClassifiedListing) -> String {
    let (l, a) = (&c.listing, &c.analysis);
    format!(
        "{badge} PROFITABLE DEAL FOUND\n\n\
         {title}\n\n\
         Price: ${buy:.2}\n\
         Resale: ${sell:.2}\n\
         Margin: {margin:.1}%\n\
         Net Profit: ${net:.2}\n\n\
         Platform: {platform}\n\
         {url}\n",
        badge = margin_badge(a.margin_percent),
        title = l.title,
        buy = round_cents(a.buy_price),
        sell = round_cents(a.suggested_price),
        margin = round_percent(a.margin_percent),
        net = round_cents(a.net_profit),
        platform = l.platform,
        url = l.url,
    )
}

fn render_bundle(b: &BundleOpportunity) -> String {
    let mut items = String::new();
    for (i, item) in b.matched_items.iter().enumerate() {
        let _ = writeln!(items, "{}. {}", i + 1, item);
    }
    format!(
        "🎁 BUNDLE OPPORTUNITY\n\n\
         Bundle: {name}\n\
         {verdict}\n\n\
         Total Cost: ${cost:.2}\n\
         Resale Value: ${resale:.2}\n\
         Net Profit: ${net:.2}\n\
         Net Margin: {margin:.1}%\n\n\
         Items:\n{items}",
        name = b.bundle_name,
        verdict = if b.viable { "✅ VIABLE" } else { "⚠️ CHECK MARGINS" },
        cost = round_cents(b.total_cost),
        resale = round_cents(b.resale_value),
        net = round_cents(b.net_profit),
        margin = round_percent(b.net_margin_percent),
        items = items,
    )
}

fn render_daily(row: &PeriodStats, platforms: &[PlatformBreakdown]) -> String {
    let mut breakdown = String::new();
    for p in platforms {
        let _ = writeln!(
            breakdown,
            "  • {}: {} items, {} profitable",
            p.platform, p.item_count, p.profitable_count
        );
    }
    let s = &row.totals;
    format!(
        "📊 Daily Summary ({date})\n\n\
         Searches: {searches}\n\
         Items Found: {items}\n\
         Profitable Deals: {deals}\n\
         Potential Profit: ${profit:.2}\n\n\
         Platforms:\n{breakdown}",
        date = row.date,
        searches = s.searches,
        items = s.items_found,
        deals = s.profitable_deals,
        profit = round_cents(s.total_potential_profit),
        breakdown = breakdown,
    )
}

fn render_weekly(summary: &PeriodSummary) -> String {
    let s = &summary.totals;
    format!(
        "📈 Weekly Report ({from} – {to})\n\n\
         Searches: {searches}\n\
         Items Found: {items}\n\
         Profitable Deals: {deals}\n\
         Potential Profit: ${profit:.2}\n\
         Purchases: {purchases}\n\
         Sales: {sales}\n\
         Actual Profit: ${actual:.2}\n",
        from = summary.from,
        to = summary.to,
        searches = s.searches,
        items = s.items_found,
        deals = s.profitable_deals,
        profit = round_cents(s.total_potential_profit),
        purchases = s.purchases,
        sales = s.sales,
        actual = round_cents(s.actual_profit),
    )
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Abstraction over alert delivery channels.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert.
    async fn send(&self, alert: &Alert) -> Result<()>;

    /// Sink name for logging.
    fn name(&self) -> &str;
}

/// Outcome of pushing a batch of alerts through the sinks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

/// Send every alert to every sink, in order.
pub async fn dispatch(alerts: &[Alert], sinks: &[Box<dyn AlertSink>]) -> DispatchReport {
    let mut report = DispatchReport::default();
    for alert in alerts {
        for sink in sinks {
            match sink.send(alert).await {
                Ok(()) => {
                    debug!(sink = sink.name(), kind = alert.kind(), "Alert sent");
                    report.sent += 1;
                }
                Err(e) => {
                    warn!(sink = sink.name(), kind = alert.kind(), error = %e, "Alert delivery failed");
                    report.failed += 1;
                }
            }
        }
    }
    report
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::profit::ProfitCalculator;
    use crate::types::{Listing, Platform, RunStats};
    use anyhow::anyhow;
    use chrono::NaiveDate;

    fn deal() -> Alert {
        let listing = Listing::sample("GE Sonic Plush", "eBay", dec!(20));
        Alert::Deal(ProfitCalculator::default().classify_listing(listing))
    }

    #[test]
    fn test_render_deal_fields() {
        let text = deal().render();
        assert!(text.contains("GE Sonic Plush"));
        assert!(text.contains("Price: $20.00"));
        assert!(text.contains("Resale: $31.99"));
        assert!(text.contains("Margin: 45.5%"));
        assert!(text.contains("Net Profit: $9.09"));
        assert!(text.contains("Platform: eBay"));
        assert!(text.contains("https://example.com/ge-sonic-plush"));
        assert!(text.starts_with("💰"));
    }

    #[test]
    fn test_render_daily_lists_platforms() {
        let alert = Alert::DailySummary {
            row: PeriodStats {
                date: NaiveDate::from_ymd_opt(2025, 3, 9).unwrap(),
                totals: RunStats {
                    searches: 16,
                    items_found: 40,
                    profitable_deals: 3,
                    total_potential_profit: dec!(27.5),
                    ..Default::default()
                },
            },
            platforms: vec![PlatformBreakdown {
                platform: Platform::Mercari,
                item_count: 12,
                profitable_count: 1,
                avg_net_profit: dec!(1.10),
            }],
        };
        let text = alert.render();
        assert!(text.contains("2025-03-09"));
        assert!(text.contains("Searches: 16"));
        assert!(text.contains("Potential Profit: $27.50"));
        assert!(text.contains("Mercari: 12 items, 1 profitable"));
        assert_eq!(alert.kind(), "daily");
    }

    #[tokio::test]
    async fn test_dispatch_counts_failures_without_stopping() {
        let mut ok = MockAlertSink::new();
        ok.expect_send().times(2).returning(|_| Ok(()));
        ok.expect_name().return_const("ok".to_string());

        let mut broken = MockAlertSink::new();
        broken.expect_send().times(2).returning(|_| Err(anyhow!("chat API down")));
        broken.expect_name().return_const("broken".to_string());

        let sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(broken), Box::new(ok)];
        let report = dispatch(&[deal(), deal()], &sinks).await;

        assert_eq!(report, DispatchReport { sent: 2, failed: 2 });
    }

    #[tokio::test]
    async fn test_dispatch_nothing_to_send() {
        let mut sink = MockAlertSink::new();
        sink.expect_send().never();
        let sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(sink)];
        assert_eq!(dispatch(&[], &sinks).await, DispatchReport::default());
    }
}
