//! Alert sink that writes to the tracing log.
//!
//! Always available; useful on its own for headless runs and as the
//! fallback when no chat channel is configured.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::notify::{Alert, AlertSink};
use crate::types::round_cents;

#[derive(Debug, Clone, Default)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AlertSink for LogSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        match alert {
            Alert::Deal(c) => info!(
                target: "bundle_hunter::alerts",
                title = %c.listing.title,
                platform = %c.listing.platform,
                net = %round_cents(c.analysis.net_profit),
                url = %c.listing.url,
                "Deal alert"
            ),
            Alert::Bundle(b) => info!(
                target: "bundle_hunter::alerts",
                bundle = %b.bundle_name,
                cost = %round_cents(b.total_cost),
                net = %round_cents(b.net_profit),
                items = b.matched_items.len(),
                "Bundle alert"
            ),
            Alert::DailySummary { row, .. } => info!(
                target: "bundle_hunter::alerts",
                date = %row.date,
                totals = %row.totals,
                "Daily summary"
            ),
            Alert::WeeklySummary(s) => info!(
                target: "bundle_hunter::alerts",
                from = %s.from,
                to = %s.to,
                totals = %s.totals,
                "Weekly summary"
            ),
        }
        info!(target: "bundle_hunter::alerts", "\n{}", alert.render());
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}
