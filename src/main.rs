//! Bundle Hunter — secondhand collectible deal finder
//!
//! Entry point. Loads configuration, initialises structured logging,
//! restores the stats ledger from disk (or creates fresh), runs one hunt
//! over the inventory from the last search pass and reports the results.

use anyhow::{Context, Result};
use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::{error, info, warn};

use bundle_hunter::config;
use bundle_hunter::engine::accountant::StatsLedger;
use bundle_hunter::engine::hunter::{HuntReport, Hunter};
use bundle_hunter::notify::log::LogSink;
use bundle_hunter::notify::{self, Alert, AlertSink};
use bundle_hunter::storage;
use bundle_hunter::types::{round_cents, Inventory};

const BANNER: &str = r#"
  ___ _   _ _  _ ___  _    ___   _  _ _   _ _  _ _____ ___ ___
 | _ ) | | | \| |   \| |  | __| | || | | | | \| |_   _| __| _ \
 | _ \ |_| | .` | |) | |__| _|  | __ | |_| | .` | | | | _||   /
 |___/\___/|_|\_|___/|____|___| |_||_|\___/|_|\_| |_| |___|_|_\

  Secondhand collectible profit & bundle finder
"#;

const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path =
        std::env::var("HUNTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    init_logging();

    println!("{BANNER}");
    info!(
        name = %cfg.hunter.name,
        config = %config_path,
        bundles = cfg.bundles.len(),
        max_price = %cfg.search.max_price_per_item,
        "Bundle Hunter starting up"
    );

    // -- Restore or create the ledger --------------------------------------

    let ledger = match storage::load_ledger(&cfg.storage.stats_path)? {
        Some(ledger) => {
            info!(days = ledger.len(), "Resumed stats ledger");
            ledger
        }
        None => StatsLedger::new(),
    };

    // -- Hunt --------------------------------------------------------------

    let inventory = storage::load_inventory(&cfg.storage.inventory_path)
        .context("No inventory to analyse; run a search pass first")?;
    let inventory = filter_price_band(inventory, &cfg);

    let hunter = Hunter::new(
        cfg.platform_registry(),
        cfg.profit_settings(),
        cfg.bundles.clone(),
    );
    let report = hunter.run(inventory);
    log_top_deals(&report);

    let retention = Duration::days(cfg.storage.max_history_days);
    let results_cutoff = chrono::Utc::now() - retention;
    if let Err(e) = storage::save_results(&report, &cfg.storage.results_path, results_cutoff) {
        error!(error = %e, "Failed to save results");
    }

    // -- Alerts ------------------------------------------------------------

    let mut sinks: Vec<Box<dyn AlertSink>> = Vec::new();
    if cfg.alerts.log_alerts {
        sinks.push(Box::new(LogSink::new()));
    }
    if sinks.is_empty() {
        warn!("No alert sinks enabled, results are only in the run log");
    }

    let sent = notify::dispatch(&report.alerts(), &sinks).await;
    info!(sent = sent.sent, failed = sent.failed, "Run alerts dispatched");

    // -- Stats -------------------------------------------------------------

    let today = Local::now().date_naive();
    let row = ledger.record(today, &report.stats);

    ledger.prune_before(today - retention);

    if let Err(e) = storage::save_ledger(&ledger, &cfg.storage.stats_path) {
        error!(error = %e, "Failed to save stats");
    }

    let mut summaries = vec![Alert::DailySummary {
        row,
        platforms: report.platform_breakdown(),
    }];
    if is_weekly_report_day(today, cfg.alerts.weekly_report_day) {
        summaries.push(Alert::WeeklySummary(ledger.weekly(today)));
    }
    notify::dispatch(&summaries, &sinks).await;

    info!(
        items = report.stats.items_found,
        deals = report.stats.profitable_deals,
        potential = format!("${:.2}", round_cents(report.stats.total_potential_profit)),
        viable_bundles = report.viable_bundles().count(),
        "Bundle Hunter finished."
    );

    Ok(())
}

/// Drop listings outside the configured price band before analysis.
fn filter_price_band(mut inventory: Inventory, cfg: &config::AppConfig) -> Inventory {
    let max_price = cfg.search.max_price_per_item;
    let before = inventory.listings.len();
    inventory.listings.retain(|l| {
        let keep = l.within_price_band(max_price);
        if !keep {
            warn!(title = %l.title, price = ?l.price, max = %max_price, "Listing outside price band, skipped");
        }
        keep
    });
    let dropped = before - inventory.listings.len();
    if dropped > 0 {
        info!(dropped, kept = inventory.listings.len(), "Price band filter applied");
    }
    inventory
}

/// `report_day` counts from Sunday = 0.
fn is_weekly_report_day(date: NaiveDate, report_day: u32) -> bool {
    date.weekday().num_days_from_sunday() == report_day
}

/// Log the five best deals by net profit.
fn log_top_deals(report: &HuntReport) {
    let summary = report.summary();
    for (rank, c) in summary.by_profit.iter().take(5).enumerate() {
        info!(
            rank = rank + 1,
            title = %c.listing.title,
            platform = %c.listing.platform,
            net = format!("${:.2}", round_cents(c.analysis.net_profit)),
            margin = format!("{:.1}%", c.analysis.margin_percent.round_dp(1)),
            "Top deal"
        );
    }
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("bundle_hunter=info"));

    let json_logging = std::env::var("HUNTER_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
