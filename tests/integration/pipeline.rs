//! End-to-end runs: config → inventory → hunt → alerts → stats ledger.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use bundle_hunter::config::AppConfig;
use bundle_hunter::engine::accountant::StatsLedger;
use bundle_hunter::engine::hunter::Hunter;
use bundle_hunter::notify::{self, Alert, AlertSink, DispatchReport};
use bundle_hunter::storage;
use bundle_hunter::types::{Inventory, Platform};

use crate::mock_sink::CollectingSink;

const CONFIG: &str = r#"
    [hunter]
    name = "integration"

    [[bundles]]
    name = "Hero Team Plush Pack"
    items = ["GE Sonic Plush", "GE Tails Plush", "GE Knuckles Plush"]
    target_cost = 60.0
    resale_value = 120.0
    min_margin = 50.0

    [[bundles]]
    name = "Shadow & Rivals Collector Set"
    items = ["GE Shadow Plush", "GE Sonic Plush", "Boom8 Shadow Figure"]
    target_cost = 70.0
    resale_value = 145.0
    min_margin = 50.0

    [[bundles]]
    name = "Chaotix Set"
    items = ["GE Espio Plush", "GE Vector Plush"]
    target_cost = 50.0
    resale_value = 100.0
"#;

const INVENTORY: &str = r#"{
    "listings": [
        {"title": "GE Sonic Plush", "price": "$20.00", "platform": "eBay",
         "url": "https://example.com/sonic", "searchTerm": "sonic plush"},
        {"title": "GE Tails Plush", "priceNumeric": 18.0, "platform": "eBay",
         "url": "https://example.com/tails", "searchTerm": "tails plush"},
        {"title": "GE Knuckles Plush", "priceNumeric": 22.0, "platform": "ebay",
         "url": "https://example.com/knuckles", "searchTerm": "knuckles plush"},
        {"title": "GE Shadow Plush", "priceNumeric": 24.0, "platform": "eBay",
         "url": "https://example.com/shadow", "searchTerm": "shadow plush"},
        {"title": "Boom8 Shadow Figure", "price": "US $19.00", "platform": "Mercari",
         "url": "https://example.com/boom8", "searchTerm": "shadow figure"},
        {"title": "Sonic plush lot", "price": "make offer", "platform": "Facebook Marketplace",
         "url": "https://example.com/lot", "searchTerm": "sonic plush"}
    ]
}"#;

fn setup() -> (AppConfig, Hunter, Inventory) {
    let cfg = AppConfig::parse(CONFIG).unwrap();
    let hunter = Hunter::new(
        cfg.platform_registry(),
        cfg.profit_settings(),
        cfg.bundles.clone(),
    );
    let inventory: Inventory = serde_json::from_str(INVENTORY).unwrap();
    (cfg, hunter, inventory)
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
}

#[test]
fn test_full_run_classifies_everything() {
    let (_, hunter, inventory) = setup();
    let report = hunter.run(inventory);

    assert_eq!(report.stats.items_found, 6);
    // Distinct (platform, term) pairs: five terms on eBay/Mercari + one on Facebook.
    assert_eq!(report.stats.searches, 6);

    let sonic = &report.classified[0];
    assert!(sonic.analysis.profitable);
    assert_eq!(sonic.analysis.suggested_price, dec!(31.99));
    assert_eq!(sonic.analysis.net_profit.round_dp(2), dec!(9.09));

    let lot = &report.classified[5];
    assert!(!lot.analysis.profitable);
    assert_eq!(lot.listing.platform_kind(), Platform::Facebook);

    let potential: Decimal = report.profitable().map(|c| c.analysis.net_profit).sum();
    assert_eq!(report.stats.total_potential_profit, potential);
    assert_eq!(report.stats.profitable_deals, report.profitable().count() as u64);
}

#[test]
fn test_bundles_share_listings_and_skip_incomplete() {
    let (_, hunter, inventory) = setup();
    let report = hunter.run(inventory);

    let names: Vec<_> = report.bundles.iter().map(|b| b.bundle_name.as_str()).collect();
    assert_eq!(names, vec!["Hero Team Plush Pack", "Shadow & Rivals Collector Set"]);

    let hero = &report.bundles[0];
    assert_eq!(hero.total_cost, dec!(60));
    assert_eq!(hero.fees.total, dec!(23.90));
    assert_eq!(hero.net_profit, dec!(36.10));
    assert!(hero.viable);

    let shadow = &report.bundles[1];
    assert_eq!(shadow.total_cost, dec!(63));
    assert_eq!(shadow.net_profit, dec!(54.85));
    assert!(shadow.viable);
    assert!(shadow.meets_min_margin);

    // The same Sonic listing fills a slot in both bundles.
    assert_eq!(hero.matched_items[0].url, shadow.matched_items[1].url);
}

#[tokio::test]
async fn test_alerts_reach_sink_in_order() {
    let (_, hunter, inventory) = setup();
    let report = hunter.run(inventory);

    let sink = CollectingSink::new();
    let sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(sink.clone())];
    let alerts = report.alerts();
    let result = notify::dispatch(&alerts, &sinks).await;

    assert_eq!(result, DispatchReport { sent: alerts.len(), failed: 0 });
    let kinds = sink.kinds();
    let deals = report.profitable().count();
    assert!(kinds[..deals].iter().all(|k| *k == "deal"));
    assert_eq!(&kinds[deals..], &["bundle", "bundle"]);

    let received = sink.received();
    let first_bundle = &received[deals];
    match first_bundle {
        Alert::Bundle(b) => assert_eq!(b.bundle_name, "Hero Team Plush Pack"),
        other => panic!("expected bundle alert, got {}", other.kind()),
    }
    assert!(first_bundle.render().contains("Bundle: Hero Team Plush Pack"));
}

#[tokio::test]
async fn test_failing_sink_does_not_block_others() {
    let (_, hunter, inventory) = setup();
    let report = hunter.run(inventory);

    let broken = CollectingSink::new();
    broken.set_error("webhook unreachable");
    let healthy = CollectingSink::new();
    let sinks: Vec<Box<dyn AlertSink>> = vec![Box::new(broken.clone()), Box::new(healthy.clone())];

    let alerts = report.alerts();
    let result = notify::dispatch(&alerts, &sinks).await;

    assert_eq!(result.failed, alerts.len());
    assert_eq!(result.sent, alerts.len());
    assert!(broken.received().is_empty());
    assert_eq!(healthy.received().len(), alerts.len());
}

#[test]
fn test_runs_accumulate_in_ledger_and_survive_restart() {
    let (_, hunter, inventory) = setup();
    let first = hunter.run(inventory.clone());
    let second = hunter.run(inventory);

    let ledger = StatsLedger::new();
    ledger.record(day(9), &first.stats);
    let row = ledger.record(day(9), &second.stats);

    assert_eq!(row.totals.items_found, 12);
    assert_eq!(row.totals.searches, 12);
    assert_eq!(
        row.totals.total_potential_profit,
        first.stats.total_potential_profit * dec!(2)
    );

    let mut path = std::env::temp_dir();
    path.push(format!("hunter_it_stats_{}.json", uuid::Uuid::new_v4()));
    let path = path.to_string_lossy().to_string();

    storage::save_ledger(&ledger, &path).unwrap();
    let restored = storage::load_ledger(&path).unwrap().unwrap();
    restored.record(day(10), &first.stats);

    let week = restored.weekly(day(10));
    assert_eq!(week.days_recorded, 2);
    assert_eq!(week.totals.items_found, 18);

    storage::delete_file(&path).unwrap();
}

#[test]
fn test_price_band_filter() {
    let (cfg, _, inventory) = setup();
    let max = cfg.search.max_price_per_item;
    let in_band: Vec<_> = inventory
        .listings
        .iter()
        .filter(|l| l.within_price_band(max))
        .map(|l| l.title.as_str())
        .collect();
    // The unpriced lot is out; everything else is at or under $25.
    assert_eq!(in_band.len(), 5);
    assert!(!in_band.contains(&"Sonic plush lot"));
}
