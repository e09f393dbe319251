//! `classify` command: run passes over a listing fixture

use std::fs;

use jb_core::{
    load_settings, EngineConfig, HostDocument, Listing, MemoryDocument, MemoryStore, PassReport, Reconciler,
    StoreValues,
};
use serde::Serialize;

use crate::runtime;

/// Final state of one fixture listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingOutcome {
    pub id: usize,
    pub company: Option<String>,
    pub hidden: bool,
    pub block_control: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResult {
    pub first_pass: PassReport,
    pub second_pass: PassReport,
    pub listings: Vec<ListingOutcome>,
}

pub fn load_config(path: Option<&str>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    EngineConfig::from_json(&text).map_err(|e| format!("Invalid config '{}': {}", path, e))
}

pub fn read_store_values(path: &str) -> Result<StoreValues, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid settings '{}': {}", path, e))
}

pub fn read_listings(path: &str) -> Result<Vec<Listing>, String> {
    let text = fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid listings '{}': {}", path, e))
}

/// Load settings through the store, then run two passes over the listings.
/// The second pass is expected to change nothing.
pub fn classify_fixture(
    config: &EngineConfig,
    values: StoreValues,
    listings: Vec<Listing>,
) -> Result<ClassifyResult, String> {
    let store = MemoryStore::with_values(values);
    let settings = runtime()?
        .block_on(load_settings(&store))
        .map_err(|e| format!("Failed to load settings: {}", e))?;

    let doc = MemoryDocument::from_listings(listings);
    let reconciler = Reconciler::new(&config.keywords);
    let first_pass = reconciler.run(&doc, &settings).unwrap_or_default();
    let second_pass = reconciler.run(&doc, &settings).unwrap_or_default();

    let listings = doc
        .candidates()
        .into_iter()
        .map(|id| ListingOutcome {
            id,
            company: doc.listing(id).and_then(|listing| listing.company),
            hidden: doc.is_hidden_id(id),
            block_control: doc.control_company(id),
        })
        .collect();

    Ok(ClassifyResult {
        first_pass,
        second_pass,
        listings,
    })
}

pub fn cmd_classify(settings: &str, listings: &str, config: Option<&str>, json: bool) -> Result<(), String> {
    let config = load_config(config)?;
    let values = read_store_values(settings)?;
    let listings = read_listings(listings)?;
    let result = classify_fixture(&config, values, listings)?;

    if json {
        let text = serde_json::to_string_pretty(&result).map_err(|e| format!("Failed to encode result: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    print_report("First pass", &result.first_pass);
    print_report("Second pass", &result.second_pass);
    println!();
    println!("Listings:");
    for listing in &result.listings {
        let status = if listing.hidden {
            "hidden"
        } else if listing.block_control.is_some() {
            "kept + control"
        } else {
            "kept"
        };
        println!(
            "  [{}] {:<30} {}",
            listing.id,
            listing.company.as_deref().unwrap_or("<no company>"),
            status
        );
    }

    Ok(())
}

fn print_report(label: &str, report: &PassReport) {
    println!("{}:", label);
    println!("  Scanned:     {}", report.scanned);
    println!("  Hidden:      {} (company: {}, status: {})", report.hidden(), report.hidden_by_company, report.hidden_by_status);
    println!("  Kept:        {}", report.kept);
    println!("  Skipped:     {} (already hidden: {})", report.skipped, report.already_hidden);
    println!("  Controls:    {}", report.controls_added);
}
