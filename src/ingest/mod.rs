// src/ingest/mod.rs
#[cfg(feature = "browser")]
pub mod browser;
pub mod coordinator;
pub mod extract;
pub mod fetcher;
pub mod http;
pub mod page;
pub mod providers;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

/// One-time metrics registration so series show up in whatever recorder the host installs.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_listings_extracted_total",
            "Listing candidates extracted from source pages."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that failed navigation or extraction."
        );
        describe_histogram!("ingest_source_ms", "Wall time per source in milliseconds.");
        describe_counter!(
            "store_new_listings_total",
            "Listings that were new to the store on merge."
        );
        describe_counter!("notify_errors_total", "Failed notification deliveries.");
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the pipeline last completed a run."
        );
    });
}

/// Normalize scraped text: decode entities, fold quotes, collapse whitespace, trim.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 3) Collapse whitespace (NBSP included)
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"[\s\u{00A0}]+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap: 300 chars
    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }

    out
}
