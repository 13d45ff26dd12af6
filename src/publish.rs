// src/publish.rs
//! Static page summarizing the current store snapshot. Regenerated in full
//! on every publishing run.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::path::Path;

use crate::fsutil::write_atomic;
use crate::ingest::types::Listing;

pub const EMPTY_PLACEHOLDER: &str =
    "No listings fetched yet. Waiting for the next scan...";

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="tr">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Live Listing Tracker</title>
    <style>
        body { font-family: 'Segoe UI', sans-serif; background: #f4f7f9; color: #333; margin: 0; padding: 20px; }
        .container { max-width: 1000px; margin: auto; }
        h1 { color: #2c3e50; text-align: center; }
        .update-time { text-align: center; color: #7f8c8d; font-size: 0.9em; margin-bottom: 20px; }
        .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(300px, 1fr)); gap: 20px; }
        .card { background: white; padding: 20px; border-radius: 12px; box-shadow: 0 4px 6px rgba(0,0,0,0.1); border-top: 5px solid #3498db; }
        .price { font-size: 1.5em; font-weight: bold; color: #e67e22; margin-bottom: 10px; }
        .title { font-size: 1em; height: 50px; overflow: hidden; margin-bottom: 15px; font-weight: 600; }
        .source { font-size: 0.8em; color: #7f8c8d; margin-bottom: 10px; text-transform: uppercase; }
        .btn { display: block; text-align: center; background: #3498db; color: white; text-decoration: none; padding: 10px; border-radius: 5px; font-weight: bold; }
        .btn:hover { background: #2980b9; }
        .empty { text-align: center; color: #7f8c8d; }
    </style>
</head>
<body>
    <div class="container">
        <h1>Listing Tracker</h1>
        <p class="update-time">Last update: {{updated}} &middot; {{count}} listings</p>
        {{body}}
    </div>
</body>
</html>
"#;

fn render_card(l: &Listing) -> String {
    let location = l
        .location
        .as_deref()
        .map(|loc| format!(" &middot; {}", encode_text(loc)))
        .unwrap_or_default();
    format!(
        r#"
            <div class="card">
                <div class="price">{price}</div>
                <div class="title">{title}</div>
                <div class="source">{source}{location}</div>
                <a href="{link}" target="_blank" rel="noopener" class="btn">Open listing</a>
            </div>"#,
        price = encode_text(&l.price),
        title = encode_text(&l.title),
        source = l.source,
        location = location,
        link = encode_double_quoted_attribute(&l.link),
    )
}

/// Render the page for `listings` in store order.
pub fn render_page(listings: &[Listing], updated: DateTime<Local>) -> String {
    let body = if listings.is_empty() {
        format!(r#"<p class="empty">{EMPTY_PLACEHOLDER}</p>"#)
    } else {
        let cards: String = listings.iter().map(render_card).collect();
        format!(r#"<div class="grid">{cards}
        </div>"#)
    };
    PAGE_TEMPLATE
        .replace("{{updated}}", &updated.format("%d/%m/%Y %H:%M").to_string())
        .replace("{{count}}", &listings.len().to_string())
        .replace("{{body}}", &body)
}

/// Render and atomically replace the page at `path`.
pub fn publish_page(path: &Path, listings: &[Listing]) -> Result<()> {
    let html = render_page(listings, Local::now());
    write_atomic(path, html.as_bytes())
        .with_context(|| format!("writing page {}", path.display()))?;
    tracing::info!(path = %path.display(), listings = listings.len(), "page published");
    Ok(())
}
