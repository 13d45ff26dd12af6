// src/ingest/providers/hepsiemlak.rs
use scraper::ElementRef;

use crate::ingest::extract::{first_text, SiteExtractor, SiteSelectors};
use crate::ingest::types::Source;

static SELECTORS: SiteSelectors = SiteSelectors {
    containers: &["li.listing-item", "div.listing-item", "article.listing-card"],
    title: &["h3", ".list-view-title", "[class*='title']"],
    price: &["span.list-view-price", ".listing-price", ".price"],
    link: &["a.card-link", "a[href]"],
    id_attrs: &["data-listing-id", "data-id"],
};

pub struct HepsiemlakExtractor;

impl SiteExtractor for HepsiemlakExtractor {
    fn source(&self) -> Source {
        Source::Hepsiemlak
    }

    fn base_origin(&self) -> &'static str {
        "https://www.hepsiemlak.com"
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }

    // Amount and currency are rendered in sibling spans.
    fn price(&self, el: ElementRef<'_>) -> Option<String> {
        let amount = first_text(el, SELECTORS.price)?;
        match first_text(el, &[".currency"]) {
            Some(cur) if !amount.contains(cur.as_str()) => Some(format!("{amount} {cur}")),
            _ => Some(amount),
        }
    }
}
