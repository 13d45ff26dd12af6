// src/ingest/providers/emlakjet.rs
use crate::ingest::extract::{SiteExtractor, SiteSelectors};
use crate::ingest::types::Source;

// Class names carry CSS-module hashes (`styles_listingItem__x1y2z`), hence the substring matches.
static SELECTORS: SiteSelectors = SiteSelectors {
    containers: &[
        "div[class*='styles_listingItem']",
        "div[class*='listing-item'][data-id]",
        "article[data-id]",
    ],
    title: &["h3", "[class*='styles_title']"],
    price: &["div[class*='styles_price']", "span[class*='price']"],
    link: &["a[href]"],
    id_attrs: &["data-id"],
};

pub struct EmlakjetExtractor;

impl SiteExtractor for EmlakjetExtractor {
    fn source(&self) -> Source {
        Source::Emlakjet
    }

    fn base_origin(&self) -> &'static str {
        "https://www.emlakjet.com"
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }
}
