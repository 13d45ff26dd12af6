// src/ingest/providers/sahibinden.rs
use once_cell::sync::OnceCell;
use regex::Regex;
use scraper::ElementRef;

use crate::ingest::extract::{SiteExtractor, SiteSelectors};
use crate::ingest::types::Source;

static SELECTORS: SiteSelectors = SiteSelectors {
    containers: &["tr.searchResultsItem", "li.searchResultsItem"],
    title: &["a.classifiedTitle", "td.searchResultsTitleValue a"],
    price: &[
        "td.searchResultsPriceValue span",
        "td.searchResultsPriceValue",
        "div.searchResultsPriceValue",
    ],
    link: &["a.classifiedTitle", "a[href*='/ilan/']"],
    id_attrs: &["data-id"],
};

pub struct SahibindenExtractor;

impl SiteExtractor for SahibindenExtractor {
    fn source(&self) -> Source {
        Source::Sahibinden
    }

    fn base_origin(&self) -> &'static str {
        "https://www.sahibinden.com"
    }

    fn selectors(&self) -> &SiteSelectors {
        &SELECTORS
    }

    // Rows occasionally drop `data-id`; the detail URL ends in `-<id>/detay`.
    fn native_id(&self, el: ElementRef<'_>) -> Option<String> {
        if let Some(id) = el.value().attr("data-id").map(str::trim) {
            if !id.is_empty() {
                return Some(id.to_string());
            }
        }
        static RE_ID: OnceCell<Regex> = OnceCell::new();
        let re = RE_ID.get_or_init(|| Regex::new(r"-(\d{6,})/detay").unwrap());
        let href = self.href(el)?;
        re.captures(&href).map(|c| c[1].to_string())
    }
}
