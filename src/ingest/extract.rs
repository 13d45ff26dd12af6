// src/ingest/extract.rs
//! Per-site extraction: rendered DOM → listing candidates.
//!
//! Markup on the watched sites changes without notice, so every selector is
//! an ordered fallback list. The first container selector that matches
//! anything wins; for fields, the first selector yielding non-empty text wins.
//! Containers missing a title, a price or a detail link are skipped silently.

use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::ingest::normalize_text;
use crate::ingest::types::{Listing, Source};

/// Where the page came from; stamped onto every candidate.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub page_url: String,
    pub location: Option<String>,
}

/// Ordered fallback selector sets for one site.
#[derive(Debug, Clone, Copy)]
pub struct SiteSelectors {
    pub containers: &'static [&'static str],
    pub title: &'static [&'static str],
    pub price: &'static [&'static str],
    pub link: &'static [&'static str],
    /// Attributes on the container carrying the site's own listing id.
    pub id_attrs: &'static [&'static str],
}

pub trait SiteExtractor: Send + Sync {
    fn source(&self) -> Source;

    /// Scheme + host used to absolutize relative links.
    fn base_origin(&self) -> &'static str;

    fn selectors(&self) -> &SiteSelectors;

    fn title(&self, el: ElementRef<'_>) -> Option<String> {
        first_text(el, self.selectors().title)
    }

    fn price(&self, el: ElementRef<'_>) -> Option<String> {
        first_text(el, self.selectors().price)
    }

    fn native_id(&self, el: ElementRef<'_>) -> Option<String> {
        self.selectors()
            .id_attrs
            .iter()
            .filter_map(|a| el.value().attr(a))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn href(&self, el: ElementRef<'_>) -> Option<String> {
        first_attr(el, self.selectors().link, "href").or_else(|| {
            // Some grids make the card itself the anchor.
            el.value().attr("href").map(str::to_string)
        })
    }

    /// Candidates in DOM order. Never fails; unparseable containers are dropped.
    fn extract(&self, doc: &Html, ctx: &PageContext) -> Vec<Listing> {
        let containers = first_matching(doc.root_element(), self.selectors().containers);
        let total = containers.len();
        let out: Vec<Listing> = containers
            .into_iter()
            .filter_map(|el| self.candidate(el, ctx))
            .collect();
        if out.len() < total {
            tracing::debug!(
                source = %self.source(),
                page = %ctx.page_url,
                skipped = total - out.len(),
                "containers without title/price/link skipped"
            );
        }
        out
    }

    fn candidate(&self, el: ElementRef<'_>, ctx: &PageContext) -> Option<Listing> {
        let title = self.title(el)?;
        let price = self.price(el)?;
        let link = self
            .href(el)
            .and_then(|h| resolve_link(self.base_origin(), &h))?;
        let native = self.native_id(el);
        Some(Listing {
            id: listing_id(self.source(), native.as_deref(), &title, &price),
            title,
            price,
            link,
            source: self.source(),
            location: ctx.location.clone(),
        })
    }
}

fn parse_all<'a>(selectors: &'a [&'a str]) -> impl Iterator<Item = Selector> + 'a {
    selectors.iter().filter_map(|s| match Selector::parse(s) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::warn!(selector = *s, error = ?e, "invalid css selector");
            None
        }
    })
}

/// Elements for the first selector that matches at least one element.
pub fn first_matching<'a>(root: ElementRef<'a>, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for sel in parse_all(selectors) {
        let found: Vec<ElementRef<'a>> = root.select(&sel).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Normalized text of the first selector hit that is non-empty.
pub fn first_text(el: ElementRef<'_>, selectors: &[&str]) -> Option<String> {
    parse_all(selectors)
        .filter_map(|sel| el.select(&sel).next())
        .map(|hit| normalize_text(&hit.text().collect::<Vec<_>>().join(" ")))
        .find(|t| !t.is_empty())
}

pub fn first_attr(el: ElementRef<'_>, selectors: &[&str], attr: &str) -> Option<String> {
    parse_all(selectors)
        .filter_map(|sel| el.select(&sel).next())
        .filter_map(|hit| hit.value().attr(attr))
        .map(str::trim)
        .find(|v| !v.is_empty())
        .map(str::to_string)
}

/// Relative (`/path`) links get the site origin; anything else is kept.
pub fn resolve_link(base_origin: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    if let Some(rest) = href.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    if href.starts_with('/') {
        return Some(format!("{}{}", base_origin.trim_end_matches('/'), href));
    }
    Some(href.to_string())
}

/// Stable identity for a listing.
///
/// A native site id is namespaced by source. Without one, the id is a hash of
/// the normalized (title, price, source) triple, so a price change produces
/// a new id.
pub fn listing_id(source: Source, native: Option<&str>, title: &str, price: &str) -> String {
    if let Some(n) = native.map(str::trim).filter(|n| !n.is_empty()) {
        return format!("{source}-{n}");
    }
    let mut hasher = Sha256::new();
    hasher.update(normalize_text(title).to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_text(price).to_lowercase().as_bytes());
    hasher.update(b"|");
    hasher.update(source.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(source.as_str().len() + 18);
    let _ = write!(&mut out, "{source}-h");
    for b in digest.iter().take(8) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
