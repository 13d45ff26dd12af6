// src/ingest/providers/mod.rs
//! One `SiteExtractor` per watched site. Adding a site means a new module
//! here, a `Source` variant, and an arm in `extractor_for`.

pub mod emlakjet;
pub mod hepsiemlak;
pub mod sahibinden;

use std::sync::Arc;

use crate::ingest::extract::SiteExtractor;
use crate::ingest::types::Source;

pub fn extractor_for(source: Source) -> Arc<dyn SiteExtractor> {
    match source {
        Source::Emlakjet => Arc::new(emlakjet::EmlakjetExtractor),
        Source::Hepsiemlak => Arc::new(hepsiemlak::HepsiemlakExtractor),
        Source::Sahibinden => Arc::new(sahibinden::SahibindenExtractor),
    }
}
