// src/ingest/types.rs
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which site produced a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Emlakjet,
    Hepsiemlak,
    Sahibinden,
}

impl Source {
    pub const ALL: [Source; 3] = [Source::Emlakjet, Source::Hepsiemlak, Source::Sahibinden];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Emlakjet => "emlakjet",
            Source::Hepsiemlak => "hepsiemlak",
            Source::Sahibinden => "sahibinden",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Records written before `source` existed all came from emlakjet.
fn legacy_source() -> Source {
    Source::Emlakjet
}

/// One extracted real-estate record. Fresh from a page it is a candidate;
/// once merged it is a store entry. Field set matches the persisted JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Listing {
    pub id: String,
    pub title: String,
    pub price: String,
    pub link: String,
    #[serde(default = "legacy_source")]
    pub source: Source,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}
