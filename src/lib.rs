// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod fsutil;
pub mod ingest;
pub mod notify;
pub mod pipeline;
pub mod publish;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::config::WatchConfig;
pub use crate::ingest::types::{Listing, Source};
pub use crate::notify::{ListingAlert, Notifier, NotifierMux};
pub use crate::pipeline::{Pipeline, RunReport, RunStatus};
pub use crate::store::{ListingStore, MergePolicy};
