// src/store.rs
//! Bounded, deduplicated listing history persisted as a pretty JSON array.
//!
//! One run = one load → merge → save cycle. Loading never fails: a missing
//! or corrupt file yields an empty store. Saving is atomic and retried once.

use anyhow::{Context, Result};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::fsutil::write_atomic;
use crate::ingest::types::Listing;

/// Where newly seen listings go relative to the existing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// New items first; trimming drops the oldest tail.
    #[default]
    Prepend,
    /// New items last; trimming drops the oldest head.
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingStore {
    entries: Vec<Listing>,
    max_size: usize,
    policy: MergePolicy,
}

impl ListingStore {
    pub fn new(max_size: usize, policy: MergePolicy) -> Self {
        Self {
            entries: Vec::new(),
            max_size: max_size.max(1),
            policy,
        }
    }

    /// Build from arbitrary entries, enforcing uniqueness (first wins) and the bound.
    pub fn from_entries(entries: Vec<Listing>, max_size: usize, policy: MergePolicy) -> Self {
        let mut store = Self::new(max_size, policy);
        let mut seen = HashSet::with_capacity(entries.len());
        store.entries = entries
            .into_iter()
            .filter(|l| seen.insert(l.id.clone()))
            .collect();
        store.trim();
        store
    }

    /// Load from disk. Absent or unreadable/corrupt files give an empty store.
    pub fn load(path: &Path, max_size: usize, policy: MergePolicy) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "no store yet, starting empty");
                return Self::new(max_size, policy);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = ?e, "store unreadable, starting empty");
                return Self::new(max_size, policy);
            }
        };
        match serde_json::from_str::<Vec<Listing>>(&raw) {
            Ok(entries) => {
                let before = entries.len();
                let store = Self::from_entries(entries, max_size, policy);
                if store.len() < before {
                    tracing::warn!(
                        path = %path.display(),
                        dropped = before - store.len(),
                        "store had duplicates or exceeded max_size"
                    );
                }
                store
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "store corrupt, starting empty");
                Self::new(max_size, policy)
            }
        }
    }

    pub fn entries(&self) -> &[Listing] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merge a fresh batch and return the listings that are new to the store.
    ///
    /// Candidates already stored, and repeats within the batch, are ignored.
    /// The returned items keep batch order and are exactly the new items that
    /// remain stored after trimming.
    pub fn merge(&mut self, candidates: &[Listing]) -> Vec<Listing> {
        let mut known: HashSet<&str> = self.entries.iter().map(|l| l.id.as_str()).collect();
        let mut fresh: Vec<Listing> = Vec::new();
        for c in candidates {
            if known.insert(c.id.as_str()) {
                fresh.push(c.clone());
            }
        }

        let mut merged = Vec::with_capacity(self.entries.len() + fresh.len());
        match self.policy {
            MergePolicy::Prepend => {
                merged.extend(fresh.iter().cloned());
                merged.append(&mut self.entries);
            }
            MergePolicy::Append => {
                merged.append(&mut self.entries);
                merged.extend(fresh.iter().cloned());
            }
        }
        self.entries = merged;
        self.trim();

        let kept: HashSet<&str> = self.entries.iter().map(|l| l.id.as_str()).collect();
        let fresh: Vec<Listing> = fresh
            .into_iter()
            .filter(|l| kept.contains(l.id.as_str()))
            .collect();
        counter!("store_new_listings_total").increment(fresh.len() as u64);
        fresh
    }

    fn trim(&mut self) {
        if self.entries.len() <= self.max_size {
            return;
        }
        match self.policy {
            MergePolicy::Prepend => self.entries.truncate(self.max_size),
            MergePolicy::Append => {
                let excess = self.entries.len() - self.max_size;
                self.entries.drain(0..excess);
            }
        }
    }

    /// Pretty JSON, 4-space indent, trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
        self.entries
            .serialize(&mut ser)
            .context("serializing store")?;
        buf.push(b'\n');
        String::from_utf8(buf).context("store json is not utf-8")
    }

    /// Atomic replace of the store file; one retry before giving up.
    pub fn save(&self, path: &Path) -> Result<()> {
        let body = self.to_json()?;
        if let Err(first) = write_atomic(path, body.as_bytes()) {
            tracing::warn!(path = %path.display(), error = ?first, "store write failed, retrying once");
            write_atomic(path, body.as_bytes())
                .with_context(|| format!("writing store {}", path.display()))?;
        }
        tracing::debug!(path = %path.display(), entries = self.len(), "store saved");
        Ok(())
    }
}
