// src/config/mod.rs
//! Run configuration. Built once at startup and passed down explicitly;
//! nothing below `main` reads the environment.

use anyhow::{anyhow, bail, Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ingest::http::DEFAULT_USER_AGENT;
use crate::ingest::types::Source;
use crate::store::MergePolicy;

pub const ENV_CONFIG_PATH: &str = "LISTING_WATCH_CONFIG";
pub const ENV_LOCATION: &str = "LISTING_WATCH_LOCATION";
pub const DEFAULT_TOML_PATH: &str = "config/listing_watch.toml";
pub const DEFAULT_JSON_PATH: &str = "config/listing_watch.json";

const LOCATION_PLACEHOLDER: &str = "{location}";

/// Inclusive random delay window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const ZERO: DelayRange = DelayRange { min_ms: 0, max_ms: 0 };

    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }.normalized()
    }

    fn normalized(self) -> Self {
        if self.min_ms > self.max_ms {
            Self {
                min_ms: self.max_ms,
                max_ms: self.min_ms,
            }
        } else {
            self
        }
    }

    pub fn sample(&self) -> Duration {
        let r = self.normalized();
        if r.min_ms == r.max_ms {
            return Duration::from_millis(r.min_ms);
        }
        Duration::from_millis(rand::rng().random_range(r.min_ms..=r.max_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    pub enabled: bool,
    pub max_rounds: u32,
    pub step_delay_ms: u64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_rounds: 15,
            step_delay_ms: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub nav_timeout_ms: u64,
    /// Pause after navigation so client-side rendering can finish.
    pub settle_ms: u64,
    pub pre_nav_delay: DelayRange,
    pub inter_source_delay: DelayRange,
    pub scroll: ScrollConfig,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            nav_timeout_ms: 60_000,
            settle_ms: 5_000,
            pre_nav_delay: DelayRange::new(500, 2_500),
            inter_source_delay: DelayRange::new(2_000, 6_000),
            scroll: ScrollConfig::default(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub source: Source,
    /// May contain `{location}`.
    pub url_template: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SourceConfig {
    pub fn new(source: Source, url_template: &str) -> Self {
        Self {
            source,
            url_template: url_template.to_string(),
            enabled: true,
        }
    }

    pub fn resolve_url(&self, location: &str) -> String {
        self.url_template.replace(LOCATION_PLACEHOLDER, location)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Http,
    Browser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Search scope (city/district slug) substituted into URL templates.
    pub location: String,
    pub sources: Vec<SourceConfig>,
    pub store_path: PathBuf,
    pub output_path: PathBuf,
    pub max_size: usize,
    pub merge_policy: MergePolicy,
    pub concurrent: bool,
    pub fetcher: FetcherKind,
    pub user_agent: String,
    pub pacing: PacingConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            location: "istanbul-kadikoy".to_string(),
            sources: vec![
                SourceConfig::new(
                    Source::Emlakjet,
                    "https://www.emlakjet.com/kiralik-konut/{location}/",
                ),
                SourceConfig::new(
                    Source::Hepsiemlak,
                    "https://www.hepsiemlak.com/{location}-kiralik",
                ),
                SourceConfig::new(
                    Source::Sahibinden,
                    "https://www.sahibinden.com/kiralik-daire/{location}",
                ),
            ],
            store_path: PathBuf::from("data/database.json"),
            output_path: PathBuf::from("index.html"),
            max_size: 100,
            merge_policy: MergePolicy::default(),
            concurrent: false,
            fetcher: FetcherKind::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pacing: PacingConfig::default(),
        }
    }
}

impl WatchConfig {
    /// Load from an explicit path. Supports TOML or JSON formats.
    ///
    /// Parses only; call [`WatchConfig::validated`] after applying overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        parse_config(&content, ext.as_str())
            .with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $LISTING_WATCH_CONFIG
    /// 2) config/listing_watch.toml
    /// 3) config/listing_watch.json
    /// 4) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                bail!("{ENV_CONFIG_PATH} points to non-existent path {}", pb.display());
            }
            return Self::load_from(&pb);
        }
        for candidate in [DEFAULT_TOML_PATH, DEFAULT_JSON_PATH] {
            let p = PathBuf::from(candidate);
            if p.exists() {
                return Self::load_from(&p);
            }
        }
        Ok(Self::default())
    }

    /// Replace the search scope; blank input is ignored.
    pub fn with_location(mut self, location: Option<&str>) -> Self {
        if let Some(loc) = location.map(str::trim).filter(|l| !l.is_empty()) {
            self.location = loc.to_string();
        }
        self
    }

    pub fn enabled_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    /// Location tag stamped onto listings; `None` when no scope is set.
    pub fn location_tag(&self) -> Option<String> {
        let l = self.location.trim();
        (!l.is_empty()).then(|| l.to_string())
    }

    pub fn validated(mut self) -> Result<Self> {
        if self.max_size == 0 {
            bail!("max_size must be at least 1");
        }
        if self.enabled_sources().next().is_none() {
            bail!("no enabled sources configured");
        }
        for s in self.enabled_sources() {
            if s.url_template.trim().is_empty() {
                bail!("source {} has an empty url_template", s.source);
            }
            if s.url_template.contains(LOCATION_PLACEHOLDER) && self.location.trim().is_empty() {
                bail!(
                    "source {} needs a location but none is configured",
                    s.source
                );
            }
        }
        self.pacing.pre_nav_delay = self.pacing.pre_nav_delay.normalized();
        self.pacing.inter_source_delay = self.pacing.inter_source_delay.normalized();
        Ok(self)
    }
}

fn parse_config(s: &str, hint_ext: &str) -> Result<WatchConfig> {
    let looks_json = s.trim_start().starts_with('{');
    match hint_ext {
        "toml" => return toml::from_str(s).map_err(|e| anyhow!("toml: {e}")),
        "json" => return serde_json::from_str(s).map_err(|e| anyhow!("json: {e}")),
        _ => {}
    }
    if looks_json {
        serde_json::from_str(s).map_err(|e| anyhow!("json: {e}"))
    } else {
        toml::from_str(s).map_err(|e| anyhow!("toml: {e}"))
    }
}
