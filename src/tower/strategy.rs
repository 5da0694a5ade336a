// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Clock-selection strategies: named presets plus explicit overrides.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{PtcError, Result};

use super::nice::DEFAULT_SMOOTH_PRIMES;

/// Anchor prime placed in every tower unless disabled.
pub const DEFAULT_ANCHOR: u64 = 61;

/// Lower bound of the 32-bit candidate range used by [`Preset::Minimal`].
pub const MIN_P_32BIT: u64 = 1 << 31;
/// Upper bound of the 32-bit candidate range.
pub const MAX_P_32BIT: u64 = (1 << 32) - 1;

/// Named strategy preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Few large 32-bit clocks.
    Minimal,
    /// Small clocks from a narrow range; cheap candidate generation.
    Fast,
    /// Wide range and a large pool.
    Safe,
    /// Small clocks first, tailored last step.
    #[default]
    Fit,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Preset::Minimal, Preset::Fast, Preset::Safe, Preset::Fit];

    pub fn name(self) -> &'static str {
        match self {
            Preset::Minimal => "minimal",
            Preset::Fast => "fast",
            Preset::Safe => "safe",
            Preset::Fit => "fit",
        }
    }

    /// Full configuration for this preset with default anchor and smooth set.
    pub fn config(self) -> StrategyConfig {
        let (min_p, max_p, pool_limit, prefer_large, policy) = match self {
            Preset::Minimal => (MIN_P_32BIT, MAX_P_32BIT, 5_000, true, SelectionPolicy::Greedy),
            Preset::Fast => (3, 500_000, 20_000, true, SelectionPolicy::Greedy),
            Preset::Safe => (3, 2_000_000, 100_000, true, SelectionPolicy::Greedy),
            Preset::Fit => (3, 2_000_000, 50_000, false, SelectionPolicy::Fit),
        };
        StrategyConfig {
            preset: self,
            min_p,
            max_p,
            pool_limit,
            prefer_large,
            policy,
            anchor: Some(DEFAULT_ANCHOR),
            smooth_primes: DEFAULT_SMOOTH_PRIMES.to_vec(),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = PtcError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| p.name() == wanted)
            .ok_or_else(|| PtcError::InvalidInput(format!("unknown preset: {s:?}")))
    }
}

/// How the selector walks the candidate pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Take candidates in pool order until the threshold is passed.
    Greedy,
    /// Before each step, look for the smallest unused prime that would
    /// finish the tower on its own; take it if one exists.
    Fit,
}

/// Resolved strategy for one selection run.
///
/// A JSON document expands its `preset` (default `fit`) first; every other
/// field present in the document then overrides the preset value.
/// `"anchor": null` disables the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StrategyDocument")]
pub struct StrategyConfig {
    pub preset: Preset,
    pub min_p: u64,
    pub max_p: u64,
    pub pool_limit: usize,
    pub prefer_large: bool,
    pub policy: SelectionPolicy,
    /// Prime placed in the tower first. Must be nice.
    pub anchor: Option<u64>,
    pub smooth_primes: Vec<u64>,
}

/// On-disk form of [`StrategyConfig`]: every field optional.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StrategyDocument {
    preset: Option<Preset>,
    min_p: Option<u64>,
    max_p: Option<u64>,
    pool_limit: Option<usize>,
    prefer_large: Option<bool>,
    policy: Option<SelectionPolicy>,
    #[serde(default, deserialize_with = "present")]
    anchor: Option<Option<u64>>,
    smooth_primes: Option<Vec<u64>>,
}

/// Distinguishes an explicit `null` (`Some(None)`) from a missing key (`None`).
fn present<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(d).map(Some)
}

impl From<StrategyDocument> for StrategyConfig {
    fn from(doc: StrategyDocument) -> Self {
        let mut cfg = doc
            .preset
            .unwrap_or_default()
            .config()
            .with_overrides(doc.min_p, doc.max_p, doc.pool_limit);
        if let Some(v) = doc.prefer_large {
            cfg.prefer_large = v;
        }
        if let Some(v) = doc.policy {
            cfg.policy = v;
        }
        if let Some(anchor) = doc.anchor {
            cfg.anchor = anchor;
        }
        match doc.smooth_primes {
            Some(primes) => cfg.with_smooth_primes(&primes),
            None => cfg,
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Preset::default().config()
    }
}

impl StrategyConfig {
    pub fn preset(preset: Preset) -> Self {
        preset.config()
    }

    /// Apply explicit range and pool overrides; `Some` always wins.
    pub fn with_overrides(mut self, min_p: Option<u64>, max_p: Option<u64>, pool_limit: Option<usize>) -> Self {
        if let Some(v) = min_p {
            self.min_p = v;
        }
        if let Some(v) = max_p {
            self.max_p = v;
        }
        if let Some(v) = pool_limit {
            self.pool_limit = v;
        }
        self
    }

    pub fn with_anchor(mut self, anchor: Option<u64>) -> Self {
        self.anchor = anchor;
        self
    }

    /// Replace the smooth prime set (sorted and deduplicated).
    pub fn with_smooth_primes(mut self, primes: &[u64]) -> Self {
        let mut v = primes.to_vec();
        v.sort_unstable();
        v.dedup();
        self.smooth_primes = v;
        self
    }

    /// Check ranges and the smooth set. Anchor niceness is checked at
    /// selection time, where the oracle is available.
    pub fn validate(&self) -> Result<()> {
        if self.min_p < 3 {
            return Err(PtcError::InvalidInput(format!("min_p must be >= 3, got {}", self.min_p)));
        }
        if self.max_p < self.min_p {
            return Err(PtcError::InvalidInput(format!(
                "max_p ({}) must be >= min_p ({})",
                self.max_p, self.min_p
            )));
        }
        if self.pool_limit == 0 {
            return Err(PtcError::InvalidInput("pool_limit must be positive".into()));
        }
        if self.smooth_primes.is_empty() {
            return Err(PtcError::InvalidInput("smooth prime set is empty".into()));
        }
        if let Some(&q) = self.smooth_primes.iter().find(|&&q| q < 2) {
            return Err(PtcError::InvalidInput(format!("smooth primes must be >= 2, got {q}")));
        }
        Ok(())
    }

    /// Smooth set in ascending order without duplicates.
    pub(crate) fn normalized_smooth(&self) -> Vec<u64> {
        let mut v = self.smooth_primes.clone();
        v.sort_unstable();
        v.dedup();
        v
    }
}
