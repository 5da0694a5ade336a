// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Tower dictionary for PTC-bin packs.
//!
//! Towers are interned into an arena in first-seen order; signature records
//! refer to them by arena index only. The dictionary is built in a single
//! consolidation pass before any record is serialized, so indices never
//! move once assigned.

use std::collections::HashMap;

use super::error::{CodecError, Result};

/// Arena of distinct ascending prime lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TowerDictionary {
    towers: Vec<Vec<u64>>,
    by_primes: HashMap<Vec<u64>, usize>,
}

impl TowerDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `primes`, adding it if unseen. `primes` must be ascending.
    pub fn intern(&mut self, primes: &[u64]) -> usize {
        debug_assert!(primes.windows(2).all(|w| w[0] < w[1]));
        if let Some(&idx) = self.by_primes.get(primes) {
            return idx;
        }
        let idx = self.towers.len();
        self.towers.push(primes.to_vec());
        self.by_primes.insert(primes.to_vec(), idx);
        idx
    }

    pub fn get(&self, index: usize) -> Option<&[u64]> {
        self.towers.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.towers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    pub fn towers(&self) -> &[Vec<u64>] {
        &self.towers
    }
}

/// `[p0, p1 - p0, p2 - p1, ...]` for an ascending prime list.
pub fn delta_encode(primes: &[u64]) -> Vec<u64> {
    let mut out = Vec::with_capacity(primes.len());
    let mut prev = 0u64;
    for &p in primes {
        out.push(p - prev);
        prev = p;
    }
    out
}

/// Inverse of [`delta_encode`]. Rejects non-increasing sequences and overflow.
pub fn delta_decode(deltas: &[u64], frame: usize) -> Result<Vec<u64>> {
    let mut out = Vec::with_capacity(deltas.len());
    let mut cur = 0u64;
    for (i, &d) in deltas.iter().enumerate() {
        if i > 0 && d == 0 {
            return Err(CodecError::InvalidFrame {
                frame,
                reason: "tower primes not strictly ascending",
            });
        }
        cur = cur.checked_add(d).ok_or(CodecError::InvalidFrame {
            frame,
            reason: "tower prime overflows u64",
        })?;
        out.push(cur);
    }
    Ok(out)
}
