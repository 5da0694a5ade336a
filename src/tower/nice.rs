// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Nice-prime oracle.
//!
//! A prime p is *nice* when p − 1 factors completely over a small set of
//! primes and 2 generates the multiplicative group mod p. Every nonzero
//! residue then has a base-2 discrete log, and the smooth order keeps
//! Pohlig–Hellman cheap.

use std::collections::HashMap;

use crate::error::Result;
use crate::modmath::{is_prime, pow_mod};

/// Default smooth prime set for p − 1.
pub const DEFAULT_SMOOTH_PRIMES: [u64; 6] = [2, 3, 5, 7, 11, 13];

/// Factorization `[(q, a), ...]` with ascending q.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Factorization(Vec<(u64, u32)>);

impl Factorization {
    pub fn factors(&self) -> &[(u64, u32)] {
        &self.0
    }

    /// Distinct prime factors.
    pub fn primes(&self) -> impl Iterator<Item = u64> + '_ {
        self.0.iter().map(|&(q, _)| q)
    }

    /// The factored value. Wraps only for inputs that were never built by
    /// [`factor_smooth`].
    pub fn value(&self) -> u64 {
        self.0
            .iter()
            .fold(1u64, |acc, &(q, a)| acc.wrapping_mul(q.wrapping_pow(a)))
    }
}

/// A certified nice prime with the factorization of p − 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NicePrime {
    pub p: u64,
    pub factors: Factorization,
}

impl NicePrime {
    /// `e` with `2^e ≡ r (mod p)`, for `r` in `[1, p − 1]`.
    pub fn log2(&self, r: u64) -> Result<u64> {
        super::dlog::log2(self.p, r, &self.factors)
    }
}

/// Factor `n` over `smooth`. `None` when a cofactor above 1 remains.
pub fn factor_smooth(mut n: u64, smooth: &[u64]) -> Option<Factorization> {
    if n == 0 {
        return None;
    }
    let mut out = Vec::new();
    for &q in smooth {
        if n == 1 {
            break;
        }
        if q < 2 {
            continue;
        }
        let mut a = 0u32;
        while n % q == 0 {
            n /= q;
            a += 1;
        }
        if a > 0 {
            out.push((q, a));
        }
    }
    (n == 1).then_some(Factorization(out))
}

/// True when 2 has order p − 1, given the factorization of p − 1.
pub fn is_generator_2(p: u64, factors: &Factorization) -> bool {
    if p <= 2 {
        return false;
    }
    let phi = p - 1;
    factors.primes().all(|q| pow_mod(2, phi / q, p) != 1)
}

/// Classify `p`: `Some` exactly when it is a nice prime.
pub fn classify(p: u64, smooth: &[u64]) -> Option<NicePrime> {
    if p <= 2 || !is_prime(p) {
        return None;
    }
    let factors = factor_smooth(p - 1, smooth)?;
    if !is_generator_2(p, &factors) {
        return None;
    }
    Some(NicePrime { p, factors })
}

/// Memoized classification for one selection run.
///
/// Owned by the caller and dropped with it; nothing is shared between runs.
#[derive(Debug, Clone)]
pub struct NiceCache {
    smooth: Vec<u64>,
    entries: HashMap<u64, Option<NicePrime>>,
    hits: u64,
}

impl NiceCache {
    pub fn new(smooth: &[u64]) -> Self {
        Self {
            smooth: smooth.to_vec(),
            entries: HashMap::new(),
            hits: 0,
        }
    }

    pub fn smooth_primes(&self) -> &[u64] {
        &self.smooth
    }

    /// Classification of `p`, computed at most once per cache.
    pub fn classify(&mut self, p: u64) -> Option<NicePrime> {
        if let Some(cached) = self.entries.get(&p) {
            self.hits += 1;
            return cached.clone();
        }
        let result = classify(p, &self.smooth);
        self.entries.insert(p, result.clone());
        result
    }

    /// Number of distinct candidates classified so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }
}

/// Every `m` in `[lo, hi]` whose prime factors all lie in `smooth`, ascending.
pub fn smooth_numbers_in_range(lo: u64, hi: u64, smooth: &[u64]) -> Vec<u64> {
    fn walk(from: usize, cur: u64, lo: u64, hi: u64, smooth: &[u64], out: &mut Vec<u64>) {
        if cur >= lo {
            out.push(cur);
        }
        for (i, &q) in smooth.iter().enumerate().skip(from) {
            match cur.checked_mul(q) {
                Some(next) if next <= hi => walk(i, next, lo, hi, smooth, out),
                _ => {}
            }
        }
    }

    let mut primes: Vec<u64> = smooth.iter().copied().filter(|&q| q >= 2).collect();
    primes.sort_unstable();
    primes.dedup();

    let mut out = Vec::new();
    if hi >= 1 {
        walk(0, 1, lo, hi, &primes, &mut out);
    }
    out.sort_unstable();
    out
}
