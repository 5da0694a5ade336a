// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Tower selection.
//!
//! The threshold for a D-digit number is 10^D: once the product M of the
//! chosen primes exceeds it, every number with at most D digits is
//! recoverable by CRT, not just the one being encoded.
//!
//! Candidates are generated as p = m + 1 for smooth m inside
//! `[min_p, max_p]`, classified through a per-run [`NiceCache`] and
//! truncated to `pool_limit`. The anchor, when configured, is always part
//! of the tower and never drawn from the pool a second time.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use tracing::debug;

use crate::error::{PtcError, Result};

use super::nice::{smooth_numbers_in_range, NiceCache, NicePrime};
use super::strategy::{SelectionPolicy, StrategyConfig};

/// Ascending entries examined per fit step before falling back to pool order.
const FIT_SCAN_WINDOW: usize = 64;

/// A selected set of nice primes, ascending by p.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tower {
    clocks: Vec<NicePrime>,
}

impl Tower {
    fn from_unsorted(mut clocks: Vec<NicePrime>) -> Self {
        clocks.sort_by_key(|np| np.p);
        Self { clocks }
    }

    pub fn nice_primes(&self) -> &[NicePrime] {
        &self.clocks
    }

    pub fn primes(&self) -> Vec<u64> {
        self.clocks.iter().map(|np| np.p).collect()
    }

    pub fn k(&self) -> usize {
        self.clocks.len()
    }

    /// M, the product of the tower primes.
    pub fn modulus(&self) -> BigUint {
        self.clocks
            .iter()
            .fold(BigUint::one(), |m, np| m * BigUint::from(np.p))
    }

    pub fn m_bits(&self) -> u64 {
        self.modulus().bits()
    }
}

/// Decimal digit count of `n`; 1 for zero.
pub fn digit_count(n: &BigUint) -> u32 {
    if n.is_zero() {
        return 1;
    }
    n.to_str_radix(10).len() as u32
}

/// `10^digits`.
pub fn threshold(digits: u32) -> BigUint {
    num_traits::pow(BigUint::from(10u32), digits as usize)
}

/// Tower that makes `n` (and every number with as many digits) lossless.
pub fn select(n: &BigUint, cfg: &StrategyConfig) -> Result<Tower> {
    select_for_digits(digit_count(n), cfg)
}

/// Tower with M > 10^digits.
pub fn select_for_digits(digits: u32, cfg: &StrategyConfig) -> Result<Tower> {
    cfg.validate()?;
    let mut cache = NiceCache::new(&cfg.normalized_smooth());
    select_with_cache(digits, cfg, &mut cache)
}

/// [`select_for_digits`] with a caller-owned cache, so several selections
/// under one smooth set can share classifications.
pub fn select_with_cache(digits: u32, cfg: &StrategyConfig, cache: &mut NiceCache) -> Result<Tower> {
    cfg.validate()?;
    if digits == 0 {
        return Err(PtcError::InvalidInput("digit count must be positive".into()));
    }
    if cache.smooth_primes() != cfg.normalized_smooth().as_slice() {
        return Err(PtcError::InvalidInput(
            "nice-prime cache was built for a different smooth prime set".into(),
        ));
    }
    let target = threshold(digits);

    let mut chosen: Vec<NicePrime> = Vec::new();
    let mut m = BigUint::one();
    if let Some(anchor) = cfg.anchor {
        let np = cache.classify(anchor).ok_or_else(|| {
            PtcError::InvalidInput(format!(
                "anchor {anchor} is not a nice prime (p-1 must be smooth and 2 a generator)"
            ))
        })?;
        m *= anchor;
        chosen.push(np);
    }

    let mut pool_len = 0;
    if m <= target {
        let pool = candidate_pool(cfg, cache);
        pool_len = pool.len();
        match cfg.policy {
            SelectionPolicy::Greedy => greedy(&pool, &target, &mut m, &mut chosen),
            SelectionPolicy::Fit => fit(&pool, &target, &mut m, &mut chosen),
        }
    }

    if m <= target {
        return Err(PtcError::PoolExhausted {
            digits,
            chosen: chosen.len(),
            pool: pool_len,
        });
    }

    let tower = Tower::from_unsorted(chosen);
    debug!(
        preset = %cfg.preset,
        digits,
        pool = pool_len,
        k = tower.k(),
        m_bits = m.bits(),
        classified = cache.len(),
        "selected tower"
    );
    Ok(tower)
}

/// Nice primes in `[min_p, max_p]` in pool order, without the anchor.
fn candidate_pool(cfg: &StrategyConfig, cache: &mut NiceCache) -> Vec<NicePrime> {
    let smooth = cache.smooth_primes().to_vec();
    let ms = smooth_numbers_in_range(cfg.min_p - 1, cfg.max_p - 1, &smooth);

    let mut pool = Vec::new();
    let mut push = |m: u64, pool: &mut Vec<NicePrime>| {
        let p = m + 1;
        if Some(p) == cfg.anchor {
            return;
        }
        if let Some(np) = cache.classify(p) {
            pool.push(np);
        }
    };
    if cfg.prefer_large {
        for &m in ms.iter().rev() {
            if pool.len() >= cfg.pool_limit {
                break;
            }
            push(m, &mut pool);
        }
    } else {
        for &m in &ms {
            if pool.len() >= cfg.pool_limit {
                break;
            }
            push(m, &mut pool);
        }
    }
    pool
}

fn greedy(pool: &[NicePrime], target: &BigUint, m: &mut BigUint, chosen: &mut Vec<NicePrime>) {
    for np in pool {
        if *m > *target {
            return;
        }
        *m *= np.p;
        chosen.push(np.clone());
    }
}

fn fit(pool: &[NicePrime], target: &BigUint, m: &mut BigUint, chosen: &mut Vec<NicePrime>) {
    let mut ascending: Vec<(u64, usize)> = pool.iter().enumerate().map(|(i, np)| (np.p, i)).collect();
    ascending.sort_unstable();
    let mut used = vec![false; pool.len()];
    let mut next = 0usize;

    while *m <= *target {
        // smallest p with m * p > target
        let need = target / &*m + 1u32;
        if let Some(need) = need.to_u64() {
            let start = ascending.partition_point(|&(p, _)| p < need);
            let finisher = ascending[start..]
                .iter()
                .take(FIT_SCAN_WINDOW)
                .find(|&&(_, i)| !used[i]);
            if let Some(&(p, i)) = finisher {
                used[i] = true;
                *m *= p;
                chosen.push(pool[i].clone());
                return;
            }
        }

        while next < pool.len() && used[next] {
            next += 1;
        }
        let Some(np) = pool.get(next) else {
            return;
        };
        used[next] = true;
        *m *= np.p;
        chosen.push(np.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tower::strategy::Preset;

    #[test]
    fn digit_counts() {
        assert_eq!(digit_count(&BigUint::zero()), 1);
        assert_eq!(digit_count(&BigUint::from(9u32)), 1);
        assert_eq!(digit_count(&BigUint::from(10u32)), 2);
        assert_eq!(digit_count(&BigUint::from(276u32)), 3);
        assert_eq!(threshold(3), BigUint::from(1000u32));
    }

    #[test]
    fn fit_scenario_276() {
        let tower = select(&BigUint::from(276u32), &StrategyConfig::default()).unwrap();
        assert_eq!(tower.primes(), vec![19, 61]);
        assert_eq!(tower.modulus(), BigUint::from(1159u32));
        assert_eq!(tower.m_bits(), 11);
    }

    #[test]
    fn anchor_alone_can_suffice() {
        let tower = select_for_digits(1, &StrategyConfig::default()).unwrap();
        assert_eq!(tower.primes(), vec![61]);
    }

    #[test]
    fn every_preset_clears_threshold() {
        for preset in Preset::ALL {
            let cfg = preset.config();
            for digits in [1u32, 5, 20, 60] {
                let tower = select_for_digits(digits, &cfg).unwrap();
                assert!(tower.modulus() > threshold(digits), "{preset} digits={digits}");
                let primes = tower.primes();
                assert!(primes.windows(2).all(|w| w[0] < w[1]), "{preset}: {primes:?}");
                assert!(primes.contains(&61));
                for &p in &primes[..] {
                    assert!(p == 61 || (cfg.min_p..=cfg.max_p).contains(&p));
                }
            }
        }
    }

    #[test]
    fn minimal_uses_large_clocks() {
        let tower = select_for_digits(30, &Preset::Minimal.config()).unwrap();
        // 61 plus 32-bit primes: 61 * (2^31)^3 < 10^30 <= 61 * (2^32)^4
        assert!(tower.k() <= 5, "k={}", tower.k());
        assert!(tower.primes().iter().filter(|&&p| p != 61).all(|&p| p >= 1 << 31));
    }

    #[test]
    fn no_anchor() {
        let cfg = StrategyConfig::default().with_anchor(None);
        let tower = select_for_digits(3, &cfg).unwrap();
        assert!(tower.modulus() > threshold(3));
        assert!(!tower.primes().contains(&61));
    }

    #[test]
    fn non_nice_anchor_rejected() {
        let cfg = StrategyConfig::default().with_anchor(Some(17));
        assert!(matches!(select_for_digits(3, &cfg), Err(PtcError::InvalidInput(_))));
    }

    #[test]
    fn zero_digits_rejected() {
        assert!(matches!(
            select_for_digits(0, &StrategyConfig::default()),
            Err(PtcError::InvalidInput(_))
        ));
    }

    #[test]
    fn pool_exhausted() {
        // nice primes in [3, 20] besides 61: 3, 5, 11, 13, 19
        let cfg = Preset::Fast.config().with_overrides(None, Some(20), None);
        let err = select_for_digits(40, &cfg).unwrap_err();
        match err {
            PtcError::PoolExhausted { digits, chosen, pool } => {
                assert_eq!(digits, 40);
                assert_eq!(pool, 5);
                assert_eq!(chosen, 6);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn pool_limit_truncates() {
        let cfg = Preset::Fast.config().with_overrides(None, None, Some(2));
        let mut cache = NiceCache::new(&cfg.normalized_smooth());
        let pool = candidate_pool(&cfg, &mut cache);
        assert_eq!(pool.len(), 2);
        assert!(pool[0].p > pool[1].p, "prefer_large pool is descending");
    }

    #[test]
    fn shared_cache_reused() {
        let cfg = StrategyConfig::default();
        let mut cache = NiceCache::new(&cfg.normalized_smooth());
        let a = select_with_cache(10, &cfg, &mut cache).unwrap();
        let classified = cache.len();
        let b = select_with_cache(10, &cfg, &mut cache).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.len(), classified);
        assert!(cache.hits() > 0);

        let mut other = NiceCache::new(&[2, 3]);
        assert!(matches!(
            select_with_cache(10, &cfg, &mut other),
            Err(PtcError::InvalidInput(_))
        ));
    }
}
