// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Base-2 discrete logarithms modulo a nice prime (Pohlig–Hellman).
//!
//! For each prime power q^a ‖ p − 1 the problem is projected into the
//! subgroup of order q^a and solved one base-q digit at a time; each digit
//! is an exhaustive search over q ≤ the largest smooth prime. The partial
//! logs are then stitched together by CRT over the coprime moduli q^a.

use crate::error::{PtcError, Result};
use crate::modmath::{crt_pair, mul_mod, pow_mod};

use super::nice::Factorization;

/// Solve `2^x ≡ h (mod p)` inside the subgroup of order `q^a`.
///
/// `g` must have order exactly `q^a` and `h` must lie in its subgroup.
fn log_prime_power(g: u64, h: u64, p: u64, q: u64, a: u32) -> Result<u64> {
    // gamma = g^(q^(a-1)) has order q
    let gamma = pow_mod(g, q.pow(a - 1), p);
    let order = q.pow(a);

    let mut x = 0u64;
    let mut q_j = 1u64;
    for j in 0..a {
        // (h * g^-x)^(q^(a-1-j)) lands in <gamma>
        let g_inv_x = pow_mod(g, (order - x) % order, p);
        let c = pow_mod(mul_mod(h, g_inv_x, p), q.pow(a - 1 - j), p);

        let mut cur = 1u64;
        let mut digit = None;
        for d in 0..q {
            if cur == c {
                digit = Some(d);
                break;
            }
            cur = mul_mod(cur, gamma, p);
        }
        let d = digit.ok_or_else(|| {
            PtcError::InvariantViolation(format!(
                "no discrete-log digit for p={p} in subgroup {q}^{a} (digit {j})"
            ))
        })?;
        x += d * q_j;
        q_j *= q;
    }
    Ok(x)
}

/// `e` in `[0, p − 1)` with `2^e ≡ r (mod p)`.
///
/// `factors` must be the complete factorization of `p − 1` and 2 must
/// generate the group mod p. `r = 0` has no logarithm and is rejected as
/// invalid input; a factorization that does not describe p − 1, or an
/// exponent that fails the final check, is an invariant violation.
pub fn log2(p: u64, r: u64, factors: &Factorization) -> Result<u64> {
    if r == 0 || r >= p {
        return Err(PtcError::InvalidInput(format!(
            "discrete log needs 1 <= r < p, got r={r} for p={p}"
        )));
    }
    let phi = p - 1;
    if factors.value() != phi {
        return Err(PtcError::InvariantViolation(format!(
            "factorization does not describe p-1 for p={p}"
        )));
    }

    let mut acc = (0u64, 1u64);
    for &(q, a) in factors.factors() {
        let m = q.pow(a);
        let g = pow_mod(2, phi / m, p);
        let h = pow_mod(r, phi / m, p);
        let x = log_prime_power(g, h, p, q, a)?;
        acc = crt_pair(acc.0, acc.1, x, m).ok_or_else(|| {
            PtcError::InvariantViolation(format!("non-coprime subgroup orders for p={p}"))
        })?;
    }

    let e = acc.0 % phi;
    if pow_mod(2, e, p) != r {
        return Err(PtcError::InvariantViolation(format!(
            "discrete log check failed: 2^{e} mod {p} != {r}"
        )));
    }
    Ok(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tower::nice::{classify, factor_smooth, smooth_numbers_in_range, DEFAULT_SMOOTH_PRIMES};

    fn nice(p: u64) -> Factorization {
        classify(p, &DEFAULT_SMOOTH_PRIMES).unwrap().factors
    }

    #[test]
    fn anchor_scenario() {
        assert_eq!(log2(61, 276 % 61, &nice(61)).unwrap(), 5);
        assert_eq!(log2(19, 276 % 19, &nice(19)).unwrap(), 17);
    }

    #[test]
    fn exhaustive_small_primes() {
        for p in [3u64, 5, 11, 13, 19, 29, 37, 53, 61, 67, 101, 131, 163, 181, 197] {
            let f = nice(p);
            for r in 1..p {
                let e = log2(p, r, &f).unwrap();
                assert!(e < p - 1, "p={p} r={r}");
                assert_eq!(pow_mod(2, e, p), r, "p={p} r={r}");
            }
        }
    }

    #[test]
    fn large_nice_prime() {
        let p = smooth_numbers_in_range(1 << 31, (1 << 32) - 2, &DEFAULT_SMOOTH_PRIMES)
            .into_iter()
            .map(|m| m + 1)
            .find(|&p| classify(p, &DEFAULT_SMOOTH_PRIMES).is_some())
            .unwrap();
        let f = nice(p);
        for r in [1, 2, 3, 12345, p - 1, p / 2] {
            let e = log2(p, r, &f).unwrap();
            assert_eq!(pow_mod(2, e, p), r);
        }
    }

    #[test]
    fn zero_residue_is_invalid_input() {
        assert!(matches!(log2(61, 0, &nice(61)), Err(PtcError::InvalidInput(_))));
        assert!(matches!(log2(61, 61, &nice(61)), Err(PtcError::InvalidInput(_))));
    }

    #[test]
    fn non_generator_is_invariant_violation() {
        // 2 has order 8 mod 17, so 3 has no base-2 log
        let f = factor_smooth(16, &[2]).unwrap();
        assert!(matches!(log2(17, 3, &f), Err(PtcError::InvariantViolation(_))));
    }
}
