// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Word-sized modular arithmetic shared by the oracle, the discrete-log
//! solver and CRT reconstruction.
//!
//! Every clock modulus fits in a `u64`, so products are taken in `u128` and
//! reduced immediately. Only the accumulated CRT modulus ever needs a big
//! integer, and that lives in [`crate::tower::crt`].

// ──────────────────────────────────────────────────────────────────────────
// Miller–Rabin witnesses that are exhaustive for every n < 2^64
// (Jim Sinclair's seven-base set).
// ──────────────────────────────────────────────────────────────────────────

const MR_WITNESSES: [u64; 7] = [2, 325, 9375, 28178, 450775, 9780504, 1795265022];

/// Small primes used for trial division before Miller–Rabin.
const SMALL_PRIMES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// `a * b mod m` without overflow.
#[inline]
pub fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    (a as u128 * b as u128 % m as u128) as u64
}

/// `base^exp mod modulus` by square-and-multiply.
pub fn pow_mod(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut result: u64 = 1;
    base %= modulus;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, modulus);
        }
        exp >>= 1;
        base = mul_mod(base, base, modulus);
    }
    result
}

/// Modular inverse of `a` mod `m` via the extended Euclidean algorithm.
///
/// Returns `None` when `gcd(a, m) != 1`. Works for any modulus, prime or not,
/// which lets CRT callers detect non-coprime moduli instead of assuming them.
pub fn mod_inverse(a: u64, m: u64) -> Option<u64> {
    if m == 0 {
        return None;
    }
    if m == 1 {
        return Some(0);
    }
    let (mut old_r, mut r) = ((a % m) as i128, m as i128);
    let (mut old_s, mut s) = (1i128, 0i128);
    while r != 0 {
        let q = old_r / r;
        (old_r, r) = (r, old_r - q * r);
        (old_s, s) = (s, old_s - q * s);
    }
    if old_r != 1 {
        return None;
    }
    Some(old_s.rem_euclid(m as i128) as u64)
}

/// Combine `x ≡ a1 (mod m1)` and `x ≡ a2 (mod m2)` into `x ≡ a (mod m1·m2)`.
///
/// Requires coprime moduli whose product fits in a `u64`; returns `None`
/// otherwise. Used to stitch Pohlig–Hellman partial logs back together,
/// where the moduli are the prime-power factors of `p − 1`.
pub fn crt_pair(a1: u64, m1: u64, a2: u64, m2: u64) -> Option<(u64, u64)> {
    let m = m1.checked_mul(m2)?;
    let inv = mod_inverse(m1 % m2, m2)?;
    let diff = (a2 % m2 + m2 - a1 % m2) % m2;
    let t = mul_mod(diff, inv, m2);
    let x = (a1 as u128 + m1 as u128 * t as u128) % m as u128;
    Some((x as u64, m))
}

// ──────────────────────────────────────────────────────────────────────────
// Primality
// ──────────────────────────────────────────────────────────────────────────

/// Deterministic primality test for the full `u64` range.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &SMALL_PRIMES {
        if n == p {
            return true;
        }
        if n % p == 0 {
            return false;
        }
    }

    // n - 1 = d * 2^s with d odd
    let mut d = n - 1;
    let mut s = 0u32;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }

    'witness: for &w in &MR_WITNESSES {
        let a = w % n;
        if a == 0 {
            continue;
        }
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Number of bits needed to hold `v` (0 for 0).
#[inline]
pub fn bit_length(v: u64) -> u32 {
    u64::BITS - v.leading_zeros()
}
