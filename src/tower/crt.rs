// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! CRT reconstruction of N mod M from a signature's clocks.

use num_bigint::BigUint;
use num_traits::{One, Zero};

use crate::codec::error::CodecError;
use crate::error::Result;
use crate::modmath::{mod_inverse, mul_mod};
use crate::signature::Signature;

/// Result of recombining a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconstruction {
    /// N mod M.
    pub value: BigUint,
    /// M, the product of all clock moduli.
    pub modulus: BigUint,
    /// The embedded summary claims losslessness: it is present and
    /// `M_bits > N_bits`. False when the signature has no summary.
    pub lossless_by_bits: bool,
}

impl Reconstruction {
    /// True when `n < M`, i.e. `value` is `n` itself.
    pub fn is_lossless_for(&self, n: &BigUint) -> bool {
        *n < self.modulus
    }

    pub fn m_bits(&self) -> u64 {
        self.modulus.bits()
    }
}

/// `n mod p` for a word-sized modulus.
pub(crate) fn rem_u64(n: &BigUint, p: u64) -> u64 {
    (n % p).iter_u64_digits().next().unwrap_or(0)
}

/// Combine `x ≡ r_i (mod p_i)` for pairwise coprime `p_i`.
///
/// Returns `(x mod M, M)`. A modulus sharing a factor with the product of
/// the ones before it is rejected as [`CodecError::NotCoprime`].
pub fn crt_combine(congruences: &[(u64, u64)]) -> Result<(BigUint, BigUint)> {
    let mut x = BigUint::zero();
    let mut m = BigUint::one();
    for &(r, p) in congruences {
        if p < 2 {
            return Err(CodecError::NotCoprime { p }.into());
        }
        let m_mod_p = rem_u64(&m, p);
        let inv = mod_inverse(m_mod_p, p).ok_or(CodecError::NotCoprime { p })?;
        let x_mod_p = rem_u64(&x, p);
        let diff = (r % p + p - x_mod_p) % p;
        let t = mul_mod(diff, inv, p);
        x += &m * t;
        m *= p;
    }
    Ok((x, m))
}

/// Recombine a signature into N mod M.
///
/// Each residue is recomputed from its exponent. A `z = false` clock whose
/// residue comes out as 0, or an exponent outside `[0, p − 1)`, marks the
/// signature corrupt.
pub fn reconstruct(sig: &Signature) -> Result<Reconstruction> {
    let base = sig.base();
    let mut congruences = Vec::with_capacity(sig.k());
    for clock in sig.clocks() {
        let p = clock.p();
        if let Some(e) = clock.e() {
            if e >= p.saturating_sub(1) {
                return Err(CodecError::ExponentOutOfRange { p, e }.into());
            }
        }
        let r = clock.residue(base);
        if !clock.z() && r == 0 {
            return Err(CodecError::ResidueMismatch { p }.into());
        }
        congruences.push((r, p));
    }
    if congruences.is_empty() {
        return Err(CodecError::NoClocks.into());
    }

    let (value, modulus) = crt_combine(&congruences)?;
    let lossless_by_bits = sig.summary().is_some_and(|s| modulus.bits() > s.n_bits);
    Ok(Reconstruction {
        value,
        modulus,
        lossless_by_bits,
    })
}
