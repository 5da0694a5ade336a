// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Format-agnostic signature model.
//!
//! A [`Signature`] is a header, a list of [`Clock`]s sorted by ascending
//! prime and an optional [`Summary`]. Both codecs produce and consume this
//! type; neither ever mutates one in place.

use num_bigint::BigUint;
use num_traits::One;

use crate::error::{PtcError, Result};
use crate::modmath::{is_prime, pow_mod};

/// Text and binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// Base of every exponent produced by the engine.
pub const BASE: u32 = 2;

/// Note written into the header of freshly built signatures.
pub const DEFAULT_NOTE: &str = "Prime Tower Clocks signature";

/// One clock reading of N against a prime modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Clock {
    /// `p` divides N (the `z` marker); no exponent exists.
    Divides { p: u64 },
    /// `base^e ≡ N (mod p)` with `0 <= e < p - 1`.
    Residue { p: u64, e: u64 },
}

impl Clock {
    /// Build a clock from its wire fields `{p, z, e?}`.
    ///
    /// `e` must be present exactly when `z` is false.
    pub fn from_parts(p: u64, z: bool, e: Option<u64>) -> Result<Self> {
        match (z, e) {
            (true, None) => Ok(Self::Divides { p }),
            (false, Some(e)) => Ok(Self::Residue { p, e }),
            (true, Some(_)) => Err(PtcError::InvalidInput(format!(
                "clock p={p}: z=true must not carry an exponent"
            ))),
            (false, None) => Err(PtcError::InvalidInput(format!(
                "clock p={p}: z=false requires an exponent"
            ))),
        }
    }

    #[inline]
    pub fn p(&self) -> u64 {
        match *self {
            Self::Divides { p } | Self::Residue { p, .. } => p,
        }
    }

    /// The zero marker: true when p divides N.
    #[inline]
    pub fn z(&self) -> bool {
        matches!(self, Self::Divides { .. })
    }

    #[inline]
    pub fn e(&self) -> Option<u64> {
        match *self {
            Self::Divides { .. } => None,
            Self::Residue { e, .. } => Some(e),
        }
    }

    /// The residue `N mod p` implied by this clock, recomputed from `e`.
    pub fn residue(&self, base: u32) -> u64 {
        match *self {
            Self::Divides { .. } => 0,
            Self::Residue { p, e } => pow_mod(base as u64, e, p),
        }
    }
}

/// Signature header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    pub base: u32,
    /// ISO-8601 UTC timestamp, second precision, `Z` suffix.
    pub created_utc: Option<String>,
    pub note: Option<String>,
}

impl Header {
    pub fn new(created_utc: Option<String>, note: Option<String>) -> Self {
        Self {
            version: FORMAT_VERSION,
            base: BASE,
            created_utc,
            note,
        }
    }

    /// Header stamped with the current time.
    pub fn now(note: &str) -> Self {
        Self::new(Some(utc_now_iso()), Some(note.to_string()))
    }

    /// Rejects headers that neither codec would read back.
    pub fn validate(&self) -> Result<()> {
        if self.version != FORMAT_VERSION {
            return Err(PtcError::InvalidInput(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                self.version
            )));
        }
        if self.base < 2 {
            return Err(PtcError::InvalidInput(format!("base must be >= 2, got {}", self.base)));
        }
        Ok(())
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SSZ`.
pub fn utc_now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Trailing summary line. Not needed for reconstruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub k: usize,
    pub m_bits: u64,
    pub n_bits: u64,
    /// `m_bits > n_bits`, which implies M > N (the converse does not hold).
    pub lossless_claim: bool,
}

impl Summary {
    /// Summary for a clock list and the bit length of the encoded N.
    pub fn for_clocks(clocks: &[Clock], n_bits: u64) -> Self {
        let m_bits = modulus_of(clocks).bits();
        Self {
            k: clocks.len(),
            m_bits,
            n_bits,
            lossless_claim: m_bits > n_bits,
        }
    }
}

/// Product of all clock moduli.
pub fn modulus_of(clocks: &[Clock]) -> BigUint {
    clocks
        .iter()
        .fold(BigUint::one(), |m, c| m * BigUint::from(c.p()))
}

/// A complete Prime Tower Clocks signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    header: Header,
    clocks: Vec<Clock>,
    summary: Option<Summary>,
}

impl Signature {
    /// Assemble a signature from caller-supplied clocks.
    ///
    /// Clocks are sorted by ascending prime. Rejects an invalid header, an
    /// empty clock list, moduli that are below 3 or composite, duplicate
    /// moduli and exponents outside `[0, p - 1)`. When `n_bits` is given the
    /// summary is derived from it.
    pub fn new(header: Header, mut clocks: Vec<Clock>, n_bits: Option<u64>) -> Result<Self> {
        header.validate()?;
        if clocks.is_empty() {
            return Err(PtcError::InvalidInput("signature needs at least one clock".into()));
        }
        clocks.sort_by_key(Clock::p);
        for pair in clocks.windows(2) {
            if pair[0].p() == pair[1].p() {
                return Err(PtcError::InvalidInput(format!("duplicate clock for p={}", pair[0].p())));
            }
        }
        for c in &clocks {
            if c.p() < 3 {
                return Err(PtcError::InvalidInput(format!("clock modulus p={} must be >= 3", c.p())));
            }
            if !is_prime(c.p()) {
                return Err(PtcError::InvalidInput(format!("clock modulus p={} is not prime", c.p())));
            }
            if let Some(e) = c.e() {
                if e >= c.p() - 1 {
                    return Err(PtcError::InvalidInput(format!(
                        "clock p={}: exponent {e} out of range",
                        c.p()
                    )));
                }
            }
        }
        Ok(Self::from_validated(header, clocks, n_bits))
    }

    /// Assemble from clocks the caller already sorted and checked.
    pub(crate) fn from_validated(header: Header, clocks: Vec<Clock>, n_bits: Option<u64>) -> Self {
        let summary = n_bits.map(|n| Summary::for_clocks(&clocks, n));
        Self {
            header,
            clocks,
            summary,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Clocks in ascending prime order.
    pub fn clocks(&self) -> &[Clock] {
        &self.clocks
    }

    pub fn summary(&self) -> Option<&Summary> {
        self.summary.as_ref()
    }

    pub fn base(&self) -> u32 {
        self.header.base
    }

    pub fn k(&self) -> usize {
        self.clocks.len()
    }

    /// Ascending tower primes.
    pub fn primes(&self) -> Vec<u64> {
        self.clocks.iter().map(Clock::p).collect()
    }

    /// M, the product of all clock moduli.
    pub fn modulus(&self) -> BigUint {
        modulus_of(&self.clocks)
    }

    pub fn m_bits(&self) -> u64 {
        self.modulus().bits()
    }

    /// Same clocks and summary under a different header.
    pub fn with_header(self, header: Header) -> Result<Self> {
        header.validate()?;
        Ok(Self { header, ..self })
    }
}
