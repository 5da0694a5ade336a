// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! The signature engine: nice primes, discrete logs, tower selection and
//! CRT reconstruction.
//!
//! Encoding selects a tower with M > 10^D for the D-digit input, then reads
//! N against every clock: a prime dividing N becomes a zero marker, any
//! other residue is replaced by its base-2 discrete log. Decoding
//! recomputes each residue as 2^e mod p and recombines them by CRT.

pub mod nice;
pub mod dlog;
pub mod strategy;
pub mod select;
pub mod crt;

use num_bigint::BigUint;
use tracing::debug;

use crate::error::{PtcError, Result};
use crate::signature::{Clock, Header, Signature, BASE, DEFAULT_NOTE};

pub use crt::{crt_combine, reconstruct, Reconstruction};
pub use dlog::log2;
pub use nice::{classify, Factorization, NiceCache, NicePrime, DEFAULT_SMOOTH_PRIMES};
pub use select::{digit_count, select, select_for_digits, select_with_cache, threshold, Tower};
pub use strategy::{Preset, SelectionPolicy, StrategyConfig, DEFAULT_ANCHOR};

/// Signature of `n` under `cfg`, stamped with the current time.
pub fn build_signature(n: &BigUint, cfg: &StrategyConfig) -> Result<Signature> {
    build_signature_with_header(n, cfg, Header::now(DEFAULT_NOTE))
}

/// Signature of `n` under `cfg` with a caller-supplied header.
///
/// The header base must be 2; every clock exponent is a base-2 log.
pub fn build_signature_with_header(n: &BigUint, cfg: &StrategyConfig, header: Header) -> Result<Signature> {
    header.validate()?;
    if header.base != BASE {
        return Err(PtcError::InvalidInput(format!(
            "signatures are built in base {BASE}, header says {}",
            header.base
        )));
    }
    let tower = select(n, cfg)?;
    let clocks = clocks_for(n, &tower)?;
    let sig = Signature::from_validated(header, clocks, Some(n.bits()));
    debug!(k = sig.k(), m_bits = sig.m_bits(), n_bits = n.bits(), "built signature");
    Ok(sig)
}

/// Read `n` against every clock of `tower`.
pub fn clocks_for(n: &BigUint, tower: &Tower) -> Result<Vec<Clock>> {
    tower
        .nice_primes()
        .iter()
        .map(|np| {
            let p = np.p;
            match crt::rem_u64(n, p) {
                0 => Ok(Clock::Divides { p }),
                r => Ok(Clock::Residue { p, e: np.log2(r)? }),
            }
        })
        .collect()
}

/// Parse a non-negative decimal integer. Surrounding whitespace is allowed;
/// signs and any non-digit character are not.
pub fn parse_decimal(s: &str) -> Result<BigUint> {
    let t = s.trim();
    if t.is_empty() {
        return Err(PtcError::InvalidInput("empty number".into()));
    }
    if t.starts_with('-') {
        return Err(PtcError::InvalidInput(format!("N must be non-negative, got {t}")));
    }
    if !t.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PtcError::InvalidInput(format!("not a decimal integer: {t:?}")));
    }
    BigUint::parse_bytes(t.as_bytes(), 10)
        .ok_or_else(|| PtcError::InvalidInput(format!("not a decimal integer: {t:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;

    fn fixed_header() -> Header {
        Header::new(Some("2025-12-21T00:00:00Z".into()), Some(DEFAULT_NOTE.into()))
    }

    #[test]
    fn scenario_276() {
        let n = BigUint::from(276u32);
        let sig = build_signature_with_header(&n, &StrategyConfig::default(), fixed_header()).unwrap();
        assert_eq!(sig.clocks(), &[Clock::Residue { p: 19, e: 17 }, Clock::Residue { p: 61, e: 5 }]);
        let s = sig.summary().unwrap();
        assert_eq!((s.k, s.m_bits, s.n_bits, s.lossless_claim), (2, 11, 9, true));
        let rec = reconstruct(&sig).unwrap();
        assert_eq!(rec.value, n);
    }

    #[test]
    fn zero_marker_for_divisor() {
        // 1159 = 19 * 61; fit needs p >= 10^4 / 61 + 1 = 164 and finds 181
        let n = BigUint::from(1159u32);
        let sig = build_signature_with_header(&n, &StrategyConfig::default(), fixed_header()).unwrap();
        assert_eq!(sig.primes(), vec![61, 181]);
        assert_eq!(sig.clocks()[0], Clock::Divides { p: 61 });
        assert!(!sig.clocks()[1].z());
        assert_eq!(reconstruct(&sig).unwrap().value, n);
    }

    #[test]
    fn zero_input() {
        let sig = build_signature(&BigUint::zero(), &StrategyConfig::default()).unwrap();
        assert!(sig.clocks().iter().all(Clock::z));
        assert_eq!(sig.summary().unwrap().n_bits, 0);
        assert!(reconstruct(&sig).unwrap().value.is_zero());
    }

    #[test]
    fn rejects_other_bases() {
        let header = Header {
            base: 3,
            ..Header::default()
        };
        let r = build_signature_with_header(&BigUint::from(5u32), &StrategyConfig::default(), header);
        assert!(matches!(r, Err(PtcError::InvalidInput(_))));
    }

    #[test]
    fn decimal_parsing() {
        assert_eq!(parse_decimal(" 276\n").unwrap(), BigUint::from(276u32));
        assert_eq!(parse_decimal("000").unwrap(), BigUint::zero());
        assert_eq!(parse_decimal("007").unwrap(), BigUint::from(7u32));
        for bad in ["", "  ", "-5", "+5", "12a", "1_000", "0x10", "1.5"] {
            assert!(matches!(parse_decimal(bad), Err(PtcError::InvalidInput(_))), "{bad:?}");
        }
    }
}
