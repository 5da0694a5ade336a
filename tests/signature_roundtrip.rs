// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! End-to-end tests: build a signature, serialize it, decode it and
//! reconstruct N.

use num_bigint::BigUint;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use ptc_core::modmath::pow_mod;
use ptc_core::{
    build_signature, decode_text, encode_text, parse_decimal, reconstruct, Clock, Preset, PtcError, StrategyConfig,
};

fn random_decimal(rng: &mut ChaCha20Rng, digits: usize) -> String {
    let mut s = String::with_capacity(digits);
    s.push(char::from(b'1' + rng.gen_range(0..9u8)));
    for _ in 1..digits {
        s.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    s
}

#[test]
fn scenario_276_fit_preset() {
    let n = BigUint::from(276u32);
    let sig = build_signature(&n, &StrategyConfig::default()).unwrap();
    assert_eq!(sig.primes(), vec![19, 61]);
    assert_eq!(sig.clocks()[0], Clock::Residue { p: 19, e: 17 });
    assert_eq!(sig.clocks()[1], Clock::Residue { p: 61, e: 5 });

    let summary = sig.summary().unwrap();
    assert_eq!(summary.m_bits, 11);
    assert_eq!(summary.n_bits, 9);
    assert!(summary.lossless_claim);

    let rec = reconstruct(&sig).unwrap();
    assert_eq!(rec.value, n);
    assert_eq!(rec.modulus, BigUint::from(1159u32));
    assert!(rec.lossless_by_bits);
}

#[test]
fn random_sweep_all_presets() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x5054_4331);
    for preset in Preset::ALL {
        let cfg = preset.config();
        for digits in [1usize, 2, 7, 19, 40, 80] {
            let n = parse_decimal(&random_decimal(&mut rng, digits)).unwrap();
            let sig = build_signature(&n, &cfg).unwrap();

            // every clock reads n correctly
            for clock in sig.clocks() {
                let p = clock.p();
                let r = (&n % p).iter_u64_digits().next().unwrap_or(0);
                match *clock {
                    Clock::Divides { .. } => assert_eq!(r, 0, "{preset} p={p}"),
                    Clock::Residue { e, .. } => {
                        assert!(e < p - 1);
                        assert_eq!(pow_mod(2, e, p), r, "{preset} p={p}");
                    }
                }
            }

            let text = encode_text(&sig).unwrap();
            let back = decode_text(&text).unwrap();
            assert_eq!(back, sig);

            let rec = reconstruct(&back).unwrap();
            assert!(rec.modulus > n);
            assert_eq!(rec.value, n, "{preset} digits={digits}");
            assert!(rec.is_lossless_for(&n));
        }
    }
}

#[test]
fn zero_marker_iff_divisor() {
    // 61 divides every multiple of 61
    for mult in [1u32, 2, 17, 1000] {
        let n = BigUint::from(61u32 * mult);
        let sig = build_signature(&n, &StrategyConfig::default()).unwrap();
        let anchor = sig.clocks().iter().find(|c| c.p() == 61).unwrap();
        assert!(anchor.z(), "61 | {n}");
        let text = String::from_utf8(encode_text(&sig).unwrap()).unwrap();
        assert!(text.contains("{\"p\":61,\"z\":true}\n"), "{text}");
        assert_eq!(reconstruct(&sig).unwrap().value, n);
    }
}

#[test]
fn big_input_stays_lossless() {
    let n = parse_decimal(&"9".repeat(300)).unwrap();
    let sig = build_signature(&n, &Preset::Safe.config()).unwrap();
    let s = sig.summary().unwrap();
    assert!(s.lossless_claim);
    assert!(s.m_bits > s.n_bits);
    assert_eq!(reconstruct(&sig).unwrap().value, n);
}

#[test]
fn pool_exhaustion_is_reported() {
    let cfg = Preset::Fast.config().with_overrides(None, Some(1_000), None);
    let n = parse_decimal(&"1".repeat(200)).unwrap();
    match build_signature(&n, &cfg) {
        Err(PtcError::PoolExhausted { digits, .. }) => assert_eq!(digits, 200),
        other => panic!("expected PoolExhausted, got {other:?}"),
    }
}

#[test]
fn negative_and_malformed_input_rejected() {
    for bad in ["-1", "12x", ""] {
        assert!(matches!(parse_decimal(bad), Err(PtcError::InvalidInput(_))), "{bad:?}");
    }
}
