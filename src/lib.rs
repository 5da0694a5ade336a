// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! # ptc-core
//!
//! Prime Tower Clocks: represent a non-negative integer N by its readings
//! against a tower of "nice" primes, so that the Chinese Remainder Theorem
//! recovers N (or N mod M, M = product of the tower) from the readings alone.
//!
//! - **Engine** (`tower` module): nice-prime oracle, Pohlig–Hellman base-2
//!   discrete logs, preset-driven tower selection and CRT reconstruction.
//! - **Codecs** (`codec` module): a JSON-Lines text form and PTC-bin, a
//!   CRC-framed binary pack that shares prime towers between signatures.
//! - **Batch** (`batch` module): parallel signature building and directory
//!   pack/unpack.
//!
//! Not a cryptographic primitive and not a compressor: every signature is a
//! declared, inspectable algebraic encoding.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use ptc_core::{build_signature, decode_text, encode_text, parse_decimal, reconstruct, StrategyConfig};
//!
//! let n = parse_decimal("276").unwrap();
//! let sig = build_signature(&n, &StrategyConfig::default()).unwrap();
//! let text = encode_text(&sig).unwrap();
//! let back = decode_text(&text).unwrap();
//! assert_eq!(reconstruct(&back).unwrap().value, n);
//! ```

pub mod modmath;
pub mod error;
pub mod signature;
pub mod codec;
pub mod tower;
pub mod batch;

pub use error::{PtcError, Result};
pub use signature::{Clock, Header, Signature, Summary, BASE, DEFAULT_NOTE, FORMAT_VERSION};
pub use codec::{
    decode_text, encode_text, encode_text_string, inspect, pack, pack_with, read_pack, unpack, CodecError,
    PackOptions, PackStats,
};
pub use tower::{
    build_signature, build_signature_with_header, classify, log2, parse_decimal, reconstruct, select,
    select_for_digits, NiceCache, NicePrime, Preset, Reconstruction, SelectionPolicy, StrategyConfig, Tower,
};
pub use batch::{build_signatures, pack_dir, pack_files, unpack_to_dir};
