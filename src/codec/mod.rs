// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Signature wire formats.
//!
//! Two interchangeable serializations of the same [`Signature`](crate::Signature):
//!
//! - **JSONL** (`encode_text` / `decode_text`): one JSON object per line,
//!   human readable, self-describing.
//! - **PTC-bin** (`pack` / `unpack`): many signatures in one CRC-framed
//!   stream, with prime towers deduplicated into a shared dictionary.
//!
//! Decoders never repair input. Any inconsistency is a [`CodecError`] that
//! names the line, frame or clock at fault.

pub mod error;
pub mod varint;
pub mod bitio;
pub mod frame;
pub mod dict;
pub mod jsonl;
pub mod ptcbin;

pub use error::CodecError;
pub use jsonl::{decode_text, encode_text, encode_text_string};
pub use ptcbin::{
    inspect, pack, pack_with, read_pack, unpack, PackFile, PackHeader, PackOptions, PackStats,
    PackedSignature, TowerStats,
};
