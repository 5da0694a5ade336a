// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Error types for the JSONL and PTC-bin signature codecs.

use std::fmt;

/// Errors that can occur while encoding or decoding a signature.
///
/// Every decode-side variant names the offending line, frame or clock so a
/// caller can report exactly what was rejected. Nothing is auto-corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input data is too short or truncated.
    UnexpectedEof,
    /// The text form is not valid UTF-8.
    InvalidUtf8,
    /// Missing `PTC` magic at the start of a binary pack.
    BadMagic,
    /// Format version not supported by this decoder.
    UnsupportedVersion(u8),
    /// Base does not fit the 4-bit field of the binary header.
    UnsupportedBase(u32),
    /// CRC-32 check failed for the fixed pack header.
    HeaderCrcMismatch,
    /// Header flags lack a required bit or carry unknown bits.
    UnsupportedFlags(u8),
    /// A uLEB128 varint does not fit in 64 bits.
    VarintOverflow,
    /// CRC-32 check failed for the frame at this position.
    CrcMismatch { frame: usize, frame_type: u8 },
    /// Frame type byte not recognised.
    UnknownFrameType { frame: usize, frame_type: u8 },
    /// A frame payload has invalid or inconsistent content.
    InvalidFrame { frame: usize, reason: &'static str },
    /// A signature record references a tower that is not in the dictionary.
    UnknownTower { frame: usize, index: u64 },
    /// A text line is not a JSON object of the expected shape.
    InvalidLine { line: usize, reason: String },
    /// No `{"type":"ptc",...}` header line was found.
    MissingHeader,
    /// The signature carries no clock records.
    NoClocks,
    /// The same prime appears in two clocks.
    DuplicatePrime(u64),
    /// A clock modulus is not prime, so CRT over the tower is undefined.
    NotPrime(u64),
    /// Exponent is outside `[0, p - 1)`.
    ExponentOutOfRange { p: u64, e: u64 },
    /// Recomputed residue contradicts the clock's zero marker.
    ResidueMismatch { p: u64 },
    /// A clock modulus shares a factor with the moduli before it.
    NotCoprime { p: u64 },
    /// The summary line disagrees with the clocks it summarises.
    SummaryMismatch(&'static str),
    /// Signatures in one pack must share a base.
    MixedBase { expected: u32, found: u32 },
    /// Serializer failure while writing a JSON line.
    Json(String),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of signature data"),
            Self::InvalidUtf8 => write!(f, "signature text is not valid UTF-8"),
            Self::BadMagic => write!(f, "missing PTC magic (not a PTC-bin pack)"),
            Self::UnsupportedVersion(v) => write!(f, "unsupported format version: {v}"),
            Self::UnsupportedBase(b) => write!(f, "unsupported base for PTC-bin: {b}"),
            Self::HeaderCrcMismatch => write!(f, "CRC32 mismatch in pack header"),
            Self::UnsupportedFlags(fl) => write!(f, "unsupported header flags: 0x{fl:02x}"),
            Self::VarintOverflow => write!(f, "varint does not fit in 64 bits"),
            Self::CrcMismatch { frame, frame_type } => {
                write!(f, "CRC32 mismatch in frame {frame} (type 0x{frame_type:02x})")
            }
            Self::UnknownFrameType { frame, frame_type } => {
                write!(f, "unknown frame type 0x{frame_type:02x} at frame {frame}")
            }
            Self::InvalidFrame { frame, reason } => write!(f, "invalid frame {frame}: {reason}"),
            Self::UnknownTower { frame, index } => {
                write!(f, "frame {frame} references unknown tower index {index}")
            }
            Self::InvalidLine { line, reason } => write!(f, "line {line}: {reason}"),
            Self::MissingHeader => write!(f, "empty input or missing ptc header"),
            Self::NoClocks => write!(f, "signature has no clock records"),
            Self::DuplicatePrime(p) => write!(f, "duplicate clock for p={p}"),
            Self::NotPrime(p) => write!(f, "clock modulus p={p} is not prime"),
            Self::ExponentOutOfRange { p, e } => {
                write!(f, "clock p={p}: exponent e={e} out of range [0, {})", p.saturating_sub(1))
            }
            Self::ResidueMismatch { p } => {
                write!(f, "clock p={p}: recomputed residue contradicts zero marker")
            }
            Self::NotCoprime { p } => write!(f, "clock modulus p={p} is not coprime to the tower"),
            Self::SummaryMismatch(field) => write!(f, "summary field {field} disagrees with clocks"),
            Self::MixedBase { expected, found } => {
                write!(f, "mixed bases in one pack (expected {expected}, found {found})")
            }
            Self::Json(msg) => write!(f, "JSON serialization failed: {msg}"),
        }
    }
}

impl std::error::Error for CodecError {}

pub type Result<T> = std::result::Result<T, CodecError>;
