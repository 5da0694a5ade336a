// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Error types for the signature engine.
//!
//! [`PtcError`] covers all failure modes from input validation through tower
//! selection, discrete logs and reconstruction. Decode failures from the
//! codecs arrive wrapped as [`PtcError::CorruptSignature`].

use core::fmt;

use crate::codec::error::CodecError;

/// Errors that can occur while building, decoding or reconstructing a signature.
#[derive(Debug)]
pub enum PtcError {
    /// Rejected input: negative or malformed N, bad strategy values, a
    /// non-nice anchor, a zero residue handed to the solver, or a clock
    /// whose zero marker and exponent disagree.
    InvalidInput(String),
    /// The candidate pool ran out before the tower modulus passed `10^digits`.
    PoolExhausted { digits: u32, chosen: usize, pool: usize },
    /// A certified nice prime failed a check it must pass. Indicates a bug.
    InvariantViolation(String),
    /// Decode-time mismatch in either wire form.
    CorruptSignature(CodecError),
    /// Filesystem failure in the directory helpers.
    Io(std::io::Error),
}

impl fmt::Display for PtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Self::PoolExhausted { digits, chosen, pool } => write!(
                f,
                "nice prime pool exhausted before M > 10^{digits} ({chosen} clocks chosen from a pool of {pool}); widen min_p/max_p or pool_limit"
            ),
            Self::InvariantViolation(msg) => write!(f, "internal invariant violated: {msg}"),
            Self::CorruptSignature(e) => write!(f, "corrupt signature: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PtcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CorruptSignature(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CodecError> for PtcError {
    fn from(e: CodecError) -> Self {
        Self::CorruptSignature(e)
    }
}

impl From<std::io::Error> for PtcError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, PtcError>;
