// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! JSON-Lines text form of a signature.
//!
//! ```text
//! {"type":"ptc","version":1,"base":2,"created_utc":"2025-12-21T00:00:00Z","note":"..."}
//! {"p":19,"z":false,"e":17}
//! {"p":61,"z":false,"e":5}
//! {"type":"summary","k":2,"M_bits":11,"N_bits":9,"lossless_claim":true}
//! ```
//!
//! Compact JSON, one object per `\n`-terminated line, clocks in ascending
//! prime order. `created_utc`, `note` and the summary line are optional on
//! input. Decoding is strict: unknown keys, a marker/exponent mismatch, a
//! duplicate or composite modulus, an out-of-range exponent or a summary
//! that disagrees with the clocks are all rejected.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{CodecError, Result};
use crate::modmath::is_prime;
use crate::signature::{Clock, Header, Signature, Summary, FORMAT_VERSION};

#[derive(Serialize)]
struct HeaderOut<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    version: u8,
    base: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_utc: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    note: Option<&'a str>,
}

#[derive(Serialize)]
struct ClockOut {
    p: u64,
    z: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    e: Option<u64>,
}

#[derive(Serialize)]
struct SummaryOut {
    #[serde(rename = "type")]
    kind: &'static str,
    k: usize,
    #[serde(rename = "M_bits")]
    m_bits: u64,
    #[serde(rename = "N_bits")]
    n_bits: u64,
    lossless_claim: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct HeaderIn {
    #[serde(rename = "type")]
    kind: String,
    version: u64,
    base: u64,
    #[serde(default)]
    created_utc: Option<String>,
    #[serde(default)]
    note: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ClockIn {
    p: u64,
    z: bool,
    #[serde(default)]
    e: Option<u64>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SummaryIn {
    #[serde(rename = "type")]
    #[allow(dead_code)]
    kind: String,
    k: usize,
    #[serde(rename = "M_bits")]
    m_bits: u64,
    #[serde(rename = "N_bits")]
    n_bits: u64,
    lossless_claim: bool,
}

fn push_line<T: Serialize>(out: &mut Vec<u8>, line: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, line).map_err(|e| CodecError::Json(e.to_string()))?;
    out.push(b'\n');
    Ok(())
}

/// Serialize a signature to its JSONL text form.
pub fn encode_text(sig: &Signature) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(64 + sig.k() * 32);
    let header = sig.header();
    push_line(
        &mut out,
        &HeaderOut {
            kind: "ptc",
            version: header.version,
            base: header.base,
            created_utc: header.created_utc.as_deref(),
            note: header.note.as_deref(),
        },
    )?;

    for clock in sig.clocks() {
        push_line(
            &mut out,
            &ClockOut {
                p: clock.p(),
                z: clock.z(),
                e: clock.e(),
            },
        )?;
    }

    if let Some(s) = sig.summary() {
        push_line(
            &mut out,
            &SummaryOut {
                kind: "summary",
                k: s.k,
                m_bits: s.m_bits,
                n_bits: s.n_bits,
                lossless_claim: s.lossless_claim,
            },
        )?;
    }
    Ok(out)
}

/// Text form as a `String`.
pub fn encode_text_string(sig: &Signature) -> Result<String> {
    String::from_utf8(encode_text(sig)?).map_err(|_| CodecError::InvalidUtf8)
}

fn invalid(line: usize, reason: impl Into<String>) -> CodecError {
    CodecError::InvalidLine {
        line,
        reason: reason.into(),
    }
}

fn parse_header(line: usize, value: Value) -> Result<Header> {
    let h: HeaderIn = serde_json::from_value(value).map_err(|e| invalid(line, format!("header: {e}")))?;
    if h.kind != "ptc" {
        return Err(invalid(line, "header: type must be \"ptc\""));
    }
    if h.version != FORMAT_VERSION as u64 {
        return Err(CodecError::UnsupportedVersion(h.version.min(u8::MAX as u64) as u8));
    }
    let base = u32::try_from(h.base)
        .ok()
        .filter(|b| *b >= 2)
        .ok_or_else(|| invalid(line, "header: base must be an integer >= 2"))?;
    Ok(Header {
        version: FORMAT_VERSION,
        base,
        created_utc: h.created_utc,
        note: h.note,
    })
}

fn parse_clock(line: usize, value: Value) -> Result<Clock> {
    let c: ClockIn = serde_json::from_value(value).map_err(|e| invalid(line, format!("clock: {e}")))?;
    if c.p < 3 {
        return Err(invalid(line, format!("clock: p={} must be >= 3", c.p)));
    }
    let clock = match (c.z, c.e) {
        (true, None) => Clock::Divides { p: c.p },
        (false, Some(e)) => Clock::Residue { p: c.p, e },
        (true, Some(_)) => return Err(invalid(line, format!("clock p={}: z=true must not carry e", c.p))),
        (false, None) => return Err(invalid(line, format!("clock p={}: z=false requires e", c.p))),
    };
    check_clock(&clock)?;
    Ok(clock)
}

/// Consistency of one clock against its own modulus.
pub(crate) fn check_clock(clock: &Clock) -> Result<()> {
    let p = clock.p();
    if !is_prime(p) {
        return Err(CodecError::NotPrime(p));
    }
    if let Some(e) = clock.e() {
        if e >= p - 1 {
            return Err(CodecError::ExponentOutOfRange { p, e });
        }
    }
    Ok(())
}

fn line_kind(obj: &serde_json::Map<String, Value>) -> Option<&str> {
    obj.get("type").and_then(Value::as_str)
}

/// Parse a JSONL signature.
pub fn decode_text(bytes: &[u8]) -> Result<Signature> {
    let text = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)?;

    let mut header: Option<Header> = None;
    let mut clocks: Vec<Clock> = Vec::new();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut summary: Option<(usize, SummaryIn)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(raw).map_err(|e| invalid(line, format!("invalid JSON: {e}")))?;
        let Value::Object(obj) = &value else {
            return Err(invalid(line, "expected a JSON object"));
        };

        if header.is_none() {
            if line_kind(obj) != Some("ptc") {
                return Err(CodecError::MissingHeader);
            }
            header = Some(parse_header(line, value)?);
            continue;
        }

        if summary.is_some() {
            return Err(invalid(line, "content after summary line"));
        }

        if line_kind(obj) == Some("summary") {
            let s: SummaryIn = serde_json::from_value(value).map_err(|e| invalid(line, format!("summary: {e}")))?;
            summary = Some((line, s));
            continue;
        }

        let clock = parse_clock(line, value)?;
        if !seen.insert(clock.p()) {
            return Err(CodecError::DuplicatePrime(clock.p()));
        }
        clocks.push(clock);
    }

    let header = header.ok_or(CodecError::MissingHeader)?;
    if clocks.is_empty() {
        return Err(CodecError::NoClocks);
    }
    clocks.sort_by_key(Clock::p);

    let n_bits = match summary {
        None => None,
        Some((_, s)) => {
            let expected = Summary::for_clocks(&clocks, s.n_bits);
            if s.k != expected.k {
                return Err(CodecError::SummaryMismatch("k"));
            }
            if s.m_bits != expected.m_bits {
                return Err(CodecError::SummaryMismatch("M_bits"));
            }
            if s.lossless_claim != expected.lossless_claim {
                return Err(CodecError::SummaryMismatch("lossless_claim"));
            }
            Some(s.n_bits)
        }
    };

    Ok(Signature::from_validated(header, clocks, n_bits))
}
