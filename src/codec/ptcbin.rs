// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! PTC-bin: dictionary-compressed binary packs of many signatures.
//!
//! ```text
//! "PTC" | vb = version << 4 | base | flags | CRC-32 (BE) of the 5 bytes before it
//! TOWER frame*      index, k, primes (delta-encoded with DELTA_P)
//! SIGNATURE frame*  tower index, meta, clock values
//! END frame
//! ```
//!
//! The END frame is mandatory: a stream that stops before it is truncated,
//! even when it stops exactly on a frame boundary.
//!
//! Signatures that share a prime set share one TOWER frame, so a record
//! carries only its clock values. Records keep `N_bits`, `created_utc` and
//! `note` so that unpacking reproduces the JSONL text byte for byte.

use tracing::debug;

use super::bitio::{exponent_width, BitReader, BitWriter, ByteReader};
use super::dict::{delta_decode, delta_encode, TowerDictionary};
use super::error::{CodecError, Result};
use super::frame::{write_frame, FrameReader, RawFrame, FRAME_END, FRAME_SIGNATURE, FRAME_TOWER};
use super::varint::write_varint;
use crate::modmath::is_prime;
use crate::signature::{modulus_of, Clock, Header, Signature, BASE, FORMAT_VERSION};

/// Pack magic bytes.
pub const MAGIC: &[u8; 3] = b"PTC";
/// Pack format version (high nibble of the `vb` byte).
pub const VERSION: u8 = 1;

pub const FLAG_HAS_CRC32: u8 = 0x01;
pub const FLAG_HAS_LENGTH: u8 = 0x02;
pub const FLAG_BITPACK_E: u8 = 0x04;
pub const FLAG_DELTA_P: u8 = 0x08;

const REQUIRED_FLAGS: u8 = FLAG_HAS_CRC32 | FLAG_HAS_LENGTH;
const KNOWN_FLAGS: u8 = REQUIRED_FLAGS | FLAG_BITPACK_E | FLAG_DELTA_P;

/// Bytes covered by the header CRC: magic, `vb`, flags.
const HEADER_FIELDS_LEN: usize = 5;
/// Fixed header size: magic, `vb`, flags, CRC-32.
pub const HEADER_LEN: usize = HEADER_FIELDS_LEN + 4;

const META_N_BITS: u8 = 0x01;
const META_CREATED: u8 = 0x02;
const META_NOTE: u8 = 0x04;
const KNOWN_META: u8 = META_N_BITS | META_CREATED | META_NOTE;

/// Encoder knobs. Both default to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    /// Bit-pack exponents at `bit_length(p - 2)` bits instead of one varint each.
    pub bitpack_exponents: bool,
    /// Delta-encode tower primes.
    pub delta_primes: bool,
}

impl PackOptions {
    fn flags(&self) -> u8 {
        let mut flags = REQUIRED_FLAGS;
        if self.bitpack_exponents {
            flags |= FLAG_BITPACK_E;
        }
        if self.delta_primes {
            flags |= FLAG_DELTA_P;
        }
        flags
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            bitpack_exponents: true,
            delta_primes: true,
        }
    }
}

/// Decoded fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackHeader {
    pub version: u8,
    pub base: u32,
    pub flags: u8,
}

impl PackHeader {
    pub fn bitpack_exponents(&self) -> bool {
        self.flags & FLAG_BITPACK_E != 0
    }

    pub fn delta_primes(&self) -> bool {
        self.flags & FLAG_DELTA_P != 0
    }

    fn write(&self, out: &mut Vec<u8>) {
        let start = out.len();
        out.extend_from_slice(MAGIC);
        out.push((self.version << 4) | self.base as u8);
        out.push(self.flags);
        let crc = crc32fast::hash(&out[start..]);
        out.extend_from_slice(&crc.to_be_bytes());
    }

    fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(if data.starts_with(&MAGIC[..data.len().min(3)]) {
                CodecError::UnexpectedEof
            } else {
                CodecError::BadMagic
            });
        }
        if &data[..3] != MAGIC {
            return Err(CodecError::BadMagic);
        }
        let stored_crc = u32::from_be_bytes([data[5], data[6], data[7], data[8]]);
        if stored_crc != crc32fast::hash(&data[..HEADER_FIELDS_LEN]) {
            return Err(CodecError::HeaderCrcMismatch);
        }
        let vb = data[3];
        let version = vb >> 4;
        if version != VERSION {
            return Err(CodecError::UnsupportedVersion(version));
        }
        let base = (vb & 0x0F) as u32;
        if base < 2 {
            return Err(CodecError::UnsupportedBase(base));
        }
        let flags = data[4];
        if flags & REQUIRED_FLAGS != REQUIRED_FLAGS || flags & !KNOWN_FLAGS != 0 {
            return Err(CodecError::UnsupportedFlags(flags));
        }
        Ok(Self { version, base, flags })
    }
}

/// One decoded record together with its dictionary index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSignature {
    pub tower: usize,
    pub signature: Signature,
}

/// Fully decoded pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackFile {
    pub header: PackHeader,
    pub towers: TowerDictionary,
    pub records: Vec<PackedSignature>,
}

/// Per-tower line of an [`inspect`] report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TowerStats {
    pub index: usize,
    pub k: usize,
    pub min_p: u64,
    pub max_p: u64,
    pub m_bits: u64,
    /// Number of signature records referencing this tower.
    pub signatures: usize,
}

/// Summary of a pack without materialising text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackStats {
    pub header: PackHeader,
    pub total_bytes: usize,
    pub towers: Vec<TowerStats>,
    pub signatures: usize,
}

/// Pack signatures with the default options.
pub fn pack(signatures: &[Signature]) -> Result<Vec<u8>> {
    pack_with(signatures, PackOptions::default())
}

/// Pack signatures into a PTC-bin byte stream.
///
/// All signatures must share one base, and that base must fit the 4-bit
/// header field. An empty slice yields a header plus END frame with base 2.
pub fn pack_with(signatures: &[Signature], opts: PackOptions) -> Result<Vec<u8>> {
    let base = match signatures.first() {
        Some(s) => s.base(),
        None => BASE,
    };
    if !(2..=15).contains(&base) {
        return Err(CodecError::UnsupportedBase(base));
    }
    if let Some(s) = signatures.iter().find(|s| s.base() != base) {
        return Err(CodecError::MixedBase {
            expected: base,
            found: s.base(),
        });
    }

    // Consolidation pass: every index is fixed before any record is written.
    let mut dict = TowerDictionary::new();
    let refs: Vec<usize> = signatures.iter().map(|s| dict.intern(&s.primes())).collect();

    let header = PackHeader {
        version: VERSION,
        base,
        flags: opts.flags(),
    };
    let mut out = Vec::new();
    header.write(&mut out);

    let mut payload = Vec::new();
    for (index, primes) in dict.towers().iter().enumerate() {
        payload.clear();
        encode_tower(&mut payload, index, primes, opts.delta_primes);
        write_frame(&mut out, FRAME_TOWER, &payload);
    }
    for (sig, &index) in signatures.iter().zip(&refs) {
        payload.clear();
        encode_record(&mut payload, index, sig, opts.bitpack_exponents);
        write_frame(&mut out, FRAME_SIGNATURE, &payload);
    }
    write_frame(&mut out, FRAME_END, &[]);

    debug!(
        signatures = signatures.len(),
        towers = dict.len(),
        bytes = out.len(),
        "packed signatures"
    );
    Ok(out)
}

fn encode_tower(out: &mut Vec<u8>, index: usize, primes: &[u64], delta: bool) {
    write_varint(out, index as u64);
    write_varint(out, primes.len() as u64);
    if delta {
        for d in delta_encode(primes) {
            write_varint(out, d);
        }
    } else {
        for &p in primes {
            write_varint(out, p);
        }
    }
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    write_varint(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

fn encode_record(out: &mut Vec<u8>, index: usize, sig: &Signature, bitpack: bool) {
    write_varint(out, index as u64);

    let header = sig.header();
    let n_bits = sig.summary().map(|s| s.n_bits);
    let mut meta = 0u8;
    if n_bits.is_some() {
        meta |= META_N_BITS;
    }
    if header.created_utc.is_some() {
        meta |= META_CREATED;
    }
    if header.note.is_some() {
        meta |= META_NOTE;
    }
    out.push(meta);
    if let Some(n) = n_bits {
        write_varint(out, n);
    }
    if let Some(ts) = &header.created_utc {
        write_str(out, ts);
    }
    if let Some(note) = &header.note {
        write_str(out, note);
    }

    let clocks = sig.clocks();
    if bitpack {
        let mut bitmap = vec![0u8; clocks.len().div_ceil(8)];
        let mut bits = BitWriter::new();
        for (i, clock) in clocks.iter().enumerate() {
            match *clock {
                Clock::Divides { .. } => bitmap[i / 8] |= 1 << (i % 8),
                Clock::Residue { p, e } => bits.write_bits(e, exponent_width(p)),
            }
        }
        out.extend_from_slice(&bitmap);
        out.extend_from_slice(&bits.flush());
    } else {
        for clock in clocks {
            match *clock {
                Clock::Divides { .. } => write_varint(out, 0),
                Clock::Residue { e, .. } => write_varint(out, e + 1),
            }
        }
    }
}

fn decode_tower(frame: &RawFrame<'_>, expected_index: usize, delta: bool) -> Result<Vec<u64>> {
    let invalid = |reason| CodecError::InvalidFrame {
        frame: frame.index,
        reason,
    };
    let mut r = ByteReader::new(frame.payload);
    let index = r.read_varint()?;
    if index != expected_index as u64 {
        return Err(invalid("tower index out of sequence"));
    }
    let k = r.read_varint()?;
    if k == 0 {
        return Err(invalid("empty tower"));
    }
    // Every prime needs at least one byte.
    if k > frame.payload.len() as u64 {
        return Err(CodecError::UnexpectedEof);
    }
    let mut raw = Vec::with_capacity(k as usize);
    for _ in 0..k {
        raw.push(r.read_varint()?);
    }
    if !r.is_empty() {
        return Err(invalid("trailing bytes in tower frame"));
    }

    let primes = if delta { delta_decode(&raw, frame.index)? } else { raw };
    if primes.windows(2).any(|w| w[0] >= w[1]) {
        return Err(invalid("tower primes not strictly ascending"));
    }
    for &p in &primes {
        if p < 3 {
            return Err(invalid("tower prime below 3"));
        }
        if !is_prime(p) {
            return Err(CodecError::NotPrime(p));
        }
    }
    Ok(primes)
}

fn read_str(r: &mut ByteReader<'_>) -> Result<String> {
    let len = r.read_varint()?;
    let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;
    let bytes = r.read_bytes(len)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
}

fn decode_record(frame: &RawFrame<'_>, header: &PackHeader, dict: &TowerDictionary) -> Result<PackedSignature> {
    let invalid = |reason| CodecError::InvalidFrame {
        frame: frame.index,
        reason,
    };
    let mut r = ByteReader::new(frame.payload);
    let index = r.read_varint()?;
    let primes = usize::try_from(index)
        .ok()
        .and_then(|i| dict.get(i))
        .ok_or(CodecError::UnknownTower {
            frame: frame.index,
            index,
        })?;

    let meta = r.read_u8()?;
    if meta & !KNOWN_META != 0 {
        return Err(invalid("unknown record metadata bits"));
    }
    let n_bits = if meta & META_N_BITS != 0 { Some(r.read_varint()?) } else { None };
    let created_utc = if meta & META_CREATED != 0 { Some(read_str(&mut r)?) } else { None };
    let note = if meta & META_NOTE != 0 { Some(read_str(&mut r)?) } else { None };

    let mut clocks = Vec::with_capacity(primes.len());
    if header.bitpack_exponents() {
        let bitmap = r.read_bytes(primes.len().div_ceil(8))?;
        let mut bits = BitReader::new(r.rest());
        for (i, &p) in primes.iter().enumerate() {
            if (bitmap[i / 8] >> (i % 8)) & 1 == 1 {
                clocks.push(Clock::Divides { p });
            } else {
                let e = bits.read_bits(exponent_width(p))?;
                clocks.push(checked_residue(p, e)?);
            }
        }
        if bits.unread_bytes() != 0 {
            return Err(invalid("trailing bytes in signature record"));
        }
    } else {
        for &p in primes {
            match r.read_varint()? {
                0 => clocks.push(Clock::Divides { p }),
                v => clocks.push(checked_residue(p, v - 1)?),
            }
        }
        if !r.is_empty() {
            return Err(invalid("trailing bytes in signature record"));
        }
    }

    let sig_header = Header {
        version: FORMAT_VERSION,
        base: header.base,
        created_utc,
        note,
    };
    Ok(PackedSignature {
        tower: index as usize,
        signature: Signature::from_validated(sig_header, clocks, n_bits),
    })
}

fn checked_residue(p: u64, e: u64) -> Result<Clock> {
    if e >= p - 1 {
        return Err(CodecError::ExponentOutOfRange { p, e });
    }
    Ok(Clock::Residue { p, e })
}

/// Decode a pack, keeping the dictionary and each record's tower index.
pub fn read_pack(bytes: &[u8]) -> Result<PackFile> {
    let header = PackHeader::parse(bytes)?;
    let mut frames = FrameReader::new(&bytes[HEADER_LEN..]);
    let mut towers = TowerDictionary::new();
    let mut records = Vec::new();
    let mut ended = false;

    while let Some(frame) = frames.next_frame()? {
        if ended {
            return Err(CodecError::InvalidFrame {
                frame: frame.index,
                reason: "frame after END",
            });
        }
        match frame.frame_type {
            FRAME_TOWER => {
                let expected = towers.len();
                let primes = decode_tower(&frame, expected, header.delta_primes())?;
                if towers.intern(&primes) != expected {
                    return Err(CodecError::InvalidFrame {
                        frame: frame.index,
                        reason: "duplicate tower",
                    });
                }
            }
            FRAME_SIGNATURE => records.push(decode_record(&frame, &header, &towers)?),
            FRAME_END => {
                if !frame.payload.is_empty() {
                    return Err(CodecError::InvalidFrame {
                        frame: frame.index,
                        reason: "END frame carries a payload",
                    });
                }
                ended = true;
            }
            other => {
                return Err(CodecError::UnknownFrameType {
                    frame: frame.index,
                    frame_type: other,
                })
            }
        }
    }

    if !ended {
        return Err(CodecError::UnexpectedEof);
    }

    debug!(towers = towers.len(), records = records.len(), "read pack");
    Ok(PackFile {
        header,
        towers,
        records,
    })
}

/// Decode a pack into its signatures, in record order.
pub fn unpack(bytes: &[u8]) -> Result<Vec<Signature>> {
    Ok(read_pack(bytes)?
        .records
        .into_iter()
        .map(|r| r.signature)
        .collect())
}

/// Header, dictionary and usage counts of a pack.
pub fn inspect(bytes: &[u8]) -> Result<PackStats> {
    let pack = read_pack(bytes)?;
    let mut usage = vec![0usize; pack.towers.len()];
    for rec in &pack.records {
        usage[rec.tower] += 1;
    }
    let towers = pack
        .towers
        .towers()
        .iter()
        .enumerate()
        .map(|(index, primes)| {
            let clocks: Vec<Clock> = primes.iter().map(|&p| Clock::Divides { p }).collect();
            TowerStats {
                index,
                k: primes.len(),
                min_p: primes.first().copied().unwrap_or(0),
                max_p: primes.last().copied().unwrap_or(0),
                m_bits: modulus_of(&clocks).bits(),
                signatures: usage[index],
            }
        })
        .collect();
    Ok(PackStats {
        header: pack.header,
        total_bytes: bytes.len(),
        towers,
        signatures: pack.records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(clocks: Vec<Clock>, n_bits: Option<u64>) -> Signature {
        Signature::new(
            Header::new(Some("2025-12-21T00:00:00Z".into()), Some("t".into())),
            clocks,
            n_bits,
        )
        .unwrap()
    }

    fn sample() -> Vec<Signature> {
        vec![
            sig(vec![Clock::Residue { p: 19, e: 17 }, Clock::Residue { p: 61, e: 5 }], Some(9)),
            sig(vec![Clock::Divides { p: 19 }, Clock::Residue { p: 61, e: 59 }], Some(10)),
            sig(vec![Clock::Residue { p: 61, e: 0 }, Clock::Divides { p: 101 }], None),
        ]
    }

    fn raw_header(vb: u8, flags: u8) -> Vec<u8> {
        let mut out = vec![b'P', b'T', b'C', vb, flags];
        let crc = crc32fast::hash(&out);
        out.extend_from_slice(&crc.to_be_bytes());
        out
    }

    #[test]
    fn header_layout() {
        let bytes = pack(&sample()).unwrap();
        assert_eq!(&bytes[..3], b"PTC");
        assert_eq!(bytes[3], 0x12);
        assert_eq!(bytes[4], 0x0F);
        assert_eq!(&bytes[5..9], &crc32fast::hash(&bytes[..5]).to_be_bytes());
    }

    #[test]
    fn roundtrip_both_modes() {
        let sigs = sample();
        for opts in [
            PackOptions::default(),
            PackOptions {
                bitpack_exponents: false,
                delta_primes: false,
            },
        ] {
            let bytes = pack_with(&sigs, opts).unwrap();
            assert_eq!(unpack(&bytes).unwrap(), sigs, "{opts:?}");
        }
    }

    #[test]
    fn shared_towers_are_deduplicated() {
        let pack_file = read_pack(&pack(&sample()).unwrap()).unwrap();
        assert_eq!(pack_file.towers.len(), 2);
        let refs: Vec<usize> = pack_file.records.iter().map(|r| r.tower).collect();
        assert_eq!(refs, vec![0, 0, 1]);
    }

    #[test]
    fn empty_pack() {
        let bytes = pack(&[]).unwrap();
        assert_eq!(bytes[3], 0x12);
        assert!(unpack(&bytes).unwrap().is_empty());
    }

    #[test]
    fn inspect_counts_usage() {
        let stats = inspect(&pack(&sample()).unwrap()).unwrap();
        assert_eq!(stats.signatures, 3);
        assert_eq!(stats.towers.len(), 2);
        assert_eq!(
            stats.towers[0],
            TowerStats {
                index: 0,
                k: 2,
                min_p: 19,
                max_p: 61,
                m_bits: 11,
                signatures: 2
            }
        );
        assert_eq!(stats.towers[1].signatures, 1);
    }

    #[test]
    fn rejects_bad_headers() {
        assert_eq!(unpack(b"XYZ\x12\x0F\0\0\0\0"), Err(CodecError::BadMagic));
        assert_eq!(unpack(b"PT"), Err(CodecError::UnexpectedEof));
        assert_eq!(unpack(b"PTC\x12\x0F"), Err(CodecError::UnexpectedEof));
        assert_eq!(unpack(&raw_header(0x22, 0x0F)), Err(CodecError::UnsupportedVersion(2)));
        assert_eq!(unpack(&raw_header(0x12, 0x0C)), Err(CodecError::UnsupportedFlags(0x0C)));
        assert_eq!(unpack(&raw_header(0x12, 0x1F)), Err(CodecError::UnsupportedFlags(0x1F)));
    }

    #[test]
    fn header_damage_caught_by_crc() {
        let clean = pack(&sample()).unwrap();
        // base nibble 2 -> 3 would otherwise decode and reconstruct wrong values
        let mut bytes = clean.clone();
        bytes[3] ^= 0x01;
        assert_eq!(unpack(&bytes), Err(CodecError::HeaderCrcMismatch));
        let mut bytes = clean;
        bytes[4] ^= FLAG_DELTA_P;
        assert_eq!(unpack(&bytes), Err(CodecError::HeaderCrcMismatch));
    }

    #[test]
    fn missing_end_is_truncation() {
        assert_eq!(unpack(&raw_header(0x12, 0x0F)), Err(CodecError::UnexpectedEof));
        let mut out = raw_header(0x12, 0x0F);
        write_frame(&mut out, FRAME_TOWER, &[0, 1, 19]);
        assert_eq!(unpack(&out), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn every_frame_boundary_cut_rejected() {
        let bytes = pack(&sample()).unwrap();
        let mut boundaries = vec![HEADER_LEN];
        let mut frames = FrameReader::new(&bytes[HEADER_LEN..]);
        let mut pos = HEADER_LEN;
        while let Some(frame) = frames.next_frame().unwrap() {
            let mut len_bytes = Vec::new();
            write_varint(&mut len_bytes, frame.payload.len() as u64);
            pos += 1 + len_bytes.len() + frame.payload.len() + 4;
            boundaries.push(pos);
        }
        assert_eq!(boundaries.pop(), Some(bytes.len()));
        // end of header, then the end of every frame before END
        assert_eq!(boundaries.len(), 6);
        for cut in boundaries {
            assert_eq!(unpack(&bytes[..cut]), Err(CodecError::UnexpectedEof), "cut at {cut}");
        }
        for cut in 0..bytes.len() {
            assert!(unpack(&bytes[..cut]).is_err(), "prefix of {cut} bytes accepted");
        }
    }

    #[test]
    fn rejects_unknown_tower_reference() {
        let mut out = Vec::new();
        PackHeader {
            version: VERSION,
            base: 2,
            flags: REQUIRED_FLAGS,
        }
        .write(&mut out);
        // record pointing at tower 3 with no towers defined
        write_frame(&mut out, FRAME_SIGNATURE, &[3, 0, 0]);
        assert_eq!(unpack(&out), Err(CodecError::UnknownTower { frame: 0, index: 3 }));
    }

    #[test]
    fn rejects_out_of_range_exponent() {
        let mut out = Vec::new();
        PackHeader {
            version: VERSION,
            base: 2,
            flags: REQUIRED_FLAGS,
        }
        .write(&mut out);
        write_frame(&mut out, FRAME_TOWER, &[0, 1, 19]);
        // varint mode: value 19 means e = 18 for p = 19
        write_frame(&mut out, FRAME_SIGNATURE, &[0, 0, 19]);
        assert_eq!(unpack(&out), Err(CodecError::ExponentOutOfRange { p: 19, e: 18 }));
    }

    #[test]
    fn rejects_composite_tower() {
        let mut out = Vec::new();
        PackHeader {
            version: VERSION,
            base: 2,
            flags: REQUIRED_FLAGS,
        }
        .write(&mut out);
        write_frame(&mut out, FRAME_TOWER, &[0, 2, 19, 21]);
        assert_eq!(unpack(&out), Err(CodecError::NotPrime(21)));
    }

    #[test]
    fn rejects_unknown_frame_type() {
        let mut out = Vec::new();
        PackHeader {
            version: VERSION,
            base: 2,
            flags: REQUIRED_FLAGS,
        }
        .write(&mut out);
        write_frame(&mut out, 0x33, &[]);
        assert_eq!(
            unpack(&out),
            Err(CodecError::UnknownFrameType { frame: 0, frame_type: 0x33 })
        );
    }

    #[test]
    fn mixed_bases_rejected() {
        let a = sample().remove(0);
        let b = sample()
            .remove(1)
            .with_header(Header {
                base: 3,
                ..Header::default()
            })
            .unwrap();
        assert_eq!(pack(&[a, b]), Err(CodecError::MixedBase { expected: 2, found: 3 }));
    }
}
