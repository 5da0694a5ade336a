// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Byte- and bit-level I/O for PTC-bin payloads.
//!
//! [`ByteReader`] walks a frame payload field by field. [`BitWriter`] and
//! [`BitReader`] pack clock exponents LSB-first, each exponent taking
//! exactly [`exponent_width`] bits for its prime.

use super::error::{CodecError, Result};
use super::varint::read_varint;
use crate::modmath::bit_length;

/// Bits needed for an exponent in `[0, p - 2]`: `bit_length(p - 2)`.
#[inline]
pub fn exponent_width(p: u64) -> u32 {
    bit_length(p.saturating_sub(2))
}

/// Sequential reader over a payload slice.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
        self.pos += 1;
        Ok(b)
    }

    pub fn read_varint(&mut self) -> Result<u64> {
        let (v, next) = read_varint(self.data, self.pos)?;
        self.pos = next;
        Ok(v)
    }

    /// Borrow the next `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).ok_or(CodecError::UnexpectedEof)?;
        let slice = self.data.get(self.pos..end).ok_or(CodecError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Everything not yet consumed.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }
}

/// LSB-first bit packer.
pub struct BitWriter {
    output: Vec<u8>,
    /// Pending bits, right-aligned. Never holds more than 7 + 64 bits.
    buf: u128,
    bits_used: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self {
            output: Vec::new(),
            buf: 0,
            bits_used: 0,
        }
    }

    /// Write the low `count` bits (0–64) of `value`.
    pub fn write_bits(&mut self, value: u64, count: u32) {
        debug_assert!(count <= 64);
        if count == 0 {
            return;
        }
        let masked = if count == 64 { value } else { value & ((1u64 << count) - 1) };
        self.buf |= (masked as u128) << self.bits_used;
        self.bits_used += count;
        while self.bits_used >= 8 {
            self.output.push(self.buf as u8);
            self.buf >>= 8;
            self.bits_used -= 8;
        }
    }

    /// Zero-pad the final partial byte and return the packed bytes.
    pub fn flush(mut self) -> Vec<u8> {
        if self.bits_used > 0 {
            self.output.push(self.buf as u8);
        }
        self.output
    }
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// LSB-first bit unpacker, the inverse of [`BitWriter`].
pub struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
    buf: u128,
    bits_left: u32,
}

impl<'a> BitReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            buf: 0,
            bits_left: 0,
        }
    }

    /// Read `count` bits (0–64).
    pub fn read_bits(&mut self, count: u32) -> Result<u64> {
        debug_assert!(count <= 64);
        if count == 0 {
            return Ok(0);
        }
        while self.bits_left < count {
            let byte = *self.data.get(self.pos).ok_or(CodecError::UnexpectedEof)?;
            self.pos += 1;
            self.buf |= (byte as u128) << self.bits_left;
            self.bits_left += 8;
        }
        let mask = if count == 64 { u64::MAX as u128 } else { (1u128 << count) - 1 };
        let v = (self.buf & mask) as u64;
        self.buf >>= count;
        self.bits_left -= count;
        Ok(v)
    }

    /// Whole bytes that were never touched by a read.
    pub fn unread_bytes(&self) -> usize {
        self.data.len() - self.pos
    }
}
