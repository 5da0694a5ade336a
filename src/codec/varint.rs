// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! Unsigned LEB128 varints.

use super::error::{CodecError, Result};

/// Append `v` as an unsigned LEB128 varint.
pub fn write_varint(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7F) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Decode a varint starting at `pos`. Returns the value and the position
/// just past it.
pub fn read_varint(data: &[u8], pos: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    let mut i = pos;
    loop {
        let byte = *data.get(i).ok_or(CodecError::UnexpectedEof)?;
        i += 1;
        let chunk = (byte & 0x7F) as u64;
        if shift >= 64 || (shift > 0 && chunk >> (64 - shift) != 0) {
            return Err(CodecError::VarintOverflow);
        }
        value |= chunk << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i));
        }
        shift += 7;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_varint(v: u64) -> Vec<u8> {
        let mut out = Vec::new();
        write_varint(&mut out, v);
        out
    }

    #[test]
    fn known_encodings() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(127), vec![0x7F]);
        assert_eq!(encode_varint(128), vec![0x80, 0x01]);
        assert_eq!(encode_varint(300), vec![0xAC, 0x02]);
        assert_eq!(encode_varint(u64::MAX).len(), 10);
    }

    #[test]
    fn decode_advances_position() {
        let mut buf = Vec::new();
        write_varint(&mut buf, 61);
        write_varint(&mut buf, 4_294_967_291);
        write_varint(&mut buf, u64::MAX);
        let (a, pos) = read_varint(&buf, 0).unwrap();
        let (b, pos) = read_varint(&buf, pos).unwrap();
        let (c, pos) = read_varint(&buf, pos).unwrap();
        assert_eq!((a, b, c), (61, 4_294_967_291, u64::MAX));
        assert_eq!(pos, buf.len());
    }

    #[test]
    fn truncated_varint_rejected() {
        assert_eq!(read_varint(&[0x80, 0x80], 0), Err(CodecError::UnexpectedEof));
        assert_eq!(read_varint(&[], 0), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn oversized_varint_rejected() {
        let too_big = [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x02];
        assert_eq!(read_varint(&too_big, 0), Err(CodecError::VarintOverflow));
        let eleven = [0x80; 11];
        assert_eq!(read_varint(&eleven, 0), Err(CodecError::VarintOverflow));
    }
}
