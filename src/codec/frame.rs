// Copyright (c) 2026 Christoph Gaffga
// SPDX-License-Identifier: GPL-3.0-only
// https://github.com/cgaffga/ptc-core

//! PTC-bin frame construction and parsing.
//!
//! Every dictionary tower and every signature record travels in its own
//! frame:
//!
//! ```text
//! [1 byte ] frame type
//! [varint ] payload length (uLEB128)
//! [N bytes] payload
//! [4 bytes] CRC-32 (big-endian) of type || length bytes || payload
//! ```
//!
//! The CRC is checked before a payload is handed to any decoder, so a
//! flipped bit anywhere in the frame surfaces as
//! [`CodecError::CrcMismatch`] rather than as a wrong clock.

use super::error::{CodecError, Result};
use super::varint::{read_varint, write_varint};

/// Dictionary tower frame.
pub const FRAME_TOWER: u8 = 0x01;
/// Signature record frame.
pub const FRAME_SIGNATURE: u8 = 0x02;
/// End-of-pack marker; a pack without it is truncated.
pub const FRAME_END: u8 = 0x7F;

/// Trailing CRC size in bytes.
pub const CRC_LEN: usize = 4;

/// Append one frame to `out`.
pub fn write_frame(out: &mut Vec<u8>, frame_type: u8, payload: &[u8]) {
    let start = out.len();
    out.push(frame_type);
    write_varint(out, payload.len() as u64);
    out.extend_from_slice(payload);

    let crc = crc32fast::hash(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// A frame whose CRC has been verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    /// Zero-based position of the frame in the pack.
    pub index: usize,
    pub frame_type: u8,
    pub payload: &'a [u8],
}

/// Sequential frame parser over the bytes following the pack header.
pub struct FrameReader<'a> {
    data: &'a [u8],
    pos: usize,
    index: usize,
}

impl<'a> FrameReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            index: 0,
        }
    }

    /// Parse the next frame, verifying its CRC.
    ///
    /// Returns `Ok(None)` at the clean end of the data. A truncated frame is
    /// [`CodecError::UnexpectedEof`].
    pub fn next_frame(&mut self) -> Result<Option<RawFrame<'a>>> {
        if self.pos >= self.data.len() {
            return Ok(None);
        }
        let start = self.pos;
        let frame_type = self.data[start];
        let (len, payload_start) = read_varint(self.data, start + 1)?;
        let len = usize::try_from(len).map_err(|_| CodecError::UnexpectedEof)?;

        let payload_end = payload_start.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        let crc_end = payload_end.checked_add(CRC_LEN).ok_or(CodecError::UnexpectedEof)?;
        if crc_end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }

        let covered = &self.data[start..payload_end];
        let crc_bytes = &self.data[payload_end..crc_end];
        let stored_crc = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);
        if stored_crc != crc32fast::hash(covered) {
            return Err(CodecError::CrcMismatch {
                frame: self.index,
                frame_type,
            });
        }

        let frame = RawFrame {
            index: self.index,
            frame_type,
            payload: &self.data[payload_start..payload_end],
        };
        self.pos = crc_end;
        self.index += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_parse_roundtrip() {
        let mut buf = Vec::new();
        write_frame(&mut buf, FRAME_TOWER, &[0x00, 0x02, 0x13, 0x2A]);
        write_frame(&mut buf, FRAME_END, &[]);

        let mut r = FrameReader::new(&buf);
        let f = r.next_frame().unwrap().unwrap();
        assert_eq!(f.index, 0);
        assert_eq!(f.frame_type, FRAME_TOWER);
        assert_eq!(f.payload, &[0x00, 0x02, 0x13, 0x2A]);
        let end = r.next_frame().unwrap().unwrap();
        assert_eq!(end.frame_type, FRAME_END);
        assert!(end.payload.is_empty());
        assert_eq!(r.next_frame().unwrap(), None);
    }

    #[test]
    fn frame_layout() {
        let mut buf = Vec::new();
        write_frame(&mut buf, FRAME_SIGNATURE, b"abc");
        // type + 1-byte length + payload + crc
        assert_eq!(buf.len(), 1 + 1 + 3 + CRC_LEN);
        assert_eq!(&buf[..5], &[FRAME_SIGNATURE, 3, b'a', b'b', b'c']);
        let crc = crc32fast::hash(&buf[..5]);
        assert_eq!(&buf[5..], &crc.to_be_bytes());
    }

    #[test]
    fn corrupted_crc_detected() {
        let mut buf = Vec::new();
        write_frame(&mut buf, FRAME_SIGNATURE, &[1, 2, 3, 4]);
        let len = buf.len();
        buf[len - 1] ^= 0xFF;
        let mut r = FrameReader::new(&buf);
        assert_eq!(
            r.next_frame(),
            Err(CodecError::CrcMismatch { frame: 0, frame_type: FRAME_SIGNATURE })
        );
    }

    #[test]
    fn every_payload_bit_flip_detected() {
        let payload = [0x00, 0x02, 0x13, 0x2A, 0xFF, 0x10];
        let mut clean = Vec::new();
        write_frame(&mut clean, FRAME_TOWER, &payload);
        for byte in 2..2 + payload.len() {
            for bit in 0..8 {
                let mut buf = clean.clone();
                buf[byte] ^= 1 << bit;
                let mut r = FrameReader::new(&buf);
                assert!(
                    matches!(r.next_frame(), Err(CodecError::CrcMismatch { .. })),
                    "flip at byte {byte} bit {bit} not caught"
                );
            }
        }
    }

    #[test]
    fn truncated_frame_rejected() {
        let mut buf = Vec::new();
        write_frame(&mut buf, FRAME_TOWER, &[9; 8]);
        buf.truncate(buf.len() - 1);
        let mut r = FrameReader::new(&buf);
        assert_eq!(r.next_frame(), Err(CodecError::UnexpectedEof));
    }
}
