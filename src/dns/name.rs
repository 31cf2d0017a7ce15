//! DNS name encoding
//!
//! Length-prefixed labels with suffix compression on write and pointer
//! chasing on read.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};

use crate::error::DhtError;

/// Longest label the wire format can carry
pub const MAX_LABEL_LEN: usize = 63;

/// Pointer chains longer than this are treated as loops
const MAX_POINTER_JUMPS: usize = 16;

/// Largest buffer offset a compression pointer can address (14 bits)
const MAX_POINTER_TARGET: usize = 0x3FFF;

/// Append a dotted name to `buf` as DNS labels
///
/// `offsets` maps name suffixes to the buffer offset where they were first
/// written; a suffix seen before is replaced by a two-byte pointer. The same
/// map must be reused across every name in one packet.
pub fn write_name(
    buf: &mut BytesMut,
    name: &str,
    offsets: &mut HashMap<String, u16>,
) -> Result<(), DhtError> {
    let mut remaining = name.trim_end_matches('.');

    while !remaining.is_empty() {
        if let Some(&offset) = offsets.get(remaining) {
            buf.put_u16(0xC000 | offset);
            return Ok(());
        }

        if buf.len() <= MAX_POINTER_TARGET {
            offsets.insert(remaining.to_string(), buf.len() as u16);
        }

        let (label, rest) = match remaining.split_once('.') {
            Some((label, rest)) => (label, rest),
            None => (remaining, ""),
        };

        if label.is_empty() {
            return Err(DhtError::packet_error(format!("Empty label in name '{}'", name)));
        }
        if label.len() > MAX_LABEL_LEN {
            return Err(DhtError::packet_error(format!(
                "Label '{}' exceeds {} bytes",
                label, MAX_LABEL_LEN
            )));
        }

        buf.put_u8(label.len() as u8);
        buf.put_slice(label.as_bytes());
        remaining = rest;
    }

    buf.put_u8(0);
    Ok(())
}

/// Read a dotted name starting at `*idx`, following compression pointers
///
/// `*idx` lands just past the name in the original stream regardless of how
/// many pointers were chased.
pub fn read_name(data: &[u8], idx: &mut usize) -> Result<String, DhtError> {
    let mut labels: Vec<String> = Vec::new();
    let mut pos = *idx;
    let mut jumped = false;
    let mut jumps = 0;

    loop {
        let len_byte = *data
            .get(pos)
            .ok_or_else(|| DhtError::decode_error("Name runs past end of packet"))?;

        if len_byte & 0xC0 == 0xC0 {
            let low = *data
                .get(pos + 1)
                .ok_or_else(|| DhtError::decode_error("Truncated compression pointer"))?;
            if !jumped {
                *idx = pos + 2;
                jumped = true;
            }
            jumps += 1;
            if jumps > MAX_POINTER_JUMPS {
                return Err(DhtError::decode_error("Compression pointer loop"));
            }
            pos = (((len_byte & 0x3F) as usize) << 8) | low as usize;
            continue;
        }

        if len_byte & 0xC0 != 0 {
            return Err(DhtError::decode_error(format!(
                "Unsupported label type: 0x{:02x}",
                len_byte
            )));
        }

        if len_byte == 0 {
            pos += 1;
            break;
        }

        let start = pos + 1;
        let end = start + len_byte as usize;
        if end > data.len() {
            return Err(DhtError::decode_error("Label runs past end of packet"));
        }
        labels.push(String::from_utf8_lossy(&data[start..end]).to_string());
        pos = end;
    }

    if !jumped {
        *idx = pos;
    }
    Ok(labels.join("."))
}
