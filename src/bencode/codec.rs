//! Bencode encoder and decoder
//!
//! Canonical serialization between `BencodeValue` trees and bencode bytes.

use std::collections::BTreeMap;

use tracing::trace;

use crate::bencode::value::BencodeValue;
use crate::error::DhtError;

/// Encode a value to its canonical bencode bytes
///
/// Total function: every `BencodeValue` has exactly one encoding. Dictionary
/// keys are emitted in ascending byte order.
pub fn encode(value: &BencodeValue) -> Vec<u8> {
    let mut out = Vec::new();
    encode_into(value, &mut out);
    out
}

fn encode_into(value: &BencodeValue, out: &mut Vec<u8>) {
    match value {
        BencodeValue::Int(i) => {
            out.push(b'i');
            out.extend_from_slice(i.to_string().as_bytes());
            out.push(b'e');
        }
        BencodeValue::Bytes(bytes) => {
            out.extend_from_slice(bytes.len().to_string().as_bytes());
            out.push(b':');
            out.extend_from_slice(bytes);
        }
        BencodeValue::List(items) => {
            out.push(b'l');
            for item in items {
                encode_into(item, out);
            }
            out.push(b'e');
        }
        BencodeValue::Dict(entries) => {
            out.push(b'd');
            for (key, val) in entries {
                out.extend_from_slice(key.len().to_string().as_bytes());
                out.push(b':');
                out.extend_from_slice(key);
                encode_into(val, out);
            }
            out.push(b'e');
        }
    }
}

/// Decode one value from the front of `data`
///
/// Returns the value and the number of bytes consumed. Dictionaries are
/// accepted with keys in any order; re-encoding the result canonicalizes
/// them. Trailing bytes after the first complete value are left for the
/// caller to judge.
pub fn decode(data: &[u8]) -> Result<(BencodeValue, usize), DhtError> {
    let mut idx = 0;
    let value = parse_value(data, &mut idx)?;
    trace!("Decoded bencode value from {}/{} bytes", idx, data.len());
    Ok((value, idx))
}

fn parse_value(data: &[u8], idx: &mut usize) -> Result<BencodeValue, DhtError> {
    if *idx >= data.len() {
        return Err(DhtError::decode_error("Unexpected end of data"));
    }

    let byte = data[*idx];

    match byte {
        b'i' => {
            // Integer
            *idx += 1;
            let end = data[*idx..]
                .iter()
                .position(|&b| b == b'e')
                .ok_or_else(|| DhtError::decode_error("Unterminated integer"))?
                + *idx;
            let num_str = std::str::from_utf8(&data[*idx..end])
                .map_err(|e| DhtError::decode_error_with_source("Invalid integer", e.to_string()))?;
            let value: i64 = num_str
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    DhtError::decode_error_with_source("Invalid integer", e.to_string())
                })?;
            *idx = end + 1;
            Ok(BencodeValue::Int(value))
        }
        b'l' => {
            // List
            *idx += 1;
            let mut list = Vec::new();
            while *idx < data.len() && data[*idx] != b'e' {
                list.push(parse_value(data, idx)?);
            }
            if *idx >= data.len() {
                return Err(DhtError::decode_error("Unterminated list"));
            }
            *idx += 1; // skip 'e'
            Ok(BencodeValue::List(list))
        }
        b'd' => {
            // Dictionary
            *idx += 1;
            let mut dict = BTreeMap::new();
            while *idx < data.len() && data[*idx] != b'e' {
                let key = match parse_value(data, idx)? {
                    BencodeValue::Bytes(b) => b,
                    _ => return Err(DhtError::decode_error("Dictionary key must be a byte string")),
                };
                let value = parse_value(data, idx)?;
                dict.insert(key, value);
            }
            if *idx >= data.len() {
                return Err(DhtError::decode_error("Unterminated dictionary"));
            }
            *idx += 1; // skip 'e'
            Ok(BencodeValue::Dict(dict))
        }
        b'0'..=b'9' => {
            // Byte string
            let colon = data[*idx..]
                .iter()
                .position(|&b| b == b':')
                .ok_or_else(|| DhtError::decode_error("Unterminated string length"))?
                + *idx;
            let len_str = std::str::from_utf8(&data[*idx..colon])
                .map_err(|e| DhtError::decode_error_with_source("Invalid string length", e.to_string()))?;
            let length: usize = len_str
                .parse()
                .map_err(|e: std::num::ParseIntError| {
                    DhtError::decode_error_with_source("Invalid string length", e.to_string())
                })?;
            let start = colon + 1;
            let end = start
                .checked_add(length)
                .filter(|&end| end <= data.len())
                .ok_or_else(|| DhtError::decode_error("String length overruns input"))?;
            *idx = end;
            Ok(BencodeValue::Bytes(data[start..end].to_vec()))
        }
        _ => Err(DhtError::decode_error(format!("Unknown bencode type: {}", byte))),
    }
}
