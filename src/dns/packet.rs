//! DNS message subset
//!
//! Answer-only packets of TXT records: the storage shape of a published
//! record family.

use std::collections::HashMap;

use bytes::{BufMut, BytesMut};
use tracing::trace;

use crate::dns::name::{read_name, write_name};
use crate::error::DhtError;

/// TXT record type code
pub const TYPE_TXT: u16 = 16;

/// Internet class code
pub const CLASS_IN: u16 = 1;

/// Header flags for an authoritative answer
pub const FLAGS_AUTHORITATIVE_RESPONSE: u16 = 0x8400;

const HEADER_LEN: usize = 12;
const MAX_CHARACTER_STRING: usize = 255;

/// A single resource record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    /// Raw RDATA bytes; for TXT records, a run of character-strings
    pub rdata: Vec<u8>,
}

impl ResourceRecord {
    /// Build a TXT record, chunking the value into ≤255-byte character-strings
    pub fn txt(name: impl Into<String>, ttl: u32, value: &[u8]) -> Self {
        let mut rdata = Vec::with_capacity(value.len() + value.len() / MAX_CHARACTER_STRING + 1);
        if value.is_empty() {
            rdata.push(0);
        } else {
            for chunk in value.chunks(MAX_CHARACTER_STRING) {
                rdata.push(chunk.len() as u8);
                rdata.extend_from_slice(chunk);
            }
        }

        ResourceRecord {
            name: name.into(),
            rtype: TYPE_TXT,
            class: CLASS_IN,
            ttl,
            rdata,
        }
    }

    /// Rejoin the TXT character-strings into one value
    pub fn txt_value(&self) -> Result<Vec<u8>, DhtError> {
        if self.rtype != TYPE_TXT {
            return Err(DhtError::packet_error_with_record(
                format!("Expected a TXT record, got type {}", self.rtype),
                self.name.clone(),
            ));
        }

        let mut value = Vec::with_capacity(self.rdata.len());
        let mut idx = 0;
        while idx < self.rdata.len() {
            let len = self.rdata[idx] as usize;
            idx += 1;
            let end = idx + len;
            if end > self.rdata.len() {
                return Err(DhtError::decode_error_with_source(
                    "TXT character-string overruns record data",
                    self.name.clone(),
                ));
            }
            value.extend_from_slice(&self.rdata[idx..end]);
            idx = end;
        }
        Ok(value)
    }
}

/// A DNS message narrowed to what the record family needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsPacket {
    pub id: u16,
    pub flags: u16,
    pub answers: Vec<ResourceRecord>,
}

impl DnsPacket {
    /// An authoritative answer packet with no question section
    pub fn answer(answers: Vec<ResourceRecord>) -> Self {
        DnsPacket {
            id: 0,
            flags: FLAGS_AUTHORITATIVE_RESPONSE,
            answers,
        }
    }

    /// Serialize to wire bytes with name compression
    pub fn serialize(&self) -> Result<Vec<u8>, DhtError> {
        let ancount = u16::try_from(self.answers.len())
            .map_err(|_| DhtError::packet_error("Too many answer records for one packet"))?;

        let mut buf = BytesMut::with_capacity(256);
        buf.put_u16(self.id);
        buf.put_u16(self.flags);
        buf.put_u16(0); // qdcount
        buf.put_u16(ancount);
        buf.put_u16(0); // nscount
        buf.put_u16(0); // arcount

        let mut offsets = HashMap::new();
        for record in &self.answers {
            write_name(&mut buf, &record.name, &mut offsets)?;
            buf.put_u16(record.rtype);
            buf.put_u16(record.class);
            buf.put_u32(record.ttl);
            let rdlength = u16::try_from(record.rdata.len()).map_err(|_| {
                DhtError::packet_error_with_record("Record data too large", record.name.clone())
            })?;
            buf.put_u16(rdlength);
            buf.put_slice(&record.rdata);
        }

        trace!("Serialized DNS packet: {} records, {} bytes", self.answers.len(), buf.len());
        Ok(buf.to_vec())
    }

    /// Parse wire bytes, skipping any question section
    pub fn deserialize(data: &[u8]) -> Result<Self, DhtError> {
        if data.len() < HEADER_LEN {
            return Err(DhtError::decode_error(format!(
                "Packet shorter than the {} byte header: {} bytes",
                HEADER_LEN,
                data.len()
            )));
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let flags = u16::from_be_bytes([data[2], data[3]]);
        let qdcount = u16::from_be_bytes([data[4], data[5]]);
        let ancount = u16::from_be_bytes([data[6], data[7]]);

        let mut idx = HEADER_LEN;

        // questions carry a name plus fixed type/class words
        for _ in 0..qdcount {
            read_name(data, &mut idx)?;
            if idx + 4 > data.len() {
                return Err(DhtError::decode_error("Question runs past end of packet"));
            }
            idx += 4;
        }

        let mut answers = Vec::with_capacity(ancount as usize);
        for _ in 0..ancount {
            answers.push(read_record(data, &mut idx)?);
        }

        trace!("Parsed DNS packet: {} answers from {} bytes", answers.len(), data.len());
        Ok(DnsPacket { id, flags, answers })
    }
}

fn read_record(data: &[u8], idx: &mut usize) -> Result<ResourceRecord, DhtError> {
    let name = read_name(data, idx)?;

    if *idx + 10 > data.len() {
        return Err(DhtError::decode_error_with_source(
            "Record header runs past end of packet",
            name,
        ));
    }
    let rtype = u16::from_be_bytes([data[*idx], data[*idx + 1]]);
    let class = u16::from_be_bytes([data[*idx + 2], data[*idx + 3]]);
    let ttl = u32::from_be_bytes([
        data[*idx + 4],
        data[*idx + 5],
        data[*idx + 6],
        data[*idx + 7],
    ]);
    let rdlength = u16::from_be_bytes([data[*idx + 8], data[*idx + 9]]) as usize;
    *idx += 10;

    let end = *idx + rdlength;
    if end > data.len() {
        return Err(DhtError::decode_error_with_source(
            "Record data runs past end of packet",
            name,
        ));
    }
    let rdata = data[*idx..end].to_vec();
    *idx = end;

    Ok(ResourceRecord {
        name,
        rtype,
        class,
        ttl,
        rdata,
    })
}
