//! NDEF message codec
//!
//! Provides:
//! - NDEF record encoding/decoding (short and long records, optional id)
//! - Well-known Text record construction and extraction
//! - Type 2 tag TLV framing (`03 <len> <message> FE`)

use crate::error::{NfcError, NfcResult};
use tracing::instrument;

const FLAG_MB: u8 = 0x80;
const FLAG_ME: u8 = 0x40;
const FLAG_CF: u8 = 0x20;
const FLAG_SR: u8 = 0x10;
const FLAG_IL: u8 = 0x08;
const TNF_MASK: u8 = 0x07;

const TLV_NULL: u8 = 0x00;
const TLV_NDEF: u8 = 0x03;
const TLV_TERMINATOR: u8 = 0xFE;

/// Record type of a well-known Text record
pub const TEXT_RECORD_TYPE: &[u8] = b"T";

/// Type Name Format field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tnf {
    Empty,
    WellKnown,
    Media,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
}

impl Tnf {
    fn bits(self) -> u8 {
        match self {
            Tnf::Empty => 0x00,
            Tnf::WellKnown => 0x01,
            Tnf::Media => 0x02,
            Tnf::AbsoluteUri => 0x03,
            Tnf::External => 0x04,
            Tnf::Unknown => 0x05,
            Tnf::Unchanged => 0x06,
        }
    }

    fn from_bits(bits: u8) -> NfcResult<Self> {
        match bits & TNF_MASK {
            0x00 => Ok(Tnf::Empty),
            0x01 => Ok(Tnf::WellKnown),
            0x02 => Ok(Tnf::Media),
            0x03 => Ok(Tnf::AbsoluteUri),
            0x04 => Ok(Tnf::External),
            0x05 => Ok(Tnf::Unknown),
            0x06 => Ok(Tnf::Unchanged),
            other => Err(NfcError::Ndef(format!("Reserved TNF value {:#04x}", other))),
        }
    }
}

/// A single NDEF record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord {
    pub tnf: Tnf,
    pub record_type: Vec<u8>,
    pub id: Vec<u8>,
    pub payload: Vec<u8>,
}

impl NdefRecord {
    /// Build a UTF-8 Text record
    pub fn text(text: &str, language: &str) -> Self {
        let lang = language.as_bytes();
        // Status byte: bit 7 = UTF-16 (unset), bits 0..5 = language code length
        let mut payload = Vec::with_capacity(1 + lang.len() + text.len());
        payload.push((lang.len() & 0x3F) as u8);
        payload.extend_from_slice(lang);
        payload.extend_from_slice(text.as_bytes());

        Self {
            tnf: Tnf::WellKnown,
            record_type: TEXT_RECORD_TYPE.to_vec(),
            id: Vec::new(),
            payload,
        }
    }

    /// Text content if this is a UTF-8 Text record
    pub fn as_text(&self) -> Option<String> {
        if self.tnf != Tnf::WellKnown || self.record_type != TEXT_RECORD_TYPE {
            return None;
        }
        let (&status, rest) = self.payload.split_first()?;
        if status & 0x80 != 0 {
            // UTF-16 text is not used by any writer we know of
            return None;
        }
        let lang_len = usize::from(status & 0x3F);
        let text = rest.get(lang_len..)?;
        String::from_utf8(text.to_vec()).ok()
    }

    /// Language code if this is a Text record
    pub fn language(&self) -> Option<&str> {
        if self.record_type != TEXT_RECORD_TYPE {
            return None;
        }
        let (&status, rest) = self.payload.split_first()?;
        let lang = rest.get(..usize::from(status & 0x3F))?;
        std::str::from_utf8(lang).ok()
    }

    fn encode_into(&self, buf: &mut Vec<u8>, first: bool, last: bool) -> NfcResult<()> {
        let type_len = u8::try_from(self.record_type.len())
            .map_err(|_| NfcError::Ndef("Record type longer than 255 bytes".to_string()))?;
        let id_len = u8::try_from(self.id.len())
            .map_err(|_| NfcError::Ndef("Record id longer than 255 bytes".to_string()))?;
        let payload_len = u32::try_from(self.payload.len())
            .map_err(|_| NfcError::Ndef("Record payload too large".to_string()))?;

        let short = payload_len < 256;
        let mut header = self.tnf.bits();
        if first {
            header |= FLAG_MB;
        }
        if last {
            header |= FLAG_ME;
        }
        if short {
            header |= FLAG_SR;
        }
        if id_len > 0 {
            header |= FLAG_IL;
        }

        buf.push(header);
        buf.push(type_len);
        if short {
            buf.push(payload_len as u8);
        } else {
            buf.extend_from_slice(&payload_len.to_be_bytes());
        }
        if id_len > 0 {
            buf.push(id_len);
        }
        buf.extend_from_slice(&self.record_type);
        buf.extend_from_slice(&self.id);
        buf.extend_from_slice(&self.payload);
        Ok(())
    }
}

/// Encode records as one NDEF message
#[instrument(skip(records), fields(count = records.len()))]
pub fn encode_message(records: &[NdefRecord]) -> NfcResult<Vec<u8>> {
    if records.is_empty() {
        // Empty message: a single empty record
        return Ok(vec![FLAG_MB | FLAG_ME | FLAG_SR, 0x00, 0x00]);
    }

    let mut buf = Vec::new();
    let last = records.len() - 1;
    for (i, record) in records.iter().enumerate() {
        record.encode_into(&mut buf, i == 0, i == last)?;
    }
    Ok(buf)
}

/// Decode an NDEF message
///
/// Chunked records are not supported.
pub fn decode_message(bytes: &[u8]) -> NfcResult<Vec<NdefRecord>> {
    let mut records = Vec::new();
    let mut cursor = Cursor { bytes, pos: 0 };

    loop {
        let header = cursor.u8()?;
        if header & FLAG_CF != 0 {
            return Err(NfcError::Ndef("Chunked records are not supported".to_string()));
        }
        let tnf = Tnf::from_bits(header)?;
        let type_len = usize::from(cursor.u8()?);
        let payload_len = if header & FLAG_SR != 0 {
            usize::from(cursor.u8()?)
        } else {
            let b = cursor.take(4)?;
            u32::from_be_bytes([b[0], b[1], b[2], b[3]]) as usize
        };
        let id_len = if header & FLAG_IL != 0 {
            usize::from(cursor.u8()?)
        } else {
            0
        };

        let record_type = cursor.take(type_len)?.to_vec();
        let id = cursor.take(id_len)?.to_vec();
        let payload = cursor.take(payload_len)?.to_vec();

        if tnf != Tnf::Empty {
            records.push(NdefRecord {
                tnf,
                record_type,
                id,
                payload,
            });
        }

        if header & FLAG_ME != 0 {
            break;
        }
        if cursor.is_empty() {
            return Err(NfcError::Ndef("Message ended without ME flag".to_string()));
        }
    }

    Ok(records)
}

/// Wrap an NDEF message in a Type 2 tag TLV, terminator included
pub fn wrap_tlv(message: &[u8]) -> NfcResult<Vec<u8>> {
    let len = message.len();
    let mut buf = Vec::with_capacity(len + 5);
    buf.push(TLV_NDEF);
    if len < 0xFF {
        buf.push(len as u8);
    } else {
        let len = u16::try_from(len)
            .map_err(|_| NfcError::Ndef(format!("Message of {} bytes too large for TLV", len)))?;
        buf.push(0xFF);
        buf.extend_from_slice(&len.to_be_bytes());
    }
    buf.extend_from_slice(message);
    buf.push(TLV_TERMINATOR);
    Ok(buf)
}

/// Locate the NDEF message TLV in tag memory
///
/// Skips NULL padding and lock/memory control TLVs. Returns `None` when the
/// terminator is reached first.
pub fn unwrap_tlv(memory: &[u8]) -> NfcResult<Option<&[u8]>> {
    let mut cursor = Cursor {
        bytes: memory,
        pos: 0,
    };

    while !cursor.is_empty() {
        let tag = cursor.u8()?;
        match tag {
            TLV_NULL => continue,
            TLV_TERMINATOR => return Ok(None),
            _ => {
                let mut len = usize::from(cursor.u8()?);
                if len == 0xFF {
                    let b = cursor.take(2)?;
                    len = usize::from(u16::from_be_bytes([b[0], b[1]]));
                }
                let value = cursor.take(len)?;
                if tag == TLV_NDEF {
                    return Ok(Some(value));
                }
            }
        }
    }

    Ok(None)
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn u8(&mut self) -> NfcResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> NfcResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                NfcError::Ndef(format!(
                    "Truncated data: need {} bytes at offset {}, have {}",
                    n,
                    self.pos,
                    self.bytes.len()
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}
