//! Simulated reader
//!
//! An in-memory reader field that tests (or a bridge running without
//! hardware) can place tags into and remove them from, from any thread.

use crate::error::{NfcError, NfcResult};
use crate::ident::{FILAMENT_BLOCK, SPOOL_BLOCK, TagIdentifiers};
use crate::ndef::{self, NdefRecord};
use crate::reader::{NdefAccess, NfcReader};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A tag's memory as seen by the simulated reader
#[derive(Debug, Clone, Default)]
pub struct SimulatedTag {
    /// Raw block contents keyed by block number
    pub blocks: HashMap<u8, Vec<u8>>,
    /// NDEF area contents (TLV framed); `None` if unformatted
    pub ndef_memory: Option<Vec<u8>>,
    pub writable: bool,
    /// Fail every NDEF write with a transport error
    pub fail_writes: bool,
}

impl SimulatedTag {
    /// Formatted, writable tag with no ids
    pub fn blank() -> Self {
        Self {
            blocks: HashMap::new(),
            ndef_memory: Some(Vec::new()),
            writable: true,
            fail_writes: false,
        }
    }

    /// Writable tag holding ids in blocks 45/46
    pub fn with_ids(spool_id: u32, filament_id: u32) -> Self {
        Self::blank()
            .with_block(FILAMENT_BLOCK, filament_id.to_be_bytes().to_vec())
            .with_block(SPOOL_BLOCK, spool_id.to_be_bytes().to_vec())
    }

    pub fn with_block(mut self, block: u8, data: Vec<u8>) -> Self {
        self.blocks.insert(block, data);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    pub fn unformatted(mut self) -> Self {
        self.ndef_memory = None;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Records currently stored in the NDEF area
    pub fn ndef_records(&self) -> NfcResult<Vec<NdefRecord>> {
        let Some(memory) = &self.ndef_memory else {
            return Err(NfcError::NoNdefArea);
        };
        match ndef::unwrap_tlv(memory)? {
            Some(message) => ndef::decode_message(message),
            None => Ok(Vec::new()),
        }
    }

    /// Ids from the first `SPOOL:`/`FILAMENT:` Text record
    pub fn written_identifiers(&self) -> Option<TagIdentifiers> {
        self.ndef_records()
            .ok()?
            .iter()
            .filter_map(NdefRecord::as_text)
            .find_map(|text| TagIdentifiers::parse_record_text(&text))
    }
}

#[derive(Debug, Default)]
struct FieldState {
    tag: Option<SimulatedTag>,
    connects: usize,
}

/// Shared handle to the simulated reader field
#[derive(Debug, Clone, Default)]
pub struct SimulatedField {
    state: Arc<Mutex<FieldState>>,
    writes: Arc<AtomicUsize>,
}

impl SimulatedField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a tag into the field, replacing any present one
    pub fn place(&self, tag: SimulatedTag) {
        self.state.lock().tag = Some(tag);
    }

    /// Take the tag out of the field
    pub fn remove(&self) -> Option<SimulatedTag> {
        self.state.lock().tag.take()
    }

    /// Snapshot of the tag in the field
    pub fn tag(&self) -> Option<SimulatedTag> {
        self.state.lock().tag.clone()
    }

    /// Number of successful `connect` calls
    pub fn connect_count(&self) -> usize {
        self.state.lock().connects
    }

    /// Number of NDEF writes that reached the tag
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Create a reader attached to this field
    pub fn reader(&self) -> SimulatedReader {
        SimulatedReader {
            field: self.clone(),
            connected: false,
        }
    }
}

/// Reader backed by a [`SimulatedField`]
#[derive(Debug)]
pub struct SimulatedReader {
    field: SimulatedField,
    connected: bool,
}

impl SimulatedReader {
    fn with_tag<T>(&self, f: impl FnOnce(&mut SimulatedTag) -> NfcResult<T>) -> NfcResult<T> {
        if !self.connected {
            return Err(NfcError::Transport("Not connected".to_string()));
        }
        let mut state = self.field.state.lock();
        match state.tag.as_mut() {
            Some(tag) => f(tag),
            None => Err(NfcError::NoTag),
        }
    }
}

impl NfcReader for SimulatedReader {
    fn connect(&mut self) -> NfcResult<()> {
        let mut state = self.field.state.lock();
        if state.tag.is_none() {
            self.connected = false;
            return Err(NfcError::NoTag);
        }
        state.connects += 1;
        self.connected = true;
        Ok(())
    }

    fn read_binary_blocks(&mut self, block: u8, length: u8) -> NfcResult<Vec<u8>> {
        self.with_tag(|tag| {
            let data = tag.blocks.get(&block).ok_or_else(|| NfcError::Read {
                block,
                reason: "block not readable".to_string(),
            })?;
            let len = usize::from(length).min(data.len());
            Ok(data[..len].to_vec())
        })
    }

    fn ndef_access(&mut self) -> NfcResult<NdefAccess> {
        self.with_tag(|tag| {
            Ok(match (&tag.ndef_memory, tag.writable) {
                (None, _) => NdefAccess::Absent,
                (Some(_), false) => NdefAccess::ReadOnly,
                (Some(_), true) => NdefAccess::Writable,
            })
        })
    }

    fn write_ndef_message(&mut self, records: &[NdefRecord]) -> NfcResult<()> {
        let writes = self.field.writes.clone();
        self.with_tag(|tag| {
            if tag.ndef_memory.is_none() {
                return Err(NfcError::NoNdefArea);
            }
            if !tag.writable {
                return Err(NfcError::WriteProtected);
            }
            if tag.fail_writes {
                return Err(NfcError::Transport("simulated write failure".to_string()));
            }
            let memory = ndef::wrap_tlv(&ndef::encode_message(records)?)?;
            tag.ndef_memory = Some(memory);
            writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::write_identifiers;

    #[test]
    fn test_connect_without_tag() {
        let field = SimulatedField::new();
        let mut reader = field.reader();
        assert!(matches!(reader.connect(), Err(NfcError::NoTag)));
        assert_eq!(field.connect_count(), 0);
    }

    #[test]
    fn test_read_requires_connect() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 2));
        let mut reader = field.reader();
        assert!(reader.read_binary_blocks(SPOOL_BLOCK, 4).is_err());
    }

    #[test]
    fn test_removed_tag_fails_reads() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 2));
        let mut reader = field.reader();
        reader.connect().unwrap();
        field.remove();
        assert!(matches!(
            reader.read_binary_blocks(SPOOL_BLOCK, 4),
            Err(NfcError::NoTag)
        ));
    }

    #[test]
    fn test_write_round_trip() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::blank());
        let mut reader = field.reader();
        reader.connect().unwrap();

        write_identifiers(&mut reader, TagIdentifiers::new(42, 17)).unwrap();

        let tag = field.tag().unwrap();
        assert_eq!(tag.written_identifiers(), Some(TagIdentifiers::new(42, 17)));
        assert_eq!(tag.ndef_records().unwrap().len(), 1);
        assert_eq!(field.write_count(), 1);
    }

    #[test]
    fn test_write_replaces_existing_records() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::blank());
        let mut reader = field.reader();
        reader.connect().unwrap();

        write_identifiers(&mut reader, TagIdentifiers::new(1, 1)).unwrap();
        write_identifiers(&mut reader, TagIdentifiers::new(2, 3)).unwrap();

        let tag = field.tag().unwrap();
        assert_eq!(tag.ndef_records().unwrap().len(), 1);
        assert_eq!(tag.written_identifiers(), Some(TagIdentifiers::new(2, 3)));
    }
}
