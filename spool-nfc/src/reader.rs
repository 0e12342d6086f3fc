//! Reader adapters for talking to NFC hardware
//!
//! Supports:
//! - In-memory simulated reader (tests, running without hardware)
//! - ACR122U over PC/SC (feature `acr122u`)

use crate::error::{NfcError, NfcResult};
use crate::ident::{BLOCK_READ_LEN, FILAMENT_BLOCK, SPOOL_BLOCK, TagIdentifiers, decode_block_id};
use crate::ndef::NdefRecord;
use tracing::{debug, instrument};

/// Language code used for written Text records
pub const RECORD_LANGUAGE: &str = "en";

/// State of a tag's NDEF area
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NdefAccess {
    /// Tag is not NDEF formatted
    Absent,
    /// NDEF area is locked
    ReadOnly,
    /// NDEF area can be rewritten
    Writable,
}

/// Trait for reader adapters
///
/// All calls are blocking and only made from the reader-loop thread.
pub trait NfcReader: Send {
    /// Establish a session with a tag in the field
    ///
    /// Fails with [`NfcError::NoTag`] when the field is empty.
    fn connect(&mut self) -> NfcResult<()>;

    /// Read `length` raw bytes starting at `block`
    fn read_binary_blocks(&mut self, block: u8, length: u8) -> NfcResult<Vec<u8>>;

    /// Inspect the connected tag's NDEF area
    fn ndef_access(&mut self) -> NfcResult<NdefAccess>;

    /// Replace all NDEF records on the connected tag
    fn write_ndef_message(&mut self, records: &[NdefRecord]) -> NfcResult<()>;
}

impl<R: NfcReader + ?Sized> NfcReader for Box<R> {
    fn connect(&mut self) -> NfcResult<()> {
        (**self).connect()
    }

    fn read_binary_blocks(&mut self, block: u8, length: u8) -> NfcResult<Vec<u8>> {
        (**self).read_binary_blocks(block, length)
    }

    fn ndef_access(&mut self) -> NfcResult<NdefAccess> {
        (**self).ndef_access()
    }

    fn write_ndef_message(&mut self, records: &[NdefRecord]) -> NfcResult<()> {
        (**self).write_ndef_message(records)
    }
}

/// Read one id block; any failure decodes to 0
pub fn read_id(reader: &mut dyn NfcReader, block: u8) -> u64 {
    match reader.read_binary_blocks(block, BLOCK_READ_LEN) {
        Ok(raw) => decode_block_id(&raw),
        Err(e) => {
            debug!(block, error = %e, "Block read failed, using 0");
            0
        }
    }
}

/// Read spool and filament ids from the connected tag
pub fn read_identifiers(reader: &mut dyn NfcReader) -> TagIdentifiers {
    let filament_id = read_id(reader, FILAMENT_BLOCK);
    let spool_id = read_id(reader, SPOOL_BLOCK);
    TagIdentifiers::new(spool_id, filament_id)
}

/// Write ids to the connected tag as a single Text record
#[instrument(skip(reader), fields(spool = ids.spool_id, filament = ids.filament_id))]
pub fn write_identifiers(reader: &mut dyn NfcReader, ids: TagIdentifiers) -> NfcResult<()> {
    match reader.ndef_access()? {
        NdefAccess::Writable => {
            let record = NdefRecord::text(&ids.record_text(), RECORD_LANGUAGE);
            reader.write_ndef_message(&[record])
        }
        NdefAccess::ReadOnly => Err(NfcError::WriteProtected),
        NdefAccess::Absent => Err(NfcError::NoNdefArea),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedField, SimulatedTag};

    #[test]
    fn test_read_identifiers() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(3, 7));
        let mut reader = field.reader();
        reader.connect().unwrap();

        assert_eq!(read_identifiers(&mut reader), TagIdentifiers::new(3, 7));
    }

    #[test]
    fn test_read_identifiers_missing_blocks() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::blank());
        let mut reader = field.reader();
        reader.connect().unwrap();

        assert_eq!(read_identifiers(&mut reader), TagIdentifiers::default());
    }

    #[test]
    fn test_write_identifiers_read_only() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 1).read_only());
        let mut reader = field.reader();
        reader.connect().unwrap();

        let result = write_identifiers(&mut reader, TagIdentifiers::new(5, 6));
        assert!(matches!(result, Err(NfcError::WriteProtected)));
    }

    #[test]
    fn test_write_identifiers_unformatted() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 1).unformatted());
        let mut reader = field.reader();
        reader.connect().unwrap();

        let result = write_identifiers(&mut reader, TagIdentifiers::new(5, 6));
        assert!(matches!(result, Err(NfcError::NoNdefArea)));
    }

    #[test]
    fn test_boxed_reader_delegates() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(9, 8));
        let mut reader: Box<dyn NfcReader> = Box::new(field.reader());
        reader.connect().unwrap();

        assert_eq!(read_identifiers(&mut reader), TagIdentifiers::new(9, 8));
    }
}
