//! ACR122U reader over PC/SC
//!
//! Uses the reader's pseudo-APDUs for NTAG/Ultralight (Type 2) tags:
//! - READ BINARY   `FF B0 00 <page> <len>`
//! - UPDATE BINARY `FF D6 00 <page> 04 <4 bytes>`
//!
//! The capability container in page 3 tells whether the tag is NDEF
//! formatted (`E1` magic), its data area size and its write access.

use crate::error::{NfcError, NfcResult};
use crate::ndef::{self, NdefRecord};
use crate::reader::{NdefAccess, NfcReader};
use pcsc::{Card, Context, Protocols, Scope, ShareMode};
use std::ffi::{CStr, CString};
use tracing::{debug, info, instrument};

const CC_PAGE: u8 = 3;
const NDEF_START_PAGE: u8 = 4;
const PAGE_SIZE: usize = 4;
const CC_MAGIC: u8 = 0xE1;
const CC_WRITE_ACCESS_GRANTED: u8 = 0x00;
const SW_OK: [u8; 2] = [0x90, 0x00];

/// ACR122U (or compatible PC/SC) reader
pub struct Acr122uReader {
    ctx: Context,
    reader_name: Option<CString>,
    card: Option<Card>,
}

impl Acr122uReader {
    /// Open the PC/SC context
    ///
    /// With `reader_name` unset the first reader reported by PC/SC is used.
    pub fn new(reader_name: Option<&str>) -> NfcResult<Self> {
        let ctx = Context::establish(Scope::User)
            .map_err(|e| NfcError::Transport(format!("PC/SC context: {}", e)))?;
        let reader_name = reader_name
            .map(CString::new)
            .transpose()
            .map_err(|e| NfcError::Transport(format!("Invalid reader name: {}", e)))?;

        Ok(Self {
            ctx,
            reader_name,
            card: None,
        })
    }

    fn resolve_reader(&self) -> NfcResult<CString> {
        if let Some(name) = &self.reader_name {
            return Ok(name.clone());
        }
        let len = self
            .ctx
            .list_readers_len()
            .map_err(|e| NfcError::Transport(format!("List readers: {}", e)))?;
        let mut buf = vec![0u8; len];
        let mut readers = self
            .ctx
            .list_readers(&mut buf)
            .map_err(|e| NfcError::Transport(format!("List readers: {}", e)))?;
        readers
            .next()
            .map(CStr::to_owned)
            .ok_or_else(|| NfcError::Transport("No PC/SC reader found".to_string()))
    }

    fn transmit(&self, apdu: &[u8]) -> NfcResult<Vec<u8>> {
        let card = self.card.as_ref().ok_or(NfcError::NoTag)?;
        let mut buf = [0u8; pcsc::MAX_BUFFER_SIZE];
        let response = card
            .transmit(apdu, &mut buf)
            .map_err(|e| NfcError::Transport(format!("Transmit: {}", e)))?;

        match response.split_last_chunk::<2>() {
            Some((data, sw)) if *sw == SW_OK => Ok(data.to_vec()),
            Some((_, sw)) => Err(NfcError::InvalidResponse(format!(
                "Status word {:02X}{:02X}",
                sw[0], sw[1]
            ))),
            None => Err(NfcError::InvalidResponse("Short response".to_string())),
        }
    }

    fn read_capability_container(&self) -> NfcResult<[u8; 4]> {
        let data = self.transmit(&[0xFF, 0xB0, 0x00, CC_PAGE, PAGE_SIZE as u8])?;
        data.get(..PAGE_SIZE)
            .and_then(|cc| <[u8; 4]>::try_from(cc).ok())
            .ok_or_else(|| NfcError::InvalidResponse("Capability container too short".to_string()))
    }

    fn write_page(&self, page: u8, data: &[u8]) -> NfcResult<()> {
        let mut apdu = vec![0xFF, 0xD6, 0x00, page, PAGE_SIZE as u8];
        apdu.extend_from_slice(data);
        self.transmit(&apdu).map(|_| ())
    }
}

impl NfcReader for Acr122uReader {
    fn connect(&mut self) -> NfcResult<()> {
        self.card = None;
        let reader = self.resolve_reader()?;
        match self.ctx.connect(&reader, ShareMode::Shared, Protocols::ANY) {
            Ok(card) => {
                self.card = Some(card);
                Ok(())
            }
            Err(pcsc::Error::NoSmartcard) | Err(pcsc::Error::RemovedCard) => Err(NfcError::NoTag),
            Err(e) => Err(NfcError::Transport(format!("Connect: {}", e))),
        }
    }

    fn read_binary_blocks(&mut self, block: u8, length: u8) -> NfcResult<Vec<u8>> {
        self.transmit(&[0xFF, 0xB0, 0x00, block, length])
            .map_err(|e| NfcError::Read {
                block,
                reason: e.to_string(),
            })
    }

    fn ndef_access(&mut self) -> NfcResult<NdefAccess> {
        let cc = self.read_capability_container()?;
        debug!(cc = ?cc, "Capability container");
        Ok(match cc {
            [CC_MAGIC, _, _, CC_WRITE_ACCESS_GRANTED] => NdefAccess::Writable,
            [CC_MAGIC, _, _, _] => NdefAccess::ReadOnly,
            _ => NdefAccess::Absent,
        })
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    fn write_ndef_message(&mut self, records: &[NdefRecord]) -> NfcResult<()> {
        let cc = self.read_capability_container()?;
        if cc[0] != CC_MAGIC {
            return Err(NfcError::NoNdefArea);
        }
        if cc[3] != CC_WRITE_ACCESS_GRANTED {
            return Err(NfcError::WriteProtected);
        }

        let mut data = ndef::wrap_tlv(&ndef::encode_message(records)?)?;
        let available = usize::from(cc[2]) * 8;
        if data.len() > available {
            return Err(NfcError::Capacity {
                needed: data.len(),
                available,
            });
        }
        data.resize(data.len().div_ceil(PAGE_SIZE) * PAGE_SIZE, 0x00);

        for (i, chunk) in data.chunks(PAGE_SIZE).enumerate() {
            let page = u8::try_from(usize::from(NDEF_START_PAGE) + i)
                .map_err(|_| NfcError::Ndef("Page number out of range".to_string()))?;
            self.write_page(page, chunk)?;
        }

        info!(bytes = data.len(), "NDEF message written");
        Ok(())
    }
}
