//! # spool-nfc
//!
//! NFC tag handling for filament spools: polling, decoding and writing.
//!
//! ## Scope
//!
//! This crate handles the tag side of the bridge:
//! - Reader loop reporting tag presence/absence ([`NfcHandler`])
//! - Write hand-off from other threads ([`WriteRequestChannel`])
//! - Spool/filament id layouts ([`TagIdentifiers`]) and NDEF encoding
//! - Reader drivers: simulated, ACR122U over PC/SC (optional)
//!
//! Telling the printer about the active spool is left to the application.
//!
//! ## Example
//!
//! ```ignore
//! use spool_nfc::{NfcHandler, SimulatedField, SimulatedTag};
//! use std::sync::Arc;
//!
//! let field = SimulatedField::new();
//! field.place(SimulatedTag::with_ids(3, 7));
//!
//! let handler = Arc::new(NfcHandler::new(field.reader()));
//! handler.set_tag_present_callback(|spool, filament| {
//!     println!("spool {} filament {}", spool, filament);
//! });
//!
//! let loop_handler = handler.clone();
//! std::thread::spawn(move || loop_handler.run());
//!
//! // From any other thread
//! let written = handler.write_to_tag(12, 34);
//! ```

mod error;
mod event;
mod handler;
mod ident;
pub mod ndef;
mod reader;
mod sim;
mod write_channel;

#[cfg(feature = "acr122u")]
mod acr122u;

// Re-exports
pub use error::{NfcError, NfcResult};
pub use event::TagEvent;
pub use handler::{NfcHandler, PollOutcome, PollTiming};
pub use ident::{
    BLOCK_READ_LEN, FILAMENT_BLOCK, SPOOL_BLOCK, TagIdentifiers, decode_block_id,
};
pub use ndef::NdefRecord;
pub use reader::{
    NdefAccess, NfcReader, RECORD_LANGUAGE, read_id, read_identifiers, write_identifiers,
};
pub use sim::{SimulatedField, SimulatedReader, SimulatedTag};
pub use write_channel::{DEFAULT_WRITE_TIMEOUT, PendingWrite, WriteRequestChannel};

#[cfg(feature = "acr122u")]
pub use acr122u::Acr122uReader;
