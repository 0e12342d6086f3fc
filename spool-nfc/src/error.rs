//! Error types for the NFC library

use thiserror::Error;

/// NFC reader and tag error types
#[derive(Debug, Error)]
pub enum NfcError {
    /// No tag in the reader field
    #[error("No tag present")]
    NoTag,

    /// Reader communication failure (PC/SC, USB, ...)
    #[error("Reader transport error: {0}")]
    Transport(String),

    /// Reading a memory block failed
    #[error("Read of block {block} failed: {reason}")]
    Read { block: u8, reason: String },

    /// Tag NDEF area is locked
    #[error("Tag is write protected")]
    WriteProtected,

    /// Tag is not NDEF formatted
    #[error("Tag has no NDEF area")]
    NoNdefArea,

    /// Encoded message does not fit on the tag
    #[error("NDEF message needs {needed} bytes, tag holds {available}")]
    Capacity { needed: usize, available: usize },

    /// Malformed NDEF data
    #[error("NDEF error: {0}")]
    Ndef(String),

    /// Reader answered with an unexpected status word or length
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for NFC operations
pub type NfcResult<T> = Result<T, NfcError>;
