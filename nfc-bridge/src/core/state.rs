use chrono::{DateTime, Utc};
use moonraker_client::MoonrakerClient;
use parking_lot::RwLock;
use serde::Serialize;
use spool_nfc::{NfcHandler, NfcReader, SimulatedField, TagIdentifiers, WriteRequestChannel};
use std::sync::Arc;
use std::time::Instant;

use crate::core::Config;
use crate::core::config::ReaderBackend;

/// Most recently read tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeenTag {
    #[serde(flatten)]
    pub ids: TagIdentifiers,
    pub seen_at: DateTime<Utc>,
}

/// Bridge state - shared references to every service
///
/// Cloning is cheap; all fields are `Arc`s or clonable handles.
///
/// | Field | Meaning |
/// |-------|---------|
/// | config | Configuration (immutable) |
/// | handler | NFC reader loop and write hand-off |
/// | moonraker | Printer service client |
/// | last_tag | Tag currently in the field, if any |
/// | field | Simulated reader field (simulated backend only) |
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub handler: Arc<NfcHandler>,
    pub moonraker: MoonrakerClient,
    pub last_tag: Arc<RwLock<Option<SeenTag>>>,
    pub field: Option<SimulatedField>,
    started_at: Instant,
}

impl ServerState {
    /// Open the configured reader and build the state
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        match config.reader {
            ReaderBackend::Simulated => {
                tracing::warn!("Using simulated NFC reader, no hardware will be polled");
                let field = SimulatedField::new();
                let reader = field.reader();
                Self::with_reader(config, reader, Some(field))
            }
            ReaderBackend::Acr122u => Self::with_reader(config, open_acr122u(config)?, None),
        }
    }

    /// Build the state around an already opened reader
    pub fn with_reader(
        config: &Config,
        reader: impl NfcReader + 'static,
        field: Option<SimulatedField>,
    ) -> anyhow::Result<Self> {
        let handler = NfcHandler::with_config(
            reader,
            config.poll_timing(),
            WriteRequestChannel::new(config.write_timeout),
        );
        let moonraker = config.moonraker().build_client()?;

        Ok(Self {
            config: Arc::new(config.clone()),
            handler: Arc::new(handler),
            moonraker,
            last_tag: Arc::new(RwLock::new(None)),
            field,
            started_at: Instant::now(),
        })
    }

    pub fn last_tag(&self) -> Option<SeenTag> {
        *self.last_tag.read()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(feature = "acr122u")]
fn open_acr122u(config: &Config) -> anyhow::Result<spool_nfc::Acr122uReader> {
    Ok(spool_nfc::Acr122uReader::new(config.reader_name.as_deref())?)
}

#[cfg(not(feature = "acr122u"))]
fn open_acr122u(_config: &Config) -> anyhow::Result<spool_nfc::SimulatedReader> {
    anyhow::bail!("ACR122U support not compiled in, rebuild with the `acr122u` feature")
}
