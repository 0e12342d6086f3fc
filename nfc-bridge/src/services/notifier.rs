//! Tag event consumer
//!
//! Drains [`TagEvent`]s from the reader loop, keeps the last seen tag and
//! tells Moonraker when the active spool changes.

use chrono::Utc;
use moonraker_client::MoonrakerClient;
use parking_lot::RwLock;
use spool_nfc::{TagEvent, TagIdentifiers};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::core::state::SeenTag;

pub struct TagNotifier {
    moonraker: MoonrakerClient,
    last_tag: Arc<RwLock<Option<SeenTag>>>,
    /// Spool Moonraker was last told about while the tag stayed in the field
    notified_spool: Option<u64>,
}

impl TagNotifier {
    pub fn new(moonraker: MoonrakerClient, last_tag: Arc<RwLock<Option<SeenTag>>>) -> Self {
        Self {
            moonraker,
            last_tag,
            notified_spool: None,
        }
    }

    /// Consume events until the channel closes or shutdown is signalled
    pub async fn run(mut self, mut events: mpsc::Receiver<TagEvent>, shutdown: CancellationToken) {
        info!("Tag notifier started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        warn!("Tag event channel closed");
                        break;
                    }
                },
            }
        }
        info!("Tag notifier stopped");
    }

    pub async fn handle(&mut self, event: TagEvent) {
        match event {
            TagEvent::Present(ids) => self.on_present(ids).await,
            TagEvent::Absent => {
                debug!("Tag removed");
                *self.last_tag.write() = None;
                self.notified_spool = None;
            }
        }
    }

    #[instrument(skip(self), fields(spool = ids.spool_id, filament = ids.filament_id))]
    async fn on_present(&mut self, ids: TagIdentifiers) {
        *self.last_tag.write() = Some(SeenTag {
            ids,
            seen_at: Utc::now(),
        });

        if ids.spool_id == 0 {
            warn!("Tag carries no spool id, not notifying");
            return;
        }
        if self.notified_spool == Some(ids.spool_id) {
            debug!("Spool unchanged");
            return;
        }

        // Filament is informational; Moonraker only tracks the spool
        info!("Active spool changed");
        match self
            .moonraker
            .set_spool_and_filament(ids.spool_id, ids.filament_id)
            .await
        {
            Ok(()) => self.notified_spool = Some(ids.spool_id),
            // Left unset so the next read retries
            Err(e) => error!(error = %e, "Failed to notify Moonraker"),
        }
    }
}
