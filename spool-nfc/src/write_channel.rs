//! Pending-write hand-off between caller threads and the reader loop
//!
//! A caller deposits a [`PendingWrite`] and blocks; the reader loop picks it
//! up on its next successful poll, performs it and wakes the caller. One
//! mutex guards both the pending slot and the completion marker.
//!
//! The tag write itself runs while the lock is held. Only one write can be
//! pending and the reader loop already serializes tag access, so the only
//! cost is that a new deposit waits for an in-flight write to finish.

use crate::error::{NfcError, NfcResult};
use crate::ident::TagIdentifiers;
use parking_lot::{Condvar, Mutex};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Default time a caller waits for the reader loop
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// A write request awaiting the reader loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingWrite {
    pub spool: u64,
    pub filament: u64,
    ticket: u64,
}

impl PendingWrite {
    pub fn identifiers(&self) -> TagIdentifiers {
        TagIdentifiers::new(self.spool, self.filament)
    }
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<PendingWrite>,
    /// Completed tickets not yet collected by their caller
    completed: HashSet<u64>,
    /// Tickets the loop attempted and failed; their callers wait out the timeout
    failed: HashSet<u64>,
    next_ticket: u64,
    status: String,
}

/// Mutex-guarded pending-write slot plus completion signal
#[derive(Debug)]
pub struct WriteRequestChannel {
    slot: Mutex<Slot>,
    done: Condvar,
    timeout: Duration,
}

impl Default for WriteRequestChannel {
    fn default() -> Self {
        Self::new(DEFAULT_WRITE_TIMEOUT)
    }
}

impl WriteRequestChannel {
    pub fn new(timeout: Duration) -> Self {
        Self {
            slot: Mutex::new(Slot::default()),
            done: Condvar::new(),
            timeout,
        }
    }

    /// Request a write and block until the reader loop performed it
    ///
    /// Returns `false` if the timeout elapses first, or as soon as a later
    /// call replaces this request. A failed attempt by the loop does not wake
    /// the caller; it still waits out the timeout. Depositing clears the
    /// previous failure status. The slot is left empty when this call gives
    /// up on its own request.
    pub fn write_to_tag(&self, spool: u64, filament: u64) -> bool {
        let deadline = Instant::now() + self.timeout;
        let mut slot = self.slot.lock();

        slot.next_ticket += 1;
        let ticket = slot.next_ticket;
        let replaced = slot.pending.replace(PendingWrite {
            spool,
            filament,
            ticket,
        });
        slot.status.clear();
        if replaced.is_some() {
            debug!(spool, filament, "Replacing unserviced write request");
            self.done.notify_all();
        }
        debug!(spool, filament, ticket, "Write request deposited");

        loop {
            if slot.completed.remove(&ticket) {
                return true;
            }
            let outstanding = slot.pending.is_some_and(|p| p.ticket == ticket);
            if !outstanding && !slot.failed.contains(&ticket) {
                debug!(spool, filament, ticket, "Write request replaced");
                break;
            }
            if self.done.wait_until(&mut slot, deadline).timed_out() {
                break;
            }
        }

        if slot.completed.remove(&ticket) {
            return true;
        }
        slot.failed.remove(&ticket);
        if slot.pending.is_some_and(|p| p.ticket == ticket) {
            slot.pending = None;
        }
        warn!(spool, filament, timeout = ?self.timeout, "Write request not completed");
        false
    }

    /// Reader-loop side: perform the pending write, if any
    ///
    /// The slot is cleared whether or not `write` succeeds. Returns `None`
    /// when nothing was pending, otherwise whether the write succeeded.
    pub fn service<F>(&self, write: F) -> Option<bool>
    where
        F: FnOnce(TagIdentifiers) -> NfcResult<()>,
    {
        let mut slot = self.slot.lock();
        let request = slot.pending.take()?;

        match write(request.identifiers()) {
            Ok(()) => {
                info!(
                    spool = request.spool,
                    filament = request.filament,
                    "Wrote identifiers to tag"
                );
                slot.completed.insert(request.ticket);
                self.done.notify_all();
                Some(true)
            }
            Err(e) => {
                slot.status = match &e {
                    NfcError::WriteProtected => "Tag is write protected".to_string(),
                    NfcError::NoNdefArea => "Tag has no NDEF area".to_string(),
                    _ => "Got error while writing".to_string(),
                };
                slot.failed.insert(request.ticket);
                error!(
                    spool = request.spool,
                    filament = request.filament,
                    error = %e,
                    "Failed to write identifiers to tag"
                );
                Some(false)
            }
        }
    }

    /// Description of the most recent write failure
    pub fn status(&self) -> String {
        self.slot.lock().status.clone()
    }

    /// Currently deposited request, if any
    pub fn pending(&self) -> Option<PendingWrite> {
        self.slot.lock().pending
    }
}
