//! Tag reader loop
//!
//! [`NfcHandler`] drives the presence/absence cycle on a dedicated thread:
//!
//! 1. connect to a tag; any failure counts as "no tag"
//! 2. decode filament id (block 45) and spool id (block 46)
//! 3. report the tag to the registered callback
//! 4. perform a pending write, if one was requested
//! 5. wait before polling again
//!
//! Callbacks run synchronously on the reader-loop thread. They must return
//! quickly; a slow callback delays the whole polling cadence. Use
//! [`NfcHandler::subscribe`] to hand events to async consumers instead.

use crate::event::TagEvent;
use crate::ident::TagIdentifiers;
use crate::reader::{NfcReader, read_identifiers, write_identifiers};
use crate::write_channel::WriteRequestChannel;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, info, instrument, warn};

type TagPresentCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;
type NoTagPresentCallback = Arc<dyn Fn() + Send + Sync>;

/// Wait intervals of the reader loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTiming {
    /// Wait after a failed connect
    pub absent_retry: Duration,
    /// Wait after a tag was read
    pub present_interval: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            absent_retry: Duration::from_millis(200),
            present_interval: Duration::from_secs(10),
        }
    }
}

impl PollTiming {
    pub fn with_absent_retry(mut self, interval: Duration) -> Self {
        self.absent_retry = interval;
        self
    }

    pub fn with_present_interval(mut self, interval: Duration) -> Self {
        self.present_interval = interval;
        self
    }
}

/// Result of one poll cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Absent,
    Present(TagIdentifiers),
}

/// Cooperative stop flag with an interruptible wait
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    fn set(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for `duration` unless stopped; returns true if stopped
    fn wait(&self, duration: Duration) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            let _ = self.wake.wait_while_for(&mut stopped, |s| !*s, duration);
        }
        *stopped
    }
}

/// NFC tag reader loop with callbacks and the write hand-off
pub struct NfcHandler {
    reader: Mutex<Box<dyn NfcReader>>,
    timing: PollTiming,
    writes: WriteRequestChannel,
    on_tag_present: Mutex<Option<TagPresentCallback>>,
    on_no_tag_present: Mutex<Option<NoTagPresentCallback>>,
    stop: StopSignal,
}

impl std::fmt::Debug for NfcHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NfcHandler")
            .field("timing", &self.timing)
            .field("writes", &self.writes)
            .field("stopped", &self.stop.is_set())
            .finish_non_exhaustive()
    }
}

impl NfcHandler {
    /// Create a handler with default timing and a 30 s write timeout
    pub fn new(reader: impl NfcReader + 'static) -> Self {
        Self::with_config(reader, PollTiming::default(), WriteRequestChannel::default())
    }

    pub fn with_config(
        reader: impl NfcReader + 'static,
        timing: PollTiming,
        writes: WriteRequestChannel,
    ) -> Self {
        Self {
            reader: Mutex::new(Box::new(reader)),
            timing,
            writes,
            on_tag_present: Mutex::new(None),
            on_no_tag_present: Mutex::new(None),
            stop: StopSignal::default(),
        }
    }

    /// Set the callback run when no tag is present, replacing any previous one
    pub fn set_no_tag_present_callback<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.on_no_tag_present.lock() = Some(Arc::new(callback));
    }

    /// Set the callback run with `(spool_id, filament_id)` after a tag was read
    pub fn set_tag_present_callback<F>(&self, callback: F)
    where
        F: Fn(u64, u64) + Send + Sync + 'static,
    {
        *self.on_tag_present.lock() = Some(Arc::new(callback));
    }

    /// Deliver events to a bounded channel instead of plain callbacks
    ///
    /// Replaces both callbacks. `Absent` is only sent when a previously
    /// present tag goes away. Sends never block the loop: when the queue is
    /// full a `Present` event is dropped with a warning, while `Absent` is
    /// retried on the next poll without a tag.
    pub fn subscribe(&self, capacity: usize) -> mpsc::Receiver<TagEvent> {
        let (tx, rx) = mpsc::channel(capacity);
        let present = Arc::new(AtomicBool::new(false));

        {
            let tx = tx.clone();
            let present = present.clone();
            self.set_tag_present_callback(move |spool_id, filament_id| {
                present.store(true, Ordering::SeqCst);
                let event = TagEvent::Present(TagIdentifiers::new(spool_id, filament_id));
                if let Err(e) = tx.try_send(event) {
                    warn!(error = %e, "Tag event dropped");
                }
            });
        }

        // `present` stays set until `Absent` is queued, so a full queue
        // retries on the next empty poll
        self.set_no_tag_present_callback(move || {
            if !present.load(Ordering::SeqCst) {
                return;
            }
            match tx.try_send(TagEvent::Absent) {
                Ok(()) => present.store(false, Ordering::SeqCst),
                Err(TrySendError::Full(_)) => {
                    warn!("Tag event queue full, tag removal will be resent");
                }
                Err(TrySendError::Closed(_)) => {
                    present.store(false, Ordering::SeqCst);
                    warn!("Tag event receiver closed");
                }
            }
        });

        rx
    }

    /// Run the loop until [`stop`](Self::stop) is called
    pub fn run(&self) {
        info!(timing = ?self.timing, "NFC reader loop started");
        while !self.stop.is_set() {
            let wait = match self.poll_once() {
                PollOutcome::Absent => self.timing.absent_retry,
                PollOutcome::Present(_) => self.timing.present_interval,
            };
            if self.stop.wait(wait) {
                break;
            }
        }
        info!("NFC reader loop stopped");
    }

    /// One poll cycle without the trailing wait
    #[instrument(skip(self), level = "trace")]
    pub fn poll_once(&self) -> PollOutcome {
        let mut reader = self.reader.lock();

        if let Err(e) = reader.connect() {
            drop(reader);
            debug!(error = %e, "No tag");
            let callback = self.on_no_tag_present.lock().clone();
            if let Some(callback) = callback {
                callback();
            }
            return PollOutcome::Absent;
        }

        let ids = read_identifiers(reader.as_mut());
        debug!(spool = ids.spool_id, filament = ids.filament_id, "Tag read");

        let callback = self.on_tag_present.lock().clone();
        if let Some(callback) = callback {
            callback(ids.spool_id, ids.filament_id);
        }

        self.writes
            .service(|pending| write_identifiers(reader.as_mut(), pending));

        PollOutcome::Present(ids)
    }

    /// Request cooperative shutdown of [`run`](Self::run)
    pub fn stop(&self) {
        info!("NFC reader loop stop requested");
        self.stop.set();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_set()
    }

    /// Ask the loop to write ids to the next tag it reads; see
    /// [`WriteRequestChannel::write_to_tag`]
    pub fn write_to_tag(&self, spool: u64, filament: u64) -> bool {
        self.writes.write_to_tag(spool, filament)
    }

    /// Description of the most recent write failure
    pub fn status(&self) -> String {
        self.writes.status()
    }

    pub fn write_channel(&self) -> &WriteRequestChannel {
        &self.writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimulatedField, SimulatedTag};
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Instant;

    fn fast_timing() -> PollTiming {
        PollTiming::default()
            .with_absent_retry(Duration::from_millis(5))
            .with_present_interval(Duration::from_millis(20))
    }

    #[test]
    fn test_poll_without_tag_calls_no_tag_callback() {
        let field = SimulatedField::new();
        let handler = NfcHandler::new(field.reader());
        let absent = Arc::new(AtomicUsize::new(0));
        let present = Arc::new(AtomicUsize::new(0));
        {
            let absent = absent.clone();
            handler.set_no_tag_present_callback(move || {
                absent.fetch_add(1, Ordering::SeqCst);
            });
            let present = present.clone();
            handler.set_tag_present_callback(move |_, _| {
                present.fetch_add(1, Ordering::SeqCst);
            });
        }

        for _ in 0..3 {
            assert_eq!(handler.poll_once(), PollOutcome::Absent);
        }
        assert_eq!(absent.load(Ordering::SeqCst), 3);
        assert_eq!(present.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_poll_reports_spool_and_filament() {
        let field = SimulatedField::new();
        field.place(
            SimulatedTag::blank()
                .with_block(45, vec![0x00, 0x00, 0x00, 0x07])
                .with_block(46, vec![0x00, 0x00, 0x00, 0x03]),
        );
        let handler = NfcHandler::new(field.reader());
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = seen.clone();
            handler.set_tag_present_callback(move |spool, filament| {
                seen.lock().push((spool, filament));
            });
        }

        let outcome = handler.poll_once();
        assert_eq!(outcome, PollOutcome::Present(TagIdentifiers::new(3, 7)));
        assert_eq!(*seen.lock(), vec![(3, 7)]);
    }

    #[test]
    fn test_registration_has_no_immediate_effect() {
        let field = SimulatedField::new();
        let handler = NfcHandler::new(field.reader());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        handler.set_no_tag_present_callback(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_callback_replacement() {
        let field = SimulatedField::new();
        let handler = NfcHandler::new(field.reader());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        {
            let first = first.clone();
            handler.set_no_tag_present_callback(move || {
                first.fetch_add(1, Ordering::SeqCst);
            });
            let second = second.clone();
            handler.set_no_tag_present_callback(move || {
                second.fetch_add(1, Ordering::SeqCst);
            });
        }

        handler.poll_once();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pending_write_serviced_in_same_poll() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 1));
        let handler = Arc::new(NfcHandler::with_config(
            field.reader(),
            fast_timing(),
            WriteRequestChannel::new(Duration::from_secs(5)),
        ));

        let writer = {
            let handler = handler.clone();
            thread::spawn(move || handler.write_to_tag(21, 12))
        };
        while handler.write_channel().pending().is_none() {
            thread::sleep(Duration::from_millis(1));
        }

        handler.poll_once();
        assert!(writer.join().unwrap());
        let tag = field.tag().unwrap();
        assert_eq!(tag.written_identifiers(), Some(TagIdentifiers::new(21, 12)));
    }

    #[test]
    fn test_write_protected_tag_sets_status() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 1).read_only());
        let handler = Arc::new(NfcHandler::with_config(
            field.reader(),
            fast_timing(),
            WriteRequestChannel::new(Duration::from_millis(200)),
        ));

        let writer = {
            let handler = handler.clone();
            thread::spawn(move || handler.write_to_tag(5, 5))
        };
        while handler.write_channel().pending().is_none() {
            thread::sleep(Duration::from_millis(1));
        }

        handler.poll_once();
        assert!(!writer.join().unwrap());
        assert_eq!(handler.status(), "Tag is write protected");
        assert_eq!(handler.write_channel().pending(), None);
        assert_eq!(field.write_count(), 0);
    }

    #[test]
    fn test_no_write_without_tag() {
        let field = SimulatedField::new();
        let handler = Arc::new(NfcHandler::with_config(
            field.reader(),
            fast_timing(),
            WriteRequestChannel::new(Duration::from_millis(300)),
        ));

        let writer = {
            let handler = handler.clone();
            thread::spawn(move || handler.write_to_tag(5, 5))
        };
        while handler.write_channel().pending().is_none() {
            thread::sleep(Duration::from_millis(1));
        }
        // Absent polls never touch the pending slot
        handler.poll_once();
        assert!(handler.write_channel().pending().is_some());

        assert!(!writer.join().unwrap());
        assert_eq!(handler.write_channel().pending(), None);
    }

    #[test]
    fn test_stop_interrupts_long_wait() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(1, 1));
        let timing = PollTiming::default().with_present_interval(Duration::from_secs(60));
        let handler = Arc::new(NfcHandler::with_config(
            field.reader(),
            timing,
            WriteRequestChannel::default(),
        ));

        let runner = {
            let handler = handler.clone();
            thread::spawn(move || handler.run())
        };
        while field.connect_count() == 0 {
            thread::sleep(Duration::from_millis(1));
        }

        let start = Instant::now();
        handler.stop();
        runner.join().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(handler.is_stopped());
    }

    #[test]
    fn test_run_returns_immediately_when_already_stopped() {
        let field = SimulatedField::new();
        let handler = NfcHandler::new(field.reader());
        handler.stop();
        handler.run();
        assert_eq!(field.connect_count(), 0);
    }

    #[test]
    fn test_absent_resent_after_full_queue() {
        let field = SimulatedField::new();
        field.place(SimulatedTag::with_ids(3, 7));
        let handler = NfcHandler::new(field.reader());
        let mut events = handler.subscribe(1);

        handler.poll_once();
        field.remove();
        // Queue still holds Present, Absent cannot be queued yet
        handler.poll_once();
        assert_eq!(
            events.try_recv().unwrap(),
            TagEvent::Present(TagIdentifiers::new(3, 7))
        );
        assert!(events.try_recv().is_err());

        handler.poll_once();
        assert_eq!(events.try_recv().unwrap(), TagEvent::Absent);

        // Only once per removal
        handler.poll_once();
        assert!(events.try_recv().is_err());
    }
}
