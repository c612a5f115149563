//! Offline edit queue
//!
//! Writes that cannot be sent immediately are buffered here and replayed
//! when connectivity returns. Entries move `Queued -> Syncing -> {Synced |
//! Error}`; `Error` entries stay eligible and are revisited on every pass.
//! A pass walks entries in enqueue order, but a failed entry does not block
//! the ones behind it.

mod store;
mod transport;

pub use store::{JsonFileQueueStore, MemoryQueueStore, QueueStore};
pub use transport::{DeliveryError, EditTransport, HttpTransport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::Result;

/// Lifecycle state of a queued edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditStatus {
    Queued,
    Syncing,
    Synced,
    Error,
}

/// HTTP-like method of a queued edit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EditMethod {
    Post,
    Put,
    Delete,
}

/// One buffered write awaiting delivery
///
/// The payload is frozen at enqueue time; in particular the embedded
/// version is not refreshed before replay, so a replayed edit can come
/// back as a version conflict through the normal write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedEdit {
    pub id: Uuid,
    pub method: EditMethod,
    pub target: String,
    pub payload: serde_json::Value,
    pub status: EditStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl QueuedEdit {
    #[must_use]
    pub fn new(method: EditMethod, target: impl Into<String>, payload: serde_json::Value) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: Uuid::now_v7(),
            method,
            target: target.into(),
            payload,
            status: EditStatus::Queued,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, status: EditStatus) {
        self.status = status;
        self.updated_at = chrono::Utc::now().timestamp_millis();
    }
}

/// Tuning for the queue processor
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// First retry delay; doubles per recorded attempt
    pub backoff_base: Duration,
    /// Ceiling for the retry delay
    pub backoff_cap: Duration,
    /// Interval of the background processing tick
    pub tick_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_secs(30),
            tick_interval: Duration::from_secs(15),
        }
    }
}

/// Summary of one processing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessReport {
    /// Entries for which delivery was attempted
    pub attempted: usize,
    /// Entries that reached `Synced`
    pub delivered: usize,
    /// Entries that recorded a new error
    pub failed: usize,
    /// The pass stopped early because the client was offline
    pub stopped_offline: bool,
    /// Another pass was already running; nothing was done
    pub busy: bool,
}

/// The client-side edit queue
///
/// Owns no global state: persistence and transport are injected, and the
/// background tick has an explicit start/stop lifecycle via
/// [`QueueWorker`].
pub struct EditQueue<T: EditTransport> {
    store: Arc<dyn QueueStore>,
    transport: T,
    config: QueueConfig,
    busy: tokio::sync::Mutex<()>,
    offline: AtomicBool,
}

impl<T: EditTransport + 'static> EditQueue<T> {
    #[must_use]
    pub fn new(store: Arc<dyn QueueStore>, transport: T, config: QueueConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            transport,
            config,
            busy: tokio::sync::Mutex::new(()),
            offline: AtomicBool::new(false),
        })
    }

    /// Simulate or record loss of connectivity; while offline, passes stop
    /// before attempting delivery
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Append a new edit and trigger a processing pass without blocking the
    /// caller
    pub fn enqueue(
        self: &Arc<Self>,
        method: EditMethod,
        target: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<QueuedEdit> {
        let edit = QueuedEdit::new(method, target, payload);
        self.store.append(&edit)?;
        tracing::debug!(edit = %edit.id, target = %edit.target, "Enqueued edit");

        let queue = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(error) = queue.process().await {
                tracing::warn!("Queue pass after enqueue failed: {error}");
            }
        });

        Ok(edit)
    }

    /// Run one processing pass
    ///
    /// Mutually exclusive with itself: a pass that finds another one running
    /// returns immediately with `busy` set.
    pub async fn process(&self) -> Result<ProcessReport> {
        let Ok(_guard) = self.busy.try_lock() else {
            return Ok(ProcessReport {
                busy: true,
                ..ProcessReport::default()
            });
        };

        let mut report = ProcessReport::default();
        let entries = self.store.load()?;

        for mut edit in entries {
            if edit.status == EditStatus::Synced {
                continue;
            }
            if self.is_offline() {
                // Remaining entries are left untouched, preserving order
                // for the next pass.
                report.stopped_offline = true;
                break;
            }

            edit.transition(EditStatus::Syncing);
            self.store.update(&edit)?;
            report.attempted += 1;

            match self.transport.deliver(&edit).await {
                Ok(()) => {
                    edit.transition(EditStatus::Synced);
                    edit.last_error = None;
                    self.store.update(&edit)?;
                    report.delivered += 1;
                    tracing::debug!(edit = %edit.id, "Delivered queued edit");
                }
                Err(error) => {
                    edit.attempts += 1;
                    edit.last_error = Some(error.to_string());
                    edit.transition(EditStatus::Error);
                    self.store.update(&edit)?;
                    report.failed += 1;
                    tracing::debug!(
                        edit = %edit.id,
                        attempts = edit.attempts,
                        "Delivery failed: {error}"
                    );
                    // Pace the pass after a failure; later entries are still
                    // attempted, so a dead entry cannot block the queue.
                    tokio::time::sleep(backoff_delay(&self.config, edit.attempts)).await;
                }
            }
        }

        Ok(report)
    }

    /// Entries that are not yet `Synced`
    pub fn pending_count(&self) -> Result<usize> {
        Ok(self
            .store
            .load()?
            .iter()
            .filter(|entry| entry.status != EditStatus::Synced)
            .count())
    }

    /// Snapshot of all entries, oldest first
    pub fn entries(&self) -> Result<Vec<QueuedEdit>> {
        self.store.load()
    }

    /// Drop `Synced` entries; they are otherwise retained for inspection
    pub fn compact(&self) -> Result<usize> {
        let synced: Vec<Uuid> = self
            .store
            .load()?
            .iter()
            .filter(|entry| entry.status == EditStatus::Synced)
            .map(|entry| entry.id)
            .collect();
        self.store.remove(&synced)?;
        Ok(synced.len())
    }

    /// Spawn the periodic background tick; drop or `stop` the worker to end
    /// it
    pub fn start(self: &Arc<Self>) -> QueueWorker {
        let queue = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(queue.config.tick_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                if queue.is_offline() {
                    continue;
                }
                match queue.process().await {
                    Ok(report) if report.busy => {}
                    Ok(_) => {}
                    Err(error) => tracing::warn!("Background queue pass failed: {error}"),
                }
            }
        });
        QueueWorker { handle }
    }
}

/// Handle for the background tick task
pub struct QueueWorker {
    handle: JoinHandle<()>,
}

impl QueueWorker {
    pub fn stop(&self) {
        self.handle.abort();
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Delay after `attempts` recorded failures: base doubling per attempt,
/// capped
fn backoff_delay(config: &QueueConfig, attempts: u32) -> Duration {
    let exponent = attempts.saturating_sub(1).min(16);
    let delay = config.backoff_base.saturating_mul(1 << exponent);
    delay.min(config.backoff_cap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    fn test_config() -> QueueConfig {
        QueueConfig {
            backoff_base: Duration::from_millis(1),
            backoff_cap: Duration::from_millis(4),
            tick_interval: Duration::from_millis(20),
        }
    }

    /// Records delivery order; fails targets listed in `failing`
    #[derive(Default)]
    struct RecordingTransport {
        delivered: Mutex<Vec<String>>,
        failing: Vec<String>,
    }

    impl RecordingTransport {
        fn failing(targets: &[&str]) -> Self {
            Self {
                delivered: Mutex::new(Vec::new()),
                failing: targets.iter().map(ToString::to_string).collect(),
            }
        }

        fn order(&self) -> Vec<String> {
            self.delivered.lock().unwrap().clone()
        }
    }

    impl EditTransport for RecordingTransport {
        async fn deliver(&self, edit: &QueuedEdit) -> std::result::Result<(), DeliveryError> {
            self.delivered.lock().unwrap().push(edit.target.clone());
            if self.failing.contains(&edit.target) {
                return Err(DeliveryError::Network("connection refused".to_string()));
            }
            Ok(())
        }
    }

    /// Blocks inside deliver until released, to hold a pass open
    struct GatedTransport {
        started: Arc<Notify>,
        release: Arc<Notify>,
    }

    impl EditTransport for GatedTransport {
        async fn deliver(&self, _edit: &QueuedEdit) -> std::result::Result<(), DeliveryError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    /// Build a queue with edits already in the store, avoiding the
    /// fire-and-forget pass `enqueue` spawns so passes stay deterministic
    fn seeded_queue<T: EditTransport + 'static>(
        transport: T,
        targets: &[&str],
    ) -> Arc<EditQueue<T>> {
        let store = Arc::new(MemoryQueueStore::new());
        for target in targets {
            store
                .append(&QueuedEdit::new(EditMethod::Put, *target, json!({})))
                .unwrap();
        }
        EditQueue::new(store, transport, test_config())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_offline_edit_waits_then_syncs() {
        let queue = seeded_queue(RecordingTransport::default(), &[]);
        queue.set_offline(true);

        queue
            .enqueue(EditMethod::Delete, "/v1/products/42", json!({"version": 1}))
            .unwrap();

        // While offline the pass stops early and the entry stays queued
        let report = queue.process().await.unwrap();
        assert!(report.stopped_offline);
        assert_eq!(queue.pending_count().unwrap(), 1);
        assert_eq!(queue.entries().unwrap()[0].status, EditStatus::Queued);

        queue.set_offline(false);
        // The pass spawned by enqueue may still be in flight; poll until the
        // entry lands.
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                queue.process().await.unwrap();
                if queue.pending_count().unwrap() == 0 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queued edit should sync once online");
        assert_eq!(queue.entries().unwrap()[0].status, EditStatus::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fifo_order_without_head_of_line_blocking() {
        let queue = seeded_queue(RecordingTransport::failing(&["/a"]), &["/a", "/b", "/c"]);

        let report = queue.process().await.unwrap();

        assert_eq!(report.attempted, 3);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failed, 1);

        let entries = queue.entries().unwrap();
        assert_eq!(entries[0].status, EditStatus::Error);
        assert_eq!(entries[0].attempts, 1);
        assert!(entries[0]
            .last_error
            .as_deref()
            .unwrap()
            .contains("connection refused"));
        assert_eq!(entries[1].status, EditStatus::Synced);
        assert_eq!(entries[2].status, EditStatus::Synced);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_attempt_order_matches_enqueue_order() {
        let queue = seeded_queue(RecordingTransport::failing(&["/a"]), &["/a", "/b", "/c"]);

        queue.process().await.unwrap();
        assert_eq!(queue.transport.order(), vec!["/a", "/b", "/c"]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_entries_are_retried_on_later_passes() {
        let queue = seeded_queue(RecordingTransport::failing(&["/a"]), &["/a"]);

        queue.process().await.unwrap();
        queue.process().await.unwrap();

        let entries = queue.entries().unwrap();
        assert_eq!(entries[0].attempts, 2);
        assert_eq!(entries[0].status, EditStatus::Error);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pass_is_single_flight() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let queue = seeded_queue(
            GatedTransport {
                started: Arc::clone(&started),
                release: Arc::clone(&release),
            },
            &["/a"],
        );

        let runner = Arc::clone(&queue);
        let pass = tokio::spawn(async move { runner.process().await });

        // Wait until the first pass is inside deliver, then try a second one
        started.notified().await;
        let report = queue.process().await.unwrap();
        assert!(report.busy);

        release.notify_one();
        let first = pass.await.unwrap().unwrap();
        assert_eq!(first.delivered, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_background_tick_drains_queue() {
        let queue = seeded_queue(RecordingTransport::default(), &["/a"]);

        let worker = queue.start();
        tokio::time::timeout(Duration::from_secs(2), async {
            while queue.pending_count().unwrap() > 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("tick should drain the queue");
        worker.stop();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_compact_drops_only_synced() {
        let queue = seeded_queue(RecordingTransport::failing(&["/a"]), &["/a", "/b"]);
        queue.process().await.unwrap();

        let dropped = queue.compact().unwrap();
        assert_eq!(dropped, 1);

        let entries = queue.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].target, "/a");
    }

    #[test]
    fn test_backoff_growth_is_monotonic_and_capped() {
        let config = QueueConfig {
            backoff_base: Duration::from_millis(100),
            backoff_cap: Duration::from_millis(1500),
            tick_interval: Duration::from_secs(1),
        };

        let delays: Vec<Duration> = (1..=8).map(|n| backoff_delay(&config, n)).collect();
        for pair in delays.windows(2) {
            assert!(pair[0] <= pair[1], "delays must be non-decreasing");
        }
        assert_eq!(delays[0], Duration::from_millis(100));
        assert_eq!(delays[1], Duration::from_millis(200));
        assert_eq!(delays[7], Duration::from_millis(1500));
    }

    #[test]
    fn test_backoff_handles_huge_attempt_counts() {
        let config = test_config();
        assert_eq!(backoff_delay(&config, u32::MAX), config.backoff_cap);
    }
}
