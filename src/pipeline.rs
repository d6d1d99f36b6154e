// src/pipeline.rs

//! The check-and-notify orchestration cycle.
//!
//! One cycle: load channel config → load snapshot → fetch → diff → format →
//! deliver → persist iff delivered. The cycle is guarded by an async mutex
//! so a manual trigger and a scheduled run can never interleave their
//! load/compare/save phases.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;

use crate::config::ChannelConfig;
use crate::diff;
use crate::error::Result;
use crate::fetcher::{Fetcher, Source};
use crate::models::{Config, Snapshot};
use crate::notifier::{self, Notifier};
use crate::store::SnapshotStore;

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Fetch failed or produced zero records; nothing was diffed, sent, or
    /// persisted.
    SourceUnavailable,
    /// Message delivered and the new snapshot persisted.
    Delivered { new_items: usize },
    /// Delivery failed (or credentials missing); snapshot left untouched so
    /// the next cycle recomputes the same diff.
    NotDelivered { new_items: usize },
}

/// Composes fetcher, change detection, notifier, and store into the
/// check-and-notify cycle.
pub struct Watcher {
    source: Arc<dyn Source>,
    store: SnapshotStore,
    notifier: Notifier,
    env_path: PathBuf,
    cycle_lock: tokio::sync::Mutex<()>,
}

impl Watcher {
    /// Assemble a watcher from its parts.
    pub fn new(
        source: Arc<dyn Source>,
        store: SnapshotStore,
        notifier: Notifier,
        env_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            env_path: env_path.into(),
            cycle_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Build the production watcher: HTTP fetcher and Telegram channel.
    pub fn from_config(config: &Config, env_path: impl Into<PathBuf>) -> Result<Self> {
        let source = Arc::new(Fetcher::new(config.source.clone())?);
        let store = SnapshotStore::new(&config.storage);
        let notifier = Notifier::telegram()?;
        Ok(Self::new(source, store, notifier, env_path))
    }

    /// Read the channel configuration fresh from the env file.
    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::load(&self.env_path)
    }

    /// Run one check-and-notify cycle.
    ///
    /// Infallible by design: every failure degrades to an outcome variant
    /// and a log line, and is retried naturally on the next run. Concurrent
    /// callers serialize on the cycle lock.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let _guard = self.cycle_lock.lock().await;

        log::info!("Running check for updates");
        let channel_config = self.channel_config();
        let previous = self.store.load().await;

        let current = match self.source.fetch().await {
            Ok(items) if items.is_empty() => {
                log::warn!("No announcements found. Check the page structure.");
                return CycleOutcome::SourceUnavailable;
            }
            Ok(items) => Snapshot::new(items),
            Err(e) => {
                log::warn!("Fetch failed: {}. Skipping this cycle.", e);
                return CycleOutcome::SourceUnavailable;
            }
        };

        let fresh = diff::new_items(&current, &previous);
        let message = notifier::format_message(&fresh, &previous, Local::now().date_naive());

        match self.notifier.deliver(&message, &channel_config).await {
            Ok(()) => {
                // Persistence is gated on delivery: "the user was informed"
                // and "we remember having informed them" move together.
                if let Err(e) = self.store.save(&current).await {
                    log::error!("Delivered but failed to persist snapshot: {}", e);
                }
                log::info!("Notified about {} new announcement(s)", fresh.len());
                CycleOutcome::Delivered {
                    new_items: fresh.len(),
                }
            }
            Err(e) => {
                log::warn!("Notification not sent ({}); will retry next cycle", e);
                CycleOutcome::NotDelivered {
                    new_items: fresh.len(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{Announcement, StorageConfig};
    use crate::notifier::MessageChannel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FakeSource {
        items: Vec<Announcement>,
        fail: bool,
    }

    #[async_trait]
    impl Source for FakeSource {
        async fn fetch(&self) -> Result<Vec<Announcement>> {
            if self.fail {
                Err(AppError::scrape("test source", "unreachable"))
            } else {
                Ok(self.items.clone())
            }
        }
    }

    struct FakeChannel {
        succeed: bool,
        calls: AtomicUsize,
        last_message: Mutex<Option<String>>,
    }

    impl FakeChannel {
        fn new(succeed: bool) -> Arc<Self> {
            Arc::new(Self {
                succeed,
                calls: AtomicUsize::new(0),
                last_message: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl MessageChannel for FakeChannel {
        async fn send(&self, text: &str, _config: &ChannelConfig) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_message.lock().unwrap() = Some(text.to_string());
            if self.succeed {
                Ok(())
            } else {
                Err(AppError::delivery("channel down"))
            }
        }
    }

    struct Harness {
        dir: TempDir,
        watcher: Watcher,
        channel: Arc<FakeChannel>,
    }

    fn harness(items: Vec<Announcement>, source_fails: bool, deliver_ok: bool) -> Harness {
        let dir = TempDir::new().unwrap();
        let env_path = dir.path().join(".env");
        std::fs::write(
            &env_path,
            "TELEGRAM_TOKEN=123:abc\nTELEGRAM_CHAT_ID=42\nNOTIFICATION_TIME=09:00\n",
        )
        .unwrap();

        let store = SnapshotStore::new(&StorageConfig {
            state_dir: dir.path().to_string_lossy().into_owned(),
            state_file: "previous_data.json".to_string(),
        });
        let channel = FakeChannel::new(deliver_ok);
        let watcher = Watcher::new(
            Arc::new(FakeSource {
                items,
                fail: source_fails,
            }),
            store,
            Notifier::new(channel.clone()),
            env_path,
        );
        Harness {
            dir,
            watcher,
            channel,
        }
    }

    fn store_of(h: &Harness) -> SnapshotStore {
        SnapshotStore::new(&StorageConfig {
            state_dir: h.dir.path().to_string_lossy().into_owned(),
            state_file: "previous_data.json".to_string(),
        })
    }

    async fn seed(h: &Harness, titles: &[&str]) -> Snapshot {
        let snapshot = Snapshot::new(titles.iter().map(|&t| Announcement::titled(t)).collect());
        store_of(h).save(&snapshot).await.unwrap();
        snapshot
    }

    #[tokio::test]
    async fn empty_fetch_aborts_without_side_effects() {
        let h = harness(vec![], false, true);
        let previous = seed(&h, &["A"]).await;

        let outcome = h.watcher.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::SourceUnavailable);
        assert_eq!(store_of(&h).load().await, previous);
        assert_eq!(h.channel.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fetch_error_aborts_without_side_effects() {
        let h = harness(vec![], true, true);
        let previous = seed(&h, &["A"]).await;

        let outcome = h.watcher.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::SourceUnavailable);
        assert_eq!(store_of(&h).load().await, previous);
        assert_eq!(h.channel.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn delivery_failure_leaves_snapshot_untouched() {
        let h = harness(
            vec![Announcement::titled("A"), Announcement::titled("B")],
            false,
            false,
        );
        let previous = seed(&h, &["A"]).await;

        let outcome = h.watcher.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::NotDelivered { new_items: 1 });
        assert_eq!(store_of(&h).load().await, previous);
        assert_eq!(h.channel.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn successful_delivery_persists_the_fetch() {
        let h = harness(
            vec![Announcement::titled("A"), Announcement::titled("B")],
            false,
            true,
        );
        seed(&h, &["A"]).await;

        let outcome = h.watcher.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Delivered { new_items: 1 });
        assert_eq!(
            store_of(&h).load().await,
            Snapshot::new(vec![Announcement::titled("A"), Announcement::titled("B")])
        );

        // Message layout per the end-to-end contract: B is NEW item 1,
        // A is EXISTING item 1 (the pre-update list).
        let message = h.channel.last_message.lock().unwrap().clone().unwrap();
        assert!(message.contains("*1.* B"));
        assert!(message.contains("\n1. A"));
        // One item per section, so no second entry anywhere.
        assert!(!message.contains("*2.*"));
        assert!(!message.contains("\n2. "));
    }

    #[tokio::test]
    async fn second_cycle_over_unchanged_source_finds_nothing() {
        let h = harness(
            vec![Announcement::titled("A"), Announcement::titled("B")],
            false,
            true,
        );

        let first = h.watcher.run_cycle().await;
        let second = h.watcher.run_cycle().await;

        assert_eq!(first, CycleOutcome::Delivered { new_items: 2 });
        assert_eq!(second, CycleOutcome::Delivered { new_items: 0 });
    }

    #[tokio::test]
    async fn missing_credentials_block_persistence_and_network() {
        let h = harness(vec![Announcement::titled("B")], false, true);
        // Blank out the token.
        std::fs::write(
            h.dir.path().join(".env"),
            "TELEGRAM_TOKEN=\nTELEGRAM_CHAT_ID=42\nNOTIFICATION_TIME=09:00\n",
        )
        .unwrap();
        let previous = seed(&h, &["A"]).await;

        let outcome = h.watcher.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::NotDelivered { new_items: 1 });
        assert_eq!(h.channel.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store_of(&h).load().await, previous);
    }

    #[tokio::test]
    async fn failed_delivery_is_retried_with_the_same_diff() {
        let h = harness(vec![Announcement::titled("B")], false, false);
        seed(&h, &["A"]).await;

        assert_eq!(
            h.watcher.run_cycle().await,
            CycleOutcome::NotDelivered { new_items: 1 }
        );
        // Same stored snapshot, so the same item is new again.
        assert_eq!(
            h.watcher.run_cycle().await,
            CycleOutcome::NotDelivered { new_items: 1 }
        );
    }
}
