use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// The core node's view of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CoreStatus {
    pub core_latest: u32,
}

/// The gateway's own view: the range of ledgers ingested and still retained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HistoryStatus {
    pub history_latest: u32,
    pub history_latest_closed_at: Option<DateTime<Utc>>,
    pub history_elder: u32,
}

/// Snapshot of both views of the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    #[serde(flatten)]
    pub core: CoreStatus,
    #[serde(flatten)]
    pub history: HistoryStatus,
}

/// In-memory holder of the current [`Status`].
///
/// Readers always get a copy. Each writer replaces only its own half: the core
/// poller publishes [`CoreStatus`], the ingestion pipeline and the reaper
/// publish [`HistoryStatus`]. Writers are expected to publish views where
/// `history_elder <= history_latest <= core_latest`; the cache stores whatever
/// it is given.
#[derive(Debug, Default)]
pub struct State {
    current: RwLock<Status>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the current snapshot.
    pub fn current_status(&self) -> Status {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the whole snapshot.
    pub fn set_status(&self, next: Status) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
    }

    /// Replaces the core node's half of the snapshot.
    pub fn set_core_status(&self, next: CoreStatus) {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .core = next;
    }

    /// Replaces the gateway's half of the snapshot.
    pub fn set_history_status(&self, next: HistoryStatus) {
        self.current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .history = next;
    }

    /// Records a newly committed ledger as the latest ingested one. The first
    /// ingested ledger also becomes the elder.
    pub fn record_ingested(&self, sequence: u32, closed_at: DateTime<Utc>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.history.history_latest = sequence;
        current.history.history_latest_closed_at = Some(closed_at);
        if current.history.history_elder == 0 {
            current.history.history_elder = sequence;
        }
    }

    /// Moves `history_elder` forward to `elder` after older history has been
    /// deleted. Never moves it backwards.
    pub fn advance_history_elder(&self, elder: u32) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if current.history.history_elder < elder {
            current.history.history_elder = elder;
        }
    }

    /// Whether `sequence` is older than the oldest retained ledger.
    pub fn is_before_history(&self, sequence: u32) -> bool {
        sequence < self.current_status().history.history_elder
    }

    /// Time since the last ingested ledger closed, or `None` before the first
    /// ingested ledger.
    pub fn latest_ledger_closed_ago(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.current_status()
            .history
            .history_latest_closed_at
            .map(|closed_at| now - closed_at)
    }

    /// Publish the ledger gauges from the current snapshot. Called right
    /// before each metrics scrape so the values are never older than the
    /// scrape itself.
    pub fn record_metrics(&self) {
        let status = self.current_status();
        metrics::gauge!("orbitr_history_latest_ledger").set(f64::from(status.history.history_latest));
        metrics::gauge!("orbitr_history_elder_ledger").set(f64::from(status.history.history_elder));
        metrics::gauge!("orbitr_core_latest_ledger").set(f64::from(status.core.core_latest));
        if let Some(ago) = self.latest_ledger_closed_ago(Utc::now()) {
            metrics::gauge!("orbitr_history_latest_ledger_closed_ago_seconds")
                .set(ago.num_milliseconds() as f64 / 1000.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn history(latest: u32, elder: u32) -> HistoryStatus {
        HistoryStatus {
            history_latest: latest,
            history_latest_closed_at: Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap()),
            history_elder: elder,
        }
    }

    #[test]
    fn test_partial_updates_leave_other_half_alone() {
        let state = State::new();
        state.set_history_status(history(100, 10));
        state.set_core_status(CoreStatus { core_latest: 105 });

        let status = state.current_status();
        assert_eq!(status.core.core_latest, 105);
        assert_eq!(status.history, history(100, 10));

        state.set_core_status(CoreStatus { core_latest: 106 });
        assert_eq!(state.current_status().history, history(100, 10));
    }

    #[test]
    fn test_advance_history_elder_is_monotonic() {
        let state = State::new();
        state.set_history_status(history(100, 10));
        state.advance_history_elder(50);
        assert_eq!(state.current_status().history.history_elder, 50);
        state.advance_history_elder(20);
        assert_eq!(state.current_status().history.history_elder, 50);
        assert!(state.is_before_history(49));
        assert!(!state.is_before_history(50));
    }

    #[test]
    fn test_record_ingested_sets_elder_once() {
        let state = State::new();
        let closed_at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        state.record_ingested(40, closed_at);
        state.record_ingested(41, closed_at);

        let history = state.current_status().history;
        assert_eq!(history.history_latest, 41);
        assert_eq!(history.history_elder, 40);
        assert_eq!(history.history_latest_closed_at, Some(closed_at));
    }

    #[test]
    fn test_closed_ago_is_computed_at_read_time() {
        let state = State::new();
        let now = Utc.timestamp_opt(1_700_000_030, 0).unwrap();
        assert_eq!(state.latest_ledger_closed_ago(now), None);

        state.set_history_status(history(100, 10));
        assert_eq!(
            state.latest_ledger_closed_ago(now),
            Some(chrono::Duration::seconds(30))
        );
        let later = Utc.timestamp_opt(1_700_000_045, 0).unwrap();
        assert_eq!(
            state.latest_ledger_closed_ago(later),
            Some(chrono::Duration::seconds(45))
        );
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_status() {
        let state = State::new();
        std::thread::scope(|s| {
            s.spawn(|| {
                for n in 1..=10_000u32 {
                    state.set_status(Status {
                        core: CoreStatus { core_latest: n },
                        history: HistoryStatus {
                            history_latest: n,
                            history_latest_closed_at: None,
                            history_elder: n,
                        },
                    });
                }
            });
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..10_000 {
                        let status = state.current_status();
                        assert_eq!(status.core.core_latest, status.history.history_latest);
                        assert_eq!(status.history.history_latest, status.history.history_elder);
                    }
                });
            }
        });
    }

    #[test]
    fn test_core_writer_does_not_disturb_history_readers() {
        let state = State::new();
        state.set_history_status(history(100, 10));
        std::thread::scope(|s| {
            s.spawn(|| {
                for n in 0..10_000u32 {
                    state.set_core_status(CoreStatus { core_latest: 100 + n });
                }
            });
            s.spawn(|| {
                for _ in 0..10_000 {
                    let status = state.current_status();
                    assert_eq!(status.history, history(100, 10));
                    assert!(status.core.core_latest == 0 || status.core.core_latest >= 100);
                }
            });
        });
    }

    #[test]
    fn test_status_serializes_flat() {
        let state = State::new();
        state.set_core_status(CoreStatus { core_latest: 7 });
        let json = serde_json::to_value(state.current_status()).unwrap();
        assert_eq!(json["core_latest"], 7);
        assert_eq!(json["history_latest"], 0);
        assert!(json["history_latest_closed_at"].is_null());
    }
}
