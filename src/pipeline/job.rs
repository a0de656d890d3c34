// src/pipeline/job.rs

//! One tick of the status watcher: gate, fetch, detect, notify, store.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{LineId, SystemState};
use crate::services::{Notifier, StatusFetcher};

use super::detect::{ChangeDetector, ChangeReason};
use super::window::TimeWindowGate;

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Failed(String),
}

/// Notification attempted for one line during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub line: LineId,
    pub reason: ChangeReason,
    pub delivery: Delivery,
}

/// What happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    /// Outside the daily window; nothing was fetched
    Skipped,
    /// The status page could not be read; state was kept
    FetchFailed(String),
    /// A snapshot was processed and stored
    Completed {
        first_run: bool,
        outcomes: Vec<NotifyOutcome>,
    },
}

impl TickReport {
    pub fn sent_count(&self) -> usize {
        self.count(|d| matches!(d, Delivery::Sent))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|d| matches!(d, Delivery::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&Delivery) -> bool) -> usize {
        match self {
            TickReport::Completed { outcomes, .. } => {
                outcomes.iter().filter(|o| pred(&o.delivery)).count()
            }
            _ => 0,
        }
    }
}

/// The watcher job. Owns the last observed state.
pub struct Job {
    gate: TimeWindowGate,
    fetcher: Arc<dyn StatusFetcher>,
    notifier: Arc<dyn Notifier>,
    detector: ChangeDetector,
    state: SystemState,
}

impl Job {
    pub fn new(
        gate: TimeWindowGate,
        fetcher: Arc<dyn StatusFetcher>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            gate,
            fetcher,
            notifier,
            detector: ChangeDetector::new(),
            state: SystemState::default(),
        }
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// Run a tick at the current time.
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// Run a tick as if the clock read `now`.
    ///
    /// Never returns an error: every failure is logged and reflected in the
    /// report so a scheduler loop keeps running.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        if !self.gate.allowed(&now) {
            log::info!("Current time is outside the scheduled window. Skipping this run.");
            return TickReport::Skipped;
        }

        log::info!("Starting scraping job...");
        let snapshot = match self.fetcher.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                log::error!("Error during status fetch: {}", e);
                return TickReport::FetchFailed(e.to_string());
            }
        };

        let first_run = !self.state.is_initialized();
        let changes = self.detector.evaluate(&snapshot, &self.state);

        let mut outcomes = Vec::with_capacity(changes.len());
        for change in changes {
            let fields: Vec<&str> = change.reason.fields().iter().map(|f| f.as_str()).collect();
            log::info!("Line {} flagged ({})", change.line, fields.join(", "));

            let delivery = match self.notifier.notify(change.line, &change.status).await {
                Ok(()) => Delivery::Sent,
                Err(e) => {
                    log::error!("Failed to send notification for line {}: {}", change.line, e);
                    Delivery::Failed(e.to_string())
                }
            };
            outcomes.push(NotifyOutcome {
                line: change.line,
                reason: change.reason,
                delivery,
            });
        }

        self.state.record(snapshot);
        if first_run {
            log::info!("Initial scrape completed.");
        }

        TickReport::Completed {
            first_run,
            outcomes,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use chrono_tz::America::Mexico_City;

    use super::*;
    use crate::error::{AppError, Result};
    use crate::models::{LineStatus, Snapshot};

    struct ScriptedFetcher {
        responses: Mutex<VecDeque<Result<Snapshot>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Snapshot>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl StatusFetcher for ScriptedFetcher {
        async fn fetch(&self) -> Result<Snapshot> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::fetch("test", "no scripted response")))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        failing: HashSet<u8>,
        attempts: Mutex<Vec<u8>>,
    }

    impl RecordingNotifier {
        fn failing_on(lines: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                failing: lines.iter().copied().collect(),
                ..Self::default()
            })
        }

        fn attempts(&self) -> Vec<u8> {
            self.attempts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, line: LineId, _status: &LineStatus) -> Result<()> {
            self.attempts.lock().unwrap().push(line.number());
            if self.failing.contains(&line.number()) {
                return Err(AppError::notify(line, "connection refused"));
            }
            Ok(())
        }
    }

    fn line(n: u8) -> LineId {
        LineId::new(n).unwrap()
    }

    fn noon() -> DateTime<Utc> {
        Mexico_City
            .with_ymd_and_hms(2025, 3, 14, 12, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn night() -> DateTime<Utc> {
        Mexico_City
            .with_ymd_and_hms(2025, 3, 14, 2, 0, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    fn job(fetcher: Arc<ScriptedFetcher>, notifier: Arc<RecordingNotifier>) -> Job {
        let gate = TimeWindowGate::new(5, 23, Mexico_City).unwrap();
        Job::new(gate, fetcher, notifier)
    }

    fn irregular() -> LineStatus {
        LineStatus::new("Servicio Irregular", "Ninguna", "Retraso")
    }

    #[tokio::test]
    async fn test_skipped_outside_window() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Snapshot::baseline())]);
        let notifier = RecordingNotifier::failing_on(&[]);
        let mut job = job(fetcher.clone(), notifier.clone());

        assert_eq!(job.tick_at(night()).await, TickReport::Skipped);
        assert_eq!(fetcher.calls(), 0);
        assert_eq!(job.state(), &SystemState::Uninitialized);
    }

    #[tokio::test]
    async fn test_first_run_notifies_anomalies_and_records_state() {
        let snapshot = Snapshot::baseline().with_line(line(3), irregular());
        let fetcher = ScriptedFetcher::new(vec![Ok(snapshot.clone())]);
        let notifier = RecordingNotifier::failing_on(&[]);
        let mut job = job(fetcher, notifier.clone());

        let report = job.tick_at(noon()).await;
        assert!(matches!(report, TickReport::Completed { first_run: true, .. }));
        assert_eq!(report.sent_count(), 1);
        assert_eq!(notifier.attempts(), vec![3]);
        assert_eq!(job.state(), &SystemState::Observed(snapshot));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_state() {
        let first = Snapshot::baseline();
        let fetcher = ScriptedFetcher::new(vec![
            Ok(first.clone()),
            Err(AppError::fetch("status table", "timeout")),
        ]);
        let notifier = RecordingNotifier::failing_on(&[]);
        let mut job = job(fetcher, notifier.clone());

        job.tick_at(noon()).await;
        let report = job.tick_at(noon()).await;

        assert!(matches!(report, TickReport::FetchFailed(_)));
        assert_eq!(job.state(), &SystemState::Observed(first));
        assert!(notifier.attempts().is_empty());
    }

    #[tokio::test]
    async fn test_failed_notification_does_not_stop_batch() {
        let previous = Snapshot::baseline();
        let current = previous
            .clone()
            .with_line(line(2), irregular())
            .with_line(line(4), irregular());
        let fetcher = ScriptedFetcher::new(vec![Ok(previous), Ok(current.clone())]);
        let notifier = RecordingNotifier::failing_on(&[2]);
        let mut job = job(fetcher, notifier.clone());

        job.tick_at(noon()).await;
        let report = job.tick_at(noon()).await;

        assert_eq!(notifier.attempts(), vec![2, 4]);
        assert_eq!(report.sent_count(), 1);
        assert_eq!(report.failed_count(), 1);
        match &report {
            TickReport::Completed { outcomes, .. } => {
                assert!(matches!(outcomes[0].delivery, Delivery::Failed(_)));
                assert_eq!(outcomes[1].delivery, Delivery::Sent);
            }
            other => panic!("expected completed tick, got {other:?}"),
        }
        assert_eq!(job.state(), &SystemState::Observed(current));
    }

    #[tokio::test]
    async fn test_state_recorded_when_every_notification_fails() {
        let snapshot = Snapshot::baseline()
            .with_line(line(1), irregular())
            .with_line(line(6), irregular());
        let fetcher = ScriptedFetcher::new(vec![Ok(snapshot.clone())]);
        let notifier = RecordingNotifier::failing_on(&[1, 6]);
        let mut job = job(fetcher, notifier);

        let report = job.tick_at(noon()).await;
        assert_eq!(report.failed_count(), 2);
        assert_eq!(job.state(), &SystemState::Observed(snapshot));
    }

    #[tokio::test]
    async fn test_unchanged_second_run_is_quiet() {
        let snapshot = Snapshot::baseline().with_line(line(5), irregular());
        let fetcher = ScriptedFetcher::new(vec![Ok(snapshot.clone()), Ok(snapshot)]);
        let notifier = RecordingNotifier::failing_on(&[]);
        let mut job = job(fetcher, notifier.clone());

        job.tick_at(noon()).await;
        let report = job.tick_at(noon()).await;

        assert!(matches!(report, TickReport::Completed { first_run: false, ref outcomes } if outcomes.is_empty()));
        assert_eq!(notifier.attempts(), vec![5]);
    }
}
