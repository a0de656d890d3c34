//! Change detection between consecutive snapshots.
//!
//! On the first run there is nothing to compare against, so every line that
//! deviates from normal service is reported. Afterwards a line is reported
//! whenever any of its fields differs from the previous snapshot.

use crate::models::{LineId, LineStatus, Snapshot, StatusField, SystemState};

/// Why a line was flagged for notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeReason {
    /// First run: these fields deviate from normal service
    Anomaly(Vec<StatusField>),
    /// Steady state: these fields differ from the previous snapshot
    Changed(Vec<StatusField>),
}

impl ChangeReason {
    pub fn fields(&self) -> &[StatusField] {
        match self {
            ChangeReason::Anomaly(fields) | ChangeReason::Changed(fields) => fields,
        }
    }
}

/// A line that needs a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineChange {
    pub line: LineId,
    pub status: LineStatus,
    pub reason: ChangeReason,
}

/// Decides which lines need a notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeDetector;

impl ChangeDetector {
    pub fn new() -> Self {
        Self
    }

    /// Compare a new snapshot against the stored state.
    ///
    /// Pure: the caller is responsible for recording `current` afterwards.
    /// Results are in ascending line order.
    pub fn evaluate(&self, current: &Snapshot, state: &SystemState) -> Vec<LineChange> {
        match state.snapshot() {
            None => Self::first_run(current),
            Some(previous) => Self::steady_state(previous, current),
        }
    }

    fn first_run(current: &Snapshot) -> Vec<LineChange> {
        let mut changes = Vec::new();
        for (line, status) in current.iter() {
            let anomalies = status.anomalies();
            if anomalies.is_empty() {
                log::info!("Initial happy path for line {}. No notification sent.", line);
                continue;
            }
            changes.push(LineChange {
                line,
                status: status.clone(),
                reason: ChangeReason::Anomaly(anomalies),
            });
        }
        changes
    }

    fn steady_state(previous: &Snapshot, current: &Snapshot) -> Vec<LineChange> {
        let empty = LineStatus::default();
        let mut changes = Vec::new();
        for (line, status) in current.iter() {
            let prev = previous.get(line).unwrap_or(&empty);
            let changed = status.changed_fields(prev);
            if changed.is_empty() {
                log::info!("No changes detected for line {}.", line);
                continue;
            }
            changes.push(LineChange {
                line,
                status: status.clone(),
                reason: ChangeReason::Changed(changed),
            });
        }
        changes
    }
}

/// Convenience function to evaluate changes with the default detector.
pub fn detect_changes(current: &Snapshot, state: &SystemState) -> Vec<LineChange> {
    ChangeDetector::new().evaluate(current, state)
}
