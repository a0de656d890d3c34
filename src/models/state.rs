//! Last observed state of the status page.

use super::Snapshot;

/// What the notifier remembers between ticks.
///
/// Starts `Uninitialized` and holds the latest successful snapshot after the
/// first successful tick. It is never cleared and lives only in memory, so a
/// restart begins with first-run semantics again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SystemState {
    #[default]
    Uninitialized,
    Observed(Snapshot),
}

impl SystemState {
    pub fn is_initialized(&self) -> bool {
        matches!(self, SystemState::Observed(_))
    }

    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            SystemState::Uninitialized => None,
            SystemState::Observed(snapshot) => Some(snapshot),
        }
    }

    /// Record a new snapshot, replacing whatever was stored.
    pub fn record(&mut self, snapshot: Snapshot) {
        *self = SystemState::Observed(snapshot);
    }
}
