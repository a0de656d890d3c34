// src/models/mod.rs

//! Domain models for the status notifier.

mod config;
mod line;
mod state;

pub use config::{Config, FetchConfig, LoggingConfig, NotifyConfig, ScheduleConfig};
pub use line::{BASELINE_ESTACIONES, BASELINE_ESTADO, LineId, LineStatus, Snapshot, StatusField};
pub use state::SystemState;
