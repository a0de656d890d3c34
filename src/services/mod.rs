//! Service layer for the status watcher.
//!
//! This module contains the collaborators the job talks to:
//! - Status page fetching (`PageStatusFetcher`)
//! - Push notification delivery (`NtfyNotifier`)

mod notifier;
mod status;

pub use notifier::{Notifier, NtfyNotifier, message, title};
pub use status::{PageStatusFetcher, StatusFetcher, find_frame_url, parse_status_table};
