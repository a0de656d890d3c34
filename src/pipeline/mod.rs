//! Pipeline entry points for the status watcher.
//!
//! - `detect`: decide which lines changed since the last snapshot
//! - `window`: daily time window in which ticks may run
//! - `job`: one gate → fetch → detect → notify → store tick
//! - `schedule`: run the job once or on an interval

pub mod detect;
pub mod job;
pub mod schedule;
pub mod window;

pub use detect::{ChangeDetector, ChangeReason, LineChange, detect_changes};
pub use job::{Delivery, Job, NotifyOutcome, TickReport};
pub use schedule::{ScheduledTask, Scheduler, run_once};
pub use window::TimeWindowGate;
