// src/pipeline/schedule.rs

//! Single-run and interval-driven execution of the watcher job.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, sleep};

use super::job::{Job, TickReport};

/// Something the scheduler can run once per interval.
#[async_trait]
pub trait ScheduledTask: Send {
    async fn run(&mut self) -> TickReport;
}

#[async_trait]
impl ScheduledTask for Job {
    async fn run(&mut self) -> TickReport {
        self.tick().await
    }
}

/// Runs a task every `interval`, checking once per `poll` whether it is due.
///
/// The first run happens one full interval after start. Runs never overlap:
/// the next one is scheduled from the moment the previous one finished.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    interval: Duration,
    poll: Duration,
}

impl Scheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            poll: Duration::from_secs(1),
        }
    }

    pub fn every_minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `shutdown` resolves. Returns how many runs happened.
    pub async fn run_until<T, S>(&self, task: &mut T, shutdown: S) -> usize
    where
        T: ScheduledTask + ?Sized,
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut next_run = self.due_after(Instant::now());
        let mut runs = 0;

        log::info!(
            "Scheduler started: every {}s, first run in {}s",
            self.interval.as_secs(),
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    log::info!("Shutdown requested, stopping scheduler after {} runs", runs);
                    return runs;
                }
                _ = sleep(self.poll) => {}
            }

            if next_run.is_some_and(|due| Instant::now() >= due) {
                log_report(&task.run().await);
                runs += 1;
                next_run = self.due_after(Instant::now());
            }
        }
    }

    /// When the next run is due, or `None` if that lies beyond the clock's range.
    fn due_after(&self, now: Instant) -> Option<Instant> {
        let due = now.checked_add(self.interval);
        if due.is_none() {
            log::warn!(
                "Interval of {}s is out of range, no further runs scheduled",
                self.interval.as_secs()
            );
        }
        due
    }
}

/// Run a task once and log the outcome.
pub async fn run_once<T: ScheduledTask + ?Sized>(task: &mut T) -> TickReport {
    let report = task.run().await;
    log_report(&report);
    report
}

/// Summarize a completed tick. Skips and fetch failures are logged by the job.
fn log_report(report: &TickReport) {
    if let TickReport::Completed { outcomes, .. } = report {
        log::info!(
            "Tick complete: {} flagged, {} sent, {} failed",
            outcomes.len(),
            report.sent_count(),
            report.failed_count()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        runs: usize,
    }

    #[async_trait]
    impl ScheduledTask for Counter {
        async fn run(&mut self) -> TickReport {
            self.runs += 1;
            TickReport::Skipped
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_per_interval() {
        let scheduler = Scheduler::every_minutes(1);
        let mut counter = Counter::default();

        let runs = scheduler
            .run_until(&mut counter, sleep(Duration::from_secs(150)))
            .await;

        assert_eq!(runs, 2);
        assert_eq!(counter.runs, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_run_before_first_interval() {
        let scheduler = Scheduler::every_minutes(5);
        let mut counter = Counter::default();

        let runs = scheduler
            .run_until(&mut counter, sleep(Duration::from_secs(299)))
            .await;

        assert_eq!(runs, 0);
    }

    #[tokio::test]
    async fn test_run_once() {
        let mut counter = Counter::default();
        assert_eq!(run_once(&mut counter).await, TickReport::Skipped);
        assert_eq!(counter.runs, 1);
    }

    #[test]
    fn test_every_minutes() {
        assert_eq!(
            Scheduler::every_minutes(5).interval(),
            Duration::from_secs(300)
        );
    }

    #[test]
    fn test_every_minutes_saturates() {
        assert_eq!(
            Scheduler::every_minutes(u64::MAX).interval(),
            Duration::from_secs(u64::MAX)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_never_runs() {
        let scheduler = Scheduler::every_minutes(u64::MAX / 60);
        let mut counter = Counter::default();

        let runs = scheduler
            .run_until(&mut counter, sleep(Duration::from_secs(10)))
            .await;

        assert_eq!(runs, 0);
        assert_eq!(counter.runs, 0);
    }
}
