//! Background jobs: the three periodic job kinds, a runner that retries
//! them with exponential backoff, and a thread-per-kind interval scheduler.

use crate::config::SchedulerConfig;
use crate::error::{Result, WorkPulseError};
use crate::idle::{IdleDetector, IdleRun};
use crate::overtime::{OvertimeDetector, OvertimeRun};
use crate::retry::{retry_system_errors, RetryConfig};
use crate::summary::{SummaryAggregator, SummaryRun};
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use log::{error, info, warn};
use serde::Serialize;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    DailySummary(NaiveDate),
    IdleDetection,
    OvertimeChecker,
}

impl JobKind {
    /// Queue name of the job
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::DailySummary(_) => "daily-summary",
            JobKind::IdleDetection => "idle-detection",
            JobKind::OvertimeChecker => "overtime-checker",
        }
    }

    /// Parse a queue name; `daily-summary` targets `date`, defaulting to today
    pub fn parse(name: &str, date: Option<NaiveDate>) -> Result<Self> {
        match name {
            "daily-summary" => Ok(JobKind::DailySummary(
                date.unwrap_or_else(|| Utc::now().date_naive()),
            )),
            "idle-detection" => Ok(JobKind::IdleDetection),
            "overtime-checker" => Ok(JobKind::OvertimeChecker),
            other => Err(WorkPulseError::validation(format!(
                "Unknown job '{}'",
                other
            ))),
        }
    }
}

impl FromStr for JobKind {
    type Err = WorkPulseError;

    fn from_str(s: &str) -> Result<Self> {
        JobKind::parse(s, None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "job", rename_all = "kebab-case")]
pub enum JobOutcome {
    DailySummary(SummaryRun),
    IdleDetection(IdleRun),
    OvertimeChecker(OvertimeRun),
}

#[derive(Clone, Debug)]
pub struct JobRunner {
    idle: IdleDetector,
    overtime: OvertimeDetector,
    summary: SummaryAggregator,
    retry: RetryConfig,
}

impl JobRunner {
    pub fn new(
        idle: IdleDetector,
        overtime: OvertimeDetector,
        summary: SummaryAggregator,
        retry: RetryConfig,
    ) -> Self {
        JobRunner {
            idle,
            overtime,
            summary,
            retry,
        }
    }

    /// Run a job, retrying infrastructure failures with backoff
    pub fn run(&self, job: JobKind) -> Result<JobOutcome> {
        let start = Instant::now();
        let result = retry_system_errors(&self.retry, || self.run_once(job));

        match &result {
            Ok(_) => info!(
                "Job {} finished in {}ms",
                job.name(),
                start.elapsed().as_millis()
            ),
            Err(e) if e.is_system() => error!(
                "Job {} failed after {} attempts: {}",
                job.name(),
                self.retry.max_attempts,
                e
            ),
            Err(e) => warn!("Job {} rejected: {}", job.name(), e),
        }
        result
    }

    fn run_once(&self, job: JobKind) -> Result<JobOutcome> {
        match job {
            JobKind::DailySummary(date) => self.summary.run(date).map(JobOutcome::DailySummary),
            JobKind::IdleDetection => self.idle.run().map(JobOutcome::IdleDetection),
            JobKind::OvertimeChecker => self.overtime.run().map(JobOutcome::OvertimeChecker),
        }
    }
}

/// Runs each job kind on its own thread at a fixed interval until stopped.
pub struct Scheduler {
    runner: Arc<JobRunner>,
    intervals: SchedulerConfig,
    stop: Arc<AtomicBool>,
}

/// Granularity at which sleeping loops notice the stop flag
const STOP_POLL: Duration = Duration::from_millis(200);

impl Scheduler {
    pub fn new(runner: JobRunner, intervals: SchedulerConfig) -> Self {
        Scheduler {
            runner: Arc::new(runner),
            intervals,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag shared by all loops; storing `true` stops them
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Spawn one loop per job kind. Each runs immediately, then every interval.
    pub fn start(&self) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_loop(
                "idle-detection",
                self.intervals.idle_detection_interval_seconds,
                |runner| {
                    let _ = runner.run(JobKind::IdleDetection);
                },
            ),
            self.spawn_loop(
                "overtime-checker",
                self.intervals.overtime_check_interval_seconds,
                |runner| {
                    let _ = runner.run(JobKind::OvertimeChecker);
                },
            ),
            self.spawn_loop(
                "daily-summary",
                self.intervals.daily_summary_interval_seconds,
                |runner| {
                    // Late activity can still change yesterday's totals
                    let today = Utc::now().date_naive();
                    for date in [today - ChronoDuration::days(1), today] {
                        let _ = runner.run(JobKind::DailySummary(date));
                    }
                },
            ),
        ]
    }

    fn spawn_loop<F>(&self, name: &'static str, interval_seconds: u64, tick: F) -> JoinHandle<()>
    where
        F: Fn(&JobRunner) + Send + 'static,
    {
        let runner = self.runner.clone();
        let stop = self.stop.clone();
        let interval = Duration::from_secs(interval_seconds.max(1));

        thread::spawn(move || {
            info!("Scheduler loop {} started (every {}s)", name, interval.as_secs());
            while !stop.load(Ordering::SeqCst) {
                tick(&runner);

                let next = Instant::now() + interval;
                while !stop.load(Ordering::SeqCst) && Instant::now() < next {
                    thread::sleep(STOP_POLL.min(next.saturating_duration_since(Instant::now())));
                }
            }
            info!("Scheduler loop {} stopped", name);
        })
    }
}
