//! Job orchestrator: registered handlers on fixed cadences with run-health
//! tracking, failure isolation, and a per-job overlap guard.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

/// How often a job is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobCadence {
    Daily,
    Hourly,
    EveryMinutes(i64),
}

impl JobCadence {
    pub fn interval(self) -> Duration {
        match self {
            JobCadence::Daily => Duration::days(1),
            JobCadence::Hourly => Duration::hours(1),
            JobCadence::EveryMinutes(minutes) => Duration::minutes(minutes),
        }
    }
}

/// Error surfaced by a job handler. One job's failure is recorded and never
/// propagates to other jobs.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct JobError(pub String);

impl JobError {
    pub fn from_error(error: impl std::fmt::Display) -> Self {
        JobError(error.to_string())
    }
}

/// What a completed handler reports back.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobReport {
    pub items: usize,
    pub detail: String,
}

impl JobReport {
    pub fn new(items: usize, detail: impl Into<String>) -> Self {
        Self {
            items,
            detail: detail.into(),
        }
    }
}

/// Outcome of one tick for one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRunOutcome {
    Completed(JobReport),
    Failed(String),
    /// Previous invocation still running; this tick was dropped, not queued.
    Skipped,
}

type JobHandler = Box<dyn Fn() -> Result<JobReport, JobError> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    NeverRan,
    Succeeded,
    Failed,
}

#[derive(Debug, Default)]
struct JobState {
    last_run: Option<DateTime<Utc>>,
    last_status: Option<JobStatus>,
    last_duration_ms: u128,
    last_error: Option<String>,
    success_count: u64,
    error_count: u64,
    skipped_count: u64,
}

struct RegisteredJob {
    name: &'static str,
    cadence: JobCadence,
    handler: JobHandler,
    running: AtomicBool,
    state: Mutex<JobState>,
}

/// Snapshot of one job's registry entry for the operational surface.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusView {
    pub name: &'static str,
    pub cadence: JobCadence,
    pub last_run: Option<DateTime<Utc>>,
    pub last_status: JobStatus,
    pub last_duration_ms: u128,
    pub last_error: Option<String>,
    pub success_count: u64,
    pub error_count: u64,
    pub skipped_count: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("no job registered under '{0}'")]
    UnknownJob(String),
}

/// Registry of named jobs. Scheduled ticks and manual invocation share one
/// execution wrapper.
#[derive(Default)]
pub struct JobScheduler {
    jobs: Vec<Arc<RegisteredJob>>,
}

impl JobScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &'static str, cadence: JobCadence, handler: F)
    where
        F: Fn() -> Result<JobReport, JobError> + Send + Sync + 'static,
    {
        self.jobs.push(Arc::new(RegisteredJob {
            name,
            cadence,
            handler: Box::new(handler),
            running: AtomicBool::new(false),
            state: Mutex::new(JobState::default()),
        }));
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|job| job.name).collect()
    }

    /// Run a single job immediately, subject to the same overlap guard as
    /// scheduled ticks.
    pub fn run_now(&self, name: &str) -> Result<JobRunOutcome, SchedulerError> {
        let job = self
            .jobs
            .iter()
            .find(|job| job.name == name)
            .ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        Ok(execute(job, Utc::now()))
    }

    /// Run every job whose cadence interval has elapsed since its last run.
    pub fn run_due(&self, now: DateTime<Utc>) -> Vec<(&'static str, JobRunOutcome)> {
        let mut outcomes = Vec::new();
        for job in &self.jobs {
            if self.is_due(job, now) {
                outcomes.push((job.name, execute(job, now)));
            }
        }
        outcomes
    }

    fn is_due(&self, job: &RegisteredJob, now: DateTime<Utc>) -> bool {
        let state = job.state.lock().expect("job state mutex poisoned");
        match state.last_run {
            None => true,
            Some(last) => now - last >= job.cadence.interval(),
        }
    }

    pub fn statuses(&self) -> Vec<JobStatusView> {
        self.jobs
            .iter()
            .map(|job| {
                let state = job.state.lock().expect("job state mutex poisoned");
                JobStatusView {
                    name: job.name,
                    cadence: job.cadence,
                    last_run: state.last_run,
                    last_status: state.last_status.unwrap_or(JobStatus::NeverRan),
                    last_duration_ms: state.last_duration_ms,
                    last_error: state.last_error.clone(),
                    success_count: state.success_count,
                    error_count: state.error_count,
                    skipped_count: state.skipped_count,
                }
            })
            .collect()
    }
}

fn execute(job: &RegisteredJob, now: DateTime<Utc>) -> JobRunOutcome {
    // A tick that finds the previous run still live is dropped, not queued.
    if job.running.swap(true, Ordering::AcqRel) {
        warn!(job = job.name, "previous run still in flight; tick skipped");
        let mut state = job.state.lock().expect("job state mutex poisoned");
        state.skipped_count += 1;
        return JobRunOutcome::Skipped;
    }

    let started = Instant::now();
    // A panicking handler is recorded as a failure; unwinding past this
    // point would leave the run token set and disable the job for good.
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (job.handler)()))
        .unwrap_or_else(|payload| Err(JobError(format!("panic: {}", panic_message(payload.as_ref())))));
    let elapsed = started.elapsed().as_millis();

    let outcome = {
        let mut state = job.state.lock().expect("job state mutex poisoned");
        state.last_run = Some(now);
        state.last_duration_ms = elapsed;
        match result {
            Ok(report) => {
                state.last_status = Some(JobStatus::Succeeded);
                state.last_error = None;
                state.success_count += 1;
                info!(job = job.name, items = report.items, elapsed_ms = elapsed, "job completed");
                JobRunOutcome::Completed(report)
            }
            Err(job_error) => {
                state.last_status = Some(JobStatus::Failed);
                state.last_error = Some(job_error.0.clone());
                state.error_count += 1;
                error!(job = job.name, error = %job_error.0, "job failed");
                JobRunOutcome::Failed(job_error.0)
            }
        }
    };

    job.running.store(false, Ordering::Release);
    outcome
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "job handler panicked"
    }
}
