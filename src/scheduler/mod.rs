//! Cooperative job scheduler.
//!
//! Jobs bind a [`Trigger`] to an ordered list of commands. The loop sleeps for
//! `poll_interval_secs`, then runs every due job in table order. Tasks within a
//! job, and jobs that come due together, run one after another.

pub mod runner;
pub mod trigger;

use chrono::NaiveDateTime;
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{JobConfig, SchedulerConfig};
use runner::TaskRun;
pub use trigger::Trigger;

#[derive(Debug, Clone)]
struct JobState {
    job: JobConfig,
    next_run: NaiveDateTime,
    last_run: Option<NaiveDateTime>,
}

pub struct Scheduler {
    jobs: Vec<JobState>,
    poll_interval: Duration,
    task_timeout: Duration,
    preview_chars: usize,
}

impl Scheduler {
    /// Build the job table, scheduling each trigger relative to `now`.
    pub fn new(config: &SchedulerConfig, now: NaiveDateTime) -> Self {
        let jobs = config
            .jobs
            .iter()
            .map(|job| JobState {
                next_run: job.trigger.next_run(now, now),
                last_run: None,
                job: job.clone(),
            })
            .collect();
        Self {
            jobs,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            task_timeout: Duration::from_secs(config.task_timeout_secs),
            preview_chars: config.output_preview_chars,
        }
    }

    /// `(name, trigger, next run)` per job, in table order.
    pub fn schedule(&self) -> Vec<(String, Trigger, NaiveDateTime)> {
        self.jobs
            .iter()
            .map(|s| (s.job.name.clone(), s.job.trigger, s.next_run))
            .collect()
    }

    /// Names of jobs whose next run is at or before `now`, in table order.
    pub fn due_jobs(&self, now: NaiveDateTime) -> Vec<String> {
        self.jobs
            .iter()
            .filter(|s| s.next_run <= now)
            .map(|s| s.job.name.clone())
            .collect()
    }

    /// Run one job's tasks sequentially and reschedule it.
    pub async fn run_job(&mut self, index: usize, now: NaiveDateTime) -> Vec<TaskRun> {
        let Some(state) = self.jobs.get(index) else {
            return Vec::new();
        };
        let job = state.job.clone();
        info!(job = %job.name, trigger = %job.trigger, tasks = job.tasks.len(), "job started");

        let mut runs = Vec::with_capacity(job.tasks.len());
        for task in &job.tasks {
            runs.push(runner::run_task(task, self.task_timeout, self.preview_chars).await);
        }

        let finished = chrono::Local::now().naive_local().max(now);
        if let Some(state) = self.jobs.get_mut(index) {
            state.last_run = Some(finished);
            state.next_run = job.trigger.next_run(finished, finished);
            info!(job = %job.name, next_run = %state.next_run, "job finished");
        }
        runs
    }

    /// Run every job due at `now`, in table order.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Vec<TaskRun> {
        let mut runs = Vec::new();
        for i in 0..self.jobs.len() {
            if self.jobs[i].next_run <= now {
                runs.extend(self.run_job(i, now).await);
            }
        }
        runs
    }

    /// Run the `run_on_start` jobs.
    pub async fn run_startup_jobs(&mut self) -> Vec<TaskRun> {
        let now = chrono::Local::now().naive_local();
        let mut runs = Vec::new();
        for i in 0..self.jobs.len() {
            if self.jobs[i].job.run_on_start {
                runs.extend(self.run_job(i, now).await);
            }
        }
        runs
    }

    /// Poll until Ctrl-C.
    pub async fn run(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }

    /// Run startup jobs, then poll until `shutdown` resolves. A running job is
    /// abandoned (its child killed) when shutdown arrives mid-job.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);

        tokio::select! {
            _ = self.run_startup_jobs() => {}
            _ = &mut shutdown => {
                info!("scheduler stopping");
                return;
            }
        }

        let poll_interval = self.poll_interval;
        loop {
            tokio::select! {
                _ = async {
                    tokio::time::sleep(poll_interval).await;
                    self.tick(chrono::Local::now().naive_local()).await;
                } => {}
                _ = &mut shutdown => {
                    info!("scheduler stopping");
                    break;
                }
            }
        }
    }
}
