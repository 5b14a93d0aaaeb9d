//! Durable deferred jobs backed by the `jobs` collection.
//!
//! Jobs survive restarts because they live in the database. A worker leases a due job
//! before running it; if the process dies mid-run the lease lapses and another poll picks
//! the job up again, so handlers must tolerate running more than once.

use std::sync::Arc;
use std::time::Duration;

use mongodb::bson::{oid::ObjectId, DateTime};
use tracing::{debug, error, info, warn};

use crate::config::JobConfig;
use crate::models::job_model::{Job, JobPayload};
use crate::notifications::{BookingNotifier, NotifyError};
use crate::reservation::ReservationService;
use crate::store::{JobStore, StoreError, StoreResult};

const LEASE: Duration = Duration::from_secs(60);
const RETRY_DELAY: Duration = Duration::from_secs(30);

fn after(base: DateTime, delay: Duration) -> DateTime {
    DateTime::from_millis(base.timestamp_millis() + delay.as_millis() as i64)
}

#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Clone)]
pub struct JobScheduler {
    jobs: Arc<dyn JobStore>,
}

impl JobScheduler {
    pub fn new(jobs: Arc<dyn JobStore>) -> Self {
        JobScheduler { jobs }
    }

    pub async fn schedule_after(&self, delay: Duration, payload: JobPayload) -> StoreResult<ObjectId> {
        let run_at = after(DateTime::now(), delay);
        let id = self.jobs.enqueue(&Job::new(payload.clone(), run_at)).await?;
        debug!(job_id = %id, ?payload, run_at = %run_at, "Job scheduled");
        Ok(id)
    }

    pub async fn schedule_now(&self, payload: JobPayload) -> StoreResult<ObjectId> {
        self.schedule_after(Duration::ZERO, payload).await
    }
}

pub struct JobWorker {
    jobs: Arc<dyn JobStore>,
    reservations: Arc<ReservationService>,
    notifier: Arc<BookingNotifier>,
    config: JobConfig,
}

impl JobWorker {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        reservations: Arc<ReservationService>,
        notifier: Arc<BookingNotifier>,
        config: JobConfig,
    ) -> Self {
        JobWorker {
            jobs,
            reservations,
            notifier,
            config,
        }
    }

    pub async fn run(self) {
        info!(poll_interval = ?self.config.poll_interval, "Job worker started");
        loop {
            match self.run_due().await {
                Ok(0) => {}
                Ok(processed) => debug!(processed, "Processed due jobs"),
                Err(e) => error!(error = %e, "Job polling failed"),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Runs every job that is due right now. Returns how many were attempted.
    pub async fn run_due(&self) -> StoreResult<usize> {
        let mut processed = 0;
        loop {
            let now = DateTime::now();
            let Some(job) = self.jobs.claim_due(now, after(now, LEASE)).await? else {
                return Ok(processed);
            };
            processed += 1;

            let Some(id) = job.id else {
                warn!(?job, "Claimed job without id");
                continue;
            };

            match self.execute(&job.payload).await {
                Ok(()) => self.jobs.complete(id).await?,
                Err(e) => {
                    let retry_at = (job.attempts < self.config.max_attempts).then(|| after(now, RETRY_DELAY));
                    if retry_at.is_some() {
                        warn!(job_id = %id, attempts = job.attempts, error = %e, "Job failed, will retry");
                    } else {
                        error!(job_id = %id, attempts = job.attempts, error = %e, payload = ?job.payload, "Job failed permanently");
                    }
                    self.jobs.fail(id, &e.to_string(), retry_at).await?;
                }
            }
        }
    }

    async fn execute(&self, payload: &JobPayload) -> Result<(), JobError> {
        match payload {
            JobPayload::ReleaseSeats { booking_id } => {
                let outcome = self.reservations.release_if_unpaid(*booking_id).await?;
                debug!(booking_id = %booking_id, ?outcome, "Release job finished");
            }
            JobPayload::SendConfirmation { booking_id } => {
                self.notifier.send_confirmation(*booking_id).await?;
            }
        }
        Ok(())
    }
}
