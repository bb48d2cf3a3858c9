//! The job registry: shared ownership, dispatch, and lifetime policing.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::job::{
    Accept, AnyJob, AnyMessage, JobId, MultiHandle, MultiJob, SingleHandle, SingleJob,
};

/// How long a job may sit without hearing from the remote end before the
/// expiry sweep abandons it.
pub const DEFAULT_JOB_TTL: Duration = Duration::from_secs(10);

const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// What [`JobRegistry::dispatch`] did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Routed to a registered job.
    Accepted,
    /// No job took it: unknown id, or a message of the wrong type for the
    /// job registered under that id.
    Unknown,
}

struct Entry {
    job: Box<dyn AnyJob>,
    deadline: Instant,
}

/// Owner of every in-flight job between registration and terminal
/// resolution.
///
/// All methods take `&self`; the inner map is mutex-guarded and the lock is
/// never held across an await point, so dispatch, failure and expiry
/// sources may race freely. Terminal resolution removes the job, which
/// makes resolve-at-most-once structural: no path can reach a job twice.
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Entry>>,
    ttl: Duration,
}

impl JobRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Registry with the protocol's default 10 second job TTL.
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_JOB_TTL)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<JobId, Entry>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a multi-result job under `id` and return its handle.
    ///
    /// Register before sending the request that carries `id`; a response
    /// racing ahead of registration would be dropped as unknown. `id` must
    /// not collide with a live job. Collisions are a caller bug: the
    /// previous job is abandoned and its handle observes cancellation.
    pub fn register_multi<M, F>(&self, id: JobId, finish: F) -> MultiHandle<M>
    where
        M: Send + 'static,
        F: Fn(&M) -> Option<bool> + Send + 'static,
    {
        let (job, rx) = MultiJob::new(finish);
        self.insert(id, Box::new(job));
        MultiHandle::new(id, rx)
    }

    /// Register a single-result job under `id` and return its handle.
    pub fn register_single<M>(&self, id: JobId) -> SingleHandle<M>
    where
        M: Send + 'static,
    {
        let (job, rx) = SingleJob::<M>::new();
        self.insert(id, Box::new(job));
        SingleHandle::new(id, rx)
    }

    fn insert(&self, id: JobId, job: Box<dyn AnyJob>) {
        let deadline = Instant::now() + self.ttl;
        let previous = self.lock().insert(id, Entry { job, deadline });
        if previous.is_some() {
            debug_assert!(false, "job id {id} registered twice");
            warn!(%id, "job id registered twice, previous job abandoned");
        }
    }

    /// Route `message` to the job registered under `id`.
    ///
    /// An accepted non-final message extends the job's deadline by the full
    /// TTL (heartbeat). A message whose dynamic type does not match the
    /// registered job is reported as [`DispatchOutcome::Unknown`] and
    /// leaves the job untouched.
    pub fn dispatch(&self, id: JobId, message: AnyMessage) -> DispatchOutcome {
        let mut jobs = self.lock();
        let Some(entry) = jobs.get_mut(&id) else {
            return DispatchOutcome::Unknown;
        };
        match entry.job.accept(message) {
            Accept::Terminal => {
                jobs.remove(&id);
                debug!(%id, "job finished");
                DispatchOutcome::Accepted
            }
            Accept::Pending => {
                entry.deadline = Instant::now() + self.ttl;
                DispatchOutcome::Accepted
            }
            Accept::WrongType => {
                warn!(%id, "message type does not match registered job");
                DispatchOutcome::Unknown
            }
        }
    }

    /// Abandon the job registered under `id`.
    ///
    /// A job holding partial results delivers them as a flagged success; an
    /// empty job resolves into [`JobError::RemoteFailure`] or observes
    /// cancellation depending on `due_to_remote_failure`. Returns whether a
    /// job was registered under `id`.
    ///
    /// [`JobError::RemoteFailure`]: crate::JobError::RemoteFailure
    pub fn fail(&self, id: JobId, due_to_remote_failure: bool) -> bool {
        let entry = self.lock().remove(&id);
        match entry {
            Some(mut entry) => {
                entry.job.fail(due_to_remote_failure);
                true
            }
            None => false,
        }
    }

    /// Abandon every registered job, e.g. on connection loss. Returns how
    /// many jobs were abandoned.
    pub fn fail_all(&self, due_to_remote_failure: bool) -> usize {
        let drained: Vec<Entry> = {
            let mut jobs = self.lock();
            jobs.drain().map(|(_, entry)| entry).collect()
        };
        let count = drained.len();
        for mut entry in drained {
            entry.job.fail(due_to_remote_failure);
        }
        if count > 0 {
            debug!(count, due_to_remote_failure, "abandoned all outstanding jobs");
        }
        count
    }

    /// Abandon every job whose deadline has passed. Returns how many
    /// expired.
    pub fn expire_overdue(&self) -> usize {
        let now = Instant::now();
        let expired: Vec<(JobId, Entry)> = {
            let mut jobs = self.lock();
            let due: Vec<JobId> = jobs
                .iter()
                .filter(|(_, entry)| entry.deadline <= now)
                .map(|(id, _)| *id)
                .collect();
            due.into_iter()
                .filter_map(|id| jobs.remove(&id).map(|entry| (id, entry)))
                .collect()
        };
        let count = expired.len();
        for (id, mut entry) in expired {
            debug!(%id, "job deadline expired");
            entry.job.fail(false);
        }
        count
    }

    /// Periodic expiry sweep. Runs forever; spawn it alongside the
    /// connection that feeds [`dispatch`](Self::dispatch).
    pub async fn drive_expirations(&self) {
        let mut sweep = time::interval(SWEEP_INTERVAL);
        sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            sweep.tick().await;
            self.expire_overdue();
        }
    }

    /// Number of jobs currently registered.
    pub fn outstanding(&self) -> usize {
        self.lock().len()
    }
}
