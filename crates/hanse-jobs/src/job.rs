//! Job identities, result accumulation, and completion handles.

use std::any::Any;
use std::fmt;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::oneshot;
use tracing::error;

use crate::cell::ResultCell;
use crate::error::JobError;

/// Correlation key tying an outbound request to its inbound responses.
///
/// Ids are opaque to this crate. The transport that mints them must keep
/// them unique among outstanding jobs; see [`JobIdSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for JobId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// Mints fresh job ids from an atomic counter, starting at 1.
#[derive(Debug)]
pub struct JobIdSequence {
    next: AtomicU64,
}

impl JobIdSequence {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    pub fn next(&self) -> JobId {
        JobId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for JobIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// An inbound message as the transport hands it over: type-erased, routed
/// by [`JobId`] alone.
pub type AnyMessage = Box<dyn Any + Send>;

/// Everything a finished or abandoned multi-result job yields.
///
/// `results` preserves arrival order. A set with `complete() == false` was
/// delivered because the job was abandoned mid-stream; `failed()` then
/// records whether the remote end caused the abandonment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSet<M> {
    complete: bool,
    failed: bool,
    results: Vec<M>,
}

impl<M> ResultSet<M> {
    pub(crate) fn finished(results: Vec<M>) -> Self {
        Self {
            complete: true,
            failed: false,
            results,
        }
    }

    pub(crate) fn partial(failed: bool, results: Vec<M>) -> Self {
        Self {
            complete: false,
            failed,
            results,
        }
    }

    /// Whether the finish predicate was satisfied.
    pub fn complete(&self) -> bool {
        self.complete
    }

    /// Whether the remote end reported failure after partial delivery.
    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Accumulated responses in arrival order.
    pub fn results(&self) -> &[M] {
        &self.results
    }

    pub fn into_results(self) -> Vec<M> {
        self.results
    }
}

/// How a job reacted to a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accept {
    /// Message absorbed and the job reached its terminal state.
    Terminal,
    /// Message absorbed, more are expected.
    Pending,
    /// The message's dynamic type is not the one the job was registered for.
    WrongType,
}

/// Object-safe face of a registered job, letting the registry own jobs of
/// heterogeneous message types behind one map.
pub(crate) trait AnyJob: Send {
    fn accept(&mut self, message: AnyMessage) -> Accept;

    /// Resolve the job without further messages. An empty job turns into an
    /// error or a cancellation depending on `due_to_remote_failure`; a job
    /// holding results delivers them as a flagged partial success.
    fn fail(&mut self, due_to_remote_failure: bool);
}

/// A job that accumulates responses until its finish predicate is
/// satisfied.
pub(crate) struct MultiJob<M> {
    results: Vec<M>,
    finish: Box<dyn Fn(&M) -> Option<bool> + Send>,
    cell: ResultCell<Result<ResultSet<M>, JobError>>,
}

impl<M: Send + 'static> MultiJob<M> {
    pub(crate) fn new<F>(finish: F) -> (Self, oneshot::Receiver<Result<ResultSet<M>, JobError>>)
    where
        F: Fn(&M) -> Option<bool> + Send + 'static,
    {
        let (cell, rx) = ResultCell::new();
        (
            Self {
                results: Vec::new(),
                finish: Box::new(finish),
                cell,
            },
            rx,
        )
    }
}

impl<M: Send + 'static> AnyJob for MultiJob<M> {
    fn accept(&mut self, message: AnyMessage) -> Accept {
        let message = match message.downcast::<M>() {
            Ok(message) => *message,
            Err(_) => return Accept::WrongType,
        };
        // Only a literal Some(true) finishes the job; None and Some(false)
        // both keep it pending.
        let finished = (self.finish)(&message) == Some(true);
        self.results.push(message);
        if finished {
            let set = ResultSet::finished(mem::take(&mut self.results));
            if self.cell.resolve(Ok(set)).is_err() {
                error!("job resolved twice through accept");
            }
            Accept::Terminal
        } else {
            Accept::Pending
        }
    }

    fn fail(&mut self, due_to_remote_failure: bool) {
        let outcome = if self.results.is_empty() {
            if due_to_remote_failure {
                self.cell.resolve(Err(JobError::RemoteFailure))
            } else {
                self.cell.cancel()
            }
        } else {
            let set = ResultSet::partial(due_to_remote_failure, mem::take(&mut self.results));
            self.cell.resolve(Ok(set))
        };
        if outcome.is_err() {
            error!("job resolved twice through fail");
        }
    }
}

/// A job terminated by its first response.
pub(crate) struct SingleJob<M> {
    cell: ResultCell<Result<M, JobError>>,
}

impl<M: Send + 'static> SingleJob<M> {
    pub(crate) fn new() -> (Self, oneshot::Receiver<Result<M, JobError>>) {
        let (cell, rx) = ResultCell::new();
        (Self { cell }, rx)
    }
}

impl<M: Send + 'static> AnyJob for SingleJob<M> {
    fn accept(&mut self, message: AnyMessage) -> Accept {
        let message = match message.downcast::<M>() {
            Ok(message) => *message,
            Err(_) => return Accept::WrongType,
        };
        if self.cell.resolve(Ok(message)).is_err() {
            error!("job resolved twice through accept");
        }
        Accept::Terminal
    }

    fn fail(&mut self, due_to_remote_failure: bool) {
        // A single-result job that received its message is already out of
        // the registry, so failure always finds it empty.
        let outcome = if due_to_remote_failure {
            self.cell.resolve(Err(JobError::RemoteFailure))
        } else {
            self.cell.cancel()
        };
        if outcome.is_err() {
            error!("job resolved twice through fail");
        }
    }
}

/// Awaitable handle to a multi-result job.
#[derive(Debug)]
pub struct MultiHandle<M> {
    id: JobId,
    rx: oneshot::Receiver<Result<ResultSet<M>, JobError>>,
}

impl<M> MultiHandle<M> {
    pub(crate) fn new(id: JobId, rx: oneshot::Receiver<Result<ResultSet<M>, JobError>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job's terminal outcome.
    ///
    /// A registry that was dropped or that cancelled the job surfaces as
    /// [`JobError::Cancelled`].
    pub async fn wait(self) -> Result<ResultSet<M>, JobError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(JobError::Cancelled),
        }
    }
}

/// Awaitable handle to a single-result job.
#[derive(Debug)]
pub struct SingleHandle<M> {
    id: JobId,
    rx: oneshot::Receiver<Result<M, JobError>>,
}

impl<M> SingleHandle<M> {
    pub(crate) fn new(id: JobId, rx: oneshot::Receiver<Result<M, JobError>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Wait for the job's terminal outcome.
    pub async fn wait(self) -> Result<M, JobError> {
        match self.rx.await {
            Ok(outcome) => outcome,
            Err(_) => Err(JobError::Cancelled),
        }
    }
}
