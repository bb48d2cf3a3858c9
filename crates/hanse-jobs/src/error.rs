//! Error types for hanse-jobs.

use thiserror::Error;

/// Terminal failure of a tracked job, delivered through its handle.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum JobError {
    #[error("job failed remotely before any result arrived")]
    RemoteFailure,

    #[error("job cancelled locally before any result arrived")]
    Cancelled,
}

/// A completion cell was asked to resolve a second time.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("job outcome already resolved")]
pub struct AlreadyResolved;
