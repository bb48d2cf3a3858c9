//! Composable time bounds for pipeline calls.

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, timeout_at};

/// The bound of a [`Deadline`] passed before the wrapped future finished.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("deadline exceeded")]
pub struct DeadlineExceeded;

/// A fixed point in time bounding an operation and everything nested
/// inside it.
///
/// [`nested`](Deadline::nested) derives child bounds clamped to their
/// parent, so a phase budget can never extend the call budget it lives
/// inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    /// Deadline at `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    /// A child bound at `budget` from now, clamped to `self`.
    pub fn nested(&self, budget: Duration) -> Self {
        Self((Instant::now() + budget).min(self.0))
    }

    pub fn instant(&self) -> Instant {
        self.0
    }

    /// Run `future` under this bound.
    pub async fn bound<F: Future>(&self, future: F) -> Result<F::Output, DeadlineExceeded> {
        timeout_at(self.0, future).await.map_err(|_| DeadlineExceeded)
    }
}
