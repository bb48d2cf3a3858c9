//! Asynchronous job correlation and result aggregation.
//!
//! Request/response protocols that multiplex many conversations over one
//! connection need a way to pair inbound messages with the caller waiting
//! for them. This crate provides that pairing: callers register a job under
//! a [`JobId`] before sending the request, the transport routes every
//! response carrying that id through [`JobRegistry::dispatch`], and the
//! caller awaits a typed handle.
//!
//! # Job shapes
//!
//! - **Single-result**: the first response terminates the job.
//! - **Multi-result**: responses accumulate in arrival order until a finish
//!   predicate returns `Some(true)`. A job abandoned mid-stream still
//!   delivers what it gathered, as a [`ResultSet`] flagged incomplete;
//!   partial delivery is a success, never an error.
//!
//! Only a job that ends empty turns into a [`JobError`]: remote failure
//! when the peer said so, cancellation when the job was abandoned locally.
//!
//! # Lifetime policing
//!
//! The registry stamps every job with a deadline and extends it each time a
//! message is accepted, so a burst of partial responses keeps a job alive
//! while a silent remote end cannot leak it. [`JobRegistry::drive_expirations`]
//! is the sweep loop; spawn it next to the connection.

mod cell;
mod error;
mod job;
mod registry;

pub use error::{AlreadyResolved, JobError};
pub use job::{AnyMessage, JobId, JobIdSequence, MultiHandle, ResultSet, SingleHandle};
pub use registry::{DEFAULT_JOB_TTL, DispatchOutcome, JobRegistry};
