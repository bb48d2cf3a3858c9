//! Steam content delivery: manifest and depot chunk downloads.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and types
//! - [`core`] - Pure transformations
//! - [`effects`] - I/O operations with trait abstraction
//!
//! # Key Behaviors
//!
//! - **Versioned Paths**: Manifest requests pin the manifest wire version
//!   and carry the request code as a path segment when present
//! - **Proxy Rewriting**: Machine-local caches are addressed through
//!   `%host%`/`%path%` path templates
//! - **Strict Lengths**: Bodies are held to their declared
//!   `Content-Length` and chunk metadata, failing fast on overrun
//! - **Nested Budgets**: One deadline bounds the call; request and body
//!   phases get nested budgets clamped to it
//! - **Mechanism-Only**: No retry and no server rotation; the caller owns
//!   that policy

mod core;
mod data;
mod effects;
mod error;

pub use crate::core::{Deadline, DeadlineExceeded, MANIFEST_VERSION, build_command, transfer_length};
pub use data::{ChunkData, DepotManifest, FileEntry, Scheme, Server, Timeouts, file_flags};
pub use effects::{BoxStream, Client, HttpClient, HttpResponse};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{CdnError, Phase, Result};
