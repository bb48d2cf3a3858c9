//! Immutable data types for the content delivery pipeline.
//!
//! Servers, manifests and tuning knobs live here. Everything is a plain
//! value passed between functions; the one sanctioned in-place mutation is
//! [`DepotManifest::decrypt_filenames`].

pub mod manifest;
pub mod options;
pub mod server;

pub use manifest::{ChunkData, DepotManifest, FileEntry, file_flags};
pub use options::Timeouts;
pub use server::{Scheme, Server};
