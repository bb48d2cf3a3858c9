//! Depot key cryptography and chunk payload processing.
//!
//! Depot content arrives encrypted and compressed. This crate holds the
//! key-scoped primitives: the AES-256 scheme with its ECB-encrypted IV
//! prefix, the manifest chunk checksum, the `VZ` LZMA container, and
//! [`chunk::process`] tying them together as decrypt, verify, decompress.

pub mod chunk;
pub mod vzip;

mod checksum;
mod cipher;
mod error;

pub use checksum::chunk_checksum;
pub use chunk::process;
pub use cipher::{DepotKey, symmetric_decrypt, symmetric_encrypt};
pub use error::{ProcessError, Result};
