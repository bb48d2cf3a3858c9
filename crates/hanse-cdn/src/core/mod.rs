//! Pure transformations: URL synthesis, length reconciliation, time
//! bounds and envelope unpacking. Nothing here performs I/O.

pub mod deadline;
pub mod length;
pub mod unpack;
pub mod url;

pub use deadline::{Deadline, DeadlineExceeded};
pub use length::transfer_length;
pub use self::url::{MANIFEST_VERSION, build_command};
