//! Transfer length reconciliation for chunk downloads.

use crate::error::{CdnError, Result};

/// Decide the authoritative number of body bytes for a chunk transfer.
///
/// The response's declared Content-Length and the manifest's compressed
/// length must agree when both are known; a metadata length of zero means
/// unknown. Exactly one known source wins by default. Neither known is an
/// error, because an unsized chunk stream cannot be validated.
pub fn transfer_length(declared: Option<u64>, metadata: u32) -> Result<u64> {
    match (declared, metadata) {
        (Some(declared), 0) => Ok(declared),
        (Some(declared), metadata) => {
            let metadata = u64::from(metadata);
            if declared == metadata {
                Ok(declared)
            } else {
                Err(CdnError::LengthMismatch {
                    declared,
                    actual: metadata,
                })
            }
        }
        (None, 0) => Err(CdnError::UnknownTransferLength),
        (None, metadata) => Ok(u64::from(metadata)),
    }
}
