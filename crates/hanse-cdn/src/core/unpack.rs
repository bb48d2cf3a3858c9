//! Manifest transport envelope handling.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::error::{CdnError, Result};

/// Unpack the first member of a manifest's zip envelope.
///
/// Returns the member bytes together with the member count. Well-formed
/// envelopes carry exactly one member; the caller treats anything else as
/// a tolerated anomaly worth a warning.
pub(crate) fn unpack_single_member(envelope: &[u8]) -> Result<(Vec<u8>, usize)> {
    let mut archive = ZipArchive::new(Cursor::new(envelope))
        .map_err(|e| CdnError::MalformedManifest(format!("bad envelope: {e}")))?;
    let members = archive.len();
    if members == 0 {
        return Err(CdnError::MalformedManifest("empty envelope".into()));
    }
    let mut member = archive
        .by_index(0)
        .map_err(|e| CdnError::MalformedManifest(format!("bad envelope member: {e}")))?;
    let mut bytes = Vec::with_capacity(member.size() as usize);
    member
        .read_to_end(&mut bytes)
        .map_err(|e| CdnError::MalformedManifest(format!("truncated envelope member: {e}")))?;
    Ok((bytes, members))
}
