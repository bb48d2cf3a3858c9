//! Depot chunk payload processing: decrypt, verify, decompress.

use std::io::{Cursor, Read};

use zip::ZipArchive;

use crate::checksum::chunk_checksum;
use crate::cipher::{DepotKey, symmetric_decrypt};
use crate::error::{ProcessError, Result};
use crate::vzip;

const PKZIP_MAGIC: u16 = 0x4b50; // "PK"

/// Decrypt `payload` with `key`, verify it against the manifest-declared
/// checksum, and decompress it into `destination`.
///
/// The checksum covers the decrypted, still-compressed bytes. The container
/// format is chosen by magic: `VZ` for the LZMA container, `PK` for a
/// single-member zip archive. Returns the number of plaintext bytes
/// written.
pub fn process(
    payload: &[u8],
    key: &DepotKey,
    expected_checksum: u32,
    destination: &mut [u8],
) -> Result<usize> {
    let compressed = symmetric_decrypt(payload, key)?;
    let actual = chunk_checksum(&compressed);
    if actual != expected_checksum {
        return Err(ProcessError::ChecksumMismatch {
            expected: expected_checksum,
            actual,
        });
    }
    decompress(&compressed, destination)
}

/// Decompress an already-decrypted chunk by container magic.
pub fn decompress(compressed: &[u8], destination: &mut [u8]) -> Result<usize> {
    if compressed.len() < 2 {
        return Err(ProcessError::Malformed(
            "chunk shorter than a format magic".into(),
        ));
    }
    let magic = u16::from_le_bytes([compressed[0], compressed[1]]);
    match magic {
        vzip::VZIP_MAGIC => vzip::decompress(compressed, destination),
        PKZIP_MAGIC => unzip_single(compressed, destination),
        other => Err(ProcessError::UnknownFormat(other)),
    }
}

fn unzip_single(compressed: &[u8], destination: &mut [u8]) -> Result<usize> {
    let mut archive = ZipArchive::new(Cursor::new(compressed))
        .map_err(|e| ProcessError::Malformed(e.to_string()))?;
    if archive.is_empty() {
        return Err(ProcessError::Malformed("zip chunk has no member".into()));
    }
    let mut member = archive
        .by_index(0)
        .map_err(|e| ProcessError::Malformed(e.to_string()))?;
    let size = member.size() as usize;
    if destination.len() < size {
        return Err(ProcessError::OutputTooSmall {
            needed: size,
            capacity: destination.len(),
        });
    }
    member
        .read_exact(&mut destination[..size])
        .map_err(|e| ProcessError::Malformed(e.to_string()))?;
    Ok(size)
}
