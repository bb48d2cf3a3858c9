//! Depot manifests: the chunk map of one depot at one content version.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use hanse_keys::{DepotKey, symmetric_decrypt};

use crate::error::{CdnError, Result};

/// Flag bits carried on manifest file entries.
pub mod file_flags {
    /// Entry should be marked executable on platforms that support it.
    pub const EXECUTABLE: u32 = 1 << 5;
    /// Entry is a directory, not a regular file.
    pub const DIRECTORY: u32 = 1 << 6;
    /// Entry is a symbolic link; content is the link target.
    pub const SYMLINK: u32 = 1 << 9;
}

/// Addressing and size metadata for one content chunk.
///
/// Lengths of zero mean "unknown": old manifests did not always carry
/// them, and the pipeline then trusts the response instead.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkData {
    /// Content address of the chunk; `None` when metadata is incomplete.
    pub chunk_id: Option<Vec<u8>>,
    /// Checksum of the decrypted, still-compressed chunk payload.
    pub checksum: u32,
    /// Offset of the plaintext within its file.
    pub offset: u64,
    /// Encrypted transfer size in bytes.
    pub compressed_length: u32,
    /// Plaintext size in bytes.
    pub uncompressed_length: u32,
}

impl ChunkData {
    /// Lowercase hex rendering of the chunk id, as used in request paths.
    pub fn id_hex(&self) -> Option<String> {
        self.chunk_id.as_ref().map(hex::encode)
    }
}

/// One file of a depot, described as an ordered list of chunks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Path within the depot, `/`-separated once decrypted.
    pub filename: String,
    /// Bit set from [`file_flags`].
    pub flags: u32,
    /// Total plaintext size of the file.
    pub total_size: u64,
    /// SHA-256 of the assembled file content; empty when absent.
    pub hash: Vec<u8>,
    pub chunks: Vec<ChunkData>,
}

impl FileEntry {
    pub fn is_directory(&self) -> bool {
        self.flags & file_flags::DIRECTORY != 0
    }

    /// Check assembled file content against the manifest-declared hash.
    ///
    /// Entries without a hash verify trivially.
    pub fn verify_hash(&self, content: &[u8]) -> bool {
        if self.hash.is_empty() {
            return true;
        }
        Sha256::digest(content).as_slice() == self.hash.as_slice()
    }
}

/// The chunk map of one depot at one content version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepotManifest {
    pub depot_id: u32,
    pub manifest_gid: u64,
    /// Creation time as seconds since the Unix epoch.
    pub creation_time: u64,
    /// Whether `files[].filename` still holds base64-wrapped ciphertext.
    pub filenames_encrypted: bool,
    pub total_compressed_size: u64,
    pub total_uncompressed_size: u64,
    pub files: Vec<FileEntry>,
}

impl DepotManifest {
    /// Decode a manifest from its wire form.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        postcard::from_bytes(bytes).map_err(|e| CdnError::MalformedManifest(e.to_string()))
    }

    /// Encode the manifest into its wire form.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        postcard::to_allocvec(self).map_err(|e| CdnError::MalformedManifest(e.to_string()))
    }

    /// Decrypt every filename in place with the depot key.
    ///
    /// Filenames are stored as base64-wrapped ciphertext. Decryption trims
    /// trailing NUL padding, normalizes `\` separators to `/`, re-sorts the
    /// entries by filename and clears [`filenames_encrypted`]. Calling this
    /// on an already-plain manifest is a no-op.
    ///
    /// [`filenames_encrypted`]: DepotManifest::filenames_encrypted
    pub fn decrypt_filenames(&mut self, key: &DepotKey) -> Result<()> {
        if !self.filenames_encrypted {
            return Ok(());
        }
        for file in &mut self.files {
            let sealed = BASE64
                .decode(file.filename.as_bytes())
                .map_err(|e| CdnError::MalformedManifest(format!("filename is not base64: {e}")))?;
            let decrypted = symmetric_decrypt(&sealed, key)?;
            let filename = String::from_utf8(decrypted)
                .map_err(|_| CdnError::MalformedManifest("filename is not UTF-8".into()))?;
            file.filename = filename.trim_end_matches('\0').replace('\\', "/");
        }
        self.files.sort_by(|a, b| a.filename.cmp(&b.filename));
        self.filenames_encrypted = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hanse_keys::symmetric_encrypt;

    fn entry(filename: &str) -> FileEntry {
        FileEntry {
            filename: filename.to_string(),
            flags: 0,
            total_size: 64,
            hash: Vec::new(),
            chunks: vec![ChunkData {
                chunk_id: Some(vec![0xab; 20]),
                checksum: 0x1234_5678,
                offset: 0,
                compressed_length: 48,
                uncompressed_length: 64,
            }],
        }
    }

    fn manifest(files: Vec<FileEntry>, encrypted: bool) -> DepotManifest {
        DepotManifest {
            depot_id: 441,
            manifest_gid: 0x1122_3344_5566_7788,
            creation_time: 1_700_000_000,
            filenames_encrypted: encrypted,
            total_compressed_size: 48,
            total_uncompressed_size: 64,
            files,
        }
    }

    #[test]
    fn test_wire_round_trip() {
        let original = manifest(vec![entry("alpha.bin"), entry("beta.bin")], false);
        let bytes = original.to_bytes().unwrap();
        assert_eq!(DepotManifest::parse(&bytes).unwrap(), original);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            DepotManifest::parse(&[0xff; 7]),
            Err(CdnError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_decrypt_filenames_restores_and_sorts() {
        let key = DepotKey::new([9u8; 32]);
        // out of sorted order on purpose, one with NUL padding and one with
        // windows separators
        let plain = ["zulu/last.bin", "alpha\\first.bin", "mid.bin\0\0"];
        let files = plain
            .iter()
            .map(|name| entry(&BASE64.encode(symmetric_encrypt(name.as_bytes(), &key))))
            .collect();
        let mut manifest = manifest(files, true);

        manifest.decrypt_filenames(&key).unwrap();

        assert!(!manifest.filenames_encrypted);
        let names: Vec<&str> = manifest.files.iter().map(|f| f.filename.as_str()).collect();
        assert_eq!(names, vec!["alpha/first.bin", "mid.bin", "zulu/last.bin"]);
    }

    #[test]
    fn test_decrypt_filenames_is_noop_when_plain() {
        let key = DepotKey::new([9u8; 32]);
        let mut manifest = manifest(vec![entry("plain.bin")], false);
        manifest.decrypt_filenames(&key).unwrap();
        assert_eq!(manifest.files[0].filename, "plain.bin");
    }

    #[test]
    fn test_decrypt_filenames_rejects_bad_base64() {
        let key = DepotKey::new([9u8; 32]);
        let mut manifest = manifest(vec![entry("!!! not base64 !!!")], true);
        assert!(matches!(
            manifest.decrypt_filenames(&key),
            Err(CdnError::MalformedManifest(_))
        ));
    }

    #[test]
    fn test_verify_hash() {
        let content = b"assembled file content";
        let mut file = entry("hashed.bin");
        file.hash = Sha256::digest(content).to_vec();
        assert!(file.verify_hash(content));
        assert!(!file.verify_hash(b"tampered content"));
    }

    #[test]
    fn test_missing_hash_verifies_trivially() {
        assert!(entry("no-hash.bin").verify_hash(b"anything"));
    }

    #[test]
    fn test_directory_flag() {
        let mut dir = entry("somedir");
        dir.flags = file_flags::DIRECTORY;
        assert!(dir.is_directory());
        assert!(!entry("file.bin").is_directory());
    }

    #[test]
    fn test_chunk_id_hex_rendering() {
        let chunk = ChunkData {
            chunk_id: Some(vec![0xde, 0xad, 0xbe, 0xef]),
            ..ChunkData::default()
        };
        assert_eq!(chunk.id_hex().unwrap(), "deadbeef");
        assert_eq!(ChunkData::default().id_hex(), None);
    }
}
