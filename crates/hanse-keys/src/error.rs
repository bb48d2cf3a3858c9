//! Error types for hanse-keys.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessError>;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("ciphertext shorter than one cipher block")]
    CiphertextTooShort,

    #[error("broken cipher body or PKCS#7 padding")]
    BadPadding,

    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch { expected: u32, actual: u32 },

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("lzma error: {0}")]
    Lzma(String),

    #[error("output buffer too small: need {needed} bytes, have {capacity}")]
    OutputTooSmall { needed: usize, capacity: usize },

    #[error("unknown payload format (magic {0:#06x})")]
    UnknownFormat(u16),
}
