//! The protocol's symmetric cipher: AES-256 with an ECB-encrypted IV
//! prefix and a CBC/PKCS#7 body.

use std::fmt;

use aes::Aes256;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{
    BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit,
    block_padding::Pkcs7,
};

use crate::error::{ProcessError, Result};

const BLOCK_LEN: usize = 16;

type CbcEncryptor = cbc::Encryptor<Aes256>;
type CbcDecryptor = cbc::Decryptor<Aes256>;

/// Caller-supplied 32 byte symmetric key scoped to one depot.
#[derive(Clone, PartialEq, Eq)]
pub struct DepotKey([u8; 32]);

impl DepotKey {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Self::LEN] = bytes
            .try_into()
            .map_err(|_| ProcessError::InvalidKeyLength(bytes.len()))?;
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// Key material stays out of logs.
impl fmt::Debug for DepotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DepotKey(..)")
    }
}

/// Encrypt `plaintext` under `key` with a fresh random IV.
///
/// Wire layout: one block of ECB-encrypted IV, then the CBC/PKCS#7 body.
pub fn symmetric_encrypt(plaintext: &[u8], key: &DepotKey) -> Vec<u8> {
    let iv: [u8; BLOCK_LEN] = rand::random();

    let mut iv_block = GenericArray::from(iv);
    Aes256::new(key.as_bytes().into()).encrypt_block(&mut iv_block);

    let body = CbcEncryptor::new(key.as_bytes().into(), (&iv).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext);

    let mut out = Vec::with_capacity(BLOCK_LEN + body.len());
    out.extend_from_slice(&iv_block);
    out.extend_from_slice(&body);
    out
}

/// Decrypt a payload produced by [`symmetric_encrypt`].
pub fn symmetric_decrypt(ciphertext: &[u8], key: &DepotKey) -> Result<Vec<u8>> {
    if ciphertext.len() < BLOCK_LEN {
        return Err(ProcessError::CiphertextTooShort);
    }
    let (iv_part, body) = ciphertext.split_at(BLOCK_LEN);

    let mut iv = GenericArray::clone_from_slice(iv_part);
    Aes256::new(key.as_bytes().into()).decrypt_block(&mut iv);

    CbcDecryptor::new(key.as_bytes().into(), &iv)
        .decrypt_padded_vec_mut::<Pkcs7>(body)
        .map_err(|_| ProcessError::BadPadding)
}
