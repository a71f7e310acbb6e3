//! AES-256-GCM envelope for message bodies.
//!
//! Each body is encrypted under a 32-byte key with:
//! - Nonce: `sqn (2) || rand (6)` taken from the header (8 bytes; GCM
//!   derives its counter block from non-96-bit nonces via GHASH)
//! - AAD: the full 16-byte header as transmitted
//! - Tag: truncated to 12 bytes

use aes_gcm::aead::consts::{U12, U8};
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::AesGcm;

use crate::core::{
    CryptoError, HEADER_RSV_OFFSET, HEADER_SIZE, HEADER_SQN_OFFSET, SYMMETRIC_KEY_SIZE, TAG_SIZE,
};

/// AES-256-GCM with an 8-byte nonce and a 12-byte tag.
type MtpCipher = AesGcm<Aes256, U8, U12>;

/// Encrypt a message body.
///
/// # Arguments
/// * `key` - 32-byte session or bootstrap key
/// * `header` - serialized header; supplies the nonce and is authenticated as AAD
/// * `plaintext` - body to encrypt
///
/// # Returns
/// `(ciphertext, tag)`; the ciphertext has the same length as the plaintext.
pub fn encrypt(
    key: &[u8; SYMMETRIC_KEY_SIZE],
    header: &[u8; HEADER_SIZE],
    plaintext: &[u8],
) -> Result<(Vec<u8>, [u8; TAG_SIZE]), CryptoError> {
    let cipher = MtpCipher::new(key.into());
    let nonce = GenericArray::from_slice(&header[HEADER_SQN_OFFSET..HEADER_RSV_OFFSET]);

    let mut buffer = plaintext.to_vec();
    let tag = cipher
        .encrypt_in_place_detached(nonce, header, &mut buffer)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    Ok((buffer, tag.into()))
}

/// Decrypt and authenticate a message body.
///
/// Fails with [`CryptoError::DecryptionFailed`] if the ciphertext, the
/// header or the tag was modified, or the key is wrong. No plaintext is
/// returned in that case.
pub fn decrypt(
    key: &[u8; SYMMETRIC_KEY_SIZE],
    header: &[u8; HEADER_SIZE],
    ciphertext: &[u8],
    tag: &[u8; TAG_SIZE],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = MtpCipher::new(key.into());
    let nonce = GenericArray::from_slice(&header[HEADER_SQN_OFFSET..HEADER_RSV_OFFSET]);

    let mut buffer = ciphertext.to_vec();
    cipher
        .decrypt_in_place_detached(nonce, header, &mut buffer, GenericArray::from_slice(tag))
        .map_err(|_| CryptoError::DecryptionFailed)?;

    Ok(buffer)
}
