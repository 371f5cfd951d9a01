//! In-place body encryption.
//!
//! The wire buffer stays one contiguous allocation: the header region is
//! authenticated but left in the clear (it must remain routable), the body
//! is encrypted in place, and the authentication tag lands directly after
//! the body. AES-128-CCM with an 8-byte tag.

use aes::Aes128;
use ccm::Ccm;
use ccm::aead::generic_array::GenericArray;
use ccm::aead::{AeadInPlace, KeyInit};
use ccm::consts::{U8, U13};
use tracing::warn;

use busd_core::{BlobType, KeyBlob};

use crate::CryptoError;

/// Fixed growth of the body region when a message is encrypted.
pub const EXPANSION_BYTES: usize = 8;

/// Length of the nonce blob as carried in peer state.
pub const NONCE_BYTES: usize = 16;

/// CCM with a 16-bit length field consumes exactly 13 nonce bytes.
const CCM_NONCE_LEN: usize = 13;

const AES128_KEY_LEN: usize = 16;

/// Longest body a 16-bit CCM length field can frame.
const MAX_BODY_LEN: usize = u16::MAX as usize;

type MessageCipher = Ccm<Aes128, U8, U13>;

/// Encrypt the body region of `msg` in place.
///
/// `msg` holds `hdr_len` header bytes followed by `*body_len` body bytes.
/// The header is fed to the cipher as associated data; the body is replaced
/// by ciphertext and the tag is appended, growing `*body_len` by
/// [`EXPANSION_BYTES`].
///
/// # Errors
/// [`CryptoError::UnsupportedKeyType`] unless the key is an AES blob;
/// [`CryptoError::InvalidParam`] for a bad key length, a header/body split
/// that does not match the buffer, an oversized body, or an empty nonce.
/// Nothing is transformed on error.
pub fn encrypt(
    key: &KeyBlob,
    msg: &mut Vec<u8>,
    hdr_len: usize,
    body_len: &mut usize,
    nonce: &KeyBlob,
) -> Result<(), CryptoError> {
    match key.blob_type() {
        BlobType::Aes => {
            let cipher = cipher_for(key)?;
            check_split(msg, hdr_len, *body_len)?;
            if *body_len > MAX_BODY_LEN {
                return Err(CryptoError::InvalidParam("body too large to frame"));
            }
            let nonce = ccm_nonce(nonce)?;

            let (hdr, body) = msg.split_at_mut(hdr_len);
            let tag = cipher
                .encrypt_in_place_detached(GenericArray::from_slice(&nonce), hdr, body)
                .map_err(|_| CryptoError::InvalidParam("body cannot be framed"))?;
            msg.extend_from_slice(tag.as_slice());
            *body_len += EXPANSION_BYTES;
            Ok(())
        }
        other => {
            warn!(key_type = %other, "key type not supported for message encryption");
            Err(CryptoError::UnsupportedKeyType(other))
        }
    }
}

/// Decrypt the body region of `msg` in place.
///
/// Inverse of [`encrypt`]: verifies the trailing tag against the header and
/// ciphertext, restores the plaintext body, and shrinks `*body_len` by
/// [`EXPANSION_BYTES`].
///
/// # Errors
/// Parameter and key-type failures as for [`encrypt`]. Every cryptographic
/// failure — bad tag, corrupt ciphertext, truncated body — is reported as
/// [`CryptoError::DecryptFailed`] with no further detail, and leaves the
/// buffer and `*body_len` untouched.
pub fn decrypt(
    key: &KeyBlob,
    msg: &mut Vec<u8>,
    hdr_len: usize,
    body_len: &mut usize,
    nonce: &KeyBlob,
) -> Result<(), CryptoError> {
    match key.blob_type() {
        BlobType::Aes => {
            let cipher = cipher_for(key)?;
            check_split(msg, hdr_len, *body_len)?;
            let nonce = ccm_nonce(nonce)?;
            if *body_len < EXPANSION_BYTES {
                warn!("message decryption failed");
                return Err(CryptoError::DecryptFailed);
            }
            let ct_len = *body_len - EXPANSION_BYTES;
            let tag_start = hdr_len + ct_len;

            // Decrypt a scratch copy; the caller's buffer must come through
            // a failed verification untouched.
            let mut scratch = msg[hdr_len..tag_start].to_vec();
            let tag = GenericArray::from_slice(&msg[tag_start..tag_start + EXPANSION_BYTES]);
            cipher
                .decrypt_in_place_detached(
                    GenericArray::from_slice(&nonce),
                    &msg[..hdr_len],
                    &mut scratch,
                    tag,
                )
                .map_err(|_| {
                    warn!("message decryption failed");
                    CryptoError::DecryptFailed
                })?;

            msg[hdr_len..tag_start].copy_from_slice(&scratch);
            msg.truncate(tag_start);
            *body_len = ct_len;
            Ok(())
        }
        other => {
            warn!(key_type = %other, "key type not supported for message decryption");
            Err(CryptoError::UnsupportedKeyType(other))
        }
    }
}

/// Derive the per-message nonce from the negotiated base nonce.
///
/// The base is XORed with the message serial so every message encrypts under
/// a distinct nonce; broadcast traffic additionally folds in the sender's
/// header digest so a forged header expansion cannot replay a known nonce.
#[must_use]
pub fn message_nonce(base: &KeyBlob, serial: u32, hdr_hash: Option<&KeyBlob>) -> KeyBlob {
    let mut nonce = base.clone();
    nonce.xor_with(&serial.to_le_bytes());
    if let Some(hash) = hdr_hash {
        nonce.xor_blob(hash);
    }
    nonce
}

fn cipher_for(key: &KeyBlob) -> Result<MessageCipher, CryptoError> {
    if key.len() != AES128_KEY_LEN {
        return Err(CryptoError::InvalidParam("AES key must be 16 bytes"));
    }
    Ok(MessageCipher::new(GenericArray::from_slice(key.data())))
}

fn check_split(msg: &[u8], hdr_len: usize, body_len: usize) -> Result<(), CryptoError> {
    if hdr_len + body_len == msg.len() {
        Ok(())
    } else {
        Err(CryptoError::InvalidParam(
            "header/body split does not match buffer length",
        ))
    }
}

fn ccm_nonce(nonce: &KeyBlob) -> Result<[u8; CCM_NONCE_LEN], CryptoError> {
    if nonce.is_empty() {
        return Err(CryptoError::InvalidParam("nonce is empty"));
    }
    let mut out = [0u8; CCM_NONCE_LEN];
    let n = nonce.len().min(CCM_NONCE_LEN);
    out[..n].copy_from_slice(&nonce.data()[..n]);
    Ok(out)
}
