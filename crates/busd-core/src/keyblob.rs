//! Typed containers for secret key material.
//!
//! A [`KeyBlob`] pairs raw bytes with a type tag and an optional expiration.
//! Material is zeroized on [`erase`](KeyBlob::erase) and on drop.

use std::fmt;

use chrono::{DateTime, Utc};
use rand::RngCore;
use zeroize::Zeroize;

/// Type tag describing what a blob's bytes are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlobType {
    /// No key material.
    Empty,
    /// Untyped bytes (digests, nonces).
    Generic,
    /// An AES key; the key size is the blob size.
    Aes,
    /// A PKCS#8 encoded private key.
    Pkcs8,
    /// A PEM encoded public key certificate.
    Pem,
}

impl fmt::Display for BlobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Empty => "empty",
            Self::Generic => "generic",
            Self::Aes => "aes",
            Self::Pkcs8 => "pkcs8",
            Self::Pem => "pem",
        };
        f.write_str(name)
    }
}

/// Secret-material container with a type tag and optional expiration.
#[derive(Clone)]
pub struct KeyBlob {
    data: Vec<u8>,
    blob_type: BlobType,
    expiration: Option<DateTime<Utc>>,
}

impl KeyBlob {
    /// A blob with no material.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            data: Vec::new(),
            blob_type: BlobType::Empty,
            expiration: None,
        }
    }

    /// Construct a blob from raw bytes.
    #[must_use]
    pub fn new(data: &[u8], blob_type: BlobType) -> Self {
        Self {
            data: data.to_vec(),
            blob_type,
            expiration: None,
        }
    }

    /// Construct a blob of `len` random bytes.
    #[must_use]
    pub fn rand(len: usize, blob_type: BlobType) -> Self {
        let mut data = vec![0u8; len];
        rand::thread_rng().fill_bytes(&mut data);
        Self {
            data,
            blob_type,
            expiration: None,
        }
    }

    /// The blob's type tag.
    #[must_use]
    pub const fn blob_type(&self) -> BlobType {
        self.blob_type
    }

    /// The key material.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Size of the key material in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the blob holds no material.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Zeroize the material and reset the blob to [`BlobType::Empty`].
    pub fn erase(&mut self) {
        self.data.zeroize();
        self.data.clear();
        self.blob_type = BlobType::Empty;
        self.expiration = None;
    }

    /// Set an absolute expiration time.
    pub fn set_expiration(&mut self, when: DateTime<Utc>) {
        self.expiration = Some(when);
    }

    /// The expiration time, if one was set.
    #[must_use]
    pub const fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Whether the blob has an expiration in the past.
    #[must_use]
    pub fn has_expired(&self) -> bool {
        self.expiration.is_some_and(|when| when <= Utc::now())
    }

    /// XOR `other` into the key material.
    ///
    /// Only the overlapping prefix is combined. Returns the number of bytes
    /// XORed.
    pub fn xor_with(&mut self, other: &[u8]) -> usize {
        let n = self.data.len().min(other.len());
        for (dst, src) in self.data.iter_mut().zip(other) {
            *dst ^= src;
        }
        n
    }

    /// XOR another blob's material into this one.
    pub fn xor_blob(&mut self, other: &Self) -> usize {
        let n = self.data.len().min(other.data.len());
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            *dst ^= src;
        }
        n
    }
}

impl Default for KeyBlob {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for KeyBlob {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

// Key material stays out of debug output.
impl fmt::Debug for KeyBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBlob")
            .field("type", &self.blob_type)
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn new_keeps_type_and_material() {
        let blob = KeyBlob::new(&[1, 2, 3, 4], BlobType::Aes);
        assert_eq!(blob.blob_type(), BlobType::Aes);
        assert_eq!(blob.data(), &[1, 2, 3, 4]);
        assert_eq!(blob.len(), 4);
        assert!(!blob.is_empty());
    }

    #[test]
    fn erase_resets_to_empty() {
        let mut blob = KeyBlob::new(&[0xAA; 16], BlobType::Aes);
        blob.set_expiration(Utc::now());
        blob.erase();
        assert_eq!(blob.blob_type(), BlobType::Empty);
        assert!(blob.is_empty());
        assert!(blob.expiration().is_none());
    }

    #[test]
    fn rand_produces_requested_length() {
        let blob = KeyBlob::rand(16, BlobType::Aes);
        assert_eq!(blob.len(), 16);
        assert_eq!(blob.blob_type(), BlobType::Aes);
    }

    #[test]
    fn expiration_checks() {
        let mut blob = KeyBlob::new(&[1], BlobType::Generic);
        assert!(!blob.has_expired());

        blob.set_expiration(Utc::now() - Duration::seconds(1));
        assert!(blob.has_expired());

        blob.set_expiration(Utc::now() + Duration::hours(1));
        assert!(!blob.has_expired());
    }

    #[test]
    fn xor_with_combines_overlapping_prefix() {
        let mut blob = KeyBlob::new(&[0xFF, 0xFF, 0xFF], BlobType::Generic);
        let n = blob.xor_with(&[0x0F, 0xF0]);
        assert_eq!(n, 2);
        assert_eq!(blob.data(), &[0xF0, 0x0F, 0xFF]);
    }

    #[test]
    fn xor_blob_is_self_inverse() {
        let base = KeyBlob::new(&[1, 2, 3, 4], BlobType::Generic);
        let other = KeyBlob::new(&[9, 9, 9, 9], BlobType::Generic);
        let mut mixed = base.clone();
        mixed.xor_blob(&other);
        mixed.xor_blob(&other);
        assert_eq!(mixed.data(), base.data());
    }

    #[test]
    fn debug_hides_material() {
        let blob = KeyBlob::new(&[0xDE, 0xAD], BlobType::Aes);
        let rendered = format!("{blob:?}");
        assert!(!rendered.contains("222"));
        assert!(!rendered.contains("de"));
        assert!(rendered.contains("len"));
    }
}
