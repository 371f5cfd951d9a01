//! Canonical header-field digest.
//!
//! Both sides of a link must derive the identical digest from the identical
//! header fields, so the byte stream fed to the hash is fixed: fields in
//! ascending id order starting at the path field, digest-eligible ids only,
//! each contributing its id byte, type tag, and a type-specific payload.

use sha1::{Digest, Sha1};
use tracing::trace;

use busd_core::{BlobType, COMPRESSIBLE, FieldId, HeaderFields, HeaderValue, KeyBlob};

/// Size of the header digest in bytes.
pub const DIGEST_BYTES: usize = 20;

/// Digest the canonical header fields into a generic key blob.
///
/// String-like fields contribute their raw bytes with no length prefix;
/// 32-bit integers contribute exactly four little-endian bytes; absent
/// fields contribute only their id and type tag. Fields whose id is not
/// digest-eligible are skipped entirely.
#[must_use]
pub fn hash_header_fields(fields: &HeaderFields) -> KeyBlob {
    let mut sha = Sha1::new();
    for id in FieldId::ALL {
        if !COMPRESSIBLE[id as usize] {
            continue;
        }
        let field = fields.get(id);
        sha.update([id as u8, field.type_tag()]);
        match field {
            HeaderValue::ObjectPath(s) | HeaderValue::Str(s) | HeaderValue::Signature(s) => {
                sha.update(s.as_bytes());
            }
            HeaderValue::U32(v) => sha.update(v.to_le_bytes()),
            HeaderValue::Invalid => {}
        }
    }
    let digest = sha.finalize();
    trace!(digest = %hex::encode(digest), "header digest computed");
    KeyBlob::new(&digest, BlobType::Generic)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_fields() -> HeaderFields {
        let mut fields = HeaderFields::new();
        fields.set(FieldId::Path, HeaderValue::ObjectPath("/org/bus/Test".into()));
        fields.set(FieldId::Interface, HeaderValue::Str("org.bus.Test".into()));
        fields.set(FieldId::Member, HeaderValue::Str("Ping".into()));
        fields.set(FieldId::Signature, HeaderValue::Signature("su".into()));
        fields.set(FieldId::SessionId, HeaderValue::U32(7));
        fields
    }

    #[test]
    fn digest_is_deterministic() {
        let a = hash_header_fields(&sample_fields());
        let b = hash_header_fields(&sample_fields());
        assert_eq!(a.data(), b.data());
        assert_eq!(a.len(), DIGEST_BYTES);
        assert_eq!(a.blob_type(), BlobType::Generic);
        assert!(a.expiration().is_none());
    }

    #[test]
    fn non_digest_fields_do_not_affect_the_digest() {
        let base = hash_header_fields(&sample_fields());

        let mut fields = sample_fields();
        fields.set(FieldId::ReplySerial, HeaderValue::U32(999));
        fields.set(FieldId::Handles, HeaderValue::U32(3));
        fields.set(FieldId::CompressionToken, HeaderValue::U32(12345));
        let changed = hash_header_fields(&fields);

        assert_eq!(base.data(), changed.data());
    }

    #[test]
    fn digest_fields_change_the_digest() {
        let base = hash_header_fields(&sample_fields());

        let mut fields = sample_fields();
        fields.set(FieldId::Member, HeaderValue::Str("Pong".into()));
        assert_ne!(base.data(), hash_header_fields(&fields).data());

        let mut fields = sample_fields();
        fields.set(FieldId::SessionId, HeaderValue::U32(8));
        assert_ne!(base.data(), hash_header_fields(&fields).data());
    }

    #[test]
    fn clearing_a_digest_field_changes_the_digest() {
        let base = hash_header_fields(&sample_fields());

        let mut fields = sample_fields();
        fields.clear(FieldId::Signature);
        assert_ne!(base.data(), hash_header_fields(&fields).data());
    }

    #[test]
    fn digest_matches_the_canonical_byte_stream() {
        let mut fields = HeaderFields::new();
        fields.set(FieldId::Path, HeaderValue::ObjectPath("/a".into()));
        fields.set(FieldId::Timestamp, HeaderValue::U32(0x0403_0201));

        // Rebuild the canonical stream by hand: path (id 1, tag 'o', raw
        // bytes), then every other eligible id as [id, 0] for absent fields,
        // with the timestamp contributing its four little-endian bytes.
        let mut expected = Sha1::new();
        expected.update([1, b'o']);
        expected.update(b"/a");
        expected.update([2, 0]);
        expected.update([3, 0]);
        expected.update([6, 0]);
        expected.update([7, 0]);
        expected.update([8, 0]);
        expected.update([10, b'u']);
        expected.update([0x01, 0x02, 0x03, 0x04]);
        expected.update([11, 0]);
        expected.update([13, 0]);

        let digest = hash_header_fields(&fields);
        assert_eq!(digest.data(), expected.finalize().as_slice());
    }
}
