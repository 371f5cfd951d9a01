//! Message header-field layout and the contiguous wire buffer.
//!
//! A [`Message`] carries a fixed-layout header-field array plus one
//! contiguous byte buffer logically split into an unencrypted header region
//! and a body region. The crypto layer transforms the body in place and
//! treats the header bytes as associated data; the split is therefore part
//! of this type's contract, not an implementation detail.

use crate::SessionId;

/// Header field identifiers, in canonical numeric order.
///
/// The numeric order is load-bearing: the header digest walks fields by
/// ascending id starting at [`FieldId::Path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldId {
    /// Object path the message is addressed to.
    Path = 1,
    /// Interface name.
    Interface = 2,
    /// Member (method or signal) name.
    Member = 3,
    /// Error name carried by error replies.
    ErrorName = 4,
    /// Serial number of the call this message replies to.
    ReplySerial = 5,
    /// Destination unique or well-known name.
    Destination = 6,
    /// Sender unique name.
    Sender = 7,
    /// Body type signature.
    Signature = 8,
    /// Number of attached handles.
    Handles = 9,
    /// Sender-side timestamp.
    Timestamp = 10,
    /// Time-to-live for the message.
    TimeToLive = 11,
    /// Header compression token.
    CompressionToken = 12,
    /// Session the message belongs to.
    SessionId = 13,
}

/// Number of header-field slots (slot 0 is unused).
pub const FIELD_COUNT: usize = 14;

impl FieldId {
    /// All field ids in ascending numeric order.
    pub const ALL: [Self; 13] = [
        Self::Path,
        Self::Interface,
        Self::Member,
        Self::ErrorName,
        Self::ReplySerial,
        Self::Destination,
        Self::Sender,
        Self::Signature,
        Self::Handles,
        Self::Timestamp,
        Self::TimeToLive,
        Self::CompressionToken,
        Self::SessionId,
    ];
}

/// Which field ids participate in the header digest.
pub const COMPRESSIBLE: [bool; FIELD_COUNT] = [
    false, // (unused slot)
    true,  // Path
    true,  // Interface
    true,  // Member
    false, // ErrorName
    false, // ReplySerial
    true,  // Destination
    true,  // Sender
    true,  // Signature
    false, // Handles
    true,  // Timestamp
    true,  // TimeToLive
    false, // CompressionToken
    true,  // SessionId
];

const TYPE_TAG_INVALID: u8 = 0;
const TYPE_TAG_SIGNATURE: u8 = b'g';
const TYPE_TAG_OBJECT_PATH: u8 = b'o';
const TYPE_TAG_STRING: u8 = b's';
const TYPE_TAG_UINT32: u8 = b'u';

/// A typed header-field value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HeaderValue {
    /// Field not present.
    #[default]
    Invalid,
    /// An object path.
    ObjectPath(String),
    /// A string value.
    Str(String),
    /// A type signature.
    Signature(String),
    /// An unsigned 32-bit integer.
    U32(u32),
}

impl HeaderValue {
    /// Wire type tag for this value, as carried in the header digest.
    #[must_use]
    pub const fn type_tag(&self) -> u8 {
        match self {
            Self::Invalid => TYPE_TAG_INVALID,
            Self::ObjectPath(_) => TYPE_TAG_OBJECT_PATH,
            Self::Str(_) => TYPE_TAG_STRING,
            Self::Signature(_) => TYPE_TAG_SIGNATURE,
            Self::U32(_) => TYPE_TAG_UINT32,
        }
    }
}

/// Fixed-layout header-field array indexed by [`FieldId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderFields {
    field: [HeaderValue; FIELD_COUNT],
}

impl HeaderFields {
    /// An all-invalid field set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            field: std::array::from_fn(|_| HeaderValue::Invalid),
        }
    }

    /// The value in the given slot.
    #[must_use]
    pub fn get(&self, id: FieldId) -> &HeaderValue {
        &self.field[id as usize]
    }

    /// Set the value in the given slot.
    pub fn set(&mut self, id: FieldId, value: HeaderValue) {
        self.field[id as usize] = value;
    }

    /// Clear the given slot back to [`HeaderValue::Invalid`].
    pub fn clear(&mut self, id: FieldId) {
        self.field[id as usize] = HeaderValue::Invalid;
    }
}

impl Default for HeaderFields {
    fn default() -> Self {
        Self::new()
    }
}

/// A bus message: header fields plus the raw wire buffer.
///
/// The buffer is one contiguous allocation; the first `hdr_len` bytes are the
/// marshaled header and the following `body_len` bytes are the body. After
/// encryption the body region also carries the trailing authentication tag,
/// so `body_len` can differ from the plaintext body length.
#[derive(Debug, Clone)]
pub struct Message {
    serial: u32,
    fields: HeaderFields,
    buf: Vec<u8>,
    hdr_len: usize,
    body_len: usize,
}

impl Message {
    /// Assemble a message from its marshaled header and body regions.
    #[must_use]
    pub fn new(serial: u32, fields: HeaderFields, header: &[u8], body: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(header.len() + body.len());
        buf.extend_from_slice(header);
        buf.extend_from_slice(body);
        Self {
            serial,
            fields,
            buf,
            hdr_len: header.len(),
            body_len: body.len(),
        }
    }

    /// Message serial number.
    #[must_use]
    pub const fn serial(&self) -> u32 {
        self.serial
    }

    /// The session this message belongs to, or 0 when none is set.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        match self.fields.get(FieldId::SessionId) {
            HeaderValue::U32(id) => *id,
            _ => 0,
        }
    }

    /// The header-field array.
    #[must_use]
    pub const fn fields(&self) -> &HeaderFields {
        &self.fields
    }

    /// Mutable access to the header-field array.
    pub const fn fields_mut(&mut self) -> &mut HeaderFields {
        &mut self.fields
    }

    /// Length of the unencrypted header region.
    #[must_use]
    pub const fn hdr_len(&self) -> usize {
        self.hdr_len
    }

    /// Current length of the body region (including any trailing tag).
    #[must_use]
    pub const fn body_len(&self) -> usize {
        self.body_len
    }

    /// The whole wire buffer.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// The header region.
    #[must_use]
    pub fn header(&self) -> &[u8] {
        &self.buf[..self.hdr_len]
    }

    /// The body region.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.buf[self.hdr_len..self.hdr_len + self.body_len]
    }

    /// The buffer, header length, and mutable body length, for in-place
    /// transformation by the crypto layer.
    pub const fn crypto_parts(&mut self) -> (&mut Vec<u8>, usize, &mut usize) {
        (&mut self.buf, self.hdr_len, &mut self.body_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn session_id_defaults_to_zero() {
        let msg = Message::new(1, HeaderFields::new(), b"hdr", b"body");
        assert_eq!(msg.session_id(), 0);
    }

    #[test]
    fn session_id_reads_header_field() {
        let mut fields = HeaderFields::new();
        fields.set(FieldId::SessionId, HeaderValue::U32(42));
        let msg = Message::new(1, fields, b"hdr", b"body");
        assert_eq!(msg.session_id(), 42);
    }

    #[test]
    fn buffer_split_matches_inputs() {
        let msg = Message::new(7, HeaderFields::new(), b"header!", b"payload");
        assert_eq!(msg.hdr_len(), 7);
        assert_eq!(msg.body_len(), 7);
        assert_eq!(msg.header(), b"header!");
        assert_eq!(msg.body(), b"payload");
        assert_eq!(msg.bytes().len(), 14);
    }

    #[test]
    fn clear_resets_field_to_invalid() {
        let mut fields = HeaderFields::new();
        fields.set(FieldId::Member, HeaderValue::Str("Ping".into()));
        fields.clear(FieldId::Member);
        assert_eq!(*fields.get(FieldId::Member), HeaderValue::Invalid);
    }

    #[test]
    fn field_ids_are_dense_and_ascending() {
        let mut prev = 0u8;
        for id in FieldId::ALL {
            assert_eq!(id as u8, prev + 1);
            prev = id as u8;
        }
        assert_eq!(FieldId::ALL.len() + 1, FIELD_COUNT);
    }
}
