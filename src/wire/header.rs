//! Message header encoding and decoding.

use crate::core::{
    FrameError, HEADER_LEN_OFFSET, HEADER_RAND_OFFSET, HEADER_RAND_SIZE, HEADER_RSV_OFFSET,
    HEADER_SIZE, HEADER_SQN_OFFSET, HEADER_TYP_OFFSET, HEADER_VER_OFFSET, NONCE_SIZE,
    VERSION_BYTES,
};

use super::MessageType;

/// Message header, sent in the clear and authenticated as AEAD associated data.
///
/// Wire format (16 bytes, big-endian):
/// ```text
/// +-------+-------+-------+-------+-----------------+-------+
/// | ver   | typ   | len   | sqn   | rand            | rsv   |
/// | 2     | 2     | 2     | 2     | 6               | 2     |
/// +-------+-------+-------+-------+-----------------+-------+
/// ```
///
/// Decoding keeps every field raw; validation happens when the session
/// accepts the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// Protocol version (major, minor).
    pub version: [u8; 2],
    /// Message type code.
    pub msg_type: u16,
    /// Total message length, header included.
    pub len: u16,
    /// Sequence number.
    pub sqn: u16,
    /// Per-message random salt.
    pub rand: [u8; HEADER_RAND_SIZE],
    /// Reserved, zero when sent.
    pub reserved: u16,
}

impl MessageHeader {
    /// Build a header for an outgoing message.
    pub fn new(msg_type: MessageType, len: u16, sqn: u16, rand: [u8; HEADER_RAND_SIZE]) -> Self {
        Self {
            version: VERSION_BYTES,
            msg_type: msg_type.code(),
            len,
            sqn,
            rand,
            reserved: 0,
        }
    }

    /// Serialize header to bytes (16 bytes).
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[HEADER_VER_OFFSET..HEADER_TYP_OFFSET].copy_from_slice(&self.version);
        buf[HEADER_TYP_OFFSET..HEADER_LEN_OFFSET].copy_from_slice(&self.msg_type.to_be_bytes());
        buf[HEADER_LEN_OFFSET..HEADER_SQN_OFFSET].copy_from_slice(&self.len.to_be_bytes());
        buf[HEADER_SQN_OFFSET..HEADER_RAND_OFFSET].copy_from_slice(&self.sqn.to_be_bytes());
        buf[HEADER_RAND_OFFSET..HEADER_RSV_OFFSET].copy_from_slice(&self.rand);
        buf[HEADER_RSV_OFFSET..].copy_from_slice(&self.reserved.to_be_bytes());
        buf
    }

    /// Parse header from bytes.
    ///
    /// Only the length is checked; field values are returned as found.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let bytes: &[u8; HEADER_SIZE] =
            bytes.try_into().map_err(|_| FrameError::HeaderTooShort {
                expected: HEADER_SIZE,
                actual: bytes.len(),
            })?;

        let field = |at: usize| u16::from_be_bytes([bytes[at], bytes[at + 1]]);

        let mut rand = [0u8; HEADER_RAND_SIZE];
        rand.copy_from_slice(&bytes[HEADER_RAND_OFFSET..HEADER_RSV_OFFSET]);

        Ok(Self {
            version: [bytes[HEADER_VER_OFFSET], bytes[HEADER_VER_OFFSET + 1]],
            msg_type: field(HEADER_TYP_OFFSET),
            len: field(HEADER_LEN_OFFSET),
            sqn: field(HEADER_SQN_OFFSET),
            rand,
            reserved: field(HEADER_RSV_OFFSET),
        })
    }

    /// Typed message type, if the code is known.
    pub fn message_type(&self) -> Option<MessageType> {
        MessageType::from_code(self.msg_type)
    }

    /// AEAD nonce: `sqn || rand`.
    pub fn nonce(&self) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        nonce[..2].copy_from_slice(&self.sqn.to_be_bytes());
        nonce[2..].copy_from_slice(&self.rand);
        nonce
    }
}
