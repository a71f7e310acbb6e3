//! Message type enumeration and per-type framing rules.

use crate::core::{
    KeySlot, TYPE_COMMAND_REQ, TYPE_COMMAND_RES, TYPE_DNLOAD_REQ, TYPE_DNLOAD_RES_0,
    TYPE_DNLOAD_RES_1, TYPE_LOGIN_REQ, TYPE_LOGIN_RES, TYPE_UPLOAD_REQ_0, TYPE_UPLOAD_REQ_1,
    TYPE_UPLOAD_RES, WRAPPED_KEY_SIZE,
};

/// The ten message types carried by MTP.
///
/// Membership in this set is a hard validity requirement on receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageType {
    /// Login request (carries the wrapped bootstrap key).
    LoginRequest = TYPE_LOGIN_REQ,
    /// Login response.
    LoginResponse = TYPE_LOGIN_RES,
    /// Command request.
    CommandRequest = TYPE_COMMAND_REQ,
    /// Command response.
    CommandResponse = TYPE_COMMAND_RES,
    /// Upload request fragment (more follow).
    UploadRequest0 = TYPE_UPLOAD_REQ_0,
    /// Upload request fragment (last).
    UploadRequest1 = TYPE_UPLOAD_REQ_1,
    /// Upload response.
    UploadResponse = TYPE_UPLOAD_RES,
    /// Download request.
    DownloadRequest = TYPE_DNLOAD_REQ,
    /// Download response fragment (more follow).
    DownloadResponse0 = TYPE_DNLOAD_RES_0,
    /// Download response fragment (last).
    DownloadResponse1 = TYPE_DNLOAD_RES_1,
}

impl MessageType {
    /// All message types, in code order.
    pub const ALL: [MessageType; 10] = [
        MessageType::LoginRequest,
        MessageType::LoginResponse,
        MessageType::CommandRequest,
        MessageType::CommandResponse,
        MessageType::UploadRequest0,
        MessageType::UploadRequest1,
        MessageType::UploadResponse,
        MessageType::DownloadRequest,
        MessageType::DownloadResponse0,
        MessageType::DownloadResponse1,
    ];

    /// Parse a message type from its wire code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            TYPE_LOGIN_REQ => Some(Self::LoginRequest),
            TYPE_LOGIN_RES => Some(Self::LoginResponse),
            TYPE_COMMAND_REQ => Some(Self::CommandRequest),
            TYPE_COMMAND_RES => Some(Self::CommandResponse),
            TYPE_UPLOAD_REQ_0 => Some(Self::UploadRequest0),
            TYPE_UPLOAD_REQ_1 => Some(Self::UploadRequest1),
            TYPE_UPLOAD_RES => Some(Self::UploadResponse),
            TYPE_DNLOAD_REQ => Some(Self::DownloadRequest),
            TYPE_DNLOAD_RES_0 => Some(Self::DownloadResponse0),
            TYPE_DNLOAD_RES_1 => Some(Self::DownloadResponse1),
            _ => None,
        }
    }

    /// Wire code of this type.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Wire code as big-endian bytes.
    pub fn to_bytes(self) -> [u8; 2] {
        self.code().to_be_bytes()
    }

    /// Which exchange this message belongs to.
    pub fn exchange(self) -> Exchange {
        match self {
            MessageType::LoginRequest => Exchange::LoginRequest,
            MessageType::LoginResponse => Exchange::LoginResponse,
            _ => Exchange::Session,
        }
    }
}

/// Check whether a wire code names one of the ten message types.
pub fn is_known_type(code: u16) -> bool {
    MessageType::from_code(code).is_some()
}

/// Framing and key-selection rule shared by a group of message types.
///
/// The read and write paths dispatch on this instead of comparing type
/// codes directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    /// Body under a fresh bootstrap key, followed by the RSA-wrapped key.
    LoginRequest,
    /// Body under the bootstrap key recovered or generated for the request.
    LoginResponse,
    /// Body under the session key.
    Session,
}

impl Exchange {
    /// Key protecting the message body.
    pub fn key_slot(self) -> KeySlot {
        match self {
            Exchange::LoginRequest | Exchange::LoginResponse => KeySlot::Bootstrap,
            Exchange::Session => KeySlot::Session,
        }
    }

    /// Bytes following the tag on the wire.
    pub fn trailer_size(self) -> usize {
        match self {
            Exchange::LoginRequest => WRAPPED_KEY_SIZE,
            Exchange::LoginResponse | Exchange::Session => 0,
        }
    }
}
