//! Protocol constants for SiFT MTP v1.0.
//!
//! These values are fixed by the wire format and MUST NOT be changed.

// =============================================================================
// HEADER LAYOUT
// =============================================================================

/// Protocol version, major part.
pub const VERSION_MAJOR: u8 = 1;

/// Protocol version, minor part.
pub const VERSION_MINOR: u8 = 0;

/// Version field as it appears on the wire.
pub const VERSION_BYTES: [u8; 2] = [VERSION_MAJOR, VERSION_MINOR];

/// Total header size.
pub const HEADER_SIZE: usize = 16;

/// Size of the `ver` field.
pub const HEADER_VER_SIZE: usize = 2;

/// Size of the `typ` field.
pub const HEADER_TYP_SIZE: usize = 2;

/// Size of the `len` field.
pub const HEADER_LEN_SIZE: usize = 2;

/// Size of the `sqn` field.
pub const HEADER_SQN_SIZE: usize = 2;

/// Size of the `rand` field.
pub const HEADER_RAND_SIZE: usize = 6;

/// Size of the `rsv` field.
pub const HEADER_RSV_SIZE: usize = 2;

/// Offset of the `ver` field.
pub const HEADER_VER_OFFSET: usize = 0;

/// Offset of the `typ` field.
pub const HEADER_TYP_OFFSET: usize = HEADER_VER_OFFSET + HEADER_VER_SIZE;

/// Offset of the `len` field.
pub const HEADER_LEN_OFFSET: usize = HEADER_TYP_OFFSET + HEADER_TYP_SIZE;

/// Offset of the `sqn` field.
pub const HEADER_SQN_OFFSET: usize = HEADER_LEN_OFFSET + HEADER_LEN_SIZE;

/// Offset of the `rand` field.
pub const HEADER_RAND_OFFSET: usize = HEADER_SQN_OFFSET + HEADER_SQN_SIZE;

/// Offset of the `rsv` field.
pub const HEADER_RSV_OFFSET: usize = HEADER_RAND_OFFSET + HEADER_RAND_SIZE;

// =============================================================================
// CRYPTOGRAPHIC CONSTANTS
// =============================================================================

/// Truncated AES-GCM authentication tag size.
pub const TAG_SIZE: usize = 12;

/// AEAD nonce size (`sqn || rand`).
pub const NONCE_SIZE: usize = HEADER_SQN_SIZE + HEADER_RAND_SIZE;

/// Symmetric key size (AES-256) for both session and bootstrap keys.
pub const SYMMETRIC_KEY_SIZE: usize = 32;

/// Size of the RSA-OAEP wrapped bootstrap key trailing a login request.
///
/// Sized for a 2048-bit modulus.
pub const WRAPPED_KEY_SIZE: usize = 256;

/// Size of the client/server random values mixed into the final session key.
pub const LOGIN_RANDOM_SIZE: usize = 16;

// =============================================================================
// MESSAGE TYPES
// =============================================================================

/// Login request.
pub const TYPE_LOGIN_REQ: u16 = 0x0000;

/// Login response.
pub const TYPE_LOGIN_RES: u16 = 0x0010;

/// Command request.
pub const TYPE_COMMAND_REQ: u16 = 0x0100;

/// Command response.
pub const TYPE_COMMAND_RES: u16 = 0x0110;

/// Upload request, fragment that is not the last.
pub const TYPE_UPLOAD_REQ_0: u16 = 0x0200;

/// Upload request, last fragment.
pub const TYPE_UPLOAD_REQ_1: u16 = 0x0201;

/// Upload response.
pub const TYPE_UPLOAD_RES: u16 = 0x0210;

/// Download request.
pub const TYPE_DNLOAD_REQ: u16 = 0x0300;

/// Download response, fragment that is not the last.
pub const TYPE_DNLOAD_RES_0: u16 = 0x0310;

/// Download response, last fragment.
pub const TYPE_DNLOAD_RES_1: u16 = 0x0311;

// =============================================================================
// SIZE LIMITS
// =============================================================================

/// Largest total message length expressible in the 16-bit `len` field.
pub const MAX_MESSAGE_SIZE: usize = u16::MAX as usize;

/// Fixed per-message overhead (header + tag).
pub const MESSAGE_OVERHEAD: usize = HEADER_SIZE + TAG_SIZE;

/// Largest payload that fits in any message type, including a login request.
pub const MAX_PAYLOAD_SIZE: usize = MAX_MESSAGE_SIZE - MESSAGE_OVERHEAD - WRAPPED_KEY_SIZE;
