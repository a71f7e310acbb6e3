//! SiFT MTP - Wire format
//!
//! Fixed 16-byte header, the message-type set and per-type framing rules.
//!
//! ```text
//! header(16) || ciphertext(var) || tag(12) || [wrapped_key(256)]
//! ```
//!
//! The wrapped-key block is present only on login requests.

mod header;
mod message_type;

pub use header::MessageHeader;
pub use message_type::{is_known_type, Exchange, MessageType};

use crate::core::{HEADER_SIZE, TAG_SIZE};

/// Header size in bytes.
pub const fn header_size() -> usize {
    HEADER_SIZE
}

/// Authentication tag size in bytes.
pub const fn tag_size() -> usize {
    TAG_SIZE
}
