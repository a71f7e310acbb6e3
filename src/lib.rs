//! # SiFT MTP
//!
//! **Message Transfer Protocol** of the Simple File Transfer protocol, v1.0.
//!
//! MTP turns a reliable byte stream (normally TCP) into a sequence of
//! authenticated, encrypted, replay-resistant messages:
//!
//! - **Framing**: fixed 16-byte header, type-dependent body and trailer
//! - **Confidentiality and integrity**: AES-256-GCM with the header as
//!   associated data and a 12-byte tag
//! - **Bootstrap**: the login request carries a fresh AES key wrapped with
//!   RSA-OAEP under the server's public key
//! - **Anti-replay**: monotonic 16-bit sequence numbers
//!
//! ## Feature Flags
//!
//! - `async` (default): [`AsyncMtpSession`] over tokio streams
//!
//! ## Modules
//!
//! - [`core`]: constants and error types
//! - [`wire`]: header codec and message types
//! - [`crypto`]: AEAD, key types, login key wrapping, sequence guard
//! - [`transport`]: exact-length stream reads and writes
//! - [`session`]: sans-IO protocol state and the session drivers
//!
//! ## Example Usage
//!
//! ```no_run
//! use std::net::TcpStream;
//! use sift_mtp::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let server_key = HandshakeKey::load_public_pem_file("server_pubkey.pem")?;
//! let mut session = MtpSession::client(TcpStream::connect("127.0.0.1:5150")?, server_key);
//!
//! let client_random = [7u8; LOGIN_RANDOM_SIZE];
//! let mut request = b"alice\npassword\n".to_vec();
//! request.extend_from_slice(&client_random);
//! session.send_msg(MessageType::LoginRequest, &request)?;
//!
//! let (_, response) = session.receive_msg()?;
//! let server_random: [u8; LOGIN_RANDOM_SIZE] = response[32..48].try_into()?;
//! session.set_session_key(derive_session_key(&client_random, &server_random, &request)?);
//!
//! session.send_msg(MessageType::CommandRequest, b"pwd")?;
//! let (_, result) = session.receive_msg()?;
//! # Ok(())
//! # }
//! ```
//!
//! Diagnostics go through `tracing`; nothing is emitted unless the
//! application installs a subscriber, and key material is never logged.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod core;
pub mod crypto;
pub mod session;
pub mod transport;
pub mod wire;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::core::*;

    pub use crate::crypto::{
        derive_session_key, request_hash, CounterMode, HandshakeKey, ReplayPolicy, SessionKey,
    };

    pub use crate::session::{MtpConfig, MtpSession, MtpState};

    #[cfg(feature = "async")]
    pub use crate::session::AsyncMtpSession;

    pub use crate::wire::{MessageHeader, MessageType};
}

// Re-export commonly used items at crate root
pub use crate::core::{ErrorKind, MtpError, MtpResult};
pub use crate::crypto::{HandshakeKey, SessionKey};
pub use crate::session::{MtpConfig, MtpSession};
pub use crate::wire::MessageType;

#[cfg(feature = "async")]
pub use crate::session::AsyncMtpSession;
