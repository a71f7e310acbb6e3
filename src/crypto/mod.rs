//! SiFT MTP - Security layer
//!
//! - [`aead`]: AES-256-GCM body encryption with the header as associated data
//! - [`handshake`]: RSA-OAEP wrapping of the login bootstrap key
//! - [`sequence`]: sequence numbering and anti-replay
//! - keys: session, bootstrap and RSA key types, session key derivation

pub mod aead;
pub mod handshake;
mod keys;
pub mod sequence;

pub use handshake::{unwrap_bootstrap_key, wrap_bootstrap_key, HandshakeState, Role};
pub use keys::{derive_session_key, request_hash, BootstrapKey, HandshakeKey, SessionKey};
pub use sequence::{CounterMode, ReplayPolicy, SequenceGuard};

#[cfg(test)]
pub(crate) use keys::fixtures;
