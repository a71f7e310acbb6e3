//! Login exchange: hybrid RSA-OAEP + AES-GCM bootstrap.
//!
//! The initiator generates a fresh 32-byte bootstrap key, protects the login
//! request body with it, and appends the key wrapped under the responder's
//! RSA public key (OAEP, SHA-1). The responder unwraps the key with its
//! private key, and both sides protect the login response with the same
//! bootstrap key. No other key material is exchanged.
//!
//! ```text
//! Initiator                                   Responder
//!   Idle                                         Idle
//!   |  login request: E_tk(body) || RSA(tk)       |
//!   | ------------------------------------------> |
//!   Initiated(tk)                          Responding(tk)
//!   |  login response: E_tk(body)                 |
//!   | <------------------------------------------ |
//!   Completed(tk)                          Completed(tk)
//! ```
//!
//! The bootstrap key is dropped (and zeroized) once the caller installs the
//! session key.

use rand::rngs::OsRng;
use rsa::Oaep;
use sha1::Sha1;
use tracing::debug;
use zeroize::Zeroize;

use crate::core::{KeyExchangeError, SYMMETRIC_KEY_SIZE, WRAPPED_KEY_SIZE};

use super::{BootstrapKey, HandshakeKey};

/// Our role in the login exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends the login request (client).
    Initiator,
    /// Answers the login request (server).
    Responder,
}

/// Wrap a bootstrap key under the peer's RSA public key.
///
/// The result is always exactly [`WRAPPED_KEY_SIZE`] bytes; keys with any
/// other modulus size are refused.
pub fn wrap_bootstrap_key(
    key: &HandshakeKey,
    bootstrap: &BootstrapKey,
) -> Result<Vec<u8>, KeyExchangeError> {
    let HandshakeKey::Public(public) = key else {
        return Err(KeyExchangeError::WrongKeyKind { expected: "public" });
    };
    check_modulus(key)?;

    public
        .encrypt(&mut OsRng, Oaep::new::<Sha1>(), bootstrap.as_bytes())
        .map_err(KeyExchangeError::WrapFailed)
}

/// Recover a bootstrap key from its wrapped form with our RSA private key.
pub fn unwrap_bootstrap_key(
    key: &HandshakeKey,
    wrapped: &[u8],
) -> Result<BootstrapKey, KeyExchangeError> {
    let HandshakeKey::Private(private) = key else {
        return Err(KeyExchangeError::WrongKeyKind { expected: "private" });
    };
    check_modulus(key)?;

    let mut raw = private
        .decrypt(Oaep::new::<Sha1>(), wrapped)
        .map_err(KeyExchangeError::UnwrapFailed)?;

    let result = <[u8; SYMMETRIC_KEY_SIZE]>::try_from(raw.as_slice())
        .map(BootstrapKey::from_bytes)
        .map_err(|_| KeyExchangeError::InvalidBootstrapKey(raw.len()));
    raw.zeroize();
    result
}

fn check_modulus(key: &HandshakeKey) -> Result<(), KeyExchangeError> {
    let actual = key.modulus_size();
    if actual != WRAPPED_KEY_SIZE {
        return Err(KeyExchangeError::UnsupportedKeySize {
            expected: WRAPPED_KEY_SIZE,
            actual,
        });
    }
    Ok(())
}

/// Login-exchange progress for one connection.
#[derive(Debug, Default)]
pub enum HandshakeState {
    /// No login exchange in progress, or the bootstrap key was discarded.
    #[default]
    Idle,
    /// Login request sent; waiting for the response under the same key.
    Initiated(BootstrapKey),
    /// Login request received; the response is still owed.
    Responding(BootstrapKey),
    /// Both login messages exchanged; the key lives until the session key
    /// is installed.
    Completed {
        /// Which side we played.
        role: Role,
        /// The bootstrap key, kept for the caller's key derivation step.
        key: BootstrapKey,
    },
}

impl HandshakeState {
    /// Bootstrap key to encrypt an outgoing login response with.
    pub fn response_send_key(&self) -> Option<&BootstrapKey> {
        match self {
            HandshakeState::Responding(key) => Some(key),
            _ => None,
        }
    }

    /// Bootstrap key to decrypt an incoming login response with.
    pub fn response_receive_key(&self) -> Option<&BootstrapKey> {
        match self {
            HandshakeState::Initiated(key) => Some(key),
            _ => None,
        }
    }

    /// Our role, once a login message has been sent or received.
    pub fn role(&self) -> Option<Role> {
        match self {
            HandshakeState::Idle => None,
            HandshakeState::Initiated(_) => Some(Role::Initiator),
            HandshakeState::Responding(_) => Some(Role::Responder),
            HandshakeState::Completed { role, .. } => Some(*role),
        }
    }

    /// Whether both login messages have been exchanged.
    pub fn is_complete(&self) -> bool {
        matches!(self, HandshakeState::Completed { .. })
    }

    /// Record that a login request carrying `key` was sent.
    pub fn request_sent(&mut self, key: BootstrapKey) {
        debug!("login request sent, awaiting response under bootstrap key");
        *self = HandshakeState::Initiated(key);
    }

    /// Record that a login request was received and authenticated.
    pub fn request_received(&mut self, key: BootstrapKey) {
        debug!("login request authenticated, bootstrap key recovered");
        *self = HandshakeState::Responding(key);
    }

    /// Record that the login response went out.
    pub fn response_sent(&mut self) {
        if let HandshakeState::Responding(key) = std::mem::take(self) {
            debug!("login response sent");
            *self = HandshakeState::Completed {
                role: Role::Responder,
                key,
            };
        }
    }

    /// Record that the login response was received and authenticated.
    pub fn response_received(&mut self) {
        if let HandshakeState::Initiated(key) = std::mem::take(self) {
            debug!("login response authenticated");
            *self = HandshakeState::Completed {
                role: Role::Initiator,
                key,
            };
        }
    }

    /// Drop the bootstrap key.
    pub fn discard(&mut self) {
        if !matches!(self, HandshakeState::Idle) {
            debug!("bootstrap key discarded");
        }
        *self = HandshakeState::Idle;
    }
}
