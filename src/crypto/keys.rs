//! Key material for MTP.
//!
//! - [`SessionKey`]: AES-256 key for all non-login traffic
//! - [`BootstrapKey`]: ephemeral AES-256 key protecting the login exchange
//! - [`HandshakeKey`]: long-term RSA key that wraps or unwraps the bootstrap key
//!
//! Symmetric keys are zeroized on drop and never printed.

use std::fmt;
use std::path::Path;

use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::core::{KeyExchangeError, LOGIN_RANDOM_SIZE, SYMMETRIC_KEY_SIZE};

/// A session key for AEAD operations.
///
/// Zeroized on drop for security.
#[derive(Clone)]
pub struct SessionKey {
    key: [u8; SYMMETRIC_KEY_SIZE],
}

impl SessionKey {
    /// Create a new session key from bytes.
    pub fn from_bytes(key: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Create a session key from a slice, if it has the right length.
    pub fn from_slice(key: &[u8]) -> Option<Self> {
        let key: [u8; SYMMETRIC_KEY_SIZE] = key.try_into().ok()?;
        Some(Self { key })
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    /// Handle with care - this exposes sensitive key material.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.key
    }
}

impl Drop for SessionKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Ephemeral key protecting one login request/response pair.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BootstrapKey {
    key: [u8; SYMMETRIC_KEY_SIZE],
}

impl BootstrapKey {
    /// Generate a fresh random bootstrap key.
    pub fn generate() -> Self {
        let mut key = [0u8; SYMMETRIC_KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self { key }
    }

    /// Create from raw bytes.
    pub fn from_bytes(key: [u8; SYMMETRIC_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Get the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_SIZE] {
        &self.key
    }
}

impl fmt::Debug for BootstrapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BootstrapKey(..)")
    }
}

/// The long-term asymmetric key of one side of the login exchange.
///
/// The initiator (client) holds the peer's public key and wraps the
/// bootstrap key with it; the responder (server) holds its private key and
/// unwraps.
#[derive(Clone)]
pub enum HandshakeKey {
    /// Peer public key, used to wrap.
    Public(RsaPublicKey),
    /// Own private key, used to unwrap.
    Private(RsaPrivateKey),
}

impl HandshakeKey {
    /// Parse a public key from PEM (SPKI `PUBLIC KEY` or PKCS#1 `RSA PUBLIC KEY`).
    pub fn from_public_pem(pem: &str) -> Result<Self, KeyExchangeError> {
        RsaPublicKey::from_public_key_pem(pem)
            .or_else(|_| RsaPublicKey::from_pkcs1_pem(pem))
            .map(HandshakeKey::Public)
            .map_err(|e| KeyExchangeError::InvalidKeyEncoding(e.to_string()))
    }

    /// Parse a private key from PEM (PKCS#8 `PRIVATE KEY` or PKCS#1 `RSA PRIVATE KEY`).
    pub fn from_private_pem(pem: &str) -> Result<Self, KeyExchangeError> {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(pem))
            .map(HandshakeKey::Private)
            .map_err(|e| KeyExchangeError::InvalidKeyEncoding(e.to_string()))
    }

    /// Load a public key from a PEM file.
    pub fn load_public_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyExchangeError> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_public_pem(&pem)
    }

    /// Load a private key from a PEM file.
    pub fn load_private_pem_file(path: impl AsRef<Path>) -> Result<Self, KeyExchangeError> {
        let pem = std::fs::read_to_string(path)?;
        Self::from_private_pem(&pem)
    }

    /// The public half of this key.
    pub fn public_key(&self) -> RsaPublicKey {
        match self {
            HandshakeKey::Public(key) => key.clone(),
            HandshakeKey::Private(key) => key.to_public_key(),
        }
    }

    /// Modulus size in bytes (also the size of one OAEP block).
    pub fn modulus_size(&self) -> usize {
        match self {
            HandshakeKey::Public(key) => key.size(),
            HandshakeKey::Private(key) => key.size(),
        }
    }
}

impl From<RsaPublicKey> for HandshakeKey {
    fn from(key: RsaPublicKey) -> Self {
        HandshakeKey::Public(key)
    }
}

impl From<RsaPrivateKey> for HandshakeKey {
    fn from(key: RsaPrivateKey) -> Self {
        HandshakeKey::Private(key)
    }
}

impl fmt::Debug for HandshakeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            HandshakeKey::Public(_) => "Public",
            HandshakeKey::Private(_) => "Private",
        };
        write!(f, "HandshakeKey::{kind}({} bits)", self.modulus_size() * 8)
    }
}

/// SHA-256 of the login request payload, used as the key-derivation salt.
pub fn request_hash(login_request: &[u8]) -> [u8; 32] {
    Sha256::digest(login_request).into()
}

/// Derive the final session key after a successful login exchange.
///
/// `HKDF-SHA256(ikm = client_random || server_random, salt = SHA-256(login_request))`,
/// expanded to 32 bytes with an empty info string.
pub fn derive_session_key(
    client_random: &[u8; LOGIN_RANDOM_SIZE],
    server_random: &[u8; LOGIN_RANDOM_SIZE],
    login_request: &[u8],
) -> Result<SessionKey, KeyExchangeError> {
    let salt = request_hash(login_request);

    let mut ikm = [0u8; 2 * LOGIN_RANDOM_SIZE];
    ikm[..LOGIN_RANDOM_SIZE].copy_from_slice(client_random);
    ikm[LOGIN_RANDOM_SIZE..].copy_from_slice(server_random);

    let hk = Hkdf::<Sha256>::new(Some(&salt), &ikm);
    let mut okm = [0u8; SYMMETRIC_KEY_SIZE];
    let result = hk.expand(&[], &mut okm);
    ikm.zeroize();
    result.map_err(|_| KeyExchangeError::KeyDerivationFailed)?;

    let key = SessionKey::from_bytes(okm);
    okm.zeroize();
    Ok(key)
}
