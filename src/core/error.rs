//! Error types for SiFT MTP.

use std::fmt;
use std::io;

use thiserror::Error;

/// Errors in the wire framing (header and length handling).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// Fewer header bytes than the fixed header size.
    #[error("incomplete message header: expected {expected} bytes, got {actual}")]
    HeaderTooShort {
        /// Expected size.
        expected: usize,
        /// Actual size.
        actual: usize,
    },

    /// Declared total length cannot hold the mandatory header, tag and key block.
    #[error("declared message length {declared} is below the minimum of {minimum}")]
    LengthTooSmall {
        /// Length carried in the header.
        declared: usize,
        /// Smallest length valid for the message type.
        minimum: usize,
    },

    /// Body, tag or key block handed to the session has the wrong size.
    #[error("incomplete message body: expected {expected} bytes, got {actual}")]
    BodyLengthMismatch {
        /// Size implied by the header.
        expected: usize,
        /// Size received.
        actual: usize,
    },

    /// Outgoing payload does not fit in a single message.
    #[error("payload of {size} bytes exceeds the maximum of {max}")]
    PayloadTooLarge {
        /// Payload size.
        size: usize,
        /// Largest accepted payload.
        max: usize,
    },
}

/// Errors in header validation and sequence tracking.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Version field is not the supported version.
    #[error("unsupported version {major}.{minor} found in message header")]
    UnsupportedVersion {
        /// Major version on the wire.
        major: u8,
        /// Minor version on the wire.
        minor: u8,
    },

    /// Type field is outside the fixed message-type set.
    #[error("unknown message type {0:#06x} found in message header")]
    UnknownMessageType(u16),

    /// Sequence number went backwards.
    #[error("bad sequence number: received {received}, last accepted {last}")]
    BadSequence {
        /// Sequence number carried by the rejected message.
        received: u16,
        /// Highest sequence number accepted so far.
        last: u16,
    },

    /// The 16-bit sequence space is used up - session must terminate.
    #[error("sequence number space exhausted - session must be terminated")]
    SequenceExhausted,
}

/// Errors in the AEAD layer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD encryption failed.
    #[error("AEAD encryption failed")]
    EncryptionFailed,

    /// AEAD decryption failed (invalid tag or corrupted).
    #[error("AEAD decryption failed (invalid tag or corrupted)")]
    DecryptionFailed,
}

/// Errors while wrapping or unwrapping the bootstrap key, or loading RSA keys.
#[derive(Debug, Error)]
pub enum KeyExchangeError {
    /// RSA-OAEP encryption of the bootstrap key failed.
    #[error("unable to wrap bootstrap key: {0}")]
    WrapFailed(#[source] rsa::Error),

    /// RSA-OAEP decryption of the wrapped key failed (padding or format).
    #[error("unable to unwrap bootstrap key: {0}")]
    UnwrapFailed(#[source] rsa::Error),

    /// The RSA modulus does not produce the fixed-size key block.
    #[error("unsupported RSA key size: wrapped key block must be {expected} bytes, key produces {actual}")]
    UnsupportedKeySize {
        /// Required block size.
        expected: usize,
        /// Block size produced by the key.
        actual: usize,
    },

    /// The unwrapped bootstrap key has the wrong length.
    #[error("unwrapped bootstrap key has {0} bytes, expected 32")]
    InvalidBootstrapKey(usize),

    /// A public key was needed but a private key was given, or the reverse.
    #[error("wrong handshake key: a {expected} key is required")]
    WrongKeyKind {
        /// Kind of key that was required.
        expected: &'static str,
    },

    /// PEM input could not be parsed as an RSA key.
    #[error("invalid RSA key encoding: {0}")]
    InvalidKeyEncoding(String),

    /// Key file could not be read.
    #[error("unable to read key file: {0}")]
    Io(#[from] io::Error),

    /// HKDF expansion failed.
    #[error("session key derivation failed")]
    KeyDerivationFailed,
}

/// Which key a message is protected with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeySlot {
    /// Long-lived session key, installed by the caller.
    Session,
    /// Ephemeral bootstrap key protecting the login exchange.
    Bootstrap,
    /// Long-term RSA key used to wrap or unwrap the bootstrap key.
    Handshake,
}

impl fmt::Display for KeySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySlot::Session => f.write_str("session"),
            KeySlot::Bootstrap => f.write_str("bootstrap"),
            KeySlot::Handshake => f.write_str("handshake"),
        }
    }
}

/// Coarse classification of an [`MtpError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Socket I/O failure or peer closed the connection.
    Transport,
    /// Header or body length inconsistent with the wire format.
    Framing,
    /// Unsupported version, unknown type or sequence regression.
    Protocol,
    /// AEAD tag did not verify.
    Authentication,
    /// AEAD encryption failed locally.
    Encryption,
    /// RSA wrap/unwrap failure during the login exchange.
    KeyExchange,
    /// The key needed for a message has not been installed.
    MissingKey,
}

/// Errors surfaced by the session façade.
///
/// Every lower-level failure is wrapped with the stage that failed, so the
/// `Display` output reads as a cause chain.
#[derive(Debug, Error)]
pub enum MtpError {
    /// I/O failure on the peer stream.
    #[error("{context} --> {source}")]
    Transport {
        /// Stage that was being performed.
        context: &'static str,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Framing error.
    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Authentication tag did not verify.
    #[error("authentication failed: {context} could not be verified")]
    Authentication {
        /// What was being decrypted.
        context: &'static str,
    },

    /// Local encryption failure.
    #[error("encryption failed: {context}")]
    Encryption {
        /// What was being encrypted.
        context: &'static str,
    },

    /// Key exchange error.
    #[error("key exchange error: {0}")]
    KeyExchange(#[from] KeyExchangeError),

    /// Required key is not available.
    #[error("no {0} key available")]
    MissingKey(KeySlot),

    /// An incoming header was rejected before the rest of its message was
    /// read. The stream is no longer aligned on a message boundary.
    #[error("message header rejected, stream out of sync: {0}")]
    HeaderRejected(#[source] Box<MtpError>),
}

impl MtpError {
    /// Wrap an I/O error with the stage that produced it.
    pub fn transport(context: &'static str, source: io::Error) -> Self {
        MtpError::Transport { context, source }
    }

    /// Map an AEAD failure for the given stage.
    pub fn crypto(context: &'static str, err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => MtpError::Authentication { context },
            CryptoError::EncryptionFailed => MtpError::Encryption { context },
        }
    }

    /// Mark a header-validation error raised while reading from a stream.
    pub fn header_rejected(err: MtpError) -> Self {
        MtpError::HeaderRejected(Box::new(err))
    }

    /// Classify this error. A rejected header reports the kind of its cause.
    pub fn kind(&self) -> ErrorKind {
        match self {
            MtpError::HeaderRejected(cause) => cause.kind(),
            MtpError::Transport { .. } => ErrorKind::Transport,
            MtpError::Framing(_) => ErrorKind::Framing,
            MtpError::Protocol(_) => ErrorKind::Protocol,
            MtpError::Authentication { .. } => ErrorKind::Authentication,
            MtpError::Encryption { .. } => ErrorKind::Encryption,
            MtpError::KeyExchange(_) => ErrorKind::KeyExchange,
            MtpError::MissingKey(_) => ErrorKind::MissingKey,
        }
    }

    /// Check if this error indicates tampering, replay or a forged handshake.
    pub fn is_security_error(&self) -> bool {
        match self {
            MtpError::HeaderRejected(cause) => cause.is_security_error(),
            _ => matches!(
                self,
                MtpError::Authentication { .. }
                    | MtpError::Protocol(ProtocolError::BadSequence { .. })
                    | MtpError::KeyExchange(KeyExchangeError::UnwrapFailed(_))
            ),
        }
    }

    /// Check if the session can no longer be used after this error.
    ///
    /// Once a read or write fails mid-message, or a header is rejected with
    /// its body still unread, the stream position is unknown. An exhausted
    /// sequence space cannot be recovered either.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MtpError::Transport { .. }
                | MtpError::HeaderRejected(_)
                | MtpError::Protocol(ProtocolError::SequenceExhausted)
        )
    }
}

/// Result type for session operations.
pub type MtpResult<T> = Result<T, MtpError>;
