//! Sans-IO message state machine.
//!
//! [`MtpState`] owns everything about a connection except the stream itself:
//! sequence counters, the session key, the login bootstrap key and the
//! configured RSA key. The blocking and async drivers move bytes; this type
//! decides what the bytes are.
//!
//! Receiving is split in two so the driver knows how much to read:
//! [`MtpState::open_header`] validates the 16 header bytes and returns an
//! [`IncomingFrame`] describing the rest, then [`MtpState::open`] takes the
//! body, tag and key block and authenticates them.

use rand::{rngs::OsRng, RngCore};
use tracing::{debug, trace, warn};

use crate::core::{
    FrameError, KeySlot, MtpError, MtpResult, ProtocolError, HEADER_RAND_SIZE, HEADER_SIZE,
    MAX_MESSAGE_SIZE, MESSAGE_OVERHEAD, SYMMETRIC_KEY_SIZE, TAG_SIZE, VERSION_BYTES,
};
use crate::crypto::{
    aead, unwrap_bootstrap_key, wrap_bootstrap_key, BootstrapKey, HandshakeKey, HandshakeState,
    SequenceGuard, SessionKey,
};
use crate::wire::{Exchange, MessageHeader, MessageType};

use super::MtpConfig;

/// A validated header, waiting for the rest of its message.
#[derive(Debug, Clone)]
pub struct IncomingFrame {
    header: MessageHeader,
    raw: [u8; HEADER_SIZE],
    msg_type: MessageType,
    body_len: usize,
}

impl IncomingFrame {
    /// The decoded header.
    pub fn header(&self) -> &MessageHeader {
        &self.header
    }

    /// The message type.
    pub fn msg_type(&self) -> MessageType {
        self.msg_type
    }

    /// Ciphertext length.
    pub fn body_len(&self) -> usize {
        self.body_len
    }

    /// Length of the wrapped-key block after the tag (0 or 256).
    pub fn trailer_len(&self) -> usize {
        self.msg_type.exchange().trailer_size()
    }

    /// Bytes still to read after the header.
    pub fn remaining_len(&self) -> usize {
        self.body_len + TAG_SIZE + self.trailer_len()
    }
}

/// Per-connection protocol state.
#[derive(Debug)]
pub struct MtpState {
    config: MtpConfig,
    sequence: SequenceGuard,
    session_key: Option<SessionKey>,
    handshake: HandshakeState,
    handshake_key: Option<HandshakeKey>,
}

impl MtpState {
    /// Fresh state: counters at zero, no keys.
    pub fn new(config: MtpConfig) -> Self {
        let sequence = SequenceGuard::new(config.counter_mode, config.replay_policy);
        Self {
            config,
            sequence,
            session_key: None,
            handshake: HandshakeState::default(),
            handshake_key: None,
        }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &MtpConfig {
        &self.config
    }

    /// Sequence counters.
    pub fn sequence(&self) -> &SequenceGuard {
        &self.sequence
    }

    /// Login-exchange progress.
    pub fn handshake(&self) -> &HandshakeState {
        &self.handshake
    }

    /// Whether a session key is installed.
    pub fn has_session_key(&self) -> bool {
        self.session_key.is_some()
    }

    /// Install the session key and drop the bootstrap key.
    pub fn set_session_key(&mut self, key: SessionKey) {
        self.session_key = Some(key);
        self.handshake.discard();
        debug!("session key installed");
    }

    /// Remove the session key.
    pub fn clear_session_key(&mut self) {
        if self.session_key.take().is_some() {
            debug!("session key cleared");
        }
    }

    /// Set the RSA key used for login requests: the server's public key on
    /// the client, the server's private key on the server.
    pub fn set_handshake_key(&mut self, key: HandshakeKey) {
        self.handshake_key = Some(key);
    }

    /// Largest payload `seal` accepts for a message type.
    pub fn max_payload_len(&self, msg_type: MessageType) -> usize {
        let fits = MAX_MESSAGE_SIZE - MESSAGE_OVERHEAD - msg_type.exchange().trailer_size();
        self.config.max_payload_len.min(fits)
    }

    /// Build the complete wire bytes of one outgoing message.
    ///
    /// `key_override` replaces the configured RSA key for a login request
    /// and is ignored for every other type. Nothing changes on failure
    /// except, for errors after numbering, the send counter.
    pub fn seal(
        &mut self,
        msg_type: MessageType,
        payload: &[u8],
        key_override: Option<&HandshakeKey>,
    ) -> MtpResult<Vec<u8>> {
        let max = self.max_payload_len(msg_type);
        if payload.len() > max {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max,
            }
            .into());
        }

        match msg_type.exchange() {
            Exchange::LoginRequest => {
                let rsa_key = key_override
                    .or(self.handshake_key.as_ref())
                    .ok_or(MtpError::MissingKey(KeySlot::Handshake))?;
                let bootstrap = BootstrapKey::generate();
                let wrapped = wrap_bootstrap_key(rsa_key, &bootstrap)?;

                let sqn = self.sequence.next_send()?;
                let mut frame = build_frame(bootstrap.as_bytes(), msg_type, sqn, payload)?;
                frame.extend_from_slice(&wrapped);

                self.handshake.request_sent(bootstrap);
                Ok(frame)
            }
            Exchange::LoginResponse => {
                let key = self
                    .handshake
                    .response_send_key()
                    .ok_or(MtpError::MissingKey(KeySlot::Bootstrap))?;

                let sqn = self.sequence.next_send()?;
                let frame = build_frame(key.as_bytes(), msg_type, sqn, payload)?;

                self.handshake.response_sent();
                Ok(frame)
            }
            Exchange::Session => {
                let key = self
                    .session_key
                    .as_ref()
                    .ok_or(MtpError::MissingKey(KeySlot::Session))?;

                let sqn = self.sequence.next_send()?;
                build_frame(key.as_bytes(), msg_type, sqn, payload)
            }
        }
    }

    /// Validate an incoming header.
    ///
    /// Checks, in order: header size, version, message type, sequence
    /// number, declared length. No state changes; the sequence number is
    /// only recorded once the body authenticates.
    pub fn open_header(&self, bytes: &[u8]) -> MtpResult<IncomingFrame> {
        let header = MessageHeader::from_bytes(bytes)?;

        if header.version != VERSION_BYTES {
            warn!(version = ?header.version, "rejecting message: unsupported version");
            return Err(ProtocolError::UnsupportedVersion {
                major: header.version[0],
                minor: header.version[1],
            }
            .into());
        }

        let msg_type = header.message_type().ok_or_else(|| {
            warn!(typ = header.msg_type, "rejecting message: unknown type");
            ProtocolError::UnknownMessageType(header.msg_type)
        })?;

        if let Err(e) = self.sequence.check(header.sqn) {
            warn!(
                sqn = header.sqn,
                last = self.sequence.last_received(),
                "rejecting message: sequence number too old"
            );
            return Err(e.into());
        }

        let declared = usize::from(header.len);
        let minimum = MESSAGE_OVERHEAD + msg_type.exchange().trailer_size();
        if declared < minimum {
            warn!(len = declared, minimum, "rejecting message: declared length too small");
            return Err(FrameError::LengthTooSmall { declared, minimum }.into());
        }

        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(bytes);

        Ok(IncomingFrame {
            header,
            raw,
            msg_type,
            body_len: declared - minimum,
        })
    }

    /// Authenticate and decrypt the rest of a message.
    ///
    /// `key_override` replaces the configured RSA private key when unwrapping
    /// a login request and is ignored for every other type. The sequence
    /// number and the login state only advance once decryption succeeds.
    pub fn open(
        &mut self,
        frame: &IncomingFrame,
        body: &[u8],
        tag: &[u8],
        trailer: &[u8],
        key_override: Option<&HandshakeKey>,
    ) -> MtpResult<Vec<u8>> {
        check_len(frame.body_len, body.len())?;
        check_len(frame.trailer_len(), trailer.len())?;
        let tag: &[u8; TAG_SIZE] = tag.try_into().map_err(|_| FrameError::BodyLengthMismatch {
            expected: TAG_SIZE,
            actual: tag.len(),
        })?;
        let sqn = frame.header.sqn;

        let plaintext = match frame.msg_type.exchange() {
            Exchange::LoginRequest => {
                let rsa_key = key_override
                    .or(self.handshake_key.as_ref())
                    .ok_or(MtpError::MissingKey(KeySlot::Handshake))?;
                let bootstrap = unwrap_bootstrap_key(rsa_key, trailer).inspect_err(|e| {
                    warn!(sqn, error = %e, "rejecting login request: wrapped key");
                })?;

                let plaintext = decrypt_body(bootstrap.as_bytes(), frame, body, tag)?;
                self.sequence.accept(sqn)?;
                self.handshake.request_received(bootstrap);
                plaintext
            }
            Exchange::LoginResponse => {
                let key = self
                    .handshake
                    .response_receive_key()
                    .ok_or(MtpError::MissingKey(KeySlot::Bootstrap))?;

                let plaintext = decrypt_body(key.as_bytes(), frame, body, tag)?;
                self.sequence.accept(sqn)?;
                self.handshake.response_received();
                plaintext
            }
            Exchange::Session => {
                let key = self
                    .session_key
                    .as_ref()
                    .ok_or(MtpError::MissingKey(KeySlot::Session))?;

                let plaintext = decrypt_body(key.as_bytes(), frame, body, tag)?;
                self.sequence.accept(sqn)?;
                plaintext
            }
        };

        trace!(typ = ?frame.msg_type, len = frame.header.len, sqn, "message received");
        Ok(plaintext)
    }
}

/// `header || ciphertext || tag` for one message.
fn build_frame(
    key: &[u8; SYMMETRIC_KEY_SIZE],
    msg_type: MessageType,
    sqn: u16,
    payload: &[u8],
) -> MtpResult<Vec<u8>> {
    let total = MESSAGE_OVERHEAD + payload.len() + msg_type.exchange().trailer_size();
    let len = u16::try_from(total).map_err(|_| FrameError::PayloadTooLarge {
        size: payload.len(),
        max: MAX_MESSAGE_SIZE - (total - payload.len()),
    })?;

    let mut rand = [0u8; HEADER_RAND_SIZE];
    OsRng.fill_bytes(&mut rand);

    let header = MessageHeader::new(msg_type, len, sqn, rand).to_bytes();
    let (ciphertext, tag) =
        aead::encrypt(key, &header, payload).map_err(|e| MtpError::crypto("message body", e))?;

    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(&header);
    frame.extend_from_slice(&ciphertext);
    frame.extend_from_slice(&tag);

    trace!(typ = ?msg_type, len, sqn, "message sealed");
    Ok(frame)
}

fn decrypt_body(
    key: &[u8; SYMMETRIC_KEY_SIZE],
    frame: &IncomingFrame,
    body: &[u8],
    tag: &[u8; TAG_SIZE],
) -> MtpResult<Vec<u8>> {
    aead::decrypt(key, &frame.raw, body, tag).map_err(|e| {
        warn!(
            typ = ?frame.msg_type,
            sqn = frame.header.sqn,
            "rejecting message: authentication failed"
        );
        MtpError::crypto("message body", e)
    })
}

fn check_len(expected: usize, actual: usize) -> Result<(), FrameError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FrameError::BodyLengthMismatch { expected, actual })
    }
}
