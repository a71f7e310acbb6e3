//! Async session over tokio streams.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::trace;

use crate::core::{MtpError, MtpResult, HEADER_SIZE, TAG_SIZE};
use crate::crypto::{HandshakeKey, SessionKey};
use crate::transport::AsyncStreamIo;
use crate::wire::MessageType;

use super::{MtpConfig, MtpState};

/// Async counterpart of [`MtpSession`](super::MtpSession).
///
/// Sequencing and key handling are shared with the blocking session through
/// [`MtpState`]; only the reads and writes await.
#[derive(Debug)]
pub struct AsyncMtpSession<S> {
    io: AsyncStreamIo<S>,
    state: MtpState,
}

impl<S> AsyncMtpSession<S> {
    /// Wrap a connected stream with the default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, MtpConfig::default())
    }

    /// Wrap a connected stream.
    pub fn with_config(stream: S, config: MtpConfig) -> Self {
        Self {
            io: AsyncStreamIo::new(stream),
            state: MtpState::new(config),
        }
    }

    /// Client side: login requests are wrapped under `server_public`.
    pub fn client(stream: S, server_public: HandshakeKey) -> Self {
        let mut session = Self::new(stream);
        session.state.set_handshake_key(server_public);
        session
    }

    /// Server side: login requests are unwrapped with `server_private`.
    pub fn server(stream: S, server_private: HandshakeKey) -> Self {
        let mut session = Self::new(stream);
        session.state.set_handshake_key(server_private);
        session
    }

    /// Set the RSA key used for login requests.
    pub fn set_handshake_key(&mut self, key: HandshakeKey) {
        self.state.set_handshake_key(key);
    }

    /// Install the session key; the login bootstrap key is discarded.
    pub fn set_session_key(&mut self, key: SessionKey) {
        self.state.set_session_key(key);
    }

    /// Remove the session key.
    pub fn clear_session_key(&mut self) {
        self.state.clear_session_key();
    }

    /// Protocol state.
    pub fn state(&self) -> &MtpState {
        &self.state
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        self.io.get_ref()
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.io.get_mut()
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.io.into_inner()
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncMtpSession<S> {
    /// Encrypt and send one message.
    pub async fn send_msg(&mut self, msg_type: MessageType, payload: &[u8]) -> MtpResult<()> {
        self.send(msg_type, payload, None).await
    }

    /// Send one message, wrapping a login request under `key`.
    pub async fn send_msg_with_key(
        &mut self,
        msg_type: MessageType,
        payload: &[u8],
        key: &HandshakeKey,
    ) -> MtpResult<()> {
        self.send(msg_type, payload, Some(key)).await
    }

    /// Receive, verify and decrypt one message.
    pub async fn receive_msg(&mut self) -> MtpResult<(MessageType, Vec<u8>)> {
        self.receive(None).await
    }

    /// Receive one message, unwrapping a login request with `key`.
    pub async fn receive_msg_with_key(
        &mut self,
        key: &HandshakeKey,
    ) -> MtpResult<(MessageType, Vec<u8>)> {
        self.receive(Some(key)).await
    }

    async fn send(
        &mut self,
        msg_type: MessageType,
        payload: &[u8],
        key: Option<&HandshakeKey>,
    ) -> MtpResult<()> {
        let frame = self.state.seal(msg_type, payload, key)?;
        self.io
            .write_all(&frame)
            .await
            .map_err(|e| MtpError::transport("unable to send message to peer", e))?;
        trace!(typ = ?msg_type, len = frame.len(), "message sent");
        Ok(())
    }

    async fn receive(&mut self, key: Option<&HandshakeKey>) -> MtpResult<(MessageType, Vec<u8>)> {
        let header = self
            .io
            .read_exact(HEADER_SIZE)
            .await
            .map_err(|e| MtpError::transport("unable to receive message header", e))?;
        let frame = self
            .state
            .open_header(&header)
            .map_err(MtpError::header_rejected)?;

        let body = self
            .io
            .read_exact(frame.body_len())
            .await
            .map_err(|e| MtpError::transport("unable to receive message body", e))?;
        let tag = self
            .io
            .read_exact(TAG_SIZE)
            .await
            .map_err(|e| MtpError::transport("unable to receive message tag", e))?;
        let trailer = self
            .io
            .read_exact(frame.trailer_len())
            .await
            .map_err(|e| MtpError::transport("unable to receive wrapped key", e))?;

        let payload = self.state.open(&frame, &body, &tag, &trailer, key)?;
        Ok((frame.msg_type(), payload))
    }
}
