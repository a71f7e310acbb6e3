//! Blocking session over any `Read + Write` stream.

use std::io::{Read, Write};

use tracing::trace;

use crate::core::{MtpError, MtpResult, HEADER_SIZE, TAG_SIZE};
use crate::crypto::{HandshakeKey, SessionKey};
use crate::transport::StreamIo;
use crate::wire::MessageType;

use super::{MtpConfig, MtpState};

/// One end of an MTP connection.
///
/// ```no_run
/// use std::net::TcpStream;
/// use sift_mtp::{HandshakeKey, MessageType, MtpSession};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let server_key = HandshakeKey::load_public_pem_file("server_pubkey.pem")?;
/// let stream = TcpStream::connect("127.0.0.1:5150")?;
/// let mut session = MtpSession::client(stream, server_key);
///
/// session.send_msg(MessageType::LoginRequest, b"login request")?;
/// let (msg_type, payload) = session.receive_msg()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct MtpSession<S> {
    io: StreamIo<S>,
    state: MtpState,
}

impl<S> MtpSession<S> {
    /// Wrap a connected stream with the default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, MtpConfig::default())
    }

    /// Wrap a connected stream.
    pub fn with_config(stream: S, config: MtpConfig) -> Self {
        Self {
            io: StreamIo::new(stream),
            state: MtpState::new(config),
        }
    }

    /// Client side: login requests are wrapped under `server_public`.
    pub fn client(stream: S, server_public: HandshakeKey) -> Self {
        let mut session = Self::new(stream);
        session.set_handshake_key(server_public);
        session
    }

    /// Server side: login requests are unwrapped with `server_private`.
    pub fn server(stream: S, server_private: HandshakeKey) -> Self {
        let mut session = Self::new(stream);
        session.set_handshake_key(server_private);
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

impl<S: Read + Write> MtpSession<S> {
    /// Encrypt and send one message.
    pub fn send_msg(&mut self, msg_type: MessageType, payload: &[u8]) -> MtpResult<()> {
        self.send(msg_type, payload, None)
    }

    /// Send one message, wrapping a login request under `key` instead of the
    /// configured key. For other types `key` is ignored.
    pub fn send_msg_with_key(
        &mut self,
        msg_type: MessageType,
        payload: &[u8],
        key: &HandshakeKey,
    ) -> MtpResult<()> {
        self.send(msg_type, payload, Some(key))
    }

    /// Receive, verify and decrypt one message.
    pub fn receive_msg(&mut self) -> MtpResult<(MessageType, Vec<u8>)> {
        self.receive(None)
    }

    /// Receive one message, unwrapping a login request with `key` instead of
    /// the configured key. For other types `key` is ignored.
    pub fn receive_msg_with_key(
        &mut self,
        key: &HandshakeKey,
    ) -> MtpResult<(MessageType, Vec<u8>)> {
        self.receive(Some(key))
    }

    fn send(
        &mut self,
        msg_type: MessageType,
        payload: &[u8],
        key: Option<&HandshakeKey>,
    ) -> MtpResult<()> {
        let frame = self.state.seal(msg_type, payload, key)?;
        self.io
            .write_all(&frame)
            .map_err(|e| MtpError::transport("unable to send message to peer", e))?;
        trace!(typ = ?msg_type, len = frame.len(), "message sent");
        Ok(())
    }

    fn receive(&mut self, key: Option<&HandshakeKey>) -> MtpResult<(MessageType, Vec<u8>)> {
        let header = self
            .io
            .read_exact(HEADER_SIZE)
            .map_err(|e| MtpError::transport("unable to receive message header", e))?;
        let frame = self
            .state
            .open_header(&header)
            .map_err(MtpError::header_rejected)?;

        let body = self
            .io
            .read_exact(frame.body_len())
            .map_err(|e| MtpError::transport("unable to receive message body", e))?;
        let tag = self
            .io
            .read_exact(TAG_SIZE)
            .map_err(|e| MtpError::transport("unable to receive message tag", e))?;
        let trailer = self
            .io
            .read_exact(frame.trailer_len())
            .map_err(|e| MtpError::transport("unable to receive wrapped key", e))?;

        let payload = self.state.open(&frame, &body, &tag, &trailer, key)?;
        Ok((frame.msg_type(), payload))
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    use super::*;
    use crate::core::{ErrorKind, FrameError, ProtocolError, LOGIN_RANDOM_SIZE};
    use crate::crypto::fixtures::*;
    use crate::crypto::{derive_session_key, request_hash, HandshakeState};
    use crate::transport::testing::{init_tracing, ChunkedReader, MemoryPipe};

    fn key() -> SessionKey {
        SessionKey::from_bytes([0x5A; 32])
    }

    fn keyed_pair() -> (MtpSession<MemoryPipe>, MtpSession<MemoryPipe>) {
        let mut alice = MtpSession::new(MemoryPipe::new());
        let mut bob = MtpSession::new(MemoryPipe::new());
        alice.set_session_key(key());
        bob.set_session_key(key());
        (alice, bob)
    }

    /// Cause of a header rejection reported by `receive_msg`.
    fn rejection(err: MtpError) -> MtpError {
        match err {
            MtpError::HeaderRejected(cause) => *cause,
            other => panic!("expected a rejected header, got {other}"),
        }
    }

    /// Move everything `from` wrote into `to`'s read queue.
    fn deliver(from: &mut MtpSession<MemoryPipe>, to: &mut MtpSession<MemoryPipe>) -> Vec<u8> {
        let bytes = from.get_mut().take_outgoing();
        to.get_mut().push_incoming(&bytes);
        bytes
    }

    #[test]
    fn test_roundtrip_every_session_type() {
        let (mut alice, mut bob) = keyed_pair();

        for msg_type in MessageType::ALL {
            if msg_type.exchange() != crate::wire::Exchange::Session {
                continue;
            }
            let payload = format!("payload for {msg_type:?}").into_bytes();
            alice.send_msg(msg_type, &payload).unwrap();

            let bytes = deliver(&mut alice, &mut bob);
            assert_eq!(bytes.len(), HEADER_SIZE + payload.len() + TAG_SIZE);
            assert_eq!(u16::from_be_bytes([bytes[4], bytes[5]]) as usize, bytes.len());

            let (received_type, received) = bob.receive_msg().unwrap();
            assert_eq!(received_type, msg_type);
            assert_eq!(received, payload);
        }
        assert_eq!(bob.state().sequence().last_received(), 8);
    }

    #[test]
    fn test_empty_payload() {
        let (mut alice, mut bob) = keyed_pair();
        alice.send_msg(MessageType::UploadResponse, b"").unwrap();
        deliver(&mut alice, &mut bob);
        let (_, payload) = bob.receive_msg().unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_tampered_header_fields_fail_authentication() {
        // rand, rsv and the high bit of sqn: none of these are checked before
        // decryption, so only the tag can catch them.
        for (byte, mask) in [(8, 0x01), (13, 0x80), (14, 0x01), (15, 0x40), (6, 0x80)] {
            let (mut alice, mut bob) = keyed_pair();
            alice.send_msg(MessageType::CommandRequest, b"ls -la").unwrap();

            let mut bytes = alice.get_mut().take_outgoing();
            bytes[byte] ^= mask;
            bob.get_mut().push_incoming(&bytes);

            let err = bob.receive_msg().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication, "byte {byte}");
            assert!(err.is_security_error());
        }
    }

    #[test]
    fn test_tampered_body_and_tag_fail_authentication() {
        for offset in [HEADER_SIZE, HEADER_SIZE + 3, HEADER_SIZE + 6 + TAG_SIZE - 1] {
            let (mut alice, mut bob) = keyed_pair();
            alice.send_msg(MessageType::CommandResponse, b"result").unwrap();

            let mut bytes = alice.get_mut().take_outgoing();
            bytes[offset] ^= 0xFF;
            bob.get_mut().push_incoming(&bytes);

            let err = bob.receive_msg().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Authentication);
            assert_eq!(bob.state().sequence().last_received(), 0);
        }
    }

    #[test]
    fn test_wrong_session_key() {
        let (mut alice, mut bob) = keyed_pair();
        bob.set_session_key(SessionKey::from_bytes([0x5B; 32]));

        alice.send_msg(MessageType::CommandRequest, b"pwd").unwrap();
        deliver(&mut alice, &mut bob);
        assert_eq!(bob.receive_msg().unwrap_err().kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_replayed_frame_passes_by_default() {
        // Equal sequence numbers are accepted, so a verbatim replay gets
        // through; only the strict policy stops it.
        let (mut alice, mut bob) = keyed_pair();
        alice.send_msg(MessageType::CommandRequest, b"rm file").unwrap();
        let bytes = alice.get_mut().take_outgoing();

        bob.get_mut().push_incoming(&bytes);
        bob.get_mut().push_incoming(&bytes);
        assert!(bob.receive_msg().is_ok());
        assert!(bob.receive_msg().is_ok());

        let config = MtpConfig::builder()
            .replay_policy(crate::crypto::ReplayPolicy::StrictIncrease)
            .build();
        let mut strict = MtpSession::with_config(MemoryPipe::new(), config);
        strict.set_session_key(key());
        strict.get_mut().push_incoming(&bytes);
        strict.get_mut().push_incoming(&bytes);
        assert!(strict.receive_msg().is_ok());
        let err = strict.receive_msg().unwrap_err();
        assert!(matches!(
            rejection(err),
            MtpError::Protocol(ProtocolError::BadSequence { .. })
        ));
    }

    #[test]
    fn test_unknown_type_rejected_without_session_key() {
        let (mut alice, _) = keyed_pair();
        alice.send_msg(MessageType::CommandRequest, b"ls").unwrap();
        let mut bytes = alice.get_mut().take_outgoing();
        bytes[2..4].copy_from_slice(&0x0420u16.to_be_bytes());

        let mut bob = MtpSession::new(MemoryPipe::new());
        bob.get_mut().push_incoming(&bytes);
        let err = bob.receive_msg().unwrap_err();
        assert!(matches!(
            rejection(err),
            MtpError::Protocol(ProtocolError::UnknownMessageType(0x0420))
        ));
    }

    #[test]
    fn test_rejected_header_is_fatal() {
        // A bad header followed by a valid message: the body of the first is
        // still in the stream, so the session must report itself unusable.
        let (mut alice, mut bob) = keyed_pair();
        alice.send_msg(MessageType::CommandRequest, b"first").unwrap();
        let mut bad = alice.get_mut().take_outgoing();
        bad[0] = 9;
        alice.send_msg(MessageType::CommandRequest, b"second").unwrap();
        let good = alice.get_mut().take_outgoing();

        bob.get_mut().push_incoming(&bad);
        bob.get_mut().push_incoming(&good);

        let err = bob.receive_msg().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.kind(), ErrorKind::Protocol);
        assert!(matches!(
            rejection(err),
            MtpError::Protocol(ProtocolError::UnsupportedVersion { major: 9, minor: 0 })
        ));
    }

    #[test]
    fn test_failed_authentication_is_not_fatal() {
        // The whole message was consumed, so the next one still parses.
        let (mut alice, mut bob) = keyed_pair();
        alice.send_msg(MessageType::CommandRequest, b"first").unwrap();
        let mut forged = alice.get_mut().take_outgoing();
        forged[HEADER_SIZE] ^= 0x01;
        alice.send_msg(MessageType::CommandRequest, b"second").unwrap();
        let good = alice.get_mut().take_outgoing();

        bob.get_mut().push_incoming(&forged);
        bob.get_mut().push_incoming(&good);

        let err = bob.receive_msg().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert!(!err.is_fatal());
        assert_eq!(bob.receive_msg().unwrap().1, b"second");
    }

    #[test]
    fn test_header_split_across_reads() {
        let (mut alice, _) = keyed_pair();
        alice.send_msg(MessageType::DownloadResponse0, b"file contents").unwrap();
        let bytes = alice.get_mut().take_outgoing();

        let mut bob = MtpSession::new(ChunkedReader::new(bytes, vec![1, 5, 10, 4, 4]));
        bob.set_session_key(key());
        let (msg_type, payload) = bob.receive_msg().unwrap();
        assert_eq!(msg_type, MessageType::DownloadResponse0);
        assert_eq!(payload, b"file contents");
    }

    #[test]
    fn test_peer_closed_mid_header() {
        let mut bob = MtpSession::new(ChunkedReader::new(vec![1, 0, 1], vec![]));
        bob.set_session_key(key());

        let err = bob.receive_msg().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().starts_with("unable to receive message header -->"));
    }

    #[test]
    fn test_peer_closed_mid_body() {
        let (mut alice, _) = keyed_pair();
        alice.send_msg(MessageType::CommandRequest, b"0123456789").unwrap();
        let mut bytes = alice.get_mut().take_outgoing();
        bytes.truncate(HEADER_SIZE + 4);

        let mut bob = MtpSession::new(MemoryPipe::new());
        bob.set_session_key(key());
        bob.get_mut().push_incoming(&bytes);
        let err = bob.receive_msg().unwrap_err();
        assert!(matches!(
            err,
            MtpError::Transport { context: "unable to receive message body", .. }
        ));
    }

    #[test]
    fn test_write_failure() {
        let (mut alice, _) = keyed_pair();
        alice.get_mut().fail_writes = true;

        let err = alice.send_msg(MessageType::CommandRequest, b"ls").unwrap_err();
        match err {
            MtpError::Transport { context, source } => {
                assert_eq!(context, "unable to send message to peer");
                assert_eq!(source.kind(), io::ErrorKind::BrokenPipe);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_session_key_sends_nothing() {
        let mut alice = MtpSession::new(MemoryPipe::new());
        let err = alice.send_msg(MessageType::CommandRequest, b"ls").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingKey);
        assert!(alice.get_ref().outgoing.is_empty());
    }

    #[test]
    fn test_payload_too_large_sends_nothing() {
        let (mut alice, _) = keyed_pair();
        let err = alice
            .send_msg(MessageType::UploadRequest0, &vec![0u8; 70_000])
            .unwrap_err();
        assert!(matches!(err, MtpError::Framing(FrameError::PayloadTooLarge { .. })));
        assert!(alice.get_ref().outgoing.is_empty());
        assert_eq!(alice.state().sequence().last_sent(), 0);
    }

    #[test]
    fn test_clear_session_key() {
        let (mut alice, _) = keyed_pair();
        alice.clear_session_key();
        assert!(!alice.state().has_session_key());
        assert_eq!(
            alice.send_msg(MessageType::CommandRequest, b"ls").unwrap_err().kind(),
            ErrorKind::MissingKey
        );
    }

    #[test]
    fn test_login_exchange_in_memory() {
        init_tracing();
        let mut client = MtpSession::client(MemoryPipe::new(), server_public());
        let mut server = MtpSession::server(MemoryPipe::new(), server_private());

        client.send_msg(MessageType::LoginRequest, b"alice\npassword").unwrap();
        let request = deliver(&mut client, &mut server);
        assert_eq!(request.len(), HEADER_SIZE + 14 + TAG_SIZE + 256);

        let (msg_type, payload) = server.receive_msg().unwrap();
        assert_eq!(msg_type, MessageType::LoginRequest);
        assert_eq!(payload, b"alice\npassword");

        server.send_msg(MessageType::LoginResponse, b"ok").unwrap();
        deliver(&mut server, &mut client);
        let (msg_type, payload) = client.receive_msg().unwrap();
        assert_eq!(msg_type, MessageType::LoginResponse);
        assert_eq!(payload, b"ok");

        match (client.state().handshake(), server.state().handshake()) {
            (
                HandshakeState::Completed { key: client_key, .. },
                HandshakeState::Completed { key: server_key, .. },
            ) => assert_eq!(client_key.as_bytes(), server_key.as_bytes()),
            other => panic!("login exchange incomplete: {other:?}"),
        }
    }

    #[test]
    fn test_login_with_key_override() {
        let mut client = MtpSession::new(MemoryPipe::new());
        let mut server = MtpSession::new(MemoryPipe::new());

        client
            .send_msg_with_key(MessageType::LoginRequest, b"login", &server_public())
            .unwrap();
        deliver(&mut client, &mut server);

        let (_, payload) = server.receive_msg_with_key(&server_private()).unwrap();
        assert_eq!(payload, b"login");
    }

    /// Full client/server run over TCP: login exchange, key derivation, then
    /// a command round trip under the derived key.
    #[test]
    fn test_tcp_login_then_command() {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut session = MtpSession::server(stream, server_private());

            let (msg_type, request) = session.receive_msg().unwrap();
            assert_eq!(msg_type, MessageType::LoginRequest);
            let client_random: [u8; LOGIN_RANDOM_SIZE] =
                request[request.len() - LOGIN_RANDOM_SIZE..].try_into().unwrap();

            let server_random = [0xB0; LOGIN_RANDOM_SIZE];
            let mut response = request_hash(&request).to_vec();
            response.extend_from_slice(&server_random);
            session.send_msg(MessageType::LoginResponse, &response).unwrap();

            let key = derive_session_key(&client_random, &server_random, &request).unwrap();
            session.set_session_key(key);

            let (msg_type, command) = session.receive_msg().unwrap();
            assert_eq!(msg_type, MessageType::CommandRequest);
            assert_eq!(command, b"pwd");
            session.send_msg(MessageType::CommandResponse, b"/home/alice").unwrap();
        });

        let stream = TcpStream::connect(addr).unwrap();
        let mut session = MtpSession::client(stream, server_public());

        let client_random = [0xC1; LOGIN_RANDOM_SIZE];
        let mut request = b"alice\npassword\n".to_vec();
        request.extend_from_slice(&client_random);
        session.send_msg(MessageType::LoginRequest, &request).unwrap();

        let (msg_type, response) = session.receive_msg().unwrap();
        assert_eq!(msg_type, MessageType::LoginResponse);
        assert_eq!(response[..32], request_hash(&request));
        let server_random: [u8; LOGIN_RANDOM_SIZE] = response[32..].try_into().unwrap();

        let key = derive_session_key(&client_random, &server_random, &request).unwrap();
        session.set_session_key(key);
        assert!(!session.state().handshake().is_complete());

        session.send_msg(MessageType::CommandRequest, b"pwd").unwrap();
        let (msg_type, result) = session.receive_msg().unwrap();
        assert_eq!(msg_type, MessageType::CommandResponse);
        assert_eq!(result, b"/home/alice");

        server.join().unwrap();
    }
}
