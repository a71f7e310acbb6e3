//! Blocking byte-stream reader/writer.
//!
//! Wraps any `Read + Write` peer stream (typically a `TcpStream`) and
//! provides the two blocking primitives MTP needs: an exact-length read that
//! accumulates short reads, and a full-buffer write.

use std::io::{self, Read, Write};

/// Blocking wrapper around a connected peer stream.
#[derive(Debug)]
pub struct StreamIo<S> {
    /// The underlying stream.
    stream: S,
}

impl<S> StreamIo<S> {
    /// Wrap a connected stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    /// Get a reference to the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Get a mutable reference to the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Unwrap the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read> StreamIo<S> {
    /// Read exactly `n` bytes.
    ///
    /// Blocks until `n` bytes have arrived, accumulating partial reads. A
    /// zero-length read means the peer closed the connection and fails with
    /// `UnexpectedEof`.
    pub fn read_exact(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.stream.read(&mut buf[filled..]) {
                Ok(0) => return Err(peer_closed(filled, n)),
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(buf)
    }
}

impl<S: Write> StreamIo<S> {
    /// Write the whole buffer and flush.
    pub fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)?;
        self.stream.flush()
    }
}

/// Error for a peer that closed the stream mid-read.
pub(crate) fn peer_closed(received: usize, expected: usize) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("connection with peer is broken after {received} of {expected} bytes"),
    )
}
