//! Async byte-stream reader/writer over tokio.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::stream::peer_closed;

/// Async wrapper around a connected peer stream.
///
/// Same contract as [`StreamIo`](super::StreamIo); the read and write
/// futures are the only suspension points.
#[derive(Debug)]
pub struct AsyncStreamIo<S> {
    stream: S,
}

impl<S> AsyncStreamIo<S> {
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

impl<S: AsyncRead + Unpin> AsyncStreamIo<S> {
    /// Read exactly `n` bytes, accumulating partial reads.
    pub async fn read_exact(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        while filled < n {
            match self.stream.read(&mut buf[filled..]).await {
                Ok(0) => return Err(peer_closed(filled, n)),
                Ok(read) => filled += read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncStreamIo<S> {
    /// Write the whole buffer and flush.
    pub async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await
    }
}
