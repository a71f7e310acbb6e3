//! In-memory streams for tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// Reader that hands out its data in fixed fragment sizes.
///
/// Once the listed fragment sizes are used up, the rest is delivered in one
/// read, then EOF.
pub struct ChunkedReader {
    data: VecDeque<u8>,
    chunks: VecDeque<usize>,
    reads: usize,
    interrupt_next: bool,
    fail_after: Option<usize>,
}

impl ChunkedReader {
    pub fn new(data: Vec<u8>, chunks: Vec<usize>) -> Self {
        Self {
            data: data.into(),
            chunks: chunks.into(),
            reads: 0,
            interrupt_next: false,
            fail_after: None,
        }
    }

    /// Return `Interrupted` from the first read.
    pub fn interrupt_first(mut self) -> Self {
        self.interrupt_next = true;
        self
    }

    /// Return `ConnectionReset` after `n` successful reads.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Number of non-empty reads served.
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.interrupt_next {
            self.interrupt_next = false;
            return Err(io::Error::from(io::ErrorKind::Interrupted));
        }
        if self.fail_after == Some(self.reads) {
            return Err(io::Error::from(io::ErrorKind::ConnectionReset));
        }
        let limit = self.chunks.pop_front().unwrap_or(self.data.len());
        let n = limit.min(buf.len()).min(self.data.len());
        for (slot, byte) in buf.iter_mut().zip(self.data.drain(..n)) {
            *slot = byte;
        }
        if n > 0 {
            self.reads += 1;
        }
        Ok(n)
    }
}

// Writes are discarded so the reader can stand in for a full peer stream.
impl Write for ChunkedReader {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One end of an in-memory connection.
///
/// Bytes written land in `outgoing`; reads drain `incoming` and report EOF
/// once it is empty.
#[derive(Default)]
pub struct MemoryPipe {
    pub incoming: VecDeque<u8>,
    pub outgoing: Vec<u8>,
    pub fail_writes: bool,
}

impl MemoryPipe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything written so far.
    pub fn take_outgoing(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outgoing)
    }

    /// Queue bytes for the next reads.
    pub fn push_incoming(&mut self, bytes: &[u8]) {
        self.incoming.extend(bytes);
    }
}

impl Read for MemoryPipe {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.incoming.len());
        for (slot, byte) in buf.iter_mut().zip(self.incoming.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MemoryPipe {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }
        self.outgoing.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
