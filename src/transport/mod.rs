//! SiFT MTP - Byte-stream transport
//!
//! The only blocking (or suspending) operations in the crate live here:
//!
//! - [`StreamIo`]: exact-length reads and full writes over `std::io`
//! - [`AsyncStreamIo`]: the same over tokio (requires the `async` feature)
//!
//! Both tolerate short reads, since a peer may deliver one message across
//! several socket reads. Timeouts are a socket-level concern of the caller.

mod stream;

#[cfg(feature = "async")]
mod async_stream;

#[cfg(test)]
pub(crate) mod testing;

pub use stream::StreamIo;

#[cfg(feature = "async")]
pub use async_stream::AsyncStreamIo;
