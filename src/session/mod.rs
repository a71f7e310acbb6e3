//! SiFT MTP - Session layer
//!
//! [`MtpState`] holds the per-connection protocol state and does all the
//! framing and cryptography without touching a stream. Two drivers sit on
//! top of it:
//!
//! - [`MtpSession`]: blocking, over any `Read + Write`
//! - [`AsyncMtpSession`]: tokio, over any `AsyncRead + AsyncWrite` (feature `async`)
//!
//! A session carries one message at a time in each direction; callers that
//! share it across threads must serialize access themselves.

mod blocking;
mod config;
#[cfg(feature = "async")]
mod nonblocking;
mod state;

pub use blocking::MtpSession;
pub use config::{MtpConfig, MtpConfigBuilder};
#[cfg(feature = "async")]
#[cfg_attr(docsrs, doc(cfg(feature = "async")))]
pub use nonblocking::AsyncMtpSession;
pub use state::{IncomingFrame, MtpState};
