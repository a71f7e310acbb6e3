//! SiFT MTP - Core constants and error types.
//!
//! This module has no I/O or crypto logic and defines the vocabulary shared
//! by every other layer.

mod constants;
mod error;

pub use constants::*;
pub use error::*;
