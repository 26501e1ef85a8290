//! Transport adapters: thin codecs around the dispatcher.

pub mod framing;
#[cfg(feature = "http")]
pub mod http;
pub mod stdio;

#[cfg(feature = "http")]
pub use http::{HttpConfig, HttpTransport};
pub use stdio::StdioTransport;
