//! TCP transport module.
//!
//! Provides a TCP client that speaks the 2-byte request / 17-byte record protocol.

pub mod client;
pub mod framing;

pub use client::{TcpClient, TcpClientConfig, TcpTransport};
pub use framing::RecordFrameCodec;
