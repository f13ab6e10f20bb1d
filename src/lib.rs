//! # netkit - Synchronous WebSocket and HTTP/1.1 client toolkit
//!
//! `netkit` is an RFC 6455 WebSocket client built on a small set of
//! blocking-free networking primitives.
//!
//! ## Features
//!
//! - **Plain and TLS transports** behind one [`Transport`] trait
//! - **Buffered reads** that never drop bytes on short reads
//! - **HTTP/1.1 client** with chunked and content-length bodies
//! - **WebSocket sessions** with fragment reassembly and the close handshake
//! - **Resource limits** for frames, messages and response heads
//!
//! ## Concurrency
//!
//! Everything is single-threaded and synchronous. `poll` and `read_message`
//! never block; `read_all` and `wait_message` spin, yielding the thread
//! between attempts. A session is owned by exactly one caller.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use netkit::{Endpoint, Message, WsClient};
//!
//! # fn main() -> netkit::Result<()> {
//! let endpoint = Endpoint::resolve("localhost", 9001)?;
//! let mut ws = WsClient::connect(&endpoint, "/")?;
//! ws.send_message(&Message::text("hi"))?;
//! let reply = ws.wait_message()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod message;
pub mod protocol;
pub mod socket;

pub use config::{Config, Limits};
pub use connection::{ConnectionState, WebSocket, WsClient};
pub use endpoint::Endpoint;
pub use error::{Error, Result};
pub use http::{Header, HttpClient, Request, Response, Verb, Version};
pub use message::{CloseCode, Message};
pub use protocol::{OpCode, WS_GUID, compute_accept_key};
pub use socket::{BufferedSocket, TcpSocket, Transport};

#[cfg(feature = "tls-rustls")]
pub use connection::WssClient;
#[cfg(feature = "tls-rustls")]
pub use socket::{TlsContext, TlsSocket};
