//! Minimal HTTP/1.1 client.
//!
//! Used directly for plain request/response exchanges and by the WebSocket
//! session to perform the upgrade handshake.

mod client;
mod header;
mod request;
mod response;
mod types;

pub use client::HttpClient;
pub use header::Header;
pub use request::Request;
pub use response::Response;
pub use types::{Verb, Version};
