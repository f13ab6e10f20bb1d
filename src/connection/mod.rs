//! WebSocket session management and state machine.
//!
//! ## Session Lifecycle
//!
//! 1. **Open** - Initial state after a successful upgrade
//! 2. **Closing** - Close frame sent, waiting for the peer's Close
//! 3. **Closed** - Transport released
//!
//! ## Example
//!
//! ```rust,no_run
//! use netkit::{CloseCode, Endpoint, Message, WsClient};
//!
//! # fn main() -> netkit::Result<()> {
//! let endpoint = Endpoint::resolve_str("localhost:9001")?;
//! let mut ws = WsClient::connect(&endpoint, "/chat")?;
//!
//! ws.send_message(&Message::text("Hello"))?;
//! let reply = ws.wait_message()?;
//! println!("received: {:?}", reply.as_text());
//! ws.disconnect_with(CloseCode::Normal)?;
//! # Ok(())
//! # }
//! ```

mod state;
mod websocket;

pub use state::ConnectionState;
pub use websocket::{WebSocket, WsClient};

#[cfg(feature = "tls-rustls")]
pub use websocket::WssClient;
