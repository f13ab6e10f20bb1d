//! Test harness utilities for loopback WebSocket and HTTP testing.
//!
//! Peers run on plain `std::net` threads and speak the server side of the
//! protocol by hand, so the client under test talks to real sockets.

#![allow(dead_code)]

mod server;

pub use server::{
    TestServer, accept_upgrade, echo_until_close, read_frame, read_request, refuse_upgrade,
    write_close, write_frame,
};

/// Route `log` output through `env_logger`; repeated calls are harmless.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
