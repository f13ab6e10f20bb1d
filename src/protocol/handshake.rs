//! Client side of the WebSocket opening handshake (RFC 6455 Section 4).

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use sha1::{Digest, Sha1};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::{Request, Response, Verb};

/// The WebSocket GUID used in the Sec-WebSocket-Accept calculation (RFC 6455).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// The only protocol version this client speaks.
pub const WS_VERSION: &str = "13";

/// Generate a `Sec-WebSocket-Key`: 16 random bytes, base64 encoded.
///
/// The result is always 24 characters long.
///
/// # Errors
///
/// Returns [`Error::Io`] if the random source is unavailable.
pub fn generate_nonce() -> Result<String> {
    let mut nonce = [0u8; 16];
    getrandom::getrandom(&mut nonce).map_err(|e| Error::Io(e.to_string()))?;
    Ok(BASE64.encode(nonce))
}

/// Computes the Sec-WebSocket-Accept value from the client's Sec-WebSocket-Key.
///
/// The accept key is calculated as: Base64(SHA-1(key + GUID))
///
/// # Example
///
/// ```
/// use netkit::protocol::handshake::compute_accept_key;
///
/// let key = "dGhlIHNhbXBsZSBub25jZQ==";
/// let accept = compute_accept_key(key);
/// assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
/// ```
#[must_use]
pub fn compute_accept_key(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    BASE64.encode(hash)
}

/// Build the upgrade request for `resource` on `endpoint`.
#[must_use]
pub fn upgrade_request(endpoint: &Endpoint, resource: &str, nonce: &str) -> Request {
    let host = match endpoint.port() {
        80 | 443 => endpoint.host(),
        _ => endpoint.to_string(),
    };

    Request::new(Verb::Get, resource)
        .with_header("Host", host)
        .with_header("Upgrade", "websocket")
        .with_header("Connection", "Upgrade")
        .with_header("Sec-WebSocket-Key", nonce)
        .with_header("Sec-WebSocket-Version", WS_VERSION)
}

/// Check the server's answer to an upgrade request sent with `nonce`.
///
/// # Errors
///
/// - `Error::Refused` if the status is not 101
/// - `Error::InvalidHandshake` if `Upgrade` is not `websocket`, `Connection`
///   does not contain `upgrade`, or `Sec-WebSocket-Accept` is present but
///   does not match `nonce`
pub fn validate_upgrade_response(response: &Response, nonce: &str) -> Result<()> {
    if response.status() != 101 {
        return Err(Error::Refused {
            status: response.status(),
        });
    }

    let header = response.header();

    let upgrade = header
        .get("Upgrade")
        .ok_or_else(|| Error::InvalidHandshake("Missing Upgrade header in response".into()))?;
    if !upgrade.eq_ignore_ascii_case("websocket") {
        return Err(Error::InvalidHandshake(format!(
            "Invalid Upgrade header: {upgrade}"
        )));
    }

    let connection = header.get("Connection").ok_or_else(|| {
        Error::InvalidHandshake("Missing Connection header in response".into())
    })?;
    if !connection.to_ascii_lowercase().contains("upgrade") {
        return Err(Error::InvalidHandshake(format!(
            "Invalid Connection header: {connection}"
        )));
    }

    if let Some(accept) = header.get("Sec-WebSocket-Accept") {
        let expected = compute_accept_key(nonce);
        if accept != expected {
            return Err(Error::InvalidHandshake(format!(
                "Sec-WebSocket-Accept mismatch: expected {expected}, got {accept}"
            )));
        }
    }

    Ok(())
}
