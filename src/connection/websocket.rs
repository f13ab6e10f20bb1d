use std::thread;

use log::{debug, trace, warn};

use crate::config::Config;
use crate::connection::ConnectionState;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::HttpClient;
use crate::message::{CloseCode, Message};
use crate::protocol::frame::{
    FIN_BIT, LENGTH_BITS, MASK_BIT, OPCODE_BITS, RSV_BITS, decode_length, extended_length_size,
};
use crate::protocol::{
    Frame, FrameValidator, MAX_CONTROL_FRAME_PAYLOAD, MessageAssembler, OpCode, encode_message,
    generate_mask, generate_nonce, upgrade_request, validate_upgrade_response,
};
use crate::socket::{BufferedSocket, TcpSocket, Transport};

#[cfg(feature = "tls-rustls")]
use crate::socket::{TlsContext, TlsSocket};

/// WebSocket client session over a plain TCP connection.
pub type WsClient = WebSocket<TcpSocket>;

/// WebSocket client session over TLS.
#[cfg(feature = "tls-rustls")]
pub type WssClient = WebSocket<TlsSocket>;

/// A client-side WebSocket session.
///
/// A session only exists after a successful upgrade handshake and starts
/// out [`Open`](ConnectionState::Open). It owns its transport exclusively;
/// once it reaches [`Closed`](ConnectionState::Closed) the transport is
/// released and every further operation reports
/// [`Error::ConnectionReset`].
///
/// All operations are synchronous. [`read_message`](Self::read_message)
/// never waits for data to arrive; [`wait_message`](Self::wait_message)
/// spins on it, yielding the thread between attempts.
///
/// Dropping an unclosed session runs [`disconnect`](Self::disconnect).
///
/// ## Example
///
/// ```rust,no_run
/// use netkit::{Endpoint, Message, WsClient};
///
/// # fn main() -> netkit::Result<()> {
/// let endpoint = Endpoint::resolve("echo.example.com", 80)?;
/// let mut ws = WsClient::connect(&endpoint, "/")?;
///
/// ws.send_message(&Message::text("hi"))?;
/// let reply = ws.wait_message()?;
/// assert_eq!(reply.as_text(), Some("hi"));
///
/// ws.disconnect()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WebSocket<S: Transport> {
    socket: Option<BufferedSocket<S>>,
    state: ConnectionState,
    assembler: MessageAssembler,
    validator: FrameValidator,
}

impl WebSocket<TcpSocket> {
    /// Connect to `endpoint` and upgrade `resource` with the default
    /// configuration.
    ///
    /// # Errors
    ///
    /// See [`connect_with_config`](Self::connect_with_config).
    pub fn connect(endpoint: &Endpoint, resource: &str) -> Result<Self> {
        Self::connect_with_config(endpoint, resource, Config::default())
    }

    /// Connect to `endpoint` and upgrade `resource`.
    ///
    /// # Errors
    ///
    /// - `Error::EstablishConnection` if the TCP connection fails
    /// - `Error::Refused` if the server does not answer with status 101
    /// - `Error::InvalidHandshake` for a 101 answer with bad upgrade headers
    pub fn connect_with_config(endpoint: &Endpoint, resource: &str, config: Config) -> Result<Self> {
        let socket = TcpSocket::connect(endpoint)?;
        let http = HttpClient::from_socket(
            BufferedSocket::new(socket, config.buffer_capacity),
            &config.limits,
        );
        Self::upgrade(http, endpoint, resource, config)
    }
}

#[cfg(feature = "tls-rustls")]
impl WebSocket<TlsSocket> {
    /// Connect to `endpoint` over TLS and upgrade `resource`.
    ///
    /// # Errors
    ///
    /// As [`WebSocket::connect_with_config`], plus `Error::TlsHandshake` if
    /// the TLS handshake fails.
    pub fn connect_secure(
        context: &TlsContext,
        endpoint: &Endpoint,
        resource: &str,
        config: Config,
    ) -> Result<Self> {
        let socket = TlsSocket::connect(context, endpoint)?;
        let http = HttpClient::from_socket(
            BufferedSocket::new(socket, config.buffer_capacity),
            &config.limits,
        );
        Self::upgrade(http, endpoint, resource, config)
    }
}

impl<S: Transport> WebSocket<S> {
    /// Run the upgrade handshake for `resource` over an HTTP connection.
    ///
    /// Bytes the server sent right after its 101 response stay buffered
    /// and are read as the first frames of the session.
    ///
    /// # Errors
    ///
    /// - `Error::Refused` if the status is not 101; no session is created
    /// - `Error::InvalidHandshake` for bad upgrade headers
    /// - any HTTP or transport error from the exchange
    pub fn upgrade(
        mut http: HttpClient<S>,
        endpoint: &Endpoint,
        resource: &str,
        config: Config,
    ) -> Result<Self> {
        let nonce = generate_nonce()?;
        let response = http.request(&upgrade_request(endpoint, resource, &nonce))?;
        if let Err(err) = validate_upgrade_response(&response, &nonce) {
            debug!("upgrade of {endpoint}{resource} rejected: {err}");
            return Err(err);
        }

        let mut socket = http.into_socket();
        let capacity = config.buffer_capacity.max(socket.buffered_len()).max(1);
        socket.set_buffer_capacity(capacity)?;

        debug!("websocket open on {endpoint}{resource}");
        Ok(Self::from_upgraded(socket, config))
    }

    /// Start a session over a transport whose upgrade already succeeded.
    pub(crate) fn from_upgraded(socket: BufferedSocket<S>, config: Config) -> Self {
        Self {
            socket: Some(socket),
            state: ConnectionState::Open,
            assembler: MessageAssembler::new(config.limits.clone()),
            validator: FrameValidator::new(config.limits),
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Returns `true` while messages can be sent.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Returns `true` if inbound bytes are waiting. Never blocks.
    ///
    /// Always `false` once the session is closed.
    pub fn poll(&mut self) -> bool {
        self.socket.as_mut().is_some_and(BufferedSocket::poll)
    }

    /// Borrow the underlying transport, if the session still holds it.
    #[must_use]
    pub fn get_ref(&self) -> Option<&S> {
        self.socket.as_ref().map(BufferedSocket::get_ref)
    }

    /// Send `message` as a single masked frame.
    ///
    /// Sending a Close message moves the session to `Closing`; the peer's
    /// reply is collected by [`read_message`](Self::read_message) or
    /// [`disconnect`](Self::disconnect).
    ///
    /// # Errors
    ///
    /// - `Error::ConnectionReset` unless the session is open
    /// - `Error::ProtocolError` for a continuation message or a control
    ///   payload over 125 bytes
    /// - the transport's write error; a terminal one closes the session
    pub fn send_message(&mut self, message: &Message) -> Result<()> {
        if !self.state.can_send() {
            return Err(Error::ConnectionReset);
        }

        if message.opcode() == OpCode::Continuation {
            return Err(Error::ProtocolError(
                "continuation frames cannot be sent as a message".into(),
            ));
        }
        if message.is_control() && message.payload().len() > MAX_CONTROL_FRAME_PAYLOAD {
            return Err(Error::ProtocolError(format!(
                "{} payload too large: {}",
                message.opcode(),
                message.payload().len()
            )));
        }

        if let Err(err) = self.write_message(message) {
            if err.is_terminal() {
                self.mark_closed();
            }
            return Err(err);
        }

        if message.is_close() {
            debug!("close sent ({:?}), waiting for peer", message.close_code());
            self.state = ConnectionState::Closing;
        }
        Ok(())
    }

    /// Read the next complete message without waiting.
    ///
    /// Control messages (Ping, Pong, Close) are returned as they arrive,
    /// even between the fragments of a data message. No Pong is sent
    /// automatically. A Close message closes the session after echoing the
    /// status code back when the peer started the close.
    ///
    /// # Errors
    ///
    /// - `Error::NoData` if no complete message is available yet; fragments
    ///   received so far are kept
    /// - `Error::ConnectionReset` if the session is closed or the peer
    ///   went away
    /// - `Error::ProtocolError` (close code 1002), `Error::FrameTooLarge` or
    ///   `Error::MessageTooLarge` (close code 1009) for a bad inbound frame;
    ///   the session is closed without waiting for the peer
    pub fn read_message(&mut self) -> Result<Message> {
        if !self.state.can_receive() {
            return Err(Error::ConnectionReset);
        }
        let Some(socket) = self.socket.as_mut() else {
            return Err(Error::ConnectionReset);
        };
        if !socket.poll() {
            return Err(Error::NoData);
        }
        self.receive_frame()
    }

    /// Read the next complete message, spinning until one arrives.
    ///
    /// # Errors
    ///
    /// Any error of [`read_message`](Self::read_message) except
    /// `Error::NoData`.
    pub fn wait_message(&mut self) -> Result<Message> {
        loop {
            match self.read_message() {
                Err(Error::NoData) => thread::yield_now(),
                other => return other,
            }
        }
    }

    /// Run the close handshake with status 1000.
    ///
    /// # Errors
    ///
    /// See [`disconnect_with`](Self::disconnect_with).
    pub fn disconnect(&mut self) -> Result<()> {
        self.disconnect_with(CloseCode::Normal)
    }

    /// Run the close handshake with status `code`.
    ///
    /// Sends a Close frame unless one was already sent, then reads and
    /// discards messages until the peer's Close or a reset arrives. Does
    /// nothing on a closed session. There is no timeout: a peer that never
    /// answers keeps this call spinning.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidCloseCode` for a reserved code (1004-1006, 1015) on
    ///   a session that is not yet closed
    /// - the transport's write error if the Close frame cannot be sent
    ///   for a reason other than a reset; the session is closed anyway
    pub fn disconnect_with(&mut self, code: CloseCode) -> Result<()> {
        if !self.state.is_active() {
            return Ok(());
        }
        if code.is_reserved() {
            return Err(Error::InvalidCloseCode(code.as_u16()));
        }

        if self.state == ConnectionState::Open {
            debug!("closing session with code {}", code.as_u16());
            match self.write_message(&Message::close(code)) {
                Ok(()) => self.state = ConnectionState::Closing,
                Err(Error::ConnectionReset) => {
                    self.mark_closed();
                    return Ok(());
                }
                Err(err) => {
                    self.mark_closed();
                    return Err(err);
                }
            }
        }

        loop {
            match self.read_message() {
                Ok(message) if message.is_close() => break,
                Ok(message) => trace!("discarding {} message while closing", message.opcode()),
                Err(Error::NoData) => thread::yield_now(),
                Err(_) => break,
            }
        }

        self.mark_closed();
        Ok(())
    }

    /// Read fragments until a message completes or the input runs dry.
    fn receive_frame(&mut self) -> Result<Message> {
        loop {
            let pushed = match self.receive_fragment() {
                Ok(frame) => self.assembler.push(frame),
                Err(err) => Err(err),
            };

            match pushed {
                Ok(Some(message)) => return Ok(self.deliver(message)),
                Ok(None) => {
                    if !self.poll() {
                        return Err(Error::NoData);
                    }
                }
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    /// Read and validate one frame, header field by header field.
    fn receive_fragment(&mut self) -> Result<Frame> {
        let socket = self.socket.as_mut().ok_or(Error::ConnectionReset)?;

        let byte0 = socket.read_all(1)?[0];
        let fin = byte0 & FIN_BIT != 0;
        let opcode = OpCode::from_u8(byte0 & OPCODE_BITS)?;
        self.validator.validate_rsv_bits(byte0 & RSV_BITS)?;

        let byte1 = socket.read_all(1)?[0];
        self.validator.validate_masking(byte1 & MASK_BIT != 0)?;

        let len7 = byte1 & LENGTH_BITS;
        let extended = socket.read_all(extended_length_size(len7))?;
        let length = decode_length(len7, &extended)?;
        self.validator.validate_length(opcode, fin, length)?;

        // Bounded by max_frame_size above.
        let payload = socket.read_all(length as usize)?;
        trace!("received {opcode} frame (fin={fin}, {length} bytes)");
        Ok(Frame::new(fin, opcode, payload))
    }

    /// Apply the lifecycle effects of a complete inbound message.
    fn deliver(&mut self, message: Message) -> Message {
        if !message.is_close() {
            return message;
        }

        if self.state == ConnectionState::Open {
            let code = message.payload().get(..2).unwrap_or_default();
            if let Err(err) = self.write_message(&Message::new(OpCode::Close, code)) {
                debug!("could not echo close: {err}");
            }
        }
        debug!("peer closed the session ({:?})", message.close_code());
        self.mark_closed();
        message
    }

    /// Tear the session down after an inbound failure.
    fn fail(&mut self, err: Error) -> Error {
        match &err {
            Error::NoData => {}
            Error::ProtocolError(_) => self.abort(CloseCode::ProtocolError, &err),
            Error::FrameTooLarge { .. } | Error::MessageTooLarge { .. } => {
                self.abort(CloseCode::MessageTooBig, &err);
            }
            _ => self.mark_closed(),
        }
        err
    }

    /// Abortive close: a best-effort Close frame, then the transport goes.
    ///
    /// Nothing is written once our own Close is on the wire.
    fn abort(&mut self, code: CloseCode, reason: &Error) {
        warn!("aborting session with code {}: {reason}", code.as_u16());
        if self.state == ConnectionState::Open {
            if let Err(err) = self.write_message(&Message::close(code)) {
                debug!("could not send close: {err}");
            }
        }
        self.mark_closed();
    }

    fn write_message(&mut self, message: &Message) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(Error::ConnectionReset)?;
        let mask = generate_mask()?;
        trace!(
            "sending {} frame ({} bytes)",
            message.opcode(),
            message.payload().len()
        );
        socket.write(&encode_message(message, mask))
    }

    fn mark_closed(&mut self) {
        if self.state != ConnectionState::Closed {
            debug!("session closed");
        }
        self.state = ConnectionState::Closed;
        self.socket = None;
        self.assembler.reset();
    }
}

impl<S: Transport> Drop for WebSocket<S> {
    fn drop(&mut self) {
        if self.state.is_active() {
            let _ = self.disconnect();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::socket::mock::MockTransport;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::net::{IpAddr, Ipv4Addr};
    use std::rc::Rc;

    type Inbound = Rc<RefCell<VecDeque<Vec<u8>>>>;

    fn session(mock: MockTransport) -> WebSocket<MockTransport> {
        WebSocket::from_upgraded(BufferedSocket::new(mock, 64), Config::default())
    }

    fn server_frame(fin: bool, opcode: OpCode, payload: &[u8]) -> Vec<u8> {
        Frame::new(fin, opcode, payload).encode(None)
    }

    fn close_frame(code: u16) -> Vec<u8> {
        server_frame(true, OpCode::Close, &code.to_be_bytes())
    }

    fn sent_frame(bytes: &[u8]) -> Frame {
        Frame::parse(bytes).unwrap().0
    }

    fn sent_close_code(bytes: &[u8]) -> u16 {
        let frame = sent_frame(bytes);
        assert_eq!(frame.opcode, OpCode::Close);
        u16::from_be_bytes([frame.payload()[0], frame.payload()[1]])
    }

    /// Queue the peer's Close so dropping the session terminates.
    fn peer_closes(inbound: &Inbound) {
        inbound.borrow_mut().push_back(close_frame(1000));
    }

    #[test]
    fn test_read_message_without_data() {
        let mock = MockTransport::new();
        let inbound = mock.inbound();
        let mut ws = session(mock);

        assert_eq!(ws.read_message(), Err(Error::NoData));
        assert!(!ws.poll());
        assert!(ws.is_open());

        peer_closes(&inbound);
    }

    #[test]
    fn test_send_message_writes_masked_frame() {
        let mock = MockTransport::new();
        let inbound = mock.inbound();
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.send_message(&Message::text("hi")).unwrap();

        let bytes = written.borrow()[0].clone();
        assert_eq!(bytes[0], 0x81);
        assert_eq!(bytes[1], 0x80 | 2);
        assert_eq!(bytes.len(), 2 + 4 + 2);
        let frame = sent_frame(&bytes);
        assert!(frame.masked);
        assert_eq!(frame.payload(), b"hi");

        peer_closes(&inbound);
    }

    #[test]
    fn test_reassembles_fragments() {
        let mock = MockTransport::new()
            .with_chunk(&server_frame(false, OpCode::Text, b"Hel"))
            .with_chunk(&server_frame(false, OpCode::Continuation, b"lo, "))
            .with_chunk(&server_frame(true, OpCode::Continuation, b"world"));
        let inbound = mock.inbound();
        let mut ws = session(mock);

        let message = ws.read_message().unwrap();
        assert_eq!(message.opcode(), OpCode::Text);
        assert_eq!(message.as_text(), Some("Hello, world"));

        peer_closes(&inbound);
    }

    #[test]
    fn test_fragments_survive_no_data() {
        let mock = MockTransport::new().with_chunk(&server_frame(false, OpCode::Binary, b"ab"));
        let inbound = mock.inbound();
        let mut ws = session(mock);

        assert_eq!(ws.read_message(), Err(Error::NoData));
        assert!(ws.is_open());

        inbound
            .borrow_mut()
            .push_back(server_frame(true, OpCode::Continuation, b"cd"));
        let message = ws.read_message().unwrap();
        assert_eq!(message, Message::binary(b"abcd".to_vec()));

        peer_closes(&inbound);
    }

    #[test]
    fn test_control_frame_between_fragments() {
        let mock = MockTransport::new()
            .with_chunk(&server_frame(false, OpCode::Text, b"a"))
            .with_chunk(&server_frame(true, OpCode::Ping, b"p"))
            .with_chunk(&server_frame(true, OpCode::Continuation, b"b"));
        let inbound = mock.inbound();
        let written = mock.write_log();
        let mut ws = session(mock);

        assert_eq!(ws.read_message().unwrap(), Message::ping(b"p".to_vec()));
        assert!(written.borrow().is_empty());
        assert_eq!(ws.read_message().unwrap().as_text(), Some("ab"));

        peer_closes(&inbound);
    }

    #[test]
    fn test_peer_close_is_echoed() {
        let mock = MockTransport::new().with_chunk(&close_frame(1000));
        let written = mock.write_log();
        let mut ws = session(mock);

        let message = ws.read_message().unwrap();
        assert_eq!(message.opcode(), OpCode::Close);
        assert_eq!(message.close_code(), Some(CloseCode::Normal));
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert!(ws.get_ref().is_none());

        let echo = sent_frame(&written.borrow()[0]);
        assert_eq!(echo.opcode, OpCode::Close);
        assert_eq!(echo.payload(), &[0x03, 0xE8]);

        assert_eq!(
            ws.send_message(&Message::text("late")),
            Err(Error::ConnectionReset)
        );
        assert_eq!(ws.read_message(), Err(Error::ConnectionReset));
    }

    #[test]
    fn test_empty_peer_close_echoes_empty_payload() {
        let mock = MockTransport::new().with_chunk(&server_frame(true, OpCode::Close, b""));
        let written = mock.write_log();
        let mut ws = session(mock);

        assert!(ws.read_message().unwrap().is_close());
        assert!(sent_frame(&written.borrow()[0]).payload().is_empty());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mock = MockTransport::new().with_chunk(&close_frame(1000));
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.disconnect().unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);
        ws.disconnect().unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);

        // The peer's Close answers ours, so it is not echoed.
        assert_eq!(written.borrow().len(), 1);
        let close = sent_frame(&written.borrow()[0]);
        assert_eq!(close.opcode, OpCode::Close);
        assert_eq!(close.payload(), &[0x03, 0xE8]);
    }

    #[test]
    fn test_invalid_frame_while_closing_sends_no_second_close() {
        let mock = MockTransport::new().with_chunk(&[0x83, 0x00]);
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.disconnect().unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);

        let written = written.borrow();
        assert_eq!(written.len(), 1);
        assert_eq!(sent_close_code(&written[0]), 1000);
    }

    #[test]
    fn test_disconnect_on_closed_session_ignores_code() {
        let mock = MockTransport::new().with_chunk(&close_frame(1000));
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.disconnect().unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);

        assert_eq!(ws.disconnect_with(CloseCode::Other(1005)), Ok(()));
        assert_eq!(written.borrow().len(), 1);
    }

    #[test]
    fn test_disconnect_skips_data_until_close() {
        let mock = MockTransport::new()
            .with_chunk(&server_frame(true, OpCode::Text, b"pending"))
            .with_chunk(&close_frame(1000));
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.disconnect_with(CloseCode::GoingAway).unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert_eq!(sent_frame(&written.borrow()[0]).payload(), &[0x03, 0xE9]);
    }

    #[test]
    fn test_disconnect_ends_on_reset() {
        let mock = MockTransport::new().reset_when_drained();
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.disconnect().unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert_eq!(written.borrow().len(), 1);
    }

    #[test]
    fn test_disconnect_when_write_resets() {
        let mut ws = session(MockTransport::new().fail_writes());

        ws.disconnect().unwrap();
        assert_eq!(ws.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_disconnect_rejects_reserved_code() {
        let mock = MockTransport::new();
        let inbound = mock.inbound();
        let mut ws = session(mock);

        assert_eq!(
            ws.disconnect_with(CloseCode::Other(1005)),
            Err(Error::InvalidCloseCode(1005))
        );
        assert!(ws.is_open());

        peer_closes(&inbound);
    }

    #[test]
    fn test_send_close_then_read_reply() {
        let mock = MockTransport::new();
        let inbound = mock.inbound();
        let written = mock.write_log();
        let mut ws = session(mock);

        ws.send_message(&Message::close(CloseCode::Normal)).unwrap();
        assert_eq!(ws.state(), ConnectionState::Closing);
        assert_eq!(
            ws.send_message(&Message::text("more")),
            Err(Error::ConnectionReset)
        );

        peer_closes(&inbound);
        assert!(ws.read_message().unwrap().is_close());
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert_eq!(written.borrow().len(), 1);
    }

    #[test]
    fn test_send_rejects_invalid_messages() {
        let mock = MockTransport::new();
        let inbound = mock.inbound();
        let written = mock.write_log();
        let mut ws = session(mock);

        let continuation = Message::new(OpCode::Continuation, b"x".to_vec());
        assert!(matches!(
            ws.send_message(&continuation),
            Err(Error::ProtocolError(_))
        ));
        assert!(matches!(
            ws.send_message(&Message::ping(vec![0u8; 126])),
            Err(Error::ProtocolError(_))
        ));
        assert!(written.borrow().is_empty());
        assert!(ws.is_open());

        peer_closes(&inbound);
    }

    #[test]
    fn test_send_reset_closes_session() {
        let mut ws = session(MockTransport::new().fail_writes());

        assert_eq!(
            ws.send_message(&Message::text("x")),
            Err(Error::ConnectionReset)
        );
        assert_eq!(ws.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_unknown_opcode_aborts() {
        let mock = MockTransport::new().with_chunk(&[0x83, 0x00]);
        let written = mock.write_log();
        let mut ws = session(mock);

        assert!(matches!(ws.read_message(), Err(Error::ProtocolError(_))));
        assert_eq!(ws.state(), ConnectionState::Closed);

        assert_eq!(sent_close_code(&written.borrow()[0]), 1002);
    }

    #[test]
    fn test_masked_inbound_frame_aborts() {
        let masked = Frame::new(true, OpCode::Text, b"x".to_vec()).encode(Some([1, 2, 3, 4]));
        let mock = MockTransport::new().with_chunk(&masked);
        let written = mock.write_log();
        let mut ws = session(mock);

        assert!(matches!(ws.read_message(), Err(Error::ProtocolError(_))));
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert_eq!(sent_close_code(&written.borrow()[0]), 1002);
    }

    #[test]
    fn test_rsv_bits_abort() {
        let mock = MockTransport::new().with_chunk(&[0xC1, 0x00]);
        let mut ws = session(mock);

        assert!(matches!(ws.read_message(), Err(Error::ProtocolError(_))));
        assert_eq!(ws.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_oversized_frame_aborts_with_1009() {
        let mock = MockTransport::new().with_chunk(&server_frame(true, OpCode::Binary, &[0u8; 32]));
        let written = mock.write_log();
        let config = Config::default().with_limits(Limits::new(16, 1024, 8, 8192));
        let mut ws = WebSocket::from_upgraded(BufferedSocket::new(mock, 64), config);

        assert!(matches!(
            ws.read_message(),
            Err(Error::FrameTooLarge { size: 32, max: 16 })
        ));
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert_eq!(sent_close_code(&written.borrow()[0]), 1009);
    }

    #[test]
    fn test_orphan_continuation_aborts() {
        let mock = MockTransport::new().with_chunk(&server_frame(true, OpCode::Continuation, b"x"));
        let mut ws = session(mock);

        assert!(matches!(ws.read_message(), Err(Error::ProtocolError(_))));
        assert_eq!(ws.state(), ConnectionState::Closed);
    }

    #[test]
    fn test_reset_mid_frame_closes() {
        let mock = MockTransport::new().with_chunk(&[0x81, 0x05, b'h']).reset_when_drained();
        let written = mock.write_log();
        let mut ws = session(mock);

        assert_eq!(ws.read_message(), Err(Error::ConnectionReset));
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert!(written.borrow().is_empty());
    }

    #[test]
    fn test_wait_message_spins_until_ready() {
        let mock = MockTransport::new().with_chunk(&server_frame(true, OpCode::Text, b"hi"));
        let inbound = mock.inbound();
        let mut ws = session(mock);

        assert_eq!(ws.wait_message().unwrap().as_text(), Some("hi"));

        peer_closes(&inbound);
    }

    #[test]
    fn test_drop_sends_close() {
        let mock = MockTransport::new().reset_when_drained();
        let written = mock.write_log();
        drop(session(mock));

        assert_eq!(written.borrow().len(), 1);
        let close = sent_frame(&written.borrow()[0]);
        assert_eq!(close.opcode, OpCode::Close);
        assert_eq!(close.payload(), &[0x03, 0xE8]);
    }

    fn http_over(mock: MockTransport) -> HttpClient<MockTransport> {
        HttpClient::from_socket(BufferedSocket::new(mock, 64), &Limits::default())
    }

    fn endpoint() -> Endpoint {
        Endpoint::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 9001)
    }

    #[test]
    fn test_upgrade_keeps_early_frames() {
        let mut reply = b"HTTP/1.1 101 Switching Protocols\r\n\
                          Upgrade: websocket\r\n\
                          Connection: Upgrade\r\n\r\n"
            .to_vec();
        reply.extend(server_frame(true, OpCode::Text, b"hi"));
        let mock = MockTransport::new().with_chunk(&reply).reset_when_drained();
        let written = mock.write_log();

        let mut ws = WebSocket::upgrade(http_over(mock), &endpoint(), "/chat", Config::default())
            .unwrap();
        assert!(ws.is_open());
        assert_eq!(ws.read_message().unwrap().as_text(), Some("hi"));

        let request = written.borrow()[0].clone();
        assert!(request.starts_with(b"GET /chat HTTP/1.1\r\n"));
    }

    #[test]
    fn test_upgrade_refused() {
        let mock = MockTransport::new().with_chunk(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n");

        let result = WebSocket::upgrade(http_over(mock), &endpoint(), "/", Config::default());
        assert_eq!(result.err(), Some(Error::Refused { status: 200 }));
    }
}
