//! Scripted loopback peers.
//!
//! A `TestServer` accepts exactly one connection on a random port and hands
//! the stream to a script running on its own thread.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use netkit::protocol::{Frame, OpCode};
use netkit::{Endpoint, Error, compute_accept_key};

/// One-connection server running a script on a background thread.
pub struct TestServer<T> {
    addr: SocketAddr,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> TestServer<T> {
    /// Bind to a random loopback port and run `script` on the first
    /// accepted connection.
    pub fn spawn<F>(script: F) -> Self
    where
        F: FnOnce(TcpStream) -> T + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            script(stream)
        });
        Self { addr, handle }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn endpoint(&self) -> Endpoint {
        Endpoint::from(self.addr)
    }

    /// Wait for the script and return its result, re-raising its panic.
    pub fn join(self) -> T {
        match self.handle.join() {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Read an HTTP request head and any `Content-Length` body.
///
/// Returns the head (without the blank line) and the body.
pub fn read_request<S: Read>(stream: &mut S) -> (String, Vec<u8>) {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        stream.read_exact(&mut byte).unwrap();
        head.push(byte[0]);
    }
    head.truncate(head.len() - 4);
    let head = String::from_utf8(head).unwrap();

    let length = header_value(&head, "Content-Length")
        .map(|v| v.parse::<usize>().unwrap())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    stream.read_exact(&mut body).unwrap();

    (head, body)
}

/// Value of the first header called `name` (case-insensitive).
pub fn header_value<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim()
            .eq_ignore_ascii_case(name)
            .then(|| value.trim())
    })
}

/// Answer an upgrade request with 101, appending `early` right after the
/// response head in the same write.
///
/// Returns the request head.
pub fn accept_upgrade<S: Read + Write>(stream: &mut S, early: &[u8]) -> String {
    let (head, _) = read_request(stream);
    let key = header_value(&head, "Sec-WebSocket-Key").unwrap();
    assert_eq!(header_value(&head, "Sec-WebSocket-Version"), Some("13"));

    let mut response = format!(
        "HTTP/1.1 101 Switching Protocols\r\n\
         Upgrade: websocket\r\n\
         Connection: Upgrade\r\n\
         Sec-WebSocket-Accept: {}\r\n\r\n",
        compute_accept_key(key)
    )
    .into_bytes();
    response.extend_from_slice(early);
    stream.write_all(&response).unwrap();
    stream.flush().unwrap();
    head
}

/// Answer an upgrade request with a non-101 status.
pub fn refuse_upgrade<S: Read + Write>(stream: &mut S, status: u16, reason: &str) {
    read_request(stream);
    let response = format!("HTTP/1.1 {status} {reason}\r\nContent-Length: 0\r\n\r\n");
    stream.write_all(response.as_bytes()).unwrap();
    stream.flush().unwrap();
}

/// Write one unmasked frame, as a server does.
pub fn write_frame<S: Write>(stream: &mut S, fin: bool, opcode: OpCode, payload: &[u8]) {
    stream
        .write_all(&Frame::new(fin, opcode, payload).encode(None))
        .unwrap();
    stream.flush().unwrap();
}

/// Write a Close frame carrying `code`.
pub fn write_close<S: Write>(stream: &mut S, code: u16) {
    write_frame(stream, true, OpCode::Close, &code.to_be_bytes());
}

/// Read one frame from the client, unmasking it.
pub fn read_frame<S: Read>(stream: &mut S) -> Frame {
    let mut buf = Vec::new();
    loop {
        match Frame::parse(&buf) {
            Ok((frame, _)) => return frame,
            Err(Error::IncompleteFrame { needed }) => {
                let start = buf.len();
                buf.resize(start + needed, 0);
                stream.read_exact(&mut buf[start..]).unwrap();
            }
            Err(err) => panic!("client sent a bad frame: {err}"),
        }
    }
}

/// Echo every data frame back until the client's Close, answer it and
/// return its status code.
///
/// Every frame from a client must be masked.
pub fn echo_until_close<S: Read + Write>(stream: &mut S) -> u16 {
    loop {
        let frame = read_frame(stream);
        assert!(frame.masked, "client frame not masked");

        if frame.opcode == OpCode::Close {
            let payload = frame.payload().to_vec();
            write_frame(stream, true, OpCode::Close, &payload);
            return u16::from_be_bytes([payload[0], payload[1]]);
        }
        write_frame(stream, frame.fin, frame.opcode, frame.payload());
    }
}
