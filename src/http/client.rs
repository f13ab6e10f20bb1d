use log::{debug, trace};

use crate::config::{DEFAULT_BUFFER_CAPACITY, Limits};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::http::{Request, Response, Version};
use crate::socket::{BufferedSocket, TcpSocket, Transport};

#[cfg(feature = "tls-rustls")]
use crate::socket::{TlsContext, TlsSocket};

/// HTTP/1.1 client over one connection.
///
/// Requests and responses are exchanged strictly in turn. The connection
/// is closed when the client is dropped.
#[derive(Debug)]
pub struct HttpClient<S> {
    socket: BufferedSocket<S>,
    limits: Limits,
}

impl HttpClient<TcpSocket> {
    /// Open a plain TCP connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`TcpSocket::connect`].
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let socket = TcpSocket::connect(endpoint)?;
        Ok(Self::from_socket(
            BufferedSocket::new(socket, DEFAULT_BUFFER_CAPACITY),
            &Limits::default(),
        ))
    }
}

#[cfg(feature = "tls-rustls")]
impl HttpClient<TlsSocket> {
    /// Open a TLS connection to `endpoint`.
    ///
    /// # Errors
    ///
    /// See [`TlsSocket::connect`].
    pub fn connect_secure(context: &TlsContext, endpoint: &Endpoint) -> Result<Self> {
        let socket = TlsSocket::connect(context, endpoint)?;
        Ok(Self::from_socket(
            BufferedSocket::new(socket, DEFAULT_BUFFER_CAPACITY),
            &Limits::default(),
        ))
    }
}

impl<S: Transport> HttpClient<S> {
    /// Speak HTTP over an already connected socket.
    #[must_use]
    pub fn from_socket(socket: BufferedSocket<S>, limits: &Limits) -> Self {
        Self {
            socket,
            limits: limits.clone(),
        }
    }

    /// Write `request` to the connection.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` for an invalid request, or the transport error.
    pub fn send_request(&mut self, request: &Request) -> Result<()> {
        let bytes = request.encode()?;
        debug!("http {} {}", request.verb(), request.uri());
        self.socket.write(&bytes)
    }

    /// Read one response, blocking until it has fully arrived.
    ///
    /// Lines before the status line are skipped. The body is decoded from
    /// `Transfer-Encoding: chunked` or read by `Content-Length`; without
    /// either the body is empty.
    ///
    /// # Errors
    ///
    /// - `Error::Http` for a malformed response, an unsupported transfer
    ///   encoding or a head larger than `max_header_size`
    /// - `Error::MessageTooLarge` if the body exceeds `max_message_size`
    /// - the transport error if the connection fails
    pub fn receive(&mut self) -> Result<Response> {
        let mut budget = self.limits.max_header_size;

        let mut response = loop {
            let line = self.read_line(&mut budget)?;
            if let Some(response) = parse_status_line(&line)? {
                break response;
            }
            trace!("skipping line before status line: {line:?}");
        };

        loop {
            let line = self.read_line(&mut budget)?;
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| Error::Http(format!("malformed header line: {line:?}")))?;
            response.header_mut().add(name.trim(), value.trim());
        }

        let payload = match response.header().get("Transfer-Encoding") {
            Some(encoding) if encoding.eq_ignore_ascii_case("chunked") => {
                self.read_chunked_payload()?
            }
            Some(encoding) => {
                return Err(Error::Http(format!(
                    "unsupported transfer encoding: {encoding}"
                )));
            }
            None => match response.header().get("Content-Length") {
                Some(length) => {
                    let length: usize = length
                        .trim()
                        .parse()
                        .map_err(|_| Error::Http(format!("invalid Content-Length: {length}")))?;
                    self.limits.check_message_size(length)?;
                    self.socket.read_all(length)?
                }
                None => Vec::new(),
            },
        };

        debug!(
            "http response {} {} ({} byte body)",
            response.status(),
            response.status_text(),
            payload.len()
        );
        response.set_payload(payload);
        Ok(response)
    }

    /// Send `request` and read its response.
    ///
    /// # Errors
    ///
    /// See [`send_request`](Self::send_request) and [`receive`](Self::receive).
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        self.send_request(request)?;
        self.receive()
    }

    /// Borrow the buffered socket.
    #[must_use]
    pub const fn socket(&self) -> &BufferedSocket<S> {
        &self.socket
    }

    /// Take the buffered socket back, including any bytes already read past
    /// the last response.
    #[must_use]
    pub fn into_socket(self) -> BufferedSocket<S> {
        self.socket
    }

    /// Read one CRLF-terminated line, without the terminator.
    fn read_line(&mut self, budget: &mut usize) -> Result<String> {
        let mut line = Vec::new();
        while !line.ends_with(b"\r\n") {
            if *budget == 0 {
                return Err(Error::Http(format!(
                    "response head exceeds {} bytes",
                    self.limits.max_header_size
                )));
            }
            *budget -= 1;
            line.extend(self.socket.read_all(1)?);
        }
        line.truncate(line.len() - 2);

        String::from_utf8(line).map_err(|_| Error::Http("response line is not UTF-8".into()))
    }

    fn read_chunked_payload(&mut self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();

        loop {
            let mut budget = self.limits.max_header_size;
            let line = self.read_line(&mut budget)?;
            let size = line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(size, 16)
                .map_err(|_| Error::Http(format!("invalid chunk size line: {line:?}")))?;

            if size == 0 {
                break;
            }

            let total = payload.len().saturating_add(size);
            self.limits.check_message_size(total)?;
            payload.extend(self.socket.read_all(size)?);

            if !self.read_line(&mut budget)?.is_empty() {
                return Err(Error::Http("chunk not terminated by CRLF".into()));
            }
        }

        // Trailer fields are read and dropped.
        let mut budget = self.limits.max_header_size;
        while !self.read_line(&mut budget)?.is_empty() {}

        Ok(payload)
    }
}

/// Parse `HTTP/<version> <3 digits> <text>`.
///
/// Returns `Ok(None)` for a line that is not a status line.
fn parse_status_line(line: &str) -> Result<Option<Response>> {
    let Some(rest) = line.strip_prefix("HTTP/") else {
        return Ok(None);
    };
    let Some((version, rest)) = rest.split_once(' ') else {
        return Ok(None);
    };

    let rest = rest.trim_start();
    let (Some(code), Some(text)) = (rest.get(..3), rest.get(3..)) else {
        return Ok(None);
    };
    let is_status = code.bytes().all(|b| b.is_ascii_digit())
        && (text.is_empty() || text.starts_with(' '));
    if !is_status {
        return Ok(None);
    }

    let version: Version = version.parse()?;
    let status: u16 = code
        .parse()
        .map_err(|_| Error::Http(format!("invalid status code: {code}")))?;
    Ok(Some(Response::new(version, status, text.trim())))
}
