use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream};

use log::debug;

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::socket::Transport;

/// A plain TCP client stream.
#[derive(Debug)]
pub struct TcpSocket {
    stream: TcpStream,
}

impl TcpSocket {
    /// Connect to `endpoint`, resolving its hostname if no address is known.
    ///
    /// # Errors
    ///
    /// - `Error::DnsResolution` if the hostname cannot be resolved
    /// - `Error::EstablishConnection` if the connection is refused or fails
    pub fn connect(endpoint: &Endpoint) -> Result<Self> {
        let addr = endpoint.socket_addr()?;
        let stream = TcpStream::connect(addr)
            .map_err(|e| Error::EstablishConnection(format!("{endpoint}: {e}")))?;
        debug!("tcp connected to {endpoint} ({addr})");
        Ok(Self { stream })
    }

    /// Address of the connected peer.
    ///
    /// # Errors
    ///
    /// Returns the classified I/O error if the socket is no longer connected.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        Ok(self.stream.peer_addr()?)
    }

    pub(crate) fn into_stream(self) -> TcpStream {
        self.stream
    }
}

/// Zero-wait readiness check on a blocking stream.
///
/// End of stream and socket errors count as readable so that the following
/// read reports them.
pub(crate) fn poll_readable(stream: &TcpStream) -> bool {
    if stream.set_nonblocking(true).is_err() {
        return true;
    }

    let mut byte = [0u8; 1];
    let ready = match stream.peek(&mut byte) {
        Ok(_) => true,
        Err(e) if e.kind() == ErrorKind::WouldBlock => false,
        Err(_) => true,
    };

    let restored = stream.set_nonblocking(false).is_ok();
    ready || !restored
}

impl Transport for TcpSocket {
    fn poll(&mut self) -> bool {
        poll_readable(&self.stream)
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if max_len == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; max_len];
        loop {
            match self.stream.read(&mut buf) {
                Ok(0) => return Err(Error::ConnectionReset),
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes)?;
        Ok(())
    }
}
