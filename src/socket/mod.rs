//! Raw stream transports and the buffered read-ahead layer on top of them.
//!
//! Two raw transports are provided:
//!
//! - [`TcpSocket`]: a plain TCP stream
//! - [`TlsSocket`] (feature `tls-rustls`): TLS over TCP using rustls
//!
//! Both implement [`Transport`], the capability contract consumed by
//! [`BufferedSocket`], the HTTP client and the WebSocket session.

mod buffered;
mod tcp;

#[cfg(feature = "tls-rustls")]
mod tls;

#[cfg(test)]
pub(crate) mod mock;

pub use buffered::BufferedSocket;
pub use tcp::TcpSocket;

#[cfg(feature = "tls-rustls")]
pub use tls::{TlsContext, TlsSocket, load_certs_from_file};

use crate::error::Result;

/// A connected byte stream.
///
/// Implementations tear the connection down when dropped.
pub trait Transport {
    /// Returns `true` if a call to [`read`](Transport::read) would make
    /// progress without blocking.
    ///
    /// Never blocks. A pending error also counts as readiness so that the
    /// next read can report it.
    fn poll(&mut self) -> bool;

    /// Read up to `max_len` bytes. Short reads are allowed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionReset`](crate::Error::ConnectionReset) once
    /// the peer has closed the stream.
    fn read(&mut self, max_len: usize) -> Result<Vec<u8>>;

    /// Write all of `bytes`, or fail with the precise error.
    ///
    /// # Errors
    ///
    /// Returns the classified transport error; no partial write is reported
    /// as success.
    fn write(&mut self, bytes: &[u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn poll(&mut self) -> bool {
        (**self).poll()
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        (**self).read(max_len)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }
}
