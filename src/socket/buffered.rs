use std::thread;

use bytes::{Buf, BytesMut};
use log::trace;

use crate::error::{Error, Result};
use crate::socket::Transport;

/// Read-ahead buffering on top of a raw [`Transport`].
///
/// Bytes are pulled from the transport in chunks of at most `capacity`
/// bytes and handed out in arrival order. The backlog never holds more than
/// `capacity` bytes and nothing already read from the transport is dropped.
#[derive(Debug)]
pub struct BufferedSocket<S> {
    socket: S,
    backlog: BytesMut,
    capacity: usize,
    deferred: Option<Error>,
}

impl<S: Transport> BufferedSocket<S> {
    /// Wrap `socket` with a backlog of `capacity` bytes (at least one).
    #[must_use]
    pub fn new(socket: S, capacity: usize) -> Self {
        Self {
            socket,
            backlog: BytesMut::new(),
            capacity: capacity.max(1),
            deferred: None,
        }
    }

    /// Returns `true` if buffered bytes exist or the transport is readable.
    pub fn poll(&mut self) -> bool {
        !self.backlog.is_empty() || self.deferred.is_some() || self.socket.poll()
    }

    /// Read up to `size` bytes.
    ///
    /// Serves the backlog first and refills it at most once. Returns fewer
    /// than `size` bytes (possibly none) when nothing more is available
    /// right now.
    ///
    /// If the refill fails after some bytes were already taken from the
    /// backlog, those bytes are returned and the error is reported by the
    /// next call.
    ///
    /// # Errors
    ///
    /// Returns the transport error when no bytes could be delivered.
    pub fn read(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(size.min(self.capacity));
        self.drain_into(&mut bytes, size);

        if bytes.len() < size {
            if let Err(err) = self.refill_buffer() {
                if bytes.is_empty() {
                    return Err(err);
                }
                self.deferred = Some(err);
                return Ok(bytes);
            }
            self.drain_into(&mut bytes, size);
        }

        Ok(bytes)
    }

    /// Read exactly `size` bytes, yielding the thread while none are
    /// available.
    ///
    /// Blocks the caller until the bytes arrive or the transport fails.
    ///
    /// # Errors
    ///
    /// Returns the first transport error; bytes gathered so far are
    /// discarded.
    pub fn read_all(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut bytes = Vec::with_capacity(size.min(self.capacity));

        loop {
            self.drain_into(&mut bytes, size);
            if bytes.len() == size {
                return Ok(bytes);
            }
            if self.refill_buffer()? == 0 {
                thread::yield_now();
            }
        }
    }

    /// Write all of `bytes` straight to the transport.
    ///
    /// # Errors
    ///
    /// Returns the transport's write error.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.socket.write(bytes)
    }

    /// Pull one chunk from the transport into the backlog.
    ///
    /// Returns the number of bytes added, zero when the transport is not
    /// readable or the backlog is full.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionReset`] if the transport reports readiness
    /// but yields no bytes, or any other transport read error.
    pub fn refill_buffer(&mut self) -> Result<usize> {
        if let Some(err) = self.deferred.take() {
            return Err(err);
        }
        if !self.socket.poll() {
            return Ok(0);
        }

        let space = self.capacity.saturating_sub(self.backlog.len());
        if space == 0 {
            return Ok(0);
        }

        let chunk = match self.socket.read(space) {
            Ok(chunk) => chunk,
            Err(Error::NoData) => return Ok(0),
            Err(err) => return Err(err),
        };
        if chunk.is_empty() {
            return Err(Error::ConnectionReset);
        }

        trace!("buffered {} bytes ({} in backlog)", chunk.len(), self.backlog.len());
        self.backlog.extend_from_slice(&chunk);
        Ok(chunk.len())
    }

    /// Change the backlog capacity.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero or smaller
    /// than the number of bytes currently buffered.
    pub fn set_buffer_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 || capacity < self.backlog.len() {
            return Err(Error::InvalidCapacity {
                requested: capacity,
                buffered: self.backlog.len(),
            });
        }
        self.capacity = capacity;
        Ok(())
    }

    /// Current backlog capacity.
    #[must_use]
    pub const fn buffer_capacity(&self) -> usize {
        self.capacity
    }

    /// Number of bytes waiting in the backlog.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.backlog.len()
    }

    /// Borrow the raw transport.
    #[must_use]
    pub const fn get_ref(&self) -> &S {
        &self.socket
    }

    /// Take the raw transport back, discarding any buffered bytes.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.socket
    }

    fn drain_into(&mut self, out: &mut Vec<u8>, size: usize) {
        let take = (size - out.len()).min(self.backlog.len());
        if take > 0 {
            out.extend_from_slice(&self.backlog[..take]);
            self.backlog.advance(take);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::mock::MockTransport;

    #[test]
    fn test_new_clamps_capacity() {
        let socket = BufferedSocket::new(MockTransport::new(), 0);
        assert_eq!(socket.buffer_capacity(), 1);
    }

    #[test]
    fn test_read_serves_in_order() {
        let mock = MockTransport::new().with_chunk(b"hello world");
        let mut socket = BufferedSocket::new(mock, 64);

        assert_eq!(socket.read(5).unwrap(), b"hello");
        assert_eq!(socket.buffered_len(), 6);
        assert_eq!(socket.read(64).unwrap(), b" world");
        assert_eq!(socket.buffered_len(), 0);
    }

    #[test]
    fn test_read_without_data_is_empty() {
        let mut socket = BufferedSocket::new(MockTransport::new(), 64);
        assert!(!socket.poll());
        assert!(socket.read(10).unwrap().is_empty());
    }

    #[test]
    fn test_read_refills_once() {
        let mock = MockTransport::new().with_chunk(b"abc").with_chunk(b"def");
        let mut socket = BufferedSocket::new(mock, 64);

        assert_eq!(socket.read(6).unwrap(), b"abc");
        assert_eq!(socket.read(6).unwrap(), b"def");
    }

    #[test]
    fn test_read_all_collects_across_chunks() {
        let mock = MockTransport::new()
            .with_chunk(b"ab")
            .with_chunk(b"cd")
            .with_chunk(b"ef");
        let mut socket = BufferedSocket::new(mock, 64);

        assert_eq!(socket.read_all(5).unwrap(), b"abcde");
        assert_eq!(socket.read_all(1).unwrap(), b"f");
    }

    #[test]
    fn test_read_all_reports_reset() {
        let mock = MockTransport::new().with_chunk(b"ab").reset_when_drained();
        let mut socket = BufferedSocket::new(mock, 64);

        assert_eq!(socket.read_all(4), Err(Error::ConnectionReset));
    }

    #[test]
    fn test_short_read_defers_error() {
        let mock = MockTransport::new().with_chunk(b"xyz").reset_when_drained();
        let mut socket = BufferedSocket::new(mock, 2);

        assert_eq!(socket.read(2).unwrap(), b"xy");
        // One byte left in the transport chunk, then the reset.
        assert_eq!(socket.read(2).unwrap(), b"z");
        assert_eq!(socket.read(2).unwrap_err(), Error::ConnectionReset);
    }

    #[test]
    fn test_partial_backlog_then_reset_keeps_bytes() {
        let mock = MockTransport::new().with_chunk(b"1234").reset_when_drained();
        let mut socket = BufferedSocket::new(mock, 4);

        assert_eq!(socket.read(1).unwrap(), b"1");
        assert_eq!(socket.read(8).unwrap(), b"234");
        assert!(socket.poll());
        assert_eq!(socket.read(8).unwrap_err(), Error::ConnectionReset);
    }

    #[test]
    fn test_backlog_never_exceeds_capacity() {
        let payload: Vec<u8> = (0u8..64).collect();
        let mock = MockTransport::new().with_chunk(&payload);
        let requests = mock.read_requests();
        let mut socket = BufferedSocket::new(mock, 32);

        let mut received = socket.read(32).unwrap();
        assert!(socket.buffered_len() <= 32);
        received.extend(socket.read(32).unwrap());

        assert_eq!(received, payload);
        assert!(requests.borrow().iter().all(|&max| max <= 32));
    }

    #[test]
    fn test_set_buffer_capacity() {
        let mock = MockTransport::new().with_chunk(b"0123456789");
        let mut socket = BufferedSocket::new(mock, 16);

        assert_eq!(socket.read(2).unwrap(), b"01");
        assert_eq!(socket.buffered_len(), 8);

        assert_eq!(
            socket.set_buffer_capacity(4),
            Err(Error::InvalidCapacity {
                requested: 4,
                buffered: 8
            })
        );
        assert!(socket.set_buffer_capacity(0).is_err());

        socket.set_buffer_capacity(8).unwrap();
        assert_eq!(socket.buffer_capacity(), 8);
        assert_eq!(socket.read(8).unwrap(), b"23456789");
    }

    #[test]
    fn test_empty_read_after_poll_is_reset() {
        let mock = MockTransport::new().with_chunk(b"");
        let mut socket = BufferedSocket::new(mock, 8);

        assert_eq!(socket.read(1), Err(Error::ConnectionReset));
    }

    #[test]
    fn test_write_passes_through() {
        let mock = MockTransport::new();
        let written = mock.write_log();
        let mut socket = BufferedSocket::new(mock, 8);

        socket.write(b"ping").unwrap();
        socket.write(b"pong").unwrap();
        assert_eq!(written.borrow().concat(), b"pingpong");
    }
}
