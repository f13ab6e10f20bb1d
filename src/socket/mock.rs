//! Scripted in-memory transport for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::socket::Transport;

/// Serves pre-loaded inbound chunks and records every write.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    inbound: Rc<RefCell<VecDeque<Vec<u8>>>>,
    reset_when_drained: bool,
    fail_writes: bool,
    written: Rc<RefCell<Vec<Vec<u8>>>>,
    read_requests: Rc<RefCell<Vec<usize>>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue one inbound chunk. A single read never crosses chunks.
    pub(crate) fn with_chunk(mut self, bytes: &[u8]) -> Self {
        self.inbound.borrow_mut().push_back(bytes.to_vec());
        self
    }

    /// Shared handle to the inbound queue, for feeding bytes later.
    pub(crate) fn inbound(&self) -> Rc<RefCell<VecDeque<Vec<u8>>>> {
        Rc::clone(&self.inbound)
    }

    /// Report a reset once every queued chunk has been read.
    pub(crate) fn reset_when_drained(mut self) -> Self {
        self.reset_when_drained = true;
        self
    }

    /// Fail every write with a reset.
    pub(crate) fn fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Shared handle to the list of writes, one entry per call.
    pub(crate) fn write_log(&self) -> Rc<RefCell<Vec<Vec<u8>>>> {
        Rc::clone(&self.written)
    }

    /// Shared handle to the `max_len` of every read call.
    pub(crate) fn read_requests(&self) -> Rc<RefCell<Vec<usize>>> {
        Rc::clone(&self.read_requests)
    }
}

impl Transport for MockTransport {
    fn poll(&mut self) -> bool {
        !self.inbound.borrow().is_empty() || self.reset_when_drained
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        self.read_requests.borrow_mut().push(max_len);

        let mut inbound = self.inbound.borrow_mut();
        let Some(chunk) = inbound.front_mut() else {
            return if self.reset_when_drained {
                Err(Error::ConnectionReset)
            } else {
                Err(Error::NoData)
            };
        };

        let n = max_len.min(chunk.len());
        let out: Vec<u8> = chunk.drain(..n).collect();
        if chunk.is_empty() {
            inbound.pop_front();
        }
        Ok(out)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if self.fail_writes {
            return Err(Error::ConnectionReset);
        }
        self.written.borrow_mut().push(bytes.to_vec());
        Ok(())
    }
}
