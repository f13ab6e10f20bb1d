//! Configuration and limits for connections.

use crate::error::{Error, Result};

/// Default backlog capacity of a session's buffered socket (1 MiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024 * 1024;

/// Resource limits applied to inbound data.
///
/// These limits bound memory use when a peer declares huge lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum size of a single frame in bytes.
    ///
    /// Default: 16 MB (16 * 1024 * 1024)
    pub max_frame_size: usize,

    /// Maximum size of a complete message in bytes.
    ///
    /// This applies to the total size after reassembling all fragments.
    ///
    /// Default: 64 MB (64 * 1024 * 1024)
    pub max_message_size: usize,

    /// Maximum number of fragments in a single message.
    ///
    /// Default: 128
    pub max_fragment_count: usize,

    /// Maximum size of an HTTP response head (status line plus headers).
    ///
    /// Default: 8 KB (8192)
    pub max_header_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_frame_size: 16 * 1024 * 1024,   // 16 MB
            max_message_size: 64 * 1024 * 1024, // 64 MB
            max_fragment_count: 128,
            max_header_size: 8192,
        }
    }
}

impl Limits {
    /// Create new limits with custom values.
    #[must_use]
    pub const fn new(
        max_frame_size: usize,
        max_message_size: usize,
        max_fragment_count: usize,
        max_header_size: usize,
    ) -> Self {
        Self {
            max_frame_size,
            max_message_size,
            max_fragment_count,
            max_header_size,
        }
    }

    /// Create limits suitable for small embedded systems.
    ///
    /// - Max frame: 64 KB
    /// - Max message: 256 KB
    /// - Max fragments: 16
    /// - Max header: 4 KB
    #[must_use]
    pub const fn embedded() -> Self {
        Self {
            max_frame_size: 64 * 1024,
            max_message_size: 256 * 1024,
            max_fragment_count: 16,
            max_header_size: 4096,
        }
    }

    /// Create limits for unrestricted use.
    ///
    /// Warning: Use only with trusted peers.
    #[must_use]
    pub const fn unrestricted() -> Self {
        Self {
            max_frame_size: usize::MAX,
            max_message_size: usize::MAX,
            max_fragment_count: usize::MAX,
            max_header_size: 64 * 1024,
        }
    }

    /// Validate that a declared frame length is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FrameTooLarge`] if `size` exceeds the configured maximum.
    pub fn check_frame_size(&self, size: u64) -> Result<()> {
        match usize::try_from(size) {
            Ok(len) if len <= self.max_frame_size => Ok(()),
            _ => Err(Error::FrameTooLarge {
                size,
                max: self.max_frame_size,
            }),
        }
    }

    /// Validate that message size is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `size` exceeds the configured maximum.
    pub const fn check_message_size(&self, size: usize) -> Result<()> {
        if size > self.max_message_size {
            Err(Error::MessageTooLarge {
                size,
                max: self.max_message_size,
            })
        } else {
            Ok(())
        }
    }

    /// Validate that fragment count is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolError`] if `count` exceeds the configured maximum.
    pub fn check_fragment_count(&self, count: usize) -> Result<()> {
        if count > self.max_fragment_count {
            Err(Error::ProtocolError(format!(
                "too many fragments: {} (max: {})",
                count, self.max_fragment_count
            )))
        } else {
            Ok(())
        }
    }

    /// Validate that an HTTP response head is within limits.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if `size` exceeds the configured maximum.
    pub fn check_header_size(&self, size: usize) -> Result<()> {
        if size > self.max_header_size {
            Err(Error::Http(format!(
                "response head too large: {} bytes (max: {})",
                size, self.max_header_size
            )))
        } else {
            Ok(())
        }
    }
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Resource limits.
    pub limits: Limits,

    /// Capacity of the read-ahead backlog (in bytes).
    ///
    /// Default: 1 MB (1024 * 1024)
    pub buffer_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl Config {
    /// Create a new configuration with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom limits.
    #[must_use]
    pub const fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Set the backlog capacity.
    #[must_use]
    pub const fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }
}
