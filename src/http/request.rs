use crate::error::{Error, Result};
use crate::http::{Header, Verb, Version};

/// An HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    verb: Verb,
    uri: String,
    version: Version,
    header: Header,
    payload: Vec<u8>,
}

impl Request {
    /// Create an HTTP/1.1 request with no headers and no body.
    #[must_use]
    pub fn new(verb: Verb, uri: impl Into<String>) -> Self {
        Self {
            verb,
            uri: uri.into(),
            version: Version::Http11,
            header: Header::new(),
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Add a header field.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.add(name, value);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    #[must_use]
    pub const fn verb(&self) -> Verb {
        self.verb
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn set_payload(&mut self, payload: impl Into<Vec<u8>>) {
        self.payload = payload.into();
    }

    /// Serialize the request line, headers, blank line and body.
    ///
    /// A `Content-Length` header is added for a non-empty body that has
    /// neither `Content-Length` nor `Transfer-Encoding`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Http` if the URI is empty or contains whitespace or
    /// control characters, or a header is invalid.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let bad_byte = |b: u8| b.is_ascii_whitespace() || b.is_ascii_control();
        if self.uri.is_empty() || self.uri.bytes().any(bad_byte) {
            return Err(Error::Http(format!("invalid request URI: {:?}", self.uri)));
        }

        let mut out = Vec::with_capacity(128 + self.payload.len());
        out.extend_from_slice(
            format!("{} {} HTTP/{}\r\n", self.verb, self.uri, self.version).as_bytes(),
        );

        self.header.encode_into(&mut out)?;
        if !self.payload.is_empty()
            && !self.header.contains("Content-Length")
            && !self.header.contains("Transfer-Encoding")
        {
            let length = format!("Content-Length: {}\r\n", self.payload.len());
            out.extend_from_slice(length.as_bytes());
        }

        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.payload);
        Ok(out)
    }
}
