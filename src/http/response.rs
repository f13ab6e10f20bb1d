use crate::http::{Header, Version};

/// An HTTP response as read by [`HttpClient::receive`](crate::http::HttpClient::receive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    version: Version,
    status: u16,
    status_text: String,
    header: Header,
    payload: Vec<u8>,
}

impl Response {
    #[must_use]
    pub fn new(version: Version, status: u16, status_text: impl Into<String>) -> Self {
        Self {
            version,
            status,
            status_text: status_text.into(),
            header: Header::new(),
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub const fn version(&self) -> Version {
        self.version
    }

    #[must_use]
    pub const fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn status_text(&self) -> &str {
        &self.status_text
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

    pub fn set_payload(&mut self, payload: Vec<u8>) {
        self.payload = payload;
    }

    #[must_use]
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}
