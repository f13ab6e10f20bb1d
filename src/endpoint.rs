//! Network endpoints: a host (name and/or IP address) plus a port.

use std::fmt;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};

use crate::error::{Error, Result};

/// A remote endpoint.
///
/// An endpoint may carry a hostname, a resolved IP address, or both. The
/// hostname is kept after resolution because TLS (SNI) and the HTTP `Host`
/// header need it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    hostname: Option<String>,
    address: Option<IpAddr>,
    port: u16,
}

impl Endpoint {
    /// Create an endpoint from an already known address.
    #[must_use]
    pub const fn new(address: IpAddr, port: u16) -> Self {
        Self {
            hostname: None,
            address: Some(address),
            port,
        }
    }

    /// Resolve `hostname` with the system resolver and keep the first address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DnsResolution`] if the lookup fails or yields nothing.
    pub fn resolve(hostname: &str, port: u16) -> Result<Self> {
        let mut addrs = (hostname, port)
            .to_socket_addrs()
            .map_err(|e| Error::DnsResolution(format!("{hostname}: {e}")))?;

        let addr = addrs
            .next()
            .ok_or_else(|| Error::DnsResolution(format!("{hostname}: no addresses")))?;

        Ok(Self {
            hostname: Some(hostname.to_string()),
            address: Some(addr.ip()),
            port,
        })
    }

    /// Parse a `host:port` string and resolve the host.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointParse`] for malformed input and
    /// [`Error::DnsResolution`] if the host cannot be resolved.
    pub fn resolve_str(endpoint: &str) -> Result<Self> {
        let parsed = Self::parse(endpoint)?;
        match &parsed.hostname {
            Some(host) => Self::resolve(host, parsed.port),
            None => Ok(parsed),
        }
    }

    /// Parse a `host:port` string without resolving the host.
    ///
    /// IPv6 literals may be written in brackets (`[::1]:80`). A host that is
    /// an IP literal fills in the address instead of the hostname.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EndpointParse`] if the colon is missing, the host is
    /// empty or the port is not a valid `u16`.
    pub fn parse(endpoint: &str) -> Result<Self> {
        let (host, port) = endpoint
            .rsplit_once(':')
            .ok_or_else(|| Error::EndpointParse(format!("missing port in {endpoint:?}")))?;

        let port: u16 = port
            .parse()
            .map_err(|_| Error::EndpointParse(format!("invalid port in {endpoint:?}")))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(Error::EndpointParse(format!("missing host in {endpoint:?}")));
        }

        Ok(match host.parse::<IpAddr>() {
            Ok(address) => Self::new(address, port),
            Err(_) => Self {
                hostname: Some(host.to_string()),
                address: None,
                port,
            },
        })
    }

    /// The hostname, if the endpoint was created from one.
    #[must_use]
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// The resolved address, if known.
    #[must_use]
    pub const fn address(&self) -> Option<IpAddr> {
        self.address
    }

    /// The port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The host as it should appear in a `Host` header.
    #[must_use]
    pub fn host(&self) -> String {
        match (&self.hostname, self.address) {
            (Some(name), _) => name.clone(),
            (None, Some(IpAddr::V6(v6))) => format!("[{v6}]"),
            (None, Some(addr)) => addr.to_string(),
            (None, None) => String::new(),
        }
    }

    /// The socket address to connect to, resolving the hostname if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DnsResolution`] if no address is known and the
    /// hostname cannot be resolved.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        match (self.address, &self.hostname) {
            (Some(addr), _) => Ok(SocketAddr::new(addr, self.port)),
            (None, Some(host)) => Self::resolve(host, self.port)?.socket_addr(),
            (None, None) => Err(Error::DnsResolution("endpoint has no host".into())),
        }
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host(), self.port)
    }
}
