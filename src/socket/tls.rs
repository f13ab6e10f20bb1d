use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::path::Path;
use std::sync::Arc;

use log::{debug, trace};
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, ClientConnection, RootCertStore};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::socket::{TcpSocket, Transport};

/// Shared client-side TLS configuration.
///
/// Cloning is cheap; all clones share one `ClientConfig`.
#[derive(Debug, Clone)]
pub struct TlsContext {
    config: Arc<ClientConfig>,
}

impl TlsContext {
    /// Trust the Mozilla root set shipped with `webpki-roots`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the crypto provider rejects the default
    /// protocol versions.
    pub fn new() -> Result<Self> {
        let roots = RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_root_store(roots)
    }

    /// Trust only the given certificates.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if a certificate cannot be parsed.
    pub fn with_root_certificates(certs: Vec<CertificateDer<'static>>) -> Result<Self> {
        let mut roots = RootCertStore::empty();
        for cert in certs {
            roots.add(cert).map_err(|e| Error::Tls(e.to_string()))?;
        }
        Self::with_root_store(roots)
    }

    /// Trust the certificates found in a PEM file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the file cannot be read or holds no
    /// certificates.
    pub fn from_pem_file(path: &Path) -> Result<Self> {
        Self::with_root_certificates(load_certs_from_file(path)?)
    }

    /// Use a prebuilt rustls configuration.
    #[must_use]
    pub fn from_config(config: Arc<ClientConfig>) -> Self {
        Self { config }
    }

    /// The underlying rustls configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    fn with_root_store(roots: RootCertStore) -> Result<Self> {
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Tls(e.to_string()))?
            .with_root_certificates(roots)
            .with_no_client_auth();

        Ok(Self {
            config: Arc::new(config),
        })
    }
}

/// Load all certificates from a PEM file.
///
/// # Errors
///
/// Returns [`Error::Tls`] if the file cannot be read or holds no
/// certificates.
pub fn load_certs_from_file(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file =
        File::open(path).map_err(|e| Error::Tls(format!("{}: {e}", path.display())))?;
    let mut reader = BufReader::new(file);

    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("{}: {e}", path.display())))?;

    if certs.is_empty() {
        return Err(Error::Tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    Ok(certs)
}

/// TLS over a blocking TCP stream.
///
/// Sends `close_notify` when dropped.
#[derive(Debug)]
pub struct TlsSocket {
    conn: ClientConnection,
    stream: TcpStream,
    pending: Option<Error>,
}

impl TlsSocket {
    /// Connect over TCP and complete the TLS handshake.
    ///
    /// The server name for SNI and certificate verification is the
    /// endpoint's hostname, or its IP address when it has none.
    ///
    /// # Errors
    ///
    /// - `Error::EstablishConnection` if the TCP connection fails
    /// - `Error::TlsHandshake` if the handshake fails
    pub fn connect(context: &TlsContext, endpoint: &Endpoint) -> Result<Self> {
        let server_name = match (endpoint.hostname(), endpoint.address()) {
            (Some(name), _) => name.to_string(),
            (None, Some(addr)) => addr.to_string(),
            (None, None) => return Err(Error::DnsResolution("endpoint has no host".into())),
        };
        let tcp = TcpSocket::connect(endpoint)?;
        Self::from_tcp(context, &server_name, tcp)
    }

    /// Run the TLS handshake over an already connected TCP socket.
    ///
    /// # Errors
    ///
    /// - `Error::Tls` if `server_name` is not a valid DNS name or IP address
    /// - `Error::TlsHandshake` if the handshake fails
    pub fn from_tcp(context: &TlsContext, server_name: &str, tcp: TcpSocket) -> Result<Self> {
        let name = ServerName::try_from(server_name.to_string())
            .map_err(|_| Error::Tls(format!("invalid server name: {server_name}")))?;
        let mut conn = ClientConnection::new(Arc::clone(context.config()), name)
            .map_err(|e| Error::Tls(e.to_string()))?;
        let mut stream = tcp.into_stream();

        while conn.is_handshaking() {
            conn.complete_io(&mut stream)
                .map_err(|e| Error::TlsHandshake(e.to_string()))?;
        }

        debug!(
            "tls handshake with {server_name} complete ({:?})",
            conn.protocol_version()
        );

        Ok(Self {
            conn,
            stream,
            pending: None,
        })
    }

    fn fail(&mut self, err: Error) -> Error {
        self.pending = Some(err.clone());
        err
    }

    /// Decrypt whatever records are already buffered and report whether the
    /// application can read.
    fn plaintext_ready(&mut self) -> bool {
        match self.conn.process_new_packets() {
            Ok(state) => state.plaintext_bytes_to_read() > 0 || state.peer_has_closed(),
            Err(e) => {
                self.pending = Some(Error::Tls(e.to_string()));
                true
            }
        }
    }

    /// Pull records off a non-blocking socket until plaintext shows up or
    /// the socket would block.
    fn pump_records(&mut self) -> bool {
        loop {
            match self.conn.read_tls(&mut self.stream) {
                Ok(0) => {
                    self.pending = Some(Error::ConnectionReset);
                    return true;
                }
                Ok(_) => {
                    if self.plaintext_ready() {
                        return true;
                    }
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return false,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.pending = Some(e.into());
                    return true;
                }
            }
        }
    }

    /// Blocking read of at least one record.
    fn fill_blocking(&mut self) -> Result<()> {
        match self.conn.read_tls(&mut self.stream) {
            Ok(0) => Err(self.fail(Error::ConnectionReset)),
            Ok(_) => match self.conn.process_new_packets() {
                Ok(_) => Ok(()),
                Err(e) => Err(self.fail(Error::Tls(e.to_string()))),
            },
            Err(e) if e.kind() == ErrorKind::Interrupted => Ok(()),
            Err(e) => Err(self.fail(e.into())),
        }
    }
}

impl Transport for TlsSocket {
    fn poll(&mut self) -> bool {
        if self.pending.is_some() || self.plaintext_ready() {
            return true;
        }

        if self.stream.set_nonblocking(true).is_err() {
            return true;
        }
        let ready = self.pump_records();
        if self.stream.set_nonblocking(false).is_err() {
            self.pending
                .get_or_insert_with(|| Error::Io("failed to restore blocking mode".into()));
            return true;
        }

        ready
    }

    fn read(&mut self, max_len: usize) -> Result<Vec<u8>> {
        if let Some(err) = &self.pending {
            return Err(err.clone());
        }
        if max_len == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; max_len];
        loop {
            match self.conn.reader().read(&mut buf) {
                Ok(0) => {
                    trace!("tls peer sent close_notify");
                    return Err(self.fail(Error::ConnectionReset));
                }
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => self.fill_blocking()?,
                Err(e) => return Err(self.fail(e.into())),
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        if let Some(err) = &self.pending {
            return Err(err.clone());
        }

        self.conn.writer().write_all(bytes)?;
        while self.conn.wants_write() {
            if let Err(e) = self.conn.write_tls(&mut self.stream) {
                return Err(self.fail(e.into()));
            }
        }
        Ok(())
    }
}

impl Drop for TlsSocket {
    fn drop(&mut self) {
        self.conn.send_close_notify();
        while self.conn.wants_write() {
            if self.conn.write_tls(&mut self.stream).is_err() {
                break;
            }
        }
    }
}
