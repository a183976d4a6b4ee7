//! The blocking transport underneath a session: a plain TCP socket, or one
//! upgraded to TLS after a successful `SSLRequest` negotiation.
use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::common::conn_log;

#[cfg(feature = "ssl")]
use openssl::ssl::SslStream;

/// Either side of the wire: a bare socket, or one wrapped in TLS.
///
/// Requires the `ssl` feature to construct the [`Self::Tls`] variant; without
/// it the crate can still talk to servers that don't require encryption.
pub enum Stream {
    Plain(TcpStream),
    #[cfg(feature = "ssl")]
    Tls(Box<SslStream<TcpStream>>),
}

impl Stream {
    pub fn connect(host: &str, port: u16, connect_timeout: Option<Duration>) -> io::Result<Self> {
        let stream = match connect_timeout {
            Some(timeout) => {
                let mut last_err = None;
                let mut found = None;
                for addr in std::net::ToSocketAddrs::to_socket_addrs(&(host, port))? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(s) => {
                            found = Some(s);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                found.ok_or_else(|| {
                    last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no addresses to connect to"))
                })?
            }
            None => TcpStream::connect((host, port))?,
        };

        stream.set_nodelay(true)?;
        conn_log!(debug, "connected to {host}:{port}");
        Ok(Stream::Plain(stream))
    }

    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.tcp_ref().set_read_timeout(timeout)
    }

    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.tcp_ref().set_write_timeout(timeout)
    }

    pub fn shutdown(&self) -> io::Result<()> {
        self.tcp_ref().shutdown(std::net::Shutdown::Both)
    }

    fn tcp_ref(&self) -> &TcpStream {
        match self {
            Stream::Plain(s) => s,
            #[cfg(feature = "ssl")]
            Stream::Tls(s) => s.get_ref(),
        }
    }

    /// Upgrade a plain connection to TLS in place, after the server has
    /// answered an `SSLRequest` with `S`.
    #[cfg(feature = "ssl")]
    pub fn upgrade_tls(self, host: &str) -> io::Result<Self> {
        use openssl::ssl::{SslConnector, SslMethod, SslVerifyMode};

        let tcp = match self {
            Stream::Plain(s) => s,
            Stream::Tls(_) => return Ok(self),
        };

        let mut builder = SslConnector::builder(SslMethod::tls())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        // Matches libpq's default `sslmode=prefer` posture: encrypt the
        // channel, accept self-signed or mismatched certificates.
        builder.set_verify(SslVerifyMode::NONE);
        let connector = builder.build();

        let ssl_stream = connector
            .connect(host, tcp)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

        conn_log!(debug, "upgraded connection to TLS");
        Ok(Stream::Tls(Box::new(ssl_stream)))
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.read(buf),
            #[cfg(feature = "ssl")]
            Stream::Tls(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Plain(s) => s.write(buf),
            #[cfg(feature = "ssl")]
            Stream::Tls(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Plain(s) => s.flush(),
            #[cfg(feature = "ssl")]
            Stream::Tls(s) => s.flush(),
        }
    }
}

impl std::fmt::Debug for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Plain(s) => write!(f, "Stream::Plain({:?})", s.peer_addr()),
            #[cfg(feature = "ssl")]
            Stream::Tls(s) => write!(f, "Stream::Tls({:?})", s.get_ref().peer_addr()),
        }
    }
}
