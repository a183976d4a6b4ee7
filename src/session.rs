//! The connection's lifecycle: opening a socket, authenticating, and tracking
//! server-reported parameters for the lifetime of the connection.
use std::collections::HashMap;
use std::time::Duration;

use crate::{
    auth,
    common::{conn_log, verbose, ByteStr},
    config::Config,
    error::{Error, ErrorKind, Result, SslError},
    message::{MessageBuilder, MessageReader},
    net::Stream,
    protocol::{backend, frontend, Authentication, BackendKeyData, BackendMessage},
};

/// Seeded into `backend_pid` before a `BackendKeyData` arrives, so that
/// `is_connected` can tell "ready, but the server never sent key data" apart
/// from "never connected".
const NO_BACKEND_PID: u32 = u32::MAX;

/// Where the connection currently stands. Matched explicitly in
/// [`Session::open`]'s driving loop rather than modeled with exceptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Open,
    Authenticating,
    Starting,
    Ready,
    InFlight,
}

/// An open, authenticated connection and the state accumulated from its
/// startup exchange.
#[derive(Debug)]
pub struct Session {
    pub(crate) stream: Stream,
    pub(crate) reader: MessageReader,
    pub(crate) builder: MessageBuilder,
    pub(crate) state: SessionState,
    pub(crate) parameters: HashMap<ByteStr, ByteStr>,
    pub(crate) backend_pid: u32,
    pub(crate) backend_secret: u32,
    pub(crate) ssl: bool,
}

impl Session {
    /// Open a TCP (optionally TLS) connection and run the startup/auth
    /// handshake to completion.
    pub fn open(config: &Config) -> Result<Self> {
        let timeout = config.connect_timeout.unwrap_or(Duration::from_secs(10));
        let mut stream = Stream::connect(config.host.as_str(), config.port, Some(timeout))?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut ssl = false;
        if config.use_tls {
            stream = Self::negotiate_tls(stream, config)?;
            ssl = true;
        }

        let mut session = Self {
            stream,
            reader: MessageReader::new(),
            builder: MessageBuilder::new(),
            state: SessionState::Open,
            parameters: HashMap::new(),
            backend_pid: NO_BACKEND_PID,
            backend_secret: 0,
            ssl,
        };

        session.startup(config)?;
        Ok(session)
    }

    #[cfg(feature = "ssl")]
    fn negotiate_tls(mut stream: Stream, config: &Config) -> Result<Stream> {
        let mut builder = MessageBuilder::new();
        frontend::write_ssl_request(&mut builder);
        std::io::Write::write_all(&mut stream, &builder.split())?;

        let response = MessageReader::read_ssl_response(&mut stream)?;
        match response {
            b'S' => {
                conn_log!(debug, "server accepted TLS negotiation");
                Ok(stream.upgrade_tls(config.host.as_str())?)
            }
            _ => Err(ErrorKind::Ssl(SslError::Refused).into()),
        }
    }

    #[cfg(not(feature = "ssl"))]
    fn negotiate_tls(_stream: Stream, _config: &Config) -> Result<Stream> {
        Err(ErrorKind::Ssl(SslError::FeatureDisabled).into())
    }

    fn startup(&mut self, config: &Config) -> Result<()> {
        let user = config.resolved_user()?;

        self.builder.clear();
        frontend::write_startup(
            frontend::Startup { user: user.as_str(), database: config.dbname.as_deref(), replication: None },
            &mut self.builder,
        );
        self.flush()?;
        self.state = SessionState::Authenticating;

        loop {
            let msg = self.recv_one()?;
            match msg {
                BackendMessage::Authentication(auth_msg) => match auth_msg {
                    Authentication::Ok => break,
                    Authentication::CleartextPassword => {
                        let password = config.resolved_password().map_err(|e| {
                            self.state = SessionState::Closed;
                            Error::from(ErrorKind::Config(e))
                        })?;
                        self.builder.clear();
                        frontend::write(frontend::PasswordMessage { password: password.as_str() }, &mut self.builder);
                        self.flush()?;
                    }
                    Authentication::MD5Password { salt } => {
                        let password = config.resolved_password().map_err(|e| {
                            self.state = SessionState::Closed;
                            Error::from(ErrorKind::Config(e))
                        })?;
                        let digest = auth::md5_password(user.as_str(), password.as_str(), salt);
                        self.builder.clear();
                        frontend::write(frontend::PasswordMessage { password: &digest }, &mut self.builder);
                        self.flush()?;
                    }
                    other => {
                        let code = match other {
                            Authentication::KerberosV5 => 2,
                            Authentication::GSS => 7,
                            Authentication::SSPI => 9,
                            Authentication::SASL { .. } => 10,
                            Authentication::SASLContinue { .. } => 11,
                            Authentication::SASLFinal { .. } => 12,
                            _ => unreachable!(),
                        };
                        self.state = SessionState::Closed;
                        return Err(ErrorKind::UnsupportedAuth { code }.into());
                    }
                },
                other => {
                    return Err(Error::from(ErrorKind::Protocol(crate::protocol::ProtocolError::unexpected(
                        "AuthenticationRequest",
                        other.tag(),
                        "authentication",
                    ))))
                }
            }
        }

        self.state = SessionState::Starting;

        loop {
            match self.recv_one()? {
                BackendMessage::ParameterStatus(backend::ParameterStatus { name, value }) => {
                    self.parameters.insert(name, value);
                }
                BackendMessage::BackendKeyData(BackendKeyData { process_id, secret_key }) => {
                    self.backend_pid = process_id;
                    self.backend_secret = secret_key;
                }
                BackendMessage::ReadyForQuery(_) => break,
                other => {
                    return Err(Error::from(ErrorKind::Protocol(crate::protocol::ProtocolError::unexpected(
                        "ParameterStatus, BackendKeyData, or ReadyForQuery",
                        other.tag(),
                        "startup",
                    ))))
                }
            }
        }

        self.state = SessionState::Ready;
        conn_log!(info, "connected (pid={})", self.backend_pid);
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.backend_pid != NO_BACKEND_PID && matches!(self.state, SessionState::Ready | SessionState::InFlight)
    }

    pub fn flush(&mut self) -> Result<()> {
        let bytes = self.builder.split();
        verbose!("-> {} bytes", bytes.len());
        std::io::Write::write_all(&mut self.stream, &bytes)?;
        std::io::Write::flush(&mut self.stream)?;
        Ok(())
    }

    pub fn recv_one(&mut self) -> Result<BackendMessage> {
        let raw = self.reader.read_message(&mut self.stream)?;
        verbose!("<- {} ({} bytes)", BackendMessage::message_name(raw.tag), raw.body.len());
        Ok(BackendMessage::decode(raw.tag, raw.body)?)
    }

    /// Best-effort shutdown: send `Terminate`, then close the socket.
    /// Swallows errors since this also runs from `Drop`.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.builder.clear();
        frontend::write(frontend::Terminate, &mut self.builder);
        let _ = self.flush();
        let _ = self.stream.shutdown();
        self.state = SessionState::Closed;
        conn_log!(debug, "connection closed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
