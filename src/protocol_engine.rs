//! Drives the simple-query and extended-query exchanges over a [`Session`],
//! turning backend messages into [`QueryResult`]s.
use std::sync::Arc;

use crate::{
    error::{Error, ErrorKind, Result},
    protocol::{backend, frontend, BackendMessage, Oid, RowFieldDescription},
    result::{QueryResult, Row},
    session::{Session, SessionState},
    statement::{PortalName, StatementName},
    types::Converter,
};

/// Parameter and type metadata a prepared statement was described with.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    pub name: StatementName,
    pub param_oids: Vec<Oid>,
    pub descriptions: Vec<RowFieldDescription>,
}

/// Runs query flows against a [`Session`], decoding rows through a
/// [`Converter`] bound to that session's reported parameters.
#[derive(Debug)]
pub struct ProtocolEngine {
    pub(crate) session: Session,
    pub(crate) converter: Converter,
}

impl ProtocolEngine {
    pub fn new(session: Session) -> Self {
        let mut converter = Converter::new();
        converter.initialize_from(&session.parameters);
        Self { session, converter }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn converter(&self) -> &Converter {
        &self.converter
    }

    pub fn converter_mut(&mut self) -> &mut Converter {
        &mut self.converter
    }

    /// Run `sql` as a simple-query message. A multi-statement `sql` string
    /// produces one command tag per embedded statement, and every row from
    /// every embedded statement's sub-result is appended to `rows` in order
    /// (each row carries its own field descriptions, so sub-results of
    /// differing shape don't collide); `descriptions` reflects only the last
    /// `RowDescription` seen.
    pub fn simple_query(&mut self, sql: &str) -> Result<QueryResult> {
        self.session.builder.clear();
        frontend::write(frontend::Query { sql }, &mut self.session.builder);
        self.session.flush()?;
        self.session.state = SessionState::InFlight;

        let mut result = QueryResult::new();
        let mut descriptions: Arc<Vec<RowFieldDescription>> = Arc::new(Vec::new());

        loop {
            match self.session.recv_one()? {
                BackendMessage::RowDescription(desc) => {
                    descriptions = Arc::new(desc.fields().collect());
                    result.descriptions = (*descriptions).clone();
                }
                BackendMessage::DataRow(data) => {
                    result.rows.push(self.decode_row(&descriptions, data)?);
                }
                BackendMessage::CommandComplete(cc) => {
                    result.command_tags.push(cc.tag.as_str().to_string());
                }
                BackendMessage::EmptyQueryResponse(_) => {
                    result.command_tags.push(String::new());
                }
                BackendMessage::ErrorResponse(err) => {
                    self.drain_to_ready()?;
                    return Err(Error::from(err));
                }
                BackendMessage::NoticeResponse(notice) => {
                    crate::common::conn_log!(warn, "{}", notice.fields().find(|(c, _)| *c == b'M').map(|(_, m)| m).unwrap_or_default());
                }
                BackendMessage::ReadyForQuery(_) => break,
                other => return Err(protocol_mismatch(&other, "simple query")),
            }
        }

        self.session.state = SessionState::Ready;
        Ok(result)
    }

    /// Parse + Describe a statement, returning its parameter/result metadata.
    /// Uses an unnamed statement when `name` is `None` (re-parsed for every
    /// `prepare()` call that doesn't ask to name it).
    pub fn prepare(&mut self, sql: &str, name: StatementName, param_oids: &[Oid]) -> Result<PreparedStatement> {
        self.session.builder.clear();
        frontend::write(
            frontend::Parse { prepare_name: name.as_str(), sql, oids: param_oids },
            &mut self.session.builder,
        );
        frontend::write(frontend::Describe { kind: b'S', name: name.as_str() }, &mut self.session.builder);
        frontend::write(frontend::Sync, &mut self.session.builder);
        self.session.flush()?;
        self.session.state = SessionState::InFlight;

        let mut param_oids = Vec::new();
        let mut descriptions = Vec::new();

        loop {
            match self.session.recv_one()? {
                BackendMessage::ParseComplete(_) => {}
                BackendMessage::ParameterDescription(pd) => param_oids = pd.oids().collect(),
                BackendMessage::RowDescription(desc) => descriptions = desc.fields().collect(),
                BackendMessage::NoData(_) => {}
                BackendMessage::ErrorResponse(err) => {
                    self.drain_to_ready()?;
                    return Err(Error::from(err));
                }
                BackendMessage::ReadyForQuery(_) => break,
                other => return Err(protocol_mismatch(&other, "prepare")),
            }
        }

        self.session.state = SessionState::Ready;
        Ok(PreparedStatement { name, param_oids, descriptions })
    }

    /// Bind + Execute + Sync a prepared statement's portal to completion.
    pub fn execute(&mut self, stmt: &PreparedStatement, params: &[frontend::BoundParam<'_>]) -> Result<QueryResult> {
        let portal = PortalName::next();

        self.session.builder.clear();
        frontend::write(
            frontend::Bind { portal_name: portal.as_str(), stmt_name: stmt.name.as_str(), params },
            &mut self.session.builder,
        );
        frontend::write(frontend::Execute { portal_name: portal.as_str(), max_rows: 0 }, &mut self.session.builder);
        frontend::write(frontend::Sync, &mut self.session.builder);
        self.session.flush()?;
        self.session.state = SessionState::InFlight;

        let descriptions = Arc::new(stmt.descriptions.clone());
        let mut result = QueryResult::new();
        result.descriptions = stmt.descriptions.clone();

        loop {
            match self.session.recv_one()? {
                BackendMessage::BindComplete(_) => {}
                BackendMessage::DataRow(data) => {
                    result.rows.push(self.decode_row(&descriptions, data)?);
                }
                BackendMessage::CommandComplete(cc) => {
                    result.command_tags.push(cc.tag.as_str().to_string());
                }
                BackendMessage::PortalSuspended(_) => {}
                BackendMessage::EmptyQueryResponse(_) => result.command_tags.push(String::new()),
                BackendMessage::ErrorResponse(err) => {
                    self.drain_to_ready()?;
                    return Err(Error::from(err));
                }
                BackendMessage::ReadyForQuery(_) => break,
                other => return Err(protocol_mismatch(&other, "bind/execute")),
            }
        }

        self.session.state = SessionState::Ready;
        Ok(result)
    }

    /// Close a named prepared statement.
    pub fn close_statement(&mut self, name: &StatementName) -> Result<()> {
        if name.is_unnamed() {
            return Ok(());
        }
        self.session.builder.clear();
        frontend::write(frontend::Close { kind: b'S', name: name.as_str() }, &mut self.session.builder);
        frontend::write(frontend::Sync, &mut self.session.builder);
        self.session.flush()?;
        self.session.state = SessionState::InFlight;

        loop {
            match self.session.recv_one()? {
                BackendMessage::CloseComplete(_) => {}
                BackendMessage::ErrorResponse(err) => {
                    self.drain_to_ready()?;
                    return Err(Error::from(err));
                }
                BackendMessage::ReadyForQuery(_) => break,
                other => return Err(protocol_mismatch(&other, "close statement")),
            }
        }
        self.session.state = SessionState::Ready;
        Ok(())
    }

    fn decode_row(&self, descriptions: &Arc<Vec<RowFieldDescription>>, data: backend::DataRow) -> Result<Row> {
        let mut values = Vec::with_capacity(descriptions.len());
        for (desc, column) in descriptions.iter().zip(data.columns()) {
            let value = self
                .converter
                .decode(desc.type_oid, column.as_deref())
                .map_err(|e| ErrorKind::Decode(crate::result::DecodeError::Parse(e.to_string())))?;
            values.push(value);
        }
        Ok(Row { descriptions: descriptions.clone(), values })
    }

    /// After an `ErrorResponse` mid-flow, the server still owes us a
    /// `ReadyForQuery`; drain everything up to it so the connection stays
    /// usable for the next query instead of desyncing.
    fn drain_to_ready(&mut self) -> Result<()> {
        loop {
            match self.session.recv_one()? {
                BackendMessage::ReadyForQuery(_) => {
                    self.session.state = SessionState::Ready;
                    return Ok(());
                }
                _ => continue,
            }
        }
    }
}

fn protocol_mismatch(found: &BackendMessage, phase: &'static str) -> Error {
    Error::from(ErrorKind::Protocol(crate::protocol::ProtocolError::unexpected(
        "a message valid for this phase",
        found.tag(),
        phase,
    )))
}
