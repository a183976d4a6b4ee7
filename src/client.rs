//! The public connection handle: lazy connect/reconnect, query execution,
//! statement preparation, and query cancellation.
use std::sync::{Arc, Mutex};

use crate::{
    config::Config,
    error::Result,
    format_stmt::FormattedStatement,
    protocol::frontend::{self, BoundParam},
    protocol_engine::{PreparedStatement, ProtocolEngine},
    result::QueryResult,
    session::Session,
    statement::StatementName,
    value::Value,
};

/// A single connection to a Postgres server.
///
/// `Client` holds its session exclusively: every operation takes `&mut self`,
/// so the borrow checker rules out issuing two overlapping operations on the
/// same handle. Use [`SharedClient`] to share one connection across threads.
#[derive(Debug)]
pub struct Client {
    config: Config,
    engine: Option<ProtocolEngine>,
}

impl Client {
    /// Build a client that connects lazily on first use.
    pub fn new(config: Config) -> Self {
        Self { config, engine: None }
    }

    /// Connect immediately (plain TCP), per `config.use_tls`.
    pub fn connect(config: Config) -> Result<Self> {
        let mut client = Self::new(config);
        client.open()?;
        Ok(client)
    }

    /// Connect immediately, requesting a TLS upgrade regardless of what
    /// `config.use_tls` said.
    pub fn connect_ssl(config: Config) -> Result<Self> {
        let config = config.use_tls(true);
        Self::connect(config)
    }

    /// Open the underlying connection if it isn't already open.
    pub fn open(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Ok(());
        }
        let session = Session::open(&self.config)?;
        self.engine = Some(ProtocolEngine::new(session));
        Ok(())
    }

    /// Best-effort close; drops the session.
    pub fn close(&mut self) {
        self.engine = None;
    }

    pub fn is_connected(&self) -> bool {
        self.engine.as_ref().is_some_and(|e| e.session().is_connected())
    }

    fn engine_mut(&mut self) -> Result<&mut ProtocolEngine> {
        self.open()?;
        Ok(self.engine.as_mut().expect("just opened"))
    }

    /// Run `sql` as a simple query, capturing any rows it returns.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.engine_mut()?.simple_query(sql)
    }

    /// Run `sql`, returning only its command tag(s) (one per embedded
    /// statement in a multi-statement `sql` string).
    pub fn execute(&mut self, sql: &str) -> Result<Vec<String>> {
        Ok(self.engine_mut()?.simple_query(sql)?.command_tags)
    }

    /// Parse and describe `sql`. When `name` is `None`, the statement name is
    /// derived from a hash of `sql` so repeated calls with the same text
    /// reuse the same prepared statement; an explicit `name` is used as-is.
    pub fn prepare(&mut self, sql: &str, name: Option<&str>) -> Result<Statement> {
        let stmt_name = match name {
            Some(n) => StatementName::literal(n),
            None => StatementName::for_sql(sql),
        };
        let prepared = self.engine_mut()?.prepare(sql, stmt_name, &[])?;
        Ok(Statement { prepared })
    }

    /// Bind parameters and run a prepared statement's portal to completion.
    pub fn query_prepared(&mut self, stmt: &Statement, params: &[Value]) -> Result<QueryResult> {
        let owned: Vec<String> = params.iter().map(Value::to_string).collect();
        let bound: Vec<BoundParam<'_>> = params
            .iter()
            .zip(owned.iter())
            .map(|(v, s)| if v.is_null() { BoundParam::Null } else { BoundParam::Text(s) })
            .collect();
        self.engine_mut()?.execute(&stmt.prepared, &bound)
    }

    /// Build a client-side-quoted statement template (see
    /// [`FormattedStatement`]); never touches the wire until run via
    /// [`Client::query`] on its [`FormattedStatement::to_sql`] output.
    pub fn format(&self, sql_template: impl Into<String>) -> FormattedStatement {
        FormattedStatement::new(sql_template)
    }

    /// Query `pg_type` for server-defined `enum` types and register each
    /// OID/name pair with the converter, so columns of those types decode to
    /// [`Value::Enum`] instead of falling back to plain text. Enum OIDs are
    /// assigned per-database at `CREATE TYPE ... AS ENUM` time, so this must
    /// be called (and re-called after creating new enum types) rather than
    /// relying on a built-in table.
    pub fn load_enums(&mut self) -> Result<()> {
        let rows = self.query("SELECT oid::int4 AS oid, typname FROM pg_type WHERE typtype = 'e'")?;
        let registered: Vec<(i32, String)> =
            rows.into_iter().map(|row| (row.get::<_, i32>("oid"), row.get::<_, String>("typname"))).collect();

        let converter = self.engine_mut()?.converter_mut();
        for (oid, type_name) in registered {
            converter.enums_mut().register(oid as u32, type_name);
        }
        Ok(())
    }

    /// Probe the connection with `SELECT {n} AS probe`, verifying both the
    /// command tag and the returned value round-trip.
    pub fn is_working(&mut self) -> bool {
        let n: i32 = rand::random::<u16>() as i32;
        let sql = format!("SELECT {n} AS probe");
        let Ok(result) = self.query(&sql) else { return false };
        if result.command_tags != ["SELECT 1"] {
            return false;
        }
        let Ok(Some(row)) = result.optional() else { return false };
        row.try_get::<usize, i32>(0).map(|got| got == n).unwrap_or(false)
    }

    /// A token identifying this connection for [`cancel_query`].
    pub fn cancel_token(&self) -> Option<CancelToken> {
        let session = self.engine.as_ref()?.session();
        Some(CancelToken {
            host: self.config.host.as_str().to_string(),
            port: self.config.port,
            process_id: session.backend_pid,
            secret_key: session.backend_secret,
        })
    }
}

/// A prepared statement's identity and described metadata.
pub struct Statement {
    prepared: PreparedStatement,
}

impl Statement {
    pub fn name(&self) -> &str {
        self.prepared.name.as_str()
    }
}

/// Enough information to cancel an in-flight query on another connection.
#[derive(Clone, Debug)]
pub struct CancelToken {
    host: String,
    port: u16,
    process_id: u32,
    secret_key: u32,
}

/// Open a short-lived second connection and issue a raw `CancelRequest`
/// against `token`. No reply is expected; the socket is closed immediately
/// after the write.
pub fn cancel_query(token: &CancelToken) -> Result<()> {
    let mut stream = crate::net::Stream::connect(&token.host, token.port, Some(std::time::Duration::from_secs(10)))?;
    let mut builder = crate::message::MessageBuilder::new();
    frontend::write_cancel_request(&mut builder, token.process_id, token.secret_key);
    std::io::Write::write_all(&mut stream, &builder.split())?;
    let _ = stream.shutdown();
    Ok(())
}

/// A `Client` shared across threads: each call takes the lock only for the
/// duration of that one operation, so concurrent callers serialize rather
/// than race.
#[derive(Clone)]
pub struct SharedClient(Arc<Mutex<Client>>);

impl SharedClient {
    pub fn new(client: Client) -> Self {
        Self(Arc::new(Mutex::new(client)))
    }

    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).query(sql)
    }

    pub fn execute(&self, sql: &str) -> Result<Vec<String>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).execute(sql)
    }

    pub fn is_working(&self) -> bool {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).is_working()
    }
}
