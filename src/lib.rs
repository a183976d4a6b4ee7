//! A lightweight, synchronous PostgreSQL client speaking the wire protocol
//! directly over a blocking [`std::net::TcpStream`].
//!
//! ```no_run
//! use ivory::{Client, Config};
//!
//! # fn main() -> ivory::Result<()> {
//! let config: Config = "psql://postgres@localhost/postgres".parse()?;
//! let mut client = Client::connect(config)?;
//!
//! for row in client.query("select id, name from users")? {
//!     let id: i32 = row.get("id");
//!     let name: String = row.get("name");
//!     println!("{id}: {name}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! No connection pooling, async runtime, or statement caching beyond the
//! deterministic name [`statement::StatementName::for_sql`] derives: a
//! `Client` owns exactly one socket and serves exactly one caller at a time,
//! enforced at compile time by `&mut self` on every operation that touches
//! the wire. [`client::SharedClient`] wraps a `Client` in a mutex for callers
//! that need to share a connection handle across threads.

mod auth;
pub mod client;
mod common;
pub mod config;
mod ext;
pub mod error;
mod format_stmt;
mod message;
mod net;
pub mod protocol;
mod protocol_engine;
pub mod result;
mod session;
pub mod statement;
pub mod types;
mod value;

pub use client::{cancel_query, CancelToken, Client, SharedClient, Statement};
pub use config::{Config, ConfigError};
pub use error::{Error, ErrorKind, Result, SslError};
pub use format_stmt::FormattedStatement;
pub use protocol::ErrorResponse;
pub use protocol_engine::PreparedStatement;
pub use result::{Decode, DecodeError, FromRow, Index, QueryResult, Row, RowNotFound};
pub use statement::{PortalName, StatementName};
pub use types::Converter;
pub use value::Value;
