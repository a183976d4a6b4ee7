//! Postgres frontend and backend message formats.
//!
//! Docs here mostly paraphrase the official protocol documentation.
//!
//! All communication is through a stream of messages. The first byte of a
//! message identifies the message type, and the next four bytes specify the
//! length of the rest of the message (this length count includes itself, but
//! not the message-type byte).
//!
//! ```text
//! +----+--------------------+------+
//! | Ty |       Length       | Body |
//! +----+--------------------+------+
//! | u8 |         u32        | [u8] |
//! +----+--------------------+------+
//! ```
//!
//! For historical reasons, the very first message sent by the client (the
//! startup message) has no initial message-type byte.
//!
//! <https://www.postgresql.org/docs/current/protocol-message-formats.html>

mod pg_type;
mod format;
mod error;

pub mod frontend;
pub mod backend;

pub use pg_type::{Oid, PgType};
pub use format::PgFormat;
pub use error::ProtocolError;

pub use frontend::FrontendProtocol;
pub use backend::{
    Authentication, BackendKeyData, BackendMessage, BackendProtocol, BindComplete, CloseComplete,
    CommandComplete, DataRow, EmptyQueryResponse, ErrorResponse, NoData, NoticeResponse,
    ParameterDescription, ParameterStatus, ParseComplete, PortalSuspended, ReadyForQuery,
    RowDescription, RowFieldDescription,
};
